//! Single-rule pipeline.
//!
//! For one rule:
//! 1. Search the tracker (bounded by the request timeout once per result page)
//! 2. Skip quietly when nothing matched
//! 3. Group matches by assignee and render the digest
//! 4. Deliver it to the rule's destination or the default one
//!
//! Every failure is turned into a [`RuleOutcome`]; nothing propagates to the
//! caller, so one rule can never abort another.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use nudge_common::config::{DEFAULT_MAX_PAGES, DEFAULT_TIMEOUT_SECS};
use nudge_common::error::AppError;
use nudge_common::types::Rule;
use nudge_notifier::ChatNotifier;
use nudge_tracker::IssueTracker;

use crate::grouping::group_by_assignee;
use crate::render::MessageRenderer;
use crate::report::{RuleOutcome, Stage};

/// Evaluates one rule end to end.
pub struct RuleProcessor {
    tracker: Arc<dyn IssueTracker>,
    notifier: Arc<dyn ChatNotifier>,
    renderer: MessageRenderer,
    default_destination: Option<String>,
    timeout: Duration,
    search_pages: u32,
}

impl RuleProcessor {
    pub fn new(tracker: Arc<dyn IssueTracker>, notifier: Arc<dyn ChatNotifier>) -> Self {
        Self {
            tracker,
            notifier,
            renderer: MessageRenderer::new(),
            default_destination: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            search_pages: DEFAULT_MAX_PAGES,
        }
    }

    pub fn with_renderer(mut self, renderer: MessageRenderer) -> Self {
        self.renderer = renderer;
        self
    }

    /// Destination for rules whose own destination is empty.
    pub fn with_default_destination(mut self, destination: Option<String>) -> Self {
        self.default_destination = destination.filter(|d| !d.trim().is_empty());
        self
    }

    /// Per-request bound. Delivery gets it once; search gets it once per page.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Number of result pages a single search may fetch.
    pub fn with_search_pages(mut self, pages: u32) -> Self {
        self.search_pages = pages.max(1);
        self
    }

    fn search_timeout(&self) -> Duration {
        self.timeout.saturating_mul(self.search_pages)
    }

    /// Run the full pipeline for `rule`.
    pub async fn process(&self, rule: &Rule, cancel: &CancellationToken) -> RuleOutcome {
        let search = bounded(
            self.search_timeout(),
            "JIRA search",
            self.tracker.search(&rule.query),
        );
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::info!("Canceled before search completed");
                return RuleOutcome::Canceled { stage: Stage::Search };
            }
            result = search => result,
        };

        let result = match result {
            Ok(result) => result,
            Err(error) => {
                tracing::warn!(stage = %Stage::Search, error = %error, "Rule failed");
                return RuleOutcome::Failed {
                    stage: Some(Stage::Search),
                    error,
                };
            }
        };

        if result.is_empty() {
            tracing::info!("No matching issues, nothing to send");
            return RuleOutcome::SkippedEmpty;
        }

        let groups = group_by_assignee(&result.issues);
        let message = self
            .renderer
            .render(rule, &result, &groups, |key| self.tracker.issue_url(key));

        let Some(destination) = self.destination_for(rule) else {
            let error = AppError::Config("rule has no destination and no default is configured".to_string());
            tracing::warn!(stage = %Stage::Deliver, error = %error, "Rule failed");
            return RuleOutcome::Failed {
                stage: Some(Stage::Deliver),
                error,
            };
        };

        if cancel.is_cancelled() {
            tracing::info!("Canceled before delivery");
            return RuleOutcome::Canceled { stage: Stage::Deliver };
        }

        let deliver = bounded(
            self.timeout,
            "chat delivery",
            self.notifier.deliver(destination, &message),
        );
        let delivered = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::info!("Canceled during delivery");
                return RuleOutcome::Canceled { stage: Stage::Deliver };
            }
            delivered = deliver => delivered,
        };

        if let Err(error) = delivered {
            tracing::warn!(stage = %Stage::Deliver, error = %error, "Rule failed");
            return RuleOutcome::Failed {
                stage: Some(Stage::Deliver),
                error,
            };
        }

        tracing::info!(
            issues = result.issues.len(),
            groups = groups.len(),
            partial = result.is_partial(),
            notifier = self.notifier.name(),
            "Digest delivered"
        );

        RuleOutcome::Delivered {
            issues: result.issues.len(),
            groups: groups.len(),
            partial: result.is_partial(),
        }
    }

    fn destination_for<'a>(&'a self, rule: &'a Rule) -> Option<&'a str> {
        let own = rule.destination.trim();
        if !own.is_empty() {
            return Some(own);
        }
        self.default_destination.as_deref()
    }
}

/// Await `fut`, turning an elapsed `timeout` into a transport error.
async fn bounded<T, F>(timeout: Duration, what: &str, fut: F) -> Result<T, AppError>
where
    F: Future<Output = Result<T, AppError>>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result,
        Err(_) => Err(AppError::Transport(format!(
            "{what} timed out after {}s",
            timeout.as_secs()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_bounded_times_out() {
        let slow = async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok::<_, AppError>(())
        };
        let err = bounded(Duration::from_secs(10), "JIRA search", slow)
            .await
            .unwrap_err();
        assert_eq!(
            err,
            AppError::Transport("JIRA search timed out after 10s".to_string())
        );
    }

    #[tokio::test]
    async fn test_bounded_passes_through() {
        let fast = async { Err::<(), _>(AppError::Auth("denied".to_string())) };
        let err = bounded(Duration::from_secs(10), "chat delivery", fast)
            .await
            .unwrap_err();
        assert_eq!(err, AppError::Auth("denied".to_string()));
    }
}
