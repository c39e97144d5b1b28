//! Concurrent evaluation of a rule set.
//!
//! Every rule runs in its own task. A semaphore keeps at most
//! `min(rules, concurrency)` rules in flight so neither remote API is
//! flooded. Tasks share nothing mutable; the tracker and notifier are
//! shared read-only through the [`RuleProcessor`].

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use uuid::Uuid;

use nudge_common::config::DEFAULT_CONCURRENCY;
use nudge_common::error::AppError;
use nudge_common::types::Rule;

use crate::processor::RuleProcessor;
use crate::report::{RuleOutcome, RuleReport, RunReport, Stage};

/// Runs a set of rules through a shared [`RuleProcessor`].
pub struct NotificationRunner {
    processor: Arc<RuleProcessor>,
    concurrency: usize,
}

impl NotificationRunner {
    pub fn new(processor: RuleProcessor) -> Self {
        Self {
            processor: Arc::new(processor),
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    /// Maximum number of rules evaluated at once (at least 1).
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Evaluate every rule once and report one outcome per rule, in input order.
    ///
    /// Deliveries happen in no particular order. Triggering `cancel` makes
    /// rules that have not finished report [`RuleOutcome::Canceled`].
    pub async fn run(&self, rules: &[Rule], cancel: CancellationToken) -> RunReport {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let permits = self.concurrency.min(rules.len()).max(1);
        let semaphore = Arc::new(Semaphore::new(permits));

        tracing::info!(
            run_id = %run_id,
            rules = rules.len(),
            concurrency = permits,
            "Notification run started"
        );

        let mut handles = Vec::with_capacity(rules.len());
        for (index, rule) in rules.iter().cloned().enumerate() {
            let processor = Arc::clone(&self.processor);
            let semaphore = Arc::clone(&semaphore);
            let cancel = cancel.clone();
            let label = rule.label().to_string();
            let span = tracing::info_span!("rule", run_id = %run_id, index, rule = %rule.label());

            let handle = tokio::spawn(
                async move {
                    let started = Instant::now();
                    let outcome = tokio::select! {
                        biased;
                        _ = cancel.cancelled() => RuleOutcome::Canceled { stage: Stage::Search },
                        permit = semaphore.acquire_owned() => match permit {
                            Ok(_permit) => processor.process(&rule, &cancel).await,
                            Err(_) => RuleOutcome::Canceled { stage: Stage::Search },
                        },
                    };
                    RuleReport {
                        index,
                        rule: rule.label().to_string(),
                        outcome,
                        elapsed_ms: started.elapsed().as_millis() as u64,
                    }
                }
                .instrument(span),
            );
            handles.push((index, label, handle));
        }

        let mut reports = Vec::with_capacity(handles.len());
        for (index, label, handle) in handles {
            let report = match handle.await {
                Ok(report) => report,
                Err(e) => {
                    tracing::error!(run_id = %run_id, index, rule = %label, error = %e, "Rule task died");
                    RuleReport {
                        index,
                        rule: label,
                        outcome: RuleOutcome::Failed {
                            stage: None,
                            error: AppError::Internal(format!("rule evaluation task failed: {e}")),
                        },
                        elapsed_ms: 0,
                    }
                }
            };
            reports.push(report);
        }

        let report = RunReport {
            run_id,
            started_at,
            finished_at: Utc::now(),
            rules: reports,
        };

        tracing::info!(
            run_id = %run_id,
            delivered = report.delivered(),
            skipped = report.skipped(),
            failed = report.failed(),
            canceled = report.canceled(),
            "Notification run finished"
        );

        report
    }
}
