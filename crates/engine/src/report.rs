use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use nudge_common::error::AppError;

/// The step of a rule's evaluation an outcome refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Search,
    Deliver,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Search => write!(f, "search"),
            Stage::Deliver => write!(f, "deliver"),
        }
    }
}

/// What happened to one rule during a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RuleOutcome {
    /// A digest was accepted by the chat system
    Delivered {
        issues: usize,
        groups: usize,
        /// The tracker matched more issues than were fetched
        partial: bool,
    },
    /// The query matched nothing; no message was sent
    SkippedEmpty,
    /// A step failed. `stage` is `None` when the evaluation task itself died.
    Failed {
        #[serde(skip_serializing_if = "Option::is_none")]
        stage: Option<Stage>,
        error: AppError,
    },
    /// The run was canceled before or during `stage`
    Canceled { stage: Stage },
}

impl RuleOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, RuleOutcome::Failed { .. } | RuleOutcome::Canceled { .. })
    }
}

/// Outcome of one rule, in the position the rule had in the input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleReport {
    pub index: usize,
    pub rule: String,
    #[serde(flatten)]
    pub outcome: RuleOutcome,
    pub elapsed_ms: u64,
}

/// Summary of a whole run, one entry per rule in input order.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub rules: Vec<RuleReport>,
}

impl RunReport {
    pub fn delivered(&self) -> usize {
        self.count(|o| matches!(o, RuleOutcome::Delivered { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, RuleOutcome::SkippedEmpty))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, RuleOutcome::Failed { .. }))
    }

    pub fn canceled(&self) -> usize {
        self.count(|o| matches!(o, RuleOutcome::Canceled { .. }))
    }

    /// True when no rule failed or was canceled.
    pub fn is_success(&self) -> bool {
        !self.rules.iter().any(|r| r.outcome.is_failure())
    }

    fn count(&self, pred: impl Fn(&RuleOutcome) -> bool) -> usize {
        self.rules.iter().filter(|r| pred(&r.outcome)).count()
    }
}
