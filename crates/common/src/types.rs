use serde::{Deserialize, Serialize};

/// Display name used for issues that have no owner.
pub const UNASSIGNED: &str = "Unassigned";

/// One configured notification unit: a tracker query and where to send matches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Rule {
    /// Optional label for logs, reports and the message header
    #[serde(default)]
    pub name: Option<String>,
    /// JQL query, passed to the tracker verbatim
    pub query: String,
    /// Webhook URL; empty means the runner's default destination
    #[serde(default)]
    pub destination: String,
}

impl Rule {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            name: None,
            query: query.into(),
            destination: String::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_destination(mut self, destination: impl Into<String>) -> Self {
        self.destination = destination.into();
        self
    }

    /// Human-readable label: the configured name, or the query itself.
    pub fn label(&self) -> &str {
        match self.name.as_deref() {
            Some(name) if !name.trim().is_empty() => name,
            _ => &self.query,
        }
    }
}

/// A single tracker item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub key: String,
    pub summary: String,
    pub status: String,
    /// Display name of the owner, `None` when nobody owns the issue
    pub assignee: Option<String>,
}

impl Issue {
    /// The assignee's display name, or [`UNASSIGNED`] when absent or empty.
    ///
    /// This is the grouping key and the name shown to users.
    pub fn assignee(&self) -> &str {
        match self.assignee.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ => UNASSIGNED,
        }
    }
}

/// Issues matching one query, in tracker order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub issues: Vec<Issue>,
    /// Total number of matches reported by the tracker
    pub total: u64,
}

impl SearchResult {
    /// Build a result, keeping `total >= issues.len()`.
    pub fn new(issues: Vec<Issue>, total: u64) -> Self {
        let total = total.max(issues.len() as u64);
        Self { issues, total }
    }

    pub fn returned_count(&self) -> u64 {
        self.issues.len() as u64
    }

    /// True when the tracker matched more issues than were returned.
    pub fn is_partial(&self) -> bool {
        self.returned_count() < self.total
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issue(assignee: Option<&str>) -> Issue {
        Issue {
            key: "X-1".to_string(),
            summary: "Fix it".to_string(),
            status: "Open".to_string(),
            assignee: assignee.map(str::to_string),
        }
    }

    #[test]
    fn test_assignee_present() {
        assert_eq!(issue(Some("Alice")).assignee(), "Alice");
    }

    #[test]
    fn test_assignee_missing_or_empty() {
        assert_eq!(issue(None).assignee(), UNASSIGNED);
        assert_eq!(issue(Some("")).assignee(), UNASSIGNED);
    }

    #[test]
    fn test_rule_label_falls_back_to_query() {
        let rule = Rule::new("project = X");
        assert_eq!(rule.label(), "project = X");
        assert_eq!(rule.with_name("Stale").label(), "Stale");
    }

    #[test]
    fn test_search_result_clamps_total() {
        let result = SearchResult::new(vec![issue(None), issue(None)], 1);
        assert_eq!(result.total, 2);
        assert!(!result.is_partial());

        let result = SearchResult::new(vec![issue(None)], 10);
        assert!(result.is_partial());
        assert_eq!(result.returned_count(), 1);
    }
}
