//! Issue tracker access: the [`IssueTracker`] capability and its Jira client.

pub mod jira;

use async_trait::async_trait;

use nudge_common::error::AppError;
use nudge_common::types::SearchResult;

pub use jira::{JiraClient, JiraCredentials};

/// Trait that every issue tracker backend implements.
#[async_trait]
pub trait IssueTracker: Send + Sync {
    /// Run a query and return the matching issues in tracker order.
    ///
    /// Fails with `Transport`, `Auth` or `Protocol`.
    async fn search(&self, query: &str) -> Result<SearchResult, AppError>;

    /// Browser link to the issue with the given key.
    fn issue_url(&self, key: &str) -> String;
}
