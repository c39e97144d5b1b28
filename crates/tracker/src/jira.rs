//! Jira REST API client.
//!
//! Uses `GET /rest/api/2/search` with basic authentication and follows
//! `startAt` pagination up to a fixed page budget.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use nudge_common::config::{AppConfig, DEFAULT_MAX_PAGES};
use nudge_common::error::{AppError, body_excerpt};
use nudge_common::types::{Issue, SearchResult};

use crate::IssueTracker;

/// Fields requested for every issue.
const SEARCH_FIELDS: &str = "key,summary,status,assignee";

/// Issues requested per page (Jira's own default).
const DEFAULT_PAGE_SIZE: u32 = 50;

/// Server address and basic-auth credentials for Jira.
#[derive(Clone)]
pub struct JiraCredentials {
    /// Host (`jira.example.com`) or base URL (`https://jira.example.com`)
    pub server: String,
    pub username: String,
    pub password: String,
}

impl JiraCredentials {
    pub fn new(
        server: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            server: server.into(),
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            config.jira_server.clone(),
            config.jira_username.clone(),
            config.jira_password.clone(),
        )
    }
}

impl std::fmt::Debug for JiraCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JiraCredentials")
            .field("server", &self.server)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// A wrapper around the Jira search API.
#[derive(Debug, Clone)]
pub struct JiraClient {
    client: reqwest::Client,
    base_url: String,
    credentials: JiraCredentials,
    page_size: u32,
    max_pages: u32,
}

impl JiraClient {
    pub fn new(credentials: JiraCredentials, timeout: Duration) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: normalize_base_url(&credentials.server),
            credentials,
            page_size: DEFAULT_PAGE_SIZE,
            max_pages: DEFAULT_MAX_PAGES,
        })
    }

    /// Limit how many result pages a single search may fetch.
    pub fn with_max_pages(mut self, max_pages: u32) -> Self {
        self.max_pages = max_pages.max(1);
        self
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetch one page of search results starting at `start_at`.
    async fn fetch_page(&self, jql: &str, start_at: u64) -> Result<SearchResponse, AppError> {
        let url = format!("{}/rest/api/2/search", self.base_url);
        let start_at = start_at.to_string();
        let max_results = self.page_size.to_string();

        let resp = self
            .client
            .get(&url)
            .query(&[
                ("jql", jql),
                ("fields", SEARCH_FIELDS),
                ("startAt", start_at.as_str()),
                ("maxResults", max_results.as_str()),
            ])
            .basic_auth(&self.credentials.username, Some(&self.credentials.password))
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;

        if !status.is_success() {
            tracing::debug!(
                status = status.as_u16(),
                body = %body_excerpt(&body),
                "Non-success response body from JIRA"
            );
            return Err(AppError::from_status("JIRA", status));
        }

        serde_json::from_str(&body)
            .map_err(|e| AppError::Protocol(format!("unparsable JIRA search response: {e}")))
    }
}

#[async_trait]
impl IssueTracker for JiraClient {
    async fn search(&self, query: &str) -> Result<SearchResult, AppError> {
        let mut issues = Vec::new();
        let mut seen = HashSet::new();
        let mut total = 0u64;
        let mut start_at = 0u64;

        for page in 0..self.max_pages {
            let resp = self.fetch_page(query, start_at).await?;
            total = resp.total;

            let fetched = resp.issues.len() as u64;
            for raw in resp.issues {
                let issue = raw.into_issue()?;
                if seen.insert(issue.key.clone()) {
                    issues.push(issue);
                } else {
                    tracing::debug!(key = %issue.key, "Dropping duplicate issue across pages");
                }
            }

            tracing::debug!(page, start_at, fetched, total, "Fetched JIRA search page");

            start_at += fetched;
            if fetched == 0 || start_at >= total {
                break;
            }
        }

        let result = SearchResult::new(issues, total);
        if result.is_partial() {
            tracing::warn!(
                returned = result.returned_count(),
                total = result.total,
                max_pages = self.max_pages,
                "JIRA search results truncated"
            );
        }

        Ok(result)
    }

    fn issue_url(&self, key: &str) -> String {
        format!("{}/issues/{}", self.base_url, key)
    }
}

/// Search response from Jira.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchResponse {
    #[serde(default)]
    issues: Vec<RawIssue>,
    #[serde(default)]
    total: u64,
}

#[derive(Debug, Deserialize)]
struct RawIssue {
    #[serde(default)]
    key: String,
    #[serde(default)]
    fields: RawFields,
}

#[derive(Debug, Default, Deserialize)]
struct RawFields {
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    status: Option<RawStatus>,
    #[serde(default)]
    assignee: Option<RawUser>,
}

#[derive(Debug, Deserialize)]
struct RawStatus {
    #[serde(default)]
    name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawUser {
    #[serde(default)]
    display_name: Option<String>,
}

impl RawIssue {
    fn into_issue(self) -> Result<Issue, AppError> {
        if self.key.is_empty() {
            return Err(AppError::Protocol(
                "JIRA search response contains an issue without a key".to_string(),
            ));
        }

        Ok(Issue {
            key: self.key,
            summary: self.fields.summary.unwrap_or_default(),
            status: self.fields.status.map(|s| s.name).unwrap_or_default(),
            assignee: self
                .fields
                .assignee
                .and_then(|a| a.display_name)
                .filter(|name| !name.is_empty()),
        })
    }
}

/// Turn a bare host into an https base URL; strip trailing slashes.
fn normalize_base_url(server: &str) -> String {
    let server = server.trim().trim_end_matches('/');
    if server.contains("://") {
        server.to_string()
    } else {
        format!("https://{server}")
    }
}
