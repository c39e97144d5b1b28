use std::time::Duration;

use crate::error::AppError;

/// Default per-call timeout for tracker and chat requests.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Default number of rules evaluated at the same time.
pub const DEFAULT_CONCURRENCY: usize = 8;

/// Default number of tracker result pages fetched per query.
pub const DEFAULT_MAX_PAGES: u32 = 5;

/// Global application configuration loaded from environment variables.
///
/// Built once at startup and passed explicitly to the client constructors
/// and the runner; nothing below the binary reads the environment.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Jira host (`jira.example.com`) or base URL (`https://jira.example.com`)
    pub jira_server: String,

    /// Jira basic-auth username
    pub jira_username: String,

    /// Jira basic-auth password or API token
    pub jira_password: String,

    /// Default Slack webhook URL for rules without a destination
    pub slack_webhook_url: Option<String>,

    /// Link to the rule-set location, shown in message footers
    pub config_url: Option<String>,

    /// Maximum number of rules evaluated concurrently (default: 8)
    pub concurrency: usize,

    /// Timeout applied to every tracker and chat call (default: 10s)
    pub request_timeout: Duration,

    /// Maximum number of tracker result pages per query (default: 5)
    pub max_pages: u32,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| AppError::Config(format!("Environment variable {key} must be set")))
        };
        let optional = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let concurrency: usize = parse_positive(&lookup, "NUDGE_CONCURRENCY", DEFAULT_CONCURRENCY)?;
        let timeout_secs: u64 = parse_positive(&lookup, "NUDGE_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)?;
        let max_pages: u32 = parse_positive(&lookup, "NUDGE_MAX_PAGES", DEFAULT_MAX_PAGES)?;

        Ok(Self {
            jira_server: required("JIRA_SERVER")?,
            jira_username: required("JIRA_USERNAME")?,
            jira_password: required("JIRA_PASSWORD")?,
            slack_webhook_url: optional("SLACK_WEBHOOK_URL"),
            config_url: optional("NUDGE_CONFIG_URL"),
            concurrency,
            request_timeout: Duration::from_secs(timeout_secs),
            max_pages,
        })
    }
}

fn parse_positive<F, T>(lookup: &F, key: &str, default: T) -> Result<T, AppError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr + PartialOrd + From<u8>,
{
    let Some(raw) = lookup(key) else {
        return Ok(default);
    };
    match raw.trim().parse::<T>() {
        Ok(value) if value >= T::from(1) => Ok(value),
        _ => Err(AppError::Config(format!(
            "{key} must be a positive integer, got '{raw}'"
        ))),
    }
}
