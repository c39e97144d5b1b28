use serde::Serialize;
use thiserror::Error;

/// Common error types used across the application.
///
/// `Config` is fatal and raised before any rule runs. `Transport`, `Auth`
/// and `Protocol` describe why a single rule's tracker or chat call failed.
#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Coarse classification of an [`AppError`], kept in run reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Config,
    Transport,
    Auth,
    Protocol,
    Internal,
}

impl AppError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::Config(_) => ErrorKind::Config,
            AppError::Transport(_) => ErrorKind::Transport,
            AppError::Auth(_) => ErrorKind::Auth,
            AppError::Protocol(_) => ErrorKind::Protocol,
            AppError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Classify a non-success HTTP status returned by `service`.
    pub fn from_status(service: &str, status: reqwest::StatusCode) -> Self {
        let reason = status.canonical_reason().unwrap_or("");
        let msg = format!("got unexpected status {} {} from {}", status.as_u16(), reason, service);
        match status {
            reqwest::StatusCode::UNAUTHORIZED | reqwest::StatusCode::FORBIDDEN => AppError::Auth(msg),
            _ => AppError::Protocol(msg),
        }
    }
}

/// Longest response body excerpt kept in logs.
pub const MAX_LOGGED_BODY: usize = 512;

/// Leading part of an error response body, cut on a char boundary, for
/// debug logs.
pub fn body_excerpt(body: &str) -> &str {
    if body.len() <= MAX_LOGGED_BODY {
        return body;
    }
    let mut end = MAX_LOGGED_BODY;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    &body[..end]
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            AppError::Protocol(err.to_string())
        } else if let Some(status) = err.status() {
            AppError::from_status("remote", status)
        } else {
            AppError::Transport(err.to_string())
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::Config => write!(f, "config"),
            ErrorKind::Transport => write!(f, "transport"),
            ErrorKind::Auth => write!(f, "auth"),
            ErrorKind::Protocol => write!(f, "protocol"),
            ErrorKind::Internal => write!(f, "internal"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn test_body_excerpt_respects_char_boundaries() {
        assert_eq!(body_excerpt("short body"), "short body");

        let long = "x".repeat(MAX_LOGGED_BODY + 10);
        assert_eq!(body_excerpt(&long).len(), MAX_LOGGED_BODY);

        // 'é' is two bytes; cutting in the middle backs off
        let mut split = "x".repeat(MAX_LOGGED_BODY - 1);
        split.push('é');
        assert_eq!(body_excerpt(&split).len(), MAX_LOGGED_BODY - 1);
    }

    #[test]
    fn test_status_classification() {
        assert_eq!(
            AppError::from_status("JIRA", StatusCode::UNAUTHORIZED).kind(),
            ErrorKind::Auth
        );
        assert_eq!(
            AppError::from_status("JIRA", StatusCode::FORBIDDEN).kind(),
            ErrorKind::Auth
        );
        assert_eq!(
            AppError::from_status("Slack", StatusCode::NOT_FOUND).kind(),
            ErrorKind::Protocol
        );
        assert_eq!(
            AppError::from_status("Slack", StatusCode::INTERNAL_SERVER_ERROR).kind(),
            ErrorKind::Protocol
        );
    }

    #[test]
    fn test_serializes_kind_and_message() {
        let err = AppError::Transport("connection refused".to_string());
        assert_eq!(
            serde_json::to_value(&err).unwrap(),
            serde_json::json!({"kind": "transport", "message": "connection refused"})
        );
    }

    #[test]
    fn test_status_message_names_service() {
        let err = AppError::from_status("JIRA", StatusCode::BAD_REQUEST);
        assert_eq!(
            err.to_string(),
            "Protocol error: got unexpected status 400 Bad Request from JIRA"
        );
    }
}
