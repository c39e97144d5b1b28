//! Slack incoming-webhook delivery.

use std::time::Duration;

use async_trait::async_trait;

use nudge_common::error::{AppError, body_excerpt};

use crate::ChatNotifier;
use crate::message::Message;

/// Posts messages to Slack incoming webhooks.
///
/// The destination passed to [`ChatNotifier::deliver`] is the webhook URL,
/// so one notifier serves every rule.
#[derive(Debug, Clone)]
pub struct SlackWebhookNotifier {
    client: reqwest::Client,
}

impl SlackWebhookNotifier {
    pub fn new(timeout: Duration) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }

    /// Use an already configured HTTP client.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ChatNotifier for SlackWebhookNotifier {
    async fn deliver(&self, destination: &str, message: &Message) -> Result<(), AppError> {
        let resp = self.client.post(destination).json(message).send().await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            tracing::debug!(
                status = status.as_u16(),
                body = %body_excerpt(&body),
                "Non-success response body from Slack"
            );
            return Err(AppError::from_status("Slack", status));
        }

        tracing::debug!(blocks = message.blocks.len(), "Slack accepted message");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "slack"
    }
}
