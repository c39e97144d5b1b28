//! Chat delivery: the block-based [`Message`] model and the [`ChatNotifier`]
//! capability with its Slack webhook and console implementations.

pub mod console;
pub mod message;
pub mod slack;

use async_trait::async_trait;

use nudge_common::error::AppError;

pub use console::{ConsoleNotifier, ConsoleStream};
pub use message::{Block, Message, Text, TextFormat};
pub use slack::SlackWebhookNotifier;

/// Trait that every chat delivery backend implements.
///
/// A successful return means the chat system accepted the payload for
/// processing, nothing more.
#[async_trait]
pub trait ChatNotifier: Send + Sync {
    /// Deliver `message` to `destination` (a webhook URL for Slack).
    async fn deliver(&self, destination: &str, message: &Message) -> Result<(), AppError>;

    /// Human-readable name for this backend (e.g., "slack").
    fn name(&self) -> &'static str;
}
