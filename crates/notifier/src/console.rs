use std::io::Write;

use async_trait::async_trait;

use nudge_common::error::AppError;

use crate::ChatNotifier;
use crate::message::Message;

/// Stream a [`ConsoleNotifier`] writes payloads to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConsoleStream {
    #[default]
    Stdout,
    Stderr,
}

/// Prints payloads instead of sending them. Backs `--dry-run`.
#[derive(Debug, Clone, Default)]
pub struct ConsoleNotifier {
    stream: ConsoleStream,
}

impl ConsoleNotifier {
    pub fn new(stream: ConsoleStream) -> Self {
        Self { stream }
    }

    fn render(destination: &str, message: &Message) -> Result<String, AppError> {
        let payload = serde_json::to_string_pretty(message)
            .map_err(|e| AppError::Protocol(format!("failed to serialize message: {e}")))?;
        Ok(format!("--- {destination}\n{payload}"))
    }

    fn write_to<W: Write>(out: &mut W, text: &str) -> Result<(), AppError> {
        writeln!(out, "{text}")
            .map_err(|e| AppError::Transport(format!("failed to write payload: {e}")))
    }
}

#[async_trait]
impl ChatNotifier for ConsoleNotifier {
    async fn deliver(&self, destination: &str, message: &Message) -> Result<(), AppError> {
        let text = Self::render(destination, message)?;
        match self.stream {
            ConsoleStream::Stdout => Self::write_to(&mut std::io::stdout().lock(), &text),
            ConsoleStream::Stderr => Self::write_to(&mut std::io::stderr().lock(), &text),
        }
    }

    fn name(&self) -> &'static str {
        "console"
    }
}
