//! Block-based chat message model.
//!
//! Serializes to the Slack Block Kit shape:
//! `{"blocks":[{"type":"section","text":{"type":"mrkdwn","text":"..."}},{"type":"divider"}]}`

use serde::{Deserialize, Serialize};

/// Maximum length of a section block's text accepted by Slack.
pub const MAX_SECTION_TEXT_LEN: usize = 3000;

/// Maximum number of blocks in one message accepted by Slack.
pub const MAX_BLOCKS: usize = 50;

/// Format hint for a text element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextFormat {
    #[serde(rename = "plain_text")]
    Plain,
    #[serde(rename = "mrkdwn")]
    Markdown,
}

/// Some structured text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Text {
    #[serde(rename = "type")]
    pub format: TextFormat,
    pub text: String,
}

impl Text {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            format: TextFormat::Plain,
            text: text.into(),
        }
    }

    pub fn markdown(text: impl Into<String>) -> Self {
        Self {
            format: TextFormat::Markdown,
            text: text.into(),
        }
    }
}

/// One display block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Block {
    /// A section holding text
    Section { text: Text },
    /// A horizontal divider
    Divider,
}

/// A chat message: an ordered list of blocks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub blocks: Vec<Block>,
}

impl Message {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn section(mut self, text: Text) -> Self {
        self.blocks.push(Block::Section { text });
        self
    }

    pub fn divider(mut self) -> Self {
        self.blocks.push(Block::Divider);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Texts of all section blocks, in order.
    pub fn section_texts(&self) -> impl Iterator<Item = &Text> {
        self.blocks.iter().filter_map(|b| match b {
            Block::Section { text } => Some(text),
            Block::Divider => None,
        })
    }
}

/// Escape the three characters Slack's mrkdwn treats as control characters.
pub fn escape_mrkdwn(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}
