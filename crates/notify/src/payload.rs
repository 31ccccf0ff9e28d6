//! Alert payload in the chat webhook's block format.
//!
//! The document shape (`icon_emoji`, `username`, `blocks`) is dictated by the
//! receiving webhook and is reproduced exactly:
//!
//! ```text
//! header   "{app}: {source} Failed"
//! section  fields: Source, Error, Time[, Queue]
//! section  *Message:* ```...```
//! section  *Backtrace:* ```...```     (only when app frames remain)
//! ```

use alerter_core::{ErrorRecord, Settings};
use serde::Serialize;

pub const ALERT_USERNAME: &str = "Error Alerts";
pub const ALERT_ICON: &str = ":rotating_light:";

/// Top-level webhook document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertPayload {
    pub icon_emoji: String,
    pub username: String,
    pub blocks: Vec<Block>,
}

/// One layout block.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    Header {
        text: TextObject,
    },
    Section {
        #[serde(skip_serializing_if = "Option::is_none")]
        text: Option<TextObject>,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        fields: Vec<TextObject>,
    },
}

/// Text element inside a block.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TextObject {
    PlainText { text: String, emoji: bool },
    Mrkdwn { text: String },
}

impl TextObject {
    pub fn text(&self) -> &str {
        match self {
            TextObject::PlainText { text, .. } | TextObject::Mrkdwn { text } => text,
        }
    }

    fn mrkdwn(text: String) -> Self {
        TextObject::Mrkdwn { text }
    }
}

impl Block {
    fn text_section(text: String) -> Self {
        Block::Section {
            text: Some(TextObject::mrkdwn(text)),
            fields: Vec::new(),
        }
    }
}

impl AlertPayload {
    /// Header line, if the first block is a header.
    pub fn header(&self) -> Option<&str> {
        match self.blocks.first() {
            Some(Block::Header { text }) => Some(text.text()),
            _ => None,
        }
    }

    /// Metadata fields of the first section that has any.
    pub fn fields(&self) -> &[TextObject] {
        self.blocks
            .iter()
            .find_map(|block| match block {
                Block::Section { fields, .. } if !fields.is_empty() => Some(fields.as_slice()),
                _ => None,
            })
            .unwrap_or(&[])
    }

    /// Text of the first text section whose label starts with `label`
    /// (e.g. `"*Message:*"`).
    pub fn section_text(&self, label: &str) -> Option<&str> {
        self.blocks.iter().find_map(|block| match block {
            Block::Section {
                text: Some(text), ..
            } if text.text().starts_with(label) => Some(text.text()),
            _ => None,
        })
    }

    /// Fixed payload used to check that a webhook accepts posts.
    pub fn connectivity_test() -> Self {
        Self {
            icon_emoji: ALERT_ICON.to_string(),
            username: ALERT_USERNAME.to_string(),
            blocks: vec![
                Block::Header {
                    text: TextObject::PlainText {
                        text: "[TEST] Error Alerter".to_string(),
                        emoji: true,
                    },
                },
                Block::text_section(
                    "This is a test notification from the error alerter.".to_string(),
                ),
            ],
        }
    }
}

/// Build the alert document for `record`.
///
/// `timestamp` is already formatted; the builder does no time handling.
pub fn build_payload(record: &ErrorRecord, settings: &Settings, timestamp: &str) -> AlertPayload {
    let mut fields = vec![
        TextObject::mrkdwn(format!(
            "*Source:*\n`{}`",
            record.source_detail().unwrap_or_default()
        )),
        TextObject::mrkdwn(format!("*Error:*\n`{}`", record.error_class())),
        TextObject::mrkdwn(format!("*Time:*\n{timestamp}")),
    ];
    if let Some(queue) = record.queue() {
        fields.push(TextObject::mrkdwn(format!("*Queue:*\n{queue}")));
    }

    let header = match settings.app_name.as_deref() {
        Some(app) => format!("{app}: {} Failed", record.source()),
        None => format!("{} Failed", record.source()),
    };

    let mut blocks = vec![
        Block::Header {
            text: TextObject::PlainText {
                text: header,
                emoji: true,
            },
        },
        Block::Section { text: None, fields },
        Block::text_section(format!("*Message:*\n```{}```", record.error_message())),
    ];

    if let Some(frames) = record.backtrace().filter(|frames| !frames.is_empty()) {
        let cleaned = clean_backtrace(frames, settings.app_root.as_deref());
        if !cleaned.is_empty() {
            let trace = cleaned
                .iter()
                .take(settings.max_backtrace_lines)
                .map(String::as_str)
                .collect::<Vec<_>>()
                .join("\n");
            blocks.push(Block::text_section(format!("*Backtrace:*\n```{trace}```")));
        }
    }

    AlertPayload {
        icon_emoji: ALERT_ICON.to_string(),
        username: ALERT_USERNAME.to_string(),
        blocks,
    }
}

/// Keep only frames inside `app_root`, with the root prefix stripped.
///
/// Matching is a literal substring test; a missing or blank root keeps
/// nothing.
pub fn clean_backtrace(frames: &[String], app_root: Option<&str>) -> Vec<String> {
    let Some(root) = app_root.map(str::trim).filter(|root| !root.is_empty()) else {
        return Vec::new();
    };
    let prefix = if root.ends_with('/') {
        root.to_string()
    } else {
        format!("{root}/")
    };

    frames
        .iter()
        .filter(|frame| frame.contains(root))
        .map(|frame| frame.replacen(&prefix, "", 1))
        .collect()
}
