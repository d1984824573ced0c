//! Source-citation contract for generated replies.
//!
//! A reply may end with `[[SOURCE]] <url>`. The last marker wins; everything before it is the body.

use serde::{Deserialize, Serialize};

/// Marker the SEARCH mode instructs the model to emit before its source URL.
pub const SOURCE_DELIMITER: &str = "[[SOURCE]]";

/// Generated text split into display body and optional source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssistantReply {
    pub body: String,
    pub source: Option<String>,
}

impl AssistantReply {
    /// Splits `text` on the last [`SOURCE_DELIMITER`]. An empty source is treated as absent.
    pub fn parse(text: &str) -> Self {
        match text.rfind(SOURCE_DELIMITER) {
            Some(idx) => {
                let body = text[..idx].trim_end().to_string();
                let source = text[idx + SOURCE_DELIMITER.len()..].trim();
                Self {
                    body,
                    source: Some(source.to_string()).filter(|s| !s.is_empty()),
                }
            }
            None => Self {
                body: text.to_string(),
                source: None,
            },
        }
    }

    /// Full text in the delimiter contract (what the model produced, normalized).
    pub fn to_text(&self) -> String {
        match &self.source {
            Some(src) => format!("{}\n\n{} {}", self.body, SOURCE_DELIMITER, src),
            None => self.body.clone(),
        }
    }
}
