//! Interaction record: one rated exchange, as persisted by the feedback store.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Column order of the feedback table. Also used as the header row.
pub const FEEDBACK_COLUMNS: [&str; 8] = [
    "timestamp",
    "mode",
    "original_text",
    "converted_text",
    "feedback_label",
    "feedback_value",
    "reason",
    "comment",
];

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Thumbs up / thumbs down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rating {
    Positive,
    Negative,
}

impl Rating {
    /// `feedback_label` column value.
    pub fn label(&self) -> &'static str {
        match self {
            Rating::Positive => "👍",
            Rating::Negative => "👎",
        }
    }

    /// `feedback_value` column value.
    pub fn value(&self) -> u8 {
        match self {
            Rating::Positive => 1,
            Rating::Negative => 0,
        }
    }

    fn from_value(v: &str) -> Option<Self> {
        match v.trim() {
            "1" => Some(Rating::Positive),
            "0" => Some(Rating::Negative),
            _ => None,
        }
    }
}

/// A user's rating of one reply. Reason and comment exist only on negative feedback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "rating", rename_all = "snake_case")]
pub enum Feedback {
    Positive,
    Negative {
        #[serde(default)]
        reason: Option<String>,
        #[serde(default)]
        comment: Option<String>,
    },
}

impl Feedback {
    pub fn rating(&self) -> Rating {
        match self {
            Feedback::Positive => Rating::Positive,
            Feedback::Negative { .. } => Rating::Negative,
        }
    }
}

/// Immutable account of one rated turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionRecord {
    pub timestamp: DateTime<Utc>,
    pub mode: String,
    pub original_text: String,
    pub converted_text: String,
    pub rating: Rating,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub comment: Option<String>,
}

impl InteractionRecord {
    /// Builds a record stamped with the current time. Blank reason/comment are dropped.
    pub fn new(mode: &str, original_text: &str, converted_text: &str, feedback: &Feedback) -> Self {
        let (reason, comment) = match feedback {
            Feedback::Positive => (None, None),
            Feedback::Negative { reason, comment } => (non_blank(reason), non_blank(comment)),
        };
        Self {
            timestamp: Utc::now(),
            mode: mode.to_string(),
            original_text: original_text.to_string(),
            converted_text: converted_text.to_string(),
            rating: feedback.rating(),
            reason,
            comment,
        }
    }

    pub fn is_negative(&self) -> bool {
        self.rating == Rating::Negative
    }

    /// Spreadsheet row in [`FEEDBACK_COLUMNS`] order.
    pub fn to_row(&self) -> Vec<String> {
        vec![
            self.timestamp.format(TIMESTAMP_FORMAT).to_string(),
            self.mode.clone(),
            self.original_text.clone(),
            self.converted_text.clone(),
            self.rating.label().to_string(),
            self.rating.value().to_string(),
            self.reason.clone().unwrap_or_default(),
            self.comment.clone().unwrap_or_default(),
        ]
    }

    /// Parses a spreadsheet row. Trailing empty cells may be missing (the Sheets API trims them).
    /// Returns `None` when the feedback value is not 0/1.
    pub fn from_row(row: &[String]) -> Option<Self> {
        let cell = |i: usize| row.get(i).map(String::as_str).unwrap_or("");
        let rating = Rating::from_value(cell(5))?;
        let timestamp = NaiveDateTime::parse_from_str(cell(0).trim(), TIMESTAMP_FORMAT)
            .map(|naive| naive.and_utc())
            .unwrap_or_default();
        let opt = |i: usize| Some(cell(i).trim().to_string()).filter(|s| !s.is_empty());
        Some(Self {
            timestamp,
            mode: cell(1).to_string(),
            original_text: cell(2).to_string(),
            converted_text: cell(3).to_string(),
            rating,
            reason: opt(6),
            comment: opt(7),
        })
    }
}

fn non_blank(s: &Option<String>) -> Option<String> {
    s.as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
