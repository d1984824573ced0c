//! Error types for the Brand Voice core.

use serde::Serialize;
use thiserror::Error;

/// Result type alias for generation calls.
pub type GenerationResult<T> = Result<T, GenerationError>;

/// Result type alias for session operations.
pub type SessionResult<T> = Result<T, SessionError>;

/// Classified failure from the generation capability.
///
/// None of these are retried; a failed turn ends with the placeholder reply.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GenerationError {
    #[error("rate limited: {0}")]
    RateLimited(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("server unavailable: {0}")]
    ServerUnavailable(String),

    #[error("unknown generation error: {0}")]
    Unknown(String),
}

/// Kind of a [`GenerationError`] without its diagnostic detail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationErrorKind {
    RateLimited,
    BadRequest,
    ServerUnavailable,
    Unknown,
}

impl GenerationError {
    pub fn kind(&self) -> GenerationErrorKind {
        match self {
            GenerationError::RateLimited(_) => GenerationErrorKind::RateLimited,
            GenerationError::BadRequest(_) => GenerationErrorKind::BadRequest,
            GenerationError::ServerUnavailable(_) => GenerationErrorKind::ServerUnavailable,
            GenerationError::Unknown(_) => GenerationErrorKind::Unknown,
        }
    }

    /// Raw diagnostic detail for operators.
    pub fn detail(&self) -> &str {
        match self {
            GenerationError::RateLimited(d)
            | GenerationError::BadRequest(d)
            | GenerationError::ServerUnavailable(d)
            | GenerationError::Unknown(d) => d,
        }
    }

    /// Notice shown to the end user next to the placeholder reply.
    pub fn user_notice(&self) -> String {
        match self {
            GenerationError::RateLimited(_) => {
                "Request quota exceeded. Please wait about a minute before trying again.".to_string()
            }
            GenerationError::BadRequest(d) => {
                format!("The generation service rejected the request (check model and credentials): {}", d)
            }
            GenerationError::ServerUnavailable(_) => {
                "The generation service is temporarily unavailable. Please try again shortly.".to_string()
            }
            GenerationError::Unknown(d) => format!("Unexpected generation error: {}", d),
        }
    }
}

/// Prompt composition failure. An unknown mode is a configuration error, never a fallback.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ComposeError {
    #[error("unknown mode tag '{0}'")]
    UnknownMode(String),
}

/// Errors returned by [`crate::Session`] operations. Nothing is appended to history when one is returned.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("no mode selected for this session")]
    ModeNotSelected,

    #[error("input text is empty")]
    EmptyInput,

    #[error(transparent)]
    Compose(#[from] ComposeError),

    #[error("message {0} cannot be rated (only the latest reply is rateable)")]
    NotRateable(usize),
}

/// Startup configuration problems. Surfaced once; the surrounding application must not start.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing API key for {provider}: set generation.api_key or {env_hint}")]
    MissingApiKey {
        provider: &'static str,
        env_hint: &'static str,
    },

    #[error("feedback backend 'sheets' requires feedback.spreadsheet_id (BRANDVOICE_FEEDBACK__SPREADSHEET_ID)")]
    MissingFeedbackDestination,

    #[error("feedback backend 'sheets' requires feedback.access_token (BRANDVOICE_FEEDBACK__ACCESS_TOKEN)")]
    MissingFeedbackCredentials,

    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error("configuration load failed: {0}")]
    Load(#[from] config::ConfigError),
}

/// Internal store failure. Never crosses the [`crate::FeedbackStore`] boundary.
#[derive(Error, Debug)]
pub(crate) enum StoreError {
    #[error("store not configured: {0}")]
    NotConfigured(&'static str),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("store API error {0}: {1}")]
    Api(u16, String),

    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("blocking task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_map_from_variants() {
        assert_eq!(
            GenerationError::RateLimited("429".into()).kind(),
            GenerationErrorKind::RateLimited
        );
        assert_eq!(
            GenerationError::ServerUnavailable("503".into()).kind(),
            GenerationErrorKind::ServerUnavailable
        );
    }

    #[test]
    fn rate_limit_notice_asks_user_to_wait() {
        let notice = GenerationError::RateLimited("quota".into()).user_notice();
        assert!(notice.contains("wait"));
    }

    #[test]
    fn unknown_notice_carries_detail() {
        let notice = GenerationError::Unknown("socket closed".into()).user_notice();
        assert!(notice.contains("socket closed"));
    }
}
