//! PAGI Brand Voice: Core library.
//! Brand-voice copy conversion with a thumbs-down feedback loop: prompt composition,
//! generation client, feedback store, and per-session conversation state.

mod citation;
mod config;
mod engine;
mod error;
mod generation;
mod negative;
pub mod prompts;
mod record;
mod session;
mod store;

pub use citation::{AssistantReply, SOURCE_DELIMITER};
pub use crate::config::{
    BrandVoiceConfig, FeedbackBackend, FeedbackConfig, GenerationConfig, GenerationProvider, DEFAULT_NEGATIVE_WINDOW,
};
pub use engine::ChatEngine;
pub use error::{
    ComposeError, ConfigError, GenerationError, GenerationErrorKind, GenerationResult, SessionError, SessionResult,
};
pub use generation::{
    classify_status, GeminiBackend, GenerationBackend, GenerationClient, GenerationRequest, OpenRouterBackend,
    SamplingParams,
};
pub use negative::{build_negative_block, NegativeExampleCache};
pub use prompts::{ModeTemplate, PromptComposer};
pub use record::{Feedback, InteractionRecord, Rating, FEEDBACK_COLUMNS};
pub use session::{ChatMessage, FeedbackState, RatingOutcome, Role, Session, SessionState, TurnOutcome, FAILURE_PLACEHOLDER};
pub use store::{
    build_feedback_store, DisabledFeedbackStore, FeedbackStore, MemoryFeedbackStore, SheetsFeedbackStore,
    SledFeedbackStore,
};

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
