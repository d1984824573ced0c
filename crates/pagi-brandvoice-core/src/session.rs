//! Per-session conversation state: mode selection, ordered history, per-message feedback.
//!
//! Holds state only. Turn processing lives in [`crate::ChatEngine`], which receives the
//! session explicitly on every call.

use crate::citation::AssistantReply;
use crate::error::{GenerationError, SessionError, SessionResult};
use crate::negative::NegativeExampleCache;
use crate::record::Feedback;
use serde::{Deserialize, Serialize};

/// Assistant text recorded for a turn whose generation failed. Never sent to the feedback store.
pub const FAILURE_PLACEHOLDER: &str = "⚠️ The service is temporarily unavailable. Please try again in a moment.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum FeedbackState {
    /// User messages and failure placeholders.
    NotRateable,
    Unrated,
    Rated { feedback: Feedback },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    pub role: Role,
    /// Display body. For replies this excludes the source segment.
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    pub feedback: FeedbackState,
}

impl ChatMessage {
    fn user(text: &str) -> Self {
        Self {
            role: Role::User,
            content: text.to_string(),
            source: None,
            feedback: FeedbackState::NotRateable,
        }
    }

    fn reply(reply: AssistantReply) -> Self {
        Self {
            role: Role::Assistant,
            content: reply.body,
            source: reply.source,
            feedback: FeedbackState::Unrated,
        }
    }

    fn placeholder() -> Self {
        Self {
            role: Role::Assistant,
            content: FAILURE_PLACEHOLDER.to_string(),
            source: None,
            feedback: FeedbackState::NotRateable,
        }
    }

    /// Full reply text in the citation contract (what gets stored as `converted_text`).
    pub fn full_text(&self) -> String {
        AssistantReply {
            body: self.content.clone(),
            source: self.source.clone(),
        }
        .to_text()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    ModeUnselected,
    ModeSelected(String),
}

/// Result of one accepted turn. Both variants append exactly two messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    Replied {
        message_index: usize,
        reply: AssistantReply,
    },
    Failed {
        message_index: usize,
        error: GenerationError,
    },
}

impl TurnOutcome {
    pub fn message_index(&self) -> usize {
        match self {
            TurnOutcome::Replied { message_index, .. } | TurnOutcome::Failed { message_index, .. } => {
                *message_index
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RatingOutcome {
    /// Rating applied locally; `persisted` says whether the store accepted it.
    Recorded { persisted: bool },
    /// The message was already rated; nothing changed.
    AlreadyRated,
}

#[derive(Debug, Clone)]
pub struct Session {
    state: SessionState,
    messages: Vec<ChatMessage>,
    negatives: NegativeExampleCache,
}

impl Session {
    pub fn new(negative_block: String) -> Self {
        Self {
            state: SessionState::ModeUnselected,
            messages: Vec::new(),
            negatives: NegativeExampleCache::new(negative_block),
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn mode(&self) -> Option<&str> {
        match &self.state {
            SessionState::ModeSelected(m) => Some(m),
            SessionState::ModeUnselected => None,
        }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn negative_block(&self) -> &str {
        self.negatives.block()
    }

    /// Enters `ModeSelected`. Switching to a different mode clears history, like [`Session::change_mode`].
    /// The caller validates the tag against the composer.
    pub(crate) fn set_mode(&mut self, mode: &str) {
        if self.mode() == Some(mode) {
            return;
        }
        if self.mode().is_some() {
            self.messages.clear();
        }
        self.state = SessionState::ModeSelected(mode.to_string());
    }

    /// Back to `ModeUnselected` with an empty history.
    pub fn change_mode(&mut self) {
        self.state = SessionState::ModeUnselected;
        self.messages.clear();
    }

    /// Empties history; the mode stays.
    pub fn clear_conversation(&mut self) {
        self.messages.clear();
    }

    /// Index of the only message that may be rated: the last message, if it is a real reply.
    pub fn latest_rateable(&self) -> Option<usize> {
        let idx = self.messages.len().checked_sub(1)?;
        let last = &self.messages[idx];
        match (last.role, &last.feedback) {
            (Role::Assistant, FeedbackState::Unrated | FeedbackState::Rated { .. }) => Some(idx),
            _ => None,
        }
    }

    pub(crate) fn push_user(&mut self, text: &str) -> usize {
        self.messages.push(ChatMessage::user(text));
        self.messages.len() - 1
    }

    pub(crate) fn push_reply(&mut self, reply: AssistantReply) -> usize {
        self.messages.push(ChatMessage::reply(reply));
        self.messages.len() - 1
    }

    pub(crate) fn push_placeholder(&mut self) -> usize {
        self.messages.push(ChatMessage::placeholder());
        self.messages.len() - 1
    }

    /// Checks that `index` is the latest reply. Returns whether it is already rated.
    pub(crate) fn check_rateable(&self, index: usize) -> SessionResult<bool> {
        if self.latest_rateable() != Some(index) {
            return Err(SessionError::NotRateable(index));
        }
        Ok(matches!(self.messages[index].feedback, FeedbackState::Rated { .. }))
    }

    /// User text that produced the reply at `index`.
    pub(crate) fn prompt_for(&self, index: usize) -> Option<&str> {
        index
            .checked_sub(1)
            .and_then(|i| self.messages.get(i))
            .filter(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
    }

    pub(crate) fn mark_rated(&mut self, index: usize, feedback: Feedback) {
        if let Some(msg) = self.messages.get_mut(index) {
            msg.feedback = FeedbackState::Rated { feedback };
        }
    }

    pub(crate) fn replace_negatives(&mut self, block: String) {
        self.negatives.replace(block);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reply(text: &str) -> AssistantReply {
        AssistantReply::parse(text)
    }

    #[test]
    fn starts_unselected_and_empty() {
        let s = Session::new(String::new());
        assert_eq!(s.state(), &SessionState::ModeUnselected);
        assert!(s.messages().is_empty());
        assert!(s.latest_rateable().is_none());
    }

    #[test]
    fn change_mode_resets_everything() {
        let mut s = Session::new(String::new());
        s.set_mode("UX");
        s.push_user("a");
        s.push_reply(reply("b"));
        s.change_mode();
        assert_eq!(s.state(), &SessionState::ModeUnselected);
        assert_eq!(s.messages().len(), 0);
    }

    #[test]
    fn switching_mode_clears_but_reselecting_same_keeps() {
        let mut s = Session::new(String::new());
        s.set_mode("UX");
        s.push_user("a");
        s.push_reply(reply("b"));
        s.set_mode("UX");
        assert_eq!(s.messages().len(), 2);
        s.set_mode("SEARCH");
        assert_eq!(s.mode(), Some("SEARCH"));
        assert!(s.messages().is_empty());
    }

    #[test]
    fn clear_keeps_mode() {
        let mut s = Session::new(String::new());
        s.set_mode("SEARCH");
        s.push_user("a");
        s.push_placeholder();
        s.clear_conversation();
        assert_eq!(s.mode(), Some("SEARCH"));
        assert!(s.messages().is_empty());
    }

    #[test]
    fn only_latest_real_reply_is_rateable() {
        let mut s = Session::new(String::new());
        s.set_mode("UX");
        s.push_user("a");
        let first = s.push_reply(reply("b"));
        assert_eq!(s.latest_rateable(), Some(first));
        s.push_user("c");
        assert!(s.latest_rateable().is_none());
        s.push_placeholder();
        assert!(s.latest_rateable().is_none());
        assert_eq!(s.check_rateable(first), Err(SessionError::NotRateable(first)));
    }

    #[test]
    fn reply_keeps_source_separately() {
        let mut s = Session::new(String::new());
        s.set_mode("SEARCH");
        s.push_user("oak");
        let idx = s.push_reply(reply("Solid oak.\n[[SOURCE]] https://wood.test"));
        let msg = &s.messages()[idx];
        assert_eq!(msg.content, "Solid oak.");
        assert_eq!(msg.source.as_deref(), Some("https://wood.test"));
        assert_eq!(msg.full_text(), "Solid oak.\n\n[[SOURCE]] https://wood.test");
        assert_eq!(s.prompt_for(idx), Some("oak"));
    }

    #[test]
    fn feedback_state_serializes_tagged() {
        let state = FeedbackState::Rated {
            feedback: Feedback::Positive,
        };
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["state"], "rated");
        assert_eq!(json["feedback"]["rating"], "positive");
    }
}
