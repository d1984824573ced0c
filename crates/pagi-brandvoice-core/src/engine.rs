//! Turn processing: compose, generate, record feedback, refresh the negative cache.
//!
//! `ChatEngine` is shared and stateless per request. Each call receives the [`Session`] it acts on.

use crate::citation::AssistantReply;
use crate::config::BrandVoiceConfig;
use crate::error::{ConfigError, SessionError, SessionResult};
use crate::generation::GenerationClient;
use crate::negative::build_negative_block;
use crate::prompts::PromptComposer;
use crate::record::{Feedback, InteractionRecord};
use crate::session::{RatingOutcome, Session, TurnOutcome};
use crate::store::{build_feedback_store, FeedbackStore};
use std::sync::Arc;

pub struct ChatEngine {
    composer: PromptComposer,
    client: GenerationClient,
    store: Arc<dyn FeedbackStore>,
    negative_window: usize,
}

impl ChatEngine {
    pub fn new(
        composer: PromptComposer,
        client: GenerationClient,
        store: Arc<dyn FeedbackStore>,
        negative_window: usize,
    ) -> Self {
        Self {
            composer,
            client,
            store,
            negative_window: negative_window.max(1),
        }
    }

    /// Built-in modes, the configured provider and the configured feedback backend.
    pub fn from_config(cfg: &BrandVoiceConfig) -> Result<Self, ConfigError> {
        let client = GenerationClient::from_config(&cfg.generation)?;
        let store = build_feedback_store(&cfg.feedback);
        tracing::info!(
            provider = client.backend().provider(),
            model = client.backend().model(),
            feedback_store = store.name(),
            negative_window = cfg.negative_window,
            "brand voice engine ready"
        );
        Ok(Self::new(PromptComposer::builtin(), client, store, cfg.negative_window))
    }

    pub fn composer(&self) -> &PromptComposer {
        &self.composer
    }

    pub fn negative_window(&self) -> usize {
        self.negative_window
    }

    /// Current negative block from the store. Empty when the store is empty or unreachable.
    pub async fn load_negative_block(&self) -> String {
        let records = self.store.load_all().await;
        build_negative_block(&records, self.negative_window)
    }

    /// New session in `ModeUnselected` with a freshly loaded negative cache.
    pub async fn start_session(&self) -> Session {
        Session::new(self.load_negative_block().await)
    }

    /// Validates the tag, then enters `ModeSelected`. Switching modes clears history.
    pub fn select_mode(&self, session: &mut Session, mode: &str) -> SessionResult<()> {
        self.composer.mode_body(mode)?;
        session.set_mode(mode);
        tracing::debug!(mode, "mode selected");
        Ok(())
    }

    /// One turn. On success the history grows by exactly two messages: the input and either
    /// the reply or the failure placeholder. Errors leave the history untouched.
    pub async fn submit(&self, session: &mut Session, input: &str) -> SessionResult<TurnOutcome> {
        let mode = session.mode().ok_or(SessionError::ModeNotSelected)?.to_string();
        if input.trim().is_empty() {
            return Err(SessionError::EmptyInput);
        }
        let instruction = self.composer.compose(&mode, input, session.negative_block())?;

        session.push_user(input);
        tracing::debug!(mode = %mode, input_chars = input.chars().count(), "turn started");

        match self.client.generate(&instruction).await {
            Ok(text) => {
                let reply = AssistantReply::parse(&text);
                let message_index = session.push_reply(reply.clone());
                Ok(TurnOutcome::Replied { message_index, reply })
            }
            Err(error) => {
                let message_index = session.push_placeholder();
                Ok(TurnOutcome::Failed { message_index, error })
            }
        }
    }

    /// Rates the latest reply. The first rating per message wins; later ones are ignored.
    ///
    /// The rating is applied locally even when the store does not persist it. A persisted
    /// thumbs-down reloads the store and rebuilds the session's negative block.
    pub async fn rate(&self, session: &mut Session, message_index: usize, feedback: Feedback) -> SessionResult<RatingOutcome> {
        if session.check_rateable(message_index)? {
            return Ok(RatingOutcome::AlreadyRated);
        }
        let mode = session.mode().ok_or(SessionError::ModeNotSelected)?.to_string();
        let original = session
            .prompt_for(message_index)
            .ok_or(SessionError::NotRateable(message_index))?
            .to_string();
        let converted = session.messages()[message_index].full_text();
        let record = InteractionRecord::new(&mode, &original, &converted, &feedback);

        session.mark_rated(message_index, feedback);
        let persisted = self.store.append(&record).await;
        tracing::info!(
            mode = %mode,
            rating = record.rating.label(),
            store = self.store.name(),
            persisted,
            "feedback recorded"
        );

        if persisted && record.is_negative() {
            session.replace_negatives(self.load_negative_block().await);
        }
        Ok(RatingOutcome::Recorded { persisted })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ComposeError, GenerationResult};
    use crate::generation::{GenerationBackend, GenerationRequest};
    use crate::store::MemoryFeedbackStore;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct Echo {
        calls: Mutex<usize>,
    }

    #[async_trait]
    impl GenerationBackend for Echo {
        fn provider(&self) -> &'static str {
            "echo"
        }

        fn model(&self) -> &str {
            "echo"
        }

        async fn complete(&self, _request: &GenerationRequest) -> GenerationResult<String> {
            *self.calls.lock().unwrap() += 1;
            Ok("Relax in comfort.".to_string())
        }

        async fn list_models(&self) -> GenerationResult<Vec<String>> {
            Ok(Vec::new())
        }
    }

    fn engine() -> (ChatEngine, Arc<Echo>) {
        let backend = Arc::new(Echo { calls: Mutex::new(0) });
        let engine = ChatEngine::new(
            PromptComposer::builtin(),
            GenerationClient::new(backend.clone()),
            Arc::new(MemoryFeedbackStore::default()),
            10,
        );
        (engine, backend)
    }

    #[tokio::test]
    async fn submit_without_mode_is_rejected_and_nothing_is_sent() {
        let (engine, backend) = engine();
        let mut session = engine.start_session().await;
        assert_eq!(engine.submit(&mut session, "hi").await, Err(SessionError::ModeNotSelected));
        assert!(session.messages().is_empty());
        assert_eq!(*backend.calls.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn blank_input_is_rejected() {
        let (engine, _) = engine();
        let mut session = engine.start_session().await;
        engine.select_mode(&mut session, "UX").unwrap();
        assert_eq!(engine.submit(&mut session, "  \n").await, Err(SessionError::EmptyInput));
        assert!(session.messages().is_empty());
    }

    #[tokio::test]
    async fn unknown_mode_cannot_be_selected() {
        let (engine, _) = engine();
        let mut session = engine.start_session().await;
        let err = engine.select_mode(&mut session, "FAQ").unwrap_err();
        assert_eq!(err, SessionError::Compose(ComposeError::UnknownMode("FAQ".into())));
        assert!(session.mode().is_none());
    }

    #[tokio::test]
    async fn zero_window_is_clamped() {
        let backend = Arc::new(Echo { calls: Mutex::new(0) });
        let engine = ChatEngine::new(
            PromptComposer::builtin(),
            GenerationClient::new(backend),
            Arc::new(MemoryFeedbackStore::default()),
            0,
        );
        assert_eq!(engine.negative_window(), 1);
    }
}
