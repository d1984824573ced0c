//! Feedback store adapter: append-only table of rated interactions.
//!
//! Every backend absorbs its own failures. `append` reports durability as a bool and
//! `load_all` degrades to an empty list, so the conversation never breaks on storage.

mod sheets;
mod sled_store;

pub use sheets::SheetsFeedbackStore;
pub use sled_store::SledFeedbackStore;

use crate::config::{FeedbackBackend, FeedbackConfig};
use crate::record::InteractionRecord;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

#[async_trait]
pub trait FeedbackStore: Send + Sync {
    /// Short backend name for logs and diagnostics.
    fn name(&self) -> &'static str;

    /// Persists one record. `false` means "not persisted, continue in memory".
    async fn append(&self, record: &InteractionRecord) -> bool;

    /// Every stored record in append order, or empty if the store is unreachable.
    async fn load_all(&self) -> Vec<InteractionRecord>;
}

/// Builds the configured backend. A sled path that cannot be opened degrades to [`DisabledFeedbackStore`].
pub fn build_feedback_store(cfg: &FeedbackConfig) -> Arc<dyn FeedbackStore> {
    match cfg.backend {
        FeedbackBackend::Sheets => Arc::new(SheetsFeedbackStore::new(
            cfg.spreadsheet_id.clone(),
            cfg.access_token.clone(),
            &cfg.worksheet,
        )),
        FeedbackBackend::Sled => match SledFeedbackStore::open(&cfg.sled_path) {
            Ok(store) => Arc::new(store),
            Err(e) => {
                tracing::warn!(path = %cfg.sled_path, "feedback store open failed, ratings stay in memory: {}", e);
                Arc::new(DisabledFeedbackStore)
            }
        },
        FeedbackBackend::Memory => Arc::new(MemoryFeedbackStore::default()),
        FeedbackBackend::Disabled => Arc::new(DisabledFeedbackStore),
    }
}

/// Explicit opt-out: nothing is persisted.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledFeedbackStore;

#[async_trait]
impl FeedbackStore for DisabledFeedbackStore {
    fn name(&self) -> &'static str {
        "disabled"
    }

    async fn append(&self, _record: &InteractionRecord) -> bool {
        false
    }

    async fn load_all(&self) -> Vec<InteractionRecord> {
        Vec::new()
    }
}

/// Process-local store (development, tests). Lost on restart.
#[derive(Debug, Default)]
pub struct MemoryFeedbackStore {
    records: RwLock<Vec<InteractionRecord>>,
}

impl MemoryFeedbackStore {
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl FeedbackStore for MemoryFeedbackStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn append(&self, record: &InteractionRecord) -> bool {
        self.records.write().await.push(record.clone());
        true
    }

    async fn load_all(&self) -> Vec<InteractionRecord> {
        self.records.read().await.clone()
    }
}
