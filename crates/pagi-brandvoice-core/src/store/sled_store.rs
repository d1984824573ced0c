//! Local feedback ledger on sled. Bare metal, direct host filesystem.
//!
//! Rows live in the `feedback` tree keyed by a monotonically increasing big-endian id,
//! so key order is append order. The `meta` tree carries the header on first write.

use super::FeedbackStore;
use crate::error::StoreError;
use crate::record::{InteractionRecord, FEEDBACK_COLUMNS};
use async_trait::async_trait;
use std::path::Path;

const ROWS_TREE: &str = "feedback";
const META_TREE: &str = "meta";
const HEADER_KEY: &[u8] = b"header";

pub struct SledFeedbackStore {
    db: sled::Db,
}

impl SledFeedbackStore {
    pub fn open(path: impl AsRef<Path>) -> sled::Result<Self> {
        let db = sled::open(path)?;
        Ok(Self { db })
    }

    /// Header columns, once the first row has been written.
    pub fn header(&self) -> Option<Vec<String>> {
        let meta = self.db.open_tree(META_TREE).ok()?;
        let raw = meta.get(HEADER_KEY).ok()??;
        serde_json::from_slice(&raw).ok()
    }
}

fn ensure_header(db: &sled::Db) -> Result<(), StoreError> {
    let meta = db.open_tree(META_TREE)?;
    if meta.get(HEADER_KEY)?.is_none() {
        let header = serde_json::to_vec(&FEEDBACK_COLUMNS)?;
        meta.insert(HEADER_KEY, header)?;
        tracing::info!("feedback ledger initialized with header row");
    }
    Ok(())
}

fn append_row(db: &sled::Db, record: &InteractionRecord) -> Result<(), StoreError> {
    ensure_header(db)?;
    let rows = db.open_tree(ROWS_TREE)?;
    let id = db.generate_id()?;
    let payload = serde_json::to_vec(record)?;
    rows.insert(id.to_be_bytes(), payload)?;
    rows.flush()?;
    Ok(())
}

fn read_rows(db: &sled::Db) -> Result<Vec<InteractionRecord>, StoreError> {
    let rows = db.open_tree(ROWS_TREE)?;
    let mut out = Vec::new();
    for entry in rows.iter() {
        let (_, value) = entry?;
        match serde_json::from_slice::<InteractionRecord>(&value) {
            Ok(rec) => out.push(rec),
            Err(e) => tracing::debug!("skipping unreadable feedback row: {}", e),
        }
    }
    Ok(out)
}

// sled I/O (including the fsync in `flush`) runs on the blocking pool.
#[async_trait]
impl FeedbackStore for SledFeedbackStore {
    fn name(&self) -> &'static str {
        "sled"
    }

    async fn append(&self, record: &InteractionRecord) -> bool {
        let db = self.db.clone();
        let record = record.clone();
        let result = tokio::task::spawn_blocking(move || append_row(&db, &record))
            .await
            .map_err(StoreError::from)
            .and_then(|r| r);
        match result {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("feedback append failed (sled): {}", e);
                false
            }
        }
    }

    async fn load_all(&self) -> Vec<InteractionRecord> {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || read_rows(&db))
            .await
            .map_err(StoreError::from)
            .and_then(|r| r)
            .unwrap_or_else(|e| {
                tracing::warn!("feedback load failed (sled): {}", e);
                Vec::new()
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Feedback;

    #[tokio::test]
    async fn header_written_lazily_on_first_append() {
        let dir = tempfile::tempdir().unwrap();
        let store = SledFeedbackStore::open(dir.path()).unwrap();
        assert!(store.header().is_none());

        let rec = InteractionRecord::new("UX", "a", "b", &Feedback::Positive);
        assert!(store.append(&rec).await);

        let header = store.header().unwrap();
        assert_eq!(header.len(), 8);
        assert_eq!(header[5], "feedback_value");
    }

    #[tokio::test]
    async fn load_all_returns_append_order_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = SledFeedbackStore::open(dir.path()).unwrap();
            for i in 0..12 {
                let rec = InteractionRecord::new("UX", &format!("in {}", i), "out", &Feedback::Positive);
                assert!(store.append(&rec).await);
            }
        }
        let store = SledFeedbackStore::open(dir.path()).unwrap();
        let all = store.load_all().await;
        assert_eq!(all.len(), 12);
        let order: Vec<_> = all.iter().map(|r| r.original_text.clone()).collect();
        let expected: Vec<_> = (0..12).map(|i| format!("in {}", i)).collect();
        assert_eq!(order, expected);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn concurrent_appends_all_land() {
        let dir = tempfile::tempdir().unwrap();
        let store = std::sync::Arc::new(SledFeedbackStore::open(dir.path()).unwrap());
        let mut handles = Vec::new();
        for i in 0..8 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                let rec = InteractionRecord::new("SEARCH", &format!("q {}", i), "a", &Feedback::Positive);
                store.append(&rec).await
            }));
        }
        for h in handles {
            assert!(h.await.unwrap());
        }
        assert_eq!(store.load_all().await.len(), 8);
        assert_eq!(store.header().unwrap().len(), 8);
    }
}
