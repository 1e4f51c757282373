use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::RwLock;

use super::SnapshotStore;
use crate::error::{StorageError, StorageResult};
use crate::model::AppSnapshot;

/// In-process snapshot store.
///
/// Stores the serialized JSON so saves exercise the same encoding path as the
/// durable store.
#[derive(Default)]
pub struct MemorySnapshotStore {
    data: RwLock<Option<String>>,
    saves: AtomicUsize,
    fail_writes: AtomicBool,
}

impl MemorySnapshotStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with `snapshot`.
    pub fn with_snapshot(snapshot: &AppSnapshot) -> StorageResult<Self> {
        Ok(Self::with_raw(serde_json::to_string(snapshot)?))
    }

    /// Store pre-seeded with raw slot contents, valid JSON or not.
    pub fn with_raw(raw: impl Into<String>) -> Self {
        Self {
            data: RwLock::new(Some(raw.into())),
            ..Self::default()
        }
    }

    /// Number of successful saves.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    /// Make subsequent saves fail, simulating an unwritable store.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl SnapshotStore for MemorySnapshotStore {
    async fn load(&self) -> StorageResult<Option<AppSnapshot>> {
        match self.data.read().await.as_deref() {
            Some(raw) => Ok(Some(serde_json::from_str(raw)?)),
            None => Ok(None),
        }
    }

    async fn save(&self, snapshot: &AppSnapshot) -> StorageResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::Query {
                message: "storage quota exceeded".to_string(),
            });
        }
        let raw = serde_json::to_string(snapshot)?;
        *self.data.write().await = Some(raw);
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
