//! Durable snapshot persistence.
//!
//! The whole application state is stored as one JSON document in a named
//! slot. [`SqliteSnapshotStore`] is the durable backend;
//! [`MemorySnapshotStore`] keeps the snapshot in process for ephemeral runs
//! and tests.

mod memory;
mod sqlite;

pub use memory::MemorySnapshotStore;
pub use sqlite::SqliteSnapshotStore;

use async_trait::async_trait;

use crate::error::StorageResult;
use crate::model::AppSnapshot;

/// Slot name the application snapshot is stored under.
pub const SNAPSHOT_SLOT: &str = "grantbloom_data_v1";

/// Load/save contract for the application snapshot.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Read the stored snapshot, `None` if nothing was saved yet.
    async fn load(&self) -> StorageResult<Option<AppSnapshot>>;
    /// Replace the stored snapshot.
    async fn save(&self, snapshot: &AppSnapshot) -> StorageResult<()>;
}
