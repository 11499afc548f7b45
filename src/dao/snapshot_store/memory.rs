use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::future::{self, BoxFuture};

use crate::dao::{
    models::{ChallengeBatchEntity, SessionSnapshotEntity},
    snapshot_store::SnapshotStore,
    storage::StorageResult,
};

#[derive(Default)]
struct Records {
    sessions: Vec<SessionSnapshotEntity>,
    batches: Vec<ChallengeBatchEntity>,
}

/// Process-local store keeping every appended record in memory.
///
/// Used when no database is configured and as the test double for the others.
#[derive(Clone, Default)]
pub struct MemorySnapshotStore {
    records: Arc<Mutex<Records>>,
}

impl MemorySnapshotStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Records> {
        // Records are plain vectors; a panicked writer cannot leave them half-updated.
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Copy of every session snapshot appended so far.
    pub fn sessions(&self) -> Vec<SessionSnapshotEntity> {
        self.lock().sessions.clone()
    }

    /// Copy of every challenge batch appended so far.
    pub fn batches(&self) -> Vec<ChallengeBatchEntity> {
        self.lock().batches.clone()
    }
}

impl SnapshotStore for MemorySnapshotStore {
    fn append_session(
        &self,
        snapshot: SessionSnapshotEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        self.lock().sessions.push(snapshot);
        Box::pin(future::ready(Ok(())))
    }

    fn append_challenges(
        &self,
        batch: ChallengeBatchEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        self.lock().batches.push(batch);
        Box::pin(future::ready(Ok(())))
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(future::ready(Ok(())))
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(future::ready(Ok(())))
    }
}
