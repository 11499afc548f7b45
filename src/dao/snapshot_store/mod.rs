#[cfg(feature = "couch-store")]
pub mod couchdb;
/// In-process store for tests and storage-less runs.
pub mod memory;
#[cfg(feature = "mongo-store")]
pub mod mongodb;

use crate::dao::models::{ChallengeBatchEntity, SessionSnapshotEntity};
use crate::dao::storage::StorageResult;
use futures::future::BoxFuture;

/// Append-only sink for session snapshots and published challenge batches.
///
/// Records are never updated in place; a session snapshotted twice (solved,
/// then cleared at rotation) produces two records with distinct ids.
pub trait SnapshotStore: Send + Sync {
    /// Store one session snapshot.
    fn append_session(&self, snapshot: SessionSnapshotEntity)
    -> BoxFuture<'static, StorageResult<()>>;
    /// Store one published challenge batch.
    fn append_challenges(
        &self,
        batch: ChallengeBatchEntity,
    ) -> BoxFuture<'static, StorageResult<()>>;
    /// Cheap round trip to the backend.
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
    /// Re-establish the connection in place after a failed health check.
    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>>;
}
