//! Snapshot persistence in MongoDB collections.

mod config;
mod error;
mod models;
mod store;

pub use config::MongoConfig;
pub use error::MongoDaoError;
pub use store::MongoSnapshotStore;

impl From<MongoDaoError> for crate::dao::storage::StorageError {
    fn from(err: MongoDaoError) -> Self {
        Self::new("mongodb", err)
    }
}
