//! Snapshot persistence through the CouchDB HTTP document API.

mod config;
mod error;
mod models;
mod store;

pub use config::{CouchConfig, CouchCredentials};
pub use error::CouchDaoError;
pub use store::CouchSnapshotStore;

impl From<CouchDaoError> for crate::dao::storage::StorageError {
    fn from(err: CouchDaoError) -> Self {
        Self::new("couchdb", err)
    }
}
