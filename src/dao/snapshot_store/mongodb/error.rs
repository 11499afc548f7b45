//! Error types raised by the MongoDB snapshot backend.

use mongodb::error::Error as MongoError;
use thiserror::Error;

/// Result alias for MongoDB calls.
pub type MongoResult<T> = Result<T, MongoDaoError>;

/// Failures of the MongoDB snapshot backend.
#[derive(Debug, Error)]
pub enum MongoDaoError {
    /// A required environment variable is unset.
    #[error("environment variable `{var}` is required for the MongoDB backend")]
    MissingEnvVar {
        /// Name of the variable.
        var: &'static str,
    },
    /// The connection string could not be parsed.
    #[error("MongoDB URI `{uri}` is invalid")]
    InvalidUri {
        /// Offending connection string.
        uri: String,
        /// Driver error.
        #[source]
        source: MongoError,
    },
    /// The driver refused the parsed options.
    #[error("could not create a MongoDB client")]
    ClientConstruction {
        /// Driver error.
        #[source]
        source: MongoError,
    },
    /// The server never answered while the database was being opened.
    #[error("MongoDB did not answer after {attempts} ping(s)")]
    InitialPing {
        /// Pings sent before giving up.
        attempts: u32,
        /// Error of the last ping.
        #[source]
        source: MongoError,
    },
    /// A connected server stopped answering.
    #[error("MongoDB health ping failed")]
    HealthPing {
        /// Driver error.
        #[source]
        source: MongoError,
    },
    /// An index the store relies on could not be created.
    #[error("could not create index `{index}` on `{collection}`")]
    EnsureIndex {
        /// Collection the index belongs to.
        collection: &'static str,
        /// Index name.
        index: &'static str,
        /// Driver error.
        #[source]
        source: MongoError,
    },
    /// An insert was refused; `record` names what was being written.
    #[error("could not insert {record}")]
    Insert {
        /// Description of the record.
        record: String,
        /// Driver error.
        #[source]
        source: MongoError,
    },
}
