//! Error types raised by the CouchDB snapshot backend.

use reqwest::StatusCode;
use thiserror::Error;

/// Result alias for CouchDB calls.
pub type CouchResult<T> = Result<T, CouchDaoError>;

/// Failures of the CouchDB snapshot backend.
#[derive(Debug, Error)]
pub enum CouchDaoError {
    /// A required environment variable is unset.
    #[error("environment variable `{0}` is required for the CouchDB backend")]
    MissingEnvVar(&'static str),
    /// Building the HTTP client failed.
    #[error("could not build the CouchDB HTTP client")]
    Client(#[source] reqwest::Error),
    /// The request never got an answer.
    #[error("CouchDB unreachable at `{url}`")]
    Unreachable {
        /// Target of the request.
        url: String,
        /// Transport error.
        #[source]
        source: reqwest::Error,
    },
    /// Any status the backend does not know how to handle.
    #[error("CouchDB answered {status} for `{url}`")]
    Status {
        /// Target of the request.
        url: String,
        /// Status CouchDB answered with.
        status: StatusCode,
    },
    /// Snapshot ids are fresh uuids, so this points at a replayed write.
    #[error("document `{id}` was already recorded")]
    Duplicate {
        /// Conflicting document id.
        id: String,
    },
}
