/// Text generation backend adapters.
pub mod generator;
/// Persisted record definitions.
pub mod models;
/// Quote provider client used to source new challenges.
pub mod quotes;
/// Append-only persistence of session snapshots and challenge batches.
pub mod snapshot_store;
/// Storage abstraction layer shared by every backend.
pub mod storage;
