/// Durable snapshots of sessions and challenge batches.
pub mod archive_service;
/// Remote and bundled challenge providers.
pub mod challenge_source;
/// OpenAPI documentation generation.
pub mod documentation;
/// Session lookup, payload assembly and challenge advancement.
pub mod game_service;
/// Health check service.
pub mod health_service;
/// Daily catalog rotation.
pub mod rotation;
/// Snapshot store supervision with degraded mode.
pub mod storage_supervisor;
/// Guess streaming through the text generator.
pub mod stream_service;
