//! Library crate for words-weave-back, exposing modules for binaries and integration tests.

/// Environment-driven runtime settings.
pub mod config;
/// Adapters to external systems: generator, quotes and snapshot storage.
pub mod dao;
/// Request and response bodies.
pub mod dto;
/// Error types and their HTTP mapping.
pub mod error;
/// HTTP routes.
pub mod routes;
/// Operations behind the routes and the background tasks.
pub mod services;
/// In-memory game state.
pub mod state;
