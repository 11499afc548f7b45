//! Shared application state: the daily catalog, live sessions and storage handles.

/// Daily challenges and the catalog holding them.
pub mod challenge;
/// Word matching against generated text.
pub mod progress;
/// Per-player sessions and the store owning them.
pub mod session;
/// Phases of one streamed guess.
pub mod stream;
/// Sanitizing and splitting player text.
pub mod words;

use std::sync::Arc;

use tokio::sync::{RwLock, watch};

use crate::{
    config::AppConfig,
    dao::{generator::TextGenerator, snapshot_store::SnapshotStore},
    error::ServiceError,
    services::challenge_source::ChallengeSource,
    state::{challenge::Catalog, session::SessionStore},
};

/// Handle shared by every route and background task.
pub type SharedState = Arc<AppState>;

/// Central application state: the day's catalog, every live session and the
/// collaborators they talk to.
pub struct AppState {
    config: AppConfig,
    catalog: Catalog,
    sessions: SessionStore,
    generator: Arc<dyn TextGenerator>,
    challenge_source: Arc<dyn ChallengeSource>,
    snapshot_store: RwLock<Option<Arc<dyn SnapshotStore>>>,
    degraded: watch::Sender<bool>,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    ///
    /// The application starts in degraded mode until a snapshot store is installed.
    pub fn new(
        config: AppConfig,
        catalog: Catalog,
        generator: Arc<dyn TextGenerator>,
        challenge_source: Arc<dyn ChallengeSource>,
    ) -> SharedState {
        let (degraded_tx, _rx) = watch::channel(true);
        Arc::new(Self {
            sessions: SessionStore::new(config.max_attempts),
            config,
            catalog,
            generator,
            challenge_source,
            snapshot_store: RwLock::new(None),
            degraded: degraded_tx,
        })
    }

    /// Runtime configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Active daily challenges.
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Registry of live sessions.
    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Backend producing paragraphs for guesses.
    pub fn generator(&self) -> Arc<dyn TextGenerator> {
        self.generator.clone()
    }

    /// Provider used to publish the next day's challenges.
    pub fn challenge_source(&self) -> Arc<dyn ChallengeSource> {
        self.challenge_source.clone()
    }

    /// Obtain a handle to the current snapshot store, if one is installed.
    pub async fn snapshot_store(&self) -> Option<Arc<dyn SnapshotStore>> {
        let guard = self.snapshot_store.read().await;
        guard.as_ref().cloned()
    }

    /// Snapshot store or [`ServiceError::Degraded`] when none is installed.
    pub async fn require_snapshot_store(&self) -> Result<Arc<dyn SnapshotStore>, ServiceError> {
        self.snapshot_store().await.ok_or(ServiceError::Degraded)
    }

    /// Install a snapshot store implementation and leave degraded mode.
    pub async fn set_snapshot_store(&self, store: Arc<dyn SnapshotStore>) {
        {
            let mut guard = self.snapshot_store.write().await;
            *guard = Some(store);
        }
        self.update_degraded(false).await;
    }

    /// Current degraded flag.
    pub async fn is_degraded(&self) -> bool {
        *self.degraded.borrow()
    }

    /// Subscribe to degraded mode updates.
    pub fn degraded_watcher(&self) -> watch::Receiver<bool> {
        self.degraded.subscribe()
    }

    /// Update and broadcast the degraded flag when the value changes.
    pub async fn update_degraded(&self, value: bool) {
        self.degraded.send_if_modified(|current| {
            if *current == value {
                return false;
            }
            *current = value;
            true
        });
    }
}
