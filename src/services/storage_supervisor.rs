//! Keeps a snapshot store installed and toggles degraded mode around outages.

use std::{future::Future, sync::Arc, time::Duration};

use tokio::time::sleep;
use tracing::{info, warn};

use crate::{
    dao::{snapshot_store::SnapshotStore, storage::StorageError},
    state::SharedState,
};

/// Delays and limits of the supervision loop.
#[derive(Debug, Clone)]
pub struct SupervisorPolicy {
    /// First pause after a failed connection; doubles up to `max_delay`.
    pub initial_delay: Duration,
    /// Upper bound of the reconnect backoff.
    pub max_delay: Duration,
    /// Pause between two health checks of a connected store.
    pub health_interval: Duration,
    /// In-place recovery attempts before reconnecting from scratch.
    pub reconnect_attempts: u32,
}

impl Default for SupervisorPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(10),
            health_interval: Duration::from_secs(5),
            reconnect_attempts: 3,
        }
    }
}

impl SupervisorPolicy {
    fn backoff(&self, delay: Duration) -> Duration {
        (delay * 2).min(self.max_delay)
    }
}

/// Connect through `connect`, then health-check forever; reconnect from scratch
/// once in-place recovery gives up.
pub async fn run<F, Fut>(state: SharedState, policy: SupervisorPolicy, mut connect: F)
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<Arc<dyn SnapshotStore>, StorageError>> + Send,
{
    let mut delay = policy.initial_delay;
    loop {
        match connect().await {
            Ok(store) => {
                state.set_snapshot_store(store.clone()).await;
                info!("snapshot store connected; leaving degraded mode");
                delay = policy.initial_delay;

                watch(&state, &policy, store.as_ref()).await;
                warn!("snapshot store lost; reconnecting from scratch");
            }
            Err(err) => {
                let delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
                warn!(error = %err, delay_ms, "snapshot store connection failed");
            }
        }
        sleep(delay).await;
        delay = policy.backoff(delay);
    }
}

/// Poll `store` until it stays unreachable after every reconnect attempt.
async fn watch(state: &SharedState, policy: &SupervisorPolicy, store: &dyn SnapshotStore) {
    loop {
        match store.health_check().await {
            Ok(()) => {
                if state.is_degraded().await {
                    info!("snapshot store healthy again; leaving degraded mode");
                    state.update_degraded(false).await;
                }
            }
            Err(err) => {
                warn!(error = %err, "snapshot store health check failed");
                if !recover(state, policy, store).await {
                    return;
                }
                state.update_degraded(false).await;
            }
        }
        sleep(policy.health_interval).await;
    }
}

/// Try to reconnect in place; degraded mode is entered on the first failure.
async fn recover(state: &SharedState, policy: &SupervisorPolicy, store: &dyn SnapshotStore) -> bool {
    let mut delay = policy.initial_delay;
    for attempt in 0..policy.reconnect_attempts {
        match store.try_reconnect().await {
            Ok(()) => {
                info!(attempt, "snapshot store reconnected");
                return true;
            }
            Err(err) => {
                if attempt == 0 {
                    state.update_degraded(true).await;
                }
                warn!(attempt, error = %err, "snapshot store reconnect failed");
                sleep(delay).await;
                delay = policy.backoff(delay);
            }
        }
    }
    warn!("exhausted snapshot store reconnect attempts; staying in degraded mode");
    false
}
