use serde::Serialize;
use utoipa::ToSchema;

/// Whether snapshots are currently persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Snapshot store reachable.
    Ok,
    /// Gameplay continues but snapshots are dropped.
    Degraded,
}

/// Body of the `/healthcheck` route.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// `ok` or `degraded`.
    pub status: HealthStatus,
}

impl HealthResponse {
    /// Status matching the degraded flag.
    pub fn from_degraded(degraded: bool) -> Self {
        if degraded { Self::degraded() } else { Self::ok() }
    }

    /// Snapshots are being persisted.
    pub fn ok() -> Self {
        Self {
            status: HealthStatus::Ok,
        }
    }

    /// Snapshots are currently dropped.
    pub fn degraded() -> Self {
        Self {
            status: HealthStatus::Degraded,
        }
    }
}
