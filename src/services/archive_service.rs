//! Durable snapshots of sessions and published batches.

use tracing::{info, warn};

use crate::{
    dao::models::{ChallengeBatchEntity, ChallengeEntity, SessionSnapshotEntity},
    error::ServiceError,
    state::{SharedState, challenge::CatalogSnapshot, session::Session},
};

/// Append one session snapshot to the installed store.
pub async fn archive_session(state: &SharedState, session: &Session) -> Result<(), ServiceError> {
    let store = state.require_snapshot_store().await?;
    let snapshot = SessionSnapshotEntity::from(session);
    let session_id = snapshot.session_id.clone();
    store.append_session(snapshot).await?;
    info!(
        session_id = %session_id,
        challenge = session.challenge_index(),
        attempts = session.attempts(),
        "session snapshot archived"
    );
    Ok(())
}

/// Archive every session, logging failures. Returns how many were stored.
pub async fn archive_sessions(state: &SharedState, sessions: &[Session]) -> usize {
    let mut stored = 0;
    for session in sessions {
        match archive_session(state, session).await {
            Ok(()) => stored += 1,
            Err(err) => warn!(
                session_id = %session.id(),
                error = %err,
                "failed to archive session snapshot"
            ),
        }
    }
    stored
}

/// Append the challenges of `catalog` as one published batch.
pub async fn archive_batch(
    state: &SharedState,
    catalog: &CatalogSnapshot,
) -> Result<(), ServiceError> {
    let store = state.require_snapshot_store().await?;
    let batch = ChallengeBatchEntity::new(
        catalog
            .iter()
            .map(|challenge| ChallengeEntity::from(challenge.as_ref()))
            .collect(),
    );
    let batch_id = batch.id;
    store.append_challenges(batch).await?;
    info!(%batch_id, edition = catalog.edition(), "challenge batch archived");
    Ok(())
}
