//! Document shapes written to CouchDB.

use std::time::SystemTime;

use serde::Serialize;
use uuid::Uuid;

use crate::dao::models::{
    ChallengeBatchEntity, ChallengeEntity, HistoryEntryEntity, SessionOutcomeEntity,
    SessionSnapshotEntity,
};

pub const SESSION_PREFIX: &str = "session::";
pub const CHALLENGES_PREFIX: &str = "challenges::";

pub fn session_doc_id(session_id: &str, snapshot_id: Uuid) -> String {
    format!("{SESSION_PREFIX}{session_id}::{snapshot_id}")
}

pub fn challenges_doc_id(id: Uuid) -> String {
    format!("{CHALLENGES_PREFIX}{id}")
}

/// Session snapshot as stored in CouchDB. Documents are written once, so no `_rev`.
#[derive(Debug, Serialize)]
pub struct CouchSessionDocument {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub session_id: String,
    pub challenge: usize,
    pub progress: Vec<bool>,
    pub history: Vec<HistoryEntryEntity>,
    pub attempts: usize,
    pub outcome: SessionOutcomeEntity,
    pub recorded_at: SystemTime,
}

impl From<SessionSnapshotEntity> for CouchSessionDocument {
    fn from(snapshot: SessionSnapshotEntity) -> Self {
        Self {
            id: session_doc_id(&snapshot.session_id, snapshot.snapshot_id),
            kind: "session",
            session_id: snapshot.session_id,
            challenge: snapshot.challenge,
            progress: snapshot.progress,
            history: snapshot.history,
            attempts: snapshot.attempts,
            outcome: snapshot.outcome,
            recorded_at: snapshot.recorded_at,
        }
    }
}

/// Daily challenge batch as stored in CouchDB.
#[derive(Debug, Serialize)]
pub struct CouchChallengesDocument {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub published_at: SystemTime,
    pub challenges: Vec<ChallengeEntity>,
}

impl From<ChallengeBatchEntity> for CouchChallengesDocument {
    fn from(batch: ChallengeBatchEntity) -> Self {
        Self {
            id: challenges_doc_id(batch.id),
            kind: "challenges",
            published_at: batch.published_at,
            challenges: batch.challenges,
        }
    }
}
