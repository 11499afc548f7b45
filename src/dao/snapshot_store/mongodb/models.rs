use mongodb::bson::DateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::dao::models::{
    ChallengeBatchEntity, ChallengeEntity, HistoryEntryEntity, SessionOutcomeEntity,
    SessionSnapshotEntity,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoSessionDocument {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub session_id: String,
    pub challenge: usize,
    pub progress: Vec<bool>,
    pub history: Vec<HistoryEntryEntity>,
    pub attempts: usize,
    pub outcome: SessionOutcomeEntity,
    pub recorded_at: DateTime,
}

impl From<SessionSnapshotEntity> for MongoSessionDocument {
    fn from(value: SessionSnapshotEntity) -> Self {
        Self {
            id: value.snapshot_id,
            session_id: value.session_id,
            challenge: value.challenge,
            progress: value.progress,
            history: value.history,
            attempts: value.attempts,
            outcome: value.outcome,
            recorded_at: DateTime::from_system_time(value.recorded_at),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoChallengesDocument {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub published_at: DateTime,
    pub challenges: Vec<ChallengeEntity>,
}

impl From<ChallengeBatchEntity> for MongoChallengesDocument {
    fn from(value: ChallengeBatchEntity) -> Self {
        Self {
            id: value.id,
            published_at: DateTime::from_system_time(value.published_at),
            challenges: value.challenges,
        }
    }
}
