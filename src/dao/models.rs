use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use uuid::Uuid;

use crate::state::{challenge::Challenge, progress::Outcome, session::Session};

/// One persisted round trip of a session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HistoryEntryEntity {
    /// Text submitted by the player.
    pub input: String,
    /// Generated text returned for it.
    pub content: String,
}

/// End state recorded alongside a session snapshot.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SessionOutcomeEntity {
    /// Every target word was revealed.
    Solved,
    /// The attempt budget ran out.
    Exhausted,
    /// The session was cut short before completion.
    Unfinished,
}

/// Append-only snapshot of a finished or rotated session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionSnapshotEntity {
    /// Unique identifier of this snapshot (a session may be snapshotted several times).
    pub snapshot_id: Uuid,
    /// Session cookie identifier.
    pub session_id: String,
    /// Index of the challenge the session was playing.
    pub challenge: usize,
    /// Per-word satisfaction flags.
    pub progress: Vec<bool>,
    /// Consumed attempts only; the seed paragraph is not stored.
    pub history: Vec<HistoryEntryEntity>,
    /// Attempts consumed on the challenge.
    pub attempts: usize,
    /// How the challenge ended.
    pub outcome: SessionOutcomeEntity,
    /// Wall-clock time the snapshot was taken.
    pub recorded_at: SystemTime,
}

/// Persisted form of a published challenge.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChallengeEntity {
    /// Quote to reveal.
    pub quote: String,
    /// Credited author.
    pub author: String,
    /// Seed paragraph shown before the first attempt.
    pub content: String,
}

/// One day's batch of challenges, appended on every successful rotation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChallengeBatchEntity {
    /// Unique identifier of the batch.
    pub id: Uuid,
    /// Time the batch became active.
    pub published_at: SystemTime,
    /// Challenges in catalog order.
    pub challenges: Vec<ChallengeEntity>,
}

impl ChallengeBatchEntity {
    /// Stamp a new batch published now.
    pub fn new(challenges: Vec<ChallengeEntity>) -> Self {
        Self {
            id: Uuid::new_v4(),
            published_at: SystemTime::now(),
            challenges,
        }
    }
}

impl From<Outcome> for SessionOutcomeEntity {
    fn from(value: Outcome) -> Self {
        match value {
            Outcome::Solved => Self::Solved,
            Outcome::Exhausted => Self::Exhausted,
            Outcome::Unfinished => Self::Unfinished,
        }
    }
}

impl From<&Session> for SessionSnapshotEntity {
    fn from(session: &Session) -> Self {
        Self {
            snapshot_id: Uuid::new_v4(),
            session_id: session.id().to_owned(),
            challenge: session.challenge_index(),
            progress: session.progress().to_vec(),
            history: session
                .history()
                .iter()
                .skip(1)
                .map(|entry| HistoryEntryEntity {
                    input: entry.input.clone(),
                    content: entry.content.clone(),
                })
                .collect(),
            attempts: session.attempts(),
            outcome: session.outcome().into(),
            recorded_at: SystemTime::now(),
        }
    }
}

impl From<&Challenge> for ChallengeEntity {
    fn from(challenge: &Challenge) -> Self {
        Self {
            quote: challenge.quote.clone(),
            author: challenge.author.clone(),
            content: challenge.seed_content.clone(),
        }
    }
}
