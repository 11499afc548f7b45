use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::{
    dto::validation::validate_guess_input,
    state::{challenge::Challenge, session::Session},
};

/// Game payload returned by `GET /game` and `POST /game/next`.
///
/// The quote travels in full; clients mask the words still hidden by `progress`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GameStateResponse {
    /// Zero-based index of the challenge being played.
    pub challenge: usize,
    /// Quote to uncover.
    pub quote: String,
    /// Credited author.
    pub author: String,
    /// Latest paragraph: the seed before any attempt, then the last generated text.
    pub content: String,
    /// Attempts consumed on this challenge.
    pub attempts: usize,
    /// One flag per target word.
    pub progress: Vec<bool>,
    /// Number of target words.
    pub length: usize,
    /// Attempt budget per challenge.
    pub max_attempts: usize,
    /// Whether every word is found or no attempt remains.
    pub complete: bool,
    /// Players seen within the activity window.
    pub active_players: usize,
}

impl GameStateResponse {
    /// Assemble the payload for `session` playing `challenge`.
    pub fn from_session(
        session: &Session,
        challenge: &Challenge,
        max_attempts: usize,
        active_players: usize,
    ) -> Self {
        Self {
            challenge: session.challenge_index(),
            quote: challenge.quote.clone(),
            author: challenge.author.clone(),
            content: session.latest_content().to_owned(),
            attempts: session.attempts(),
            progress: session.progress().to_vec(),
            length: challenge.words.len(),
            max_attempts,
            complete: session.is_complete(),
            active_players,
        }
    }
}

/// Body of `POST /game`.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct GuessRequest {
    /// Free text continuing the latest paragraph.
    #[validate(custom(function = "validate_guess_input"))]
    pub input: String,
}

/// Query string accepted by `GET /game`.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct GameQuery {
    /// Any non-empty value advances to the next challenge once the current one is complete.
    #[serde(default)]
    pub next: Option<String>,
}

impl GameQuery {
    /// Whether advancement was requested.
    pub fn wants_next(&self) -> bool {
        self.next.as_deref().is_some_and(|value| !value.is_empty())
    }
}
