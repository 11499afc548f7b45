use tracing::{debug, info, warn};

use crate::{
    dto::game::GameStateResponse,
    error::ServiceError,
    services::archive_service,
    state::{
        SharedState,
        challenge::CatalogSnapshot,
        session::{Session, SessionError},
    },
};

/// Payload for one `GET /game`, plus the id to hand out when a session was minted.
#[derive(Debug)]
pub struct LoadedGame {
    /// State of the caller's current challenge.
    pub payload: GameStateResponse,
    /// Set when the caller had no usable session; goes into `Set-Cookie`.
    pub minted_session: Option<String>,
}

/// Fetch (or create) the caller's session and build its payload.
///
/// Ids unknown to the store are never adopted: a fresh id is minted instead.
/// A session left over from a previous catalog is archived before it is rebound.
/// When `advance` is set and the current challenge is complete, the session
/// moves on to the next one first; on the last challenge it stays put.
pub async fn load_game(
    state: &SharedState,
    session_id: Option<&str>,
    advance: bool,
) -> Result<LoadedGame, ServiceError> {
    let catalog = state.catalog().current().await;
    let sessions = state.sessions();

    let (mut session, minted_session) =
        match session_id.filter(|id| sessions.contains(id)) {
            Some(id) => {
                let (session, evicted) = sessions.get_or_create(id, &catalog).await?;
                if let Some(stale) = evicted {
                    archive_rebound(state, &stale).await;
                }
                (session, None)
            }
            None => {
                let session = sessions.create(&catalog).await?;
                info!(session_id = %session.id(), "session created");
                let id = session.id().to_owned();
                (session, Some(id))
            }
        };

    if advance && session.is_complete() {
        match advance_session(state, session.id(), &catalog) {
            Ok(next) => session = next,
            Err(ServiceError::Session(SessionError::NoMoreChallenges)) => {
                debug!(session_id = %session.id(), "last challenge already reached");
            }
            Err(err) => return Err(err),
        }
    }

    Ok(LoadedGame {
        payload: build_payload(state, &session, &catalog)?,
        minted_session,
    })
}

async fn archive_rebound(state: &SharedState, stale: &Session) {
    info!(session_id = %stale.id(), "stale session rebound to the current catalog");
    if let Err(err) = archive_service::archive_session(state, stale).await {
        warn!(session_id = %stale.id(), error = %err, "failed to archive stale session");
    }
}

/// Explicitly move the caller's session to the next challenge.
pub async fn advance(
    state: &SharedState,
    session_id: Option<&str>,
) -> Result<GameStateResponse, ServiceError> {
    let id = session_id.ok_or_else(|| ServiceError::Unauthorized("missing session".into()))?;
    let catalog = state.catalog().current().await;

    let session = match advance_session(state, id, &catalog) {
        Err(ServiceError::Session(SessionError::NotFound)) => {
            return Err(ServiceError::Unauthorized("unknown session".into()));
        }
        other => other?,
    };
    build_payload(state, &session, &catalog)
}

fn advance_session(
    state: &SharedState,
    id: &str,
    catalog: &CatalogSnapshot,
) -> Result<Session, ServiceError> {
    let session = state
        .sessions()
        .with_exclusive(id, |session| {
            session.advance(catalog)?;
            Ok::<_, SessionError>(session.clone())
        })
        .ok_or(SessionError::NotFound)??;

    debug!(
        session_id = %id,
        challenge = session.challenge_index(),
        "session advanced to next challenge"
    );
    Ok(session)
}

fn build_payload(
    state: &SharedState,
    session: &Session,
    catalog: &CatalogSnapshot,
) -> Result<GameStateResponse, ServiceError> {
    let challenge = catalog.get(session.challenge_index())?;
    let active_players = state
        .sessions()
        .count_active(state.config().active_window);

    Ok(GameStateResponse::from_session(
        session,
        &challenge,
        state.sessions().max_attempts(),
        active_players,
    ))
}
