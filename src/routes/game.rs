use axum::{
    Json, Router,
    body::{Body, Bytes},
    extract::{Query, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use validator::Validate;

use crate::{
    dto::game::{GameQuery, GameStateResponse, GuessRequest},
    error::{AppError, ErrorBody, ServiceError},
    services::{game_service, stream_service},
    state::SharedState,
};

/// Name of the cookie carrying the session id.
pub const SESSION_COOKIE: &str = "session";
const SESSION_MAX_AGE_SECS: u64 = 24 * 60 * 60;

/// Routes serving the daily game.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/game", get(get_game).post(post_guess))
        .route("/game/next", post(next_challenge))
}

/// Current game state for the caller, creating a session when needed.
#[utoipa::path(
    get,
    path = "/game",
    tag = "game",
    params(GameQuery),
    responses(
        (status = 200, description = "Current game state", body = GameStateResponse)
    )
)]
pub async fn get_game(
    State(state): State<SharedState>,
    Query(query): Query<GameQuery>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let session_id = session_cookie(&headers);
    let loaded =
        game_service::load_game(&state, session_id.as_deref(), query.wants_next()).await?;

    let mut response = Json(loaded.payload).into_response();
    if let Some(id) = loaded.minted_session {
        let cookie = session_set_cookie(&id, state.config().secure_cookie)?;
        response.headers_mut().insert(header::SET_COOKIE, cookie);
    }
    Ok(response)
}

/// Submit a guess and stream the generated continuation as plain text chunks.
#[utoipa::path(
    post,
    path = "/game",
    tag = "game",
    request_body = GuessRequest,
    responses(
        (status = 200, description = "Generated text, streamed", body = String, content_type = "text/plain"),
        (status = 400, description = "Malformed body", body = ErrorBody),
        (status = 401, description = "Missing or outdated session", body = ErrorBody),
        (status = 408, description = "Unknown session, cooling down or busy", body = ErrorBody),
        (status = 417, description = "Guess refused by a game rule", body = ErrorBody),
        (status = 500, description = "Generation failed", body = ErrorBody)
    )
)]
pub async fn post_guess(
    State(state): State<SharedState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, AppError> {
    let Some(session_id) = session_cookie(&headers) else {
        return Err(ServiceError::Unauthorized("missing session".into()).into());
    };
    let request: GuessRequest = serde_json::from_slice(&body)
        .map_err(|err| ServiceError::InvalidInput(format!("invalid JSON body: {err}")))?;
    request.validate()?;

    let stream = stream_service::submit_guess(&state, Some(&session_id), request.input).await?;

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8"),
            (header::CACHE_CONTROL, "no-cache"),
            (header::X_CONTENT_TYPE_OPTIONS, "nosniff"),
        ],
        Body::from_stream(stream),
    )
        .into_response())
}

/// Move on to the next challenge once the current one is complete.
#[utoipa::path(
    post,
    path = "/game/next",
    tag = "game",
    responses(
        (status = 200, description = "State of the next challenge", body = GameStateResponse),
        (status = 401, description = "Missing, unknown or outdated session", body = ErrorBody),
        (status = 409, description = "No more challenges today", body = ErrorBody),
        (status = 417, description = "Current challenge not complete", body = ErrorBody)
    )
)]
pub async fn next_challenge(
    State(state): State<SharedState>,
    headers: HeaderMap,
) -> Result<Json<GameStateResponse>, AppError> {
    let session_id = session_cookie(&headers);
    let payload = game_service::advance(&state, session_id.as_deref()).await?;
    Ok(Json(payload))
}

/// Extract the session id from the `Cookie` headers, if any.
fn session_cookie(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}

fn session_set_cookie(id: &str, secure: bool) -> Result<HeaderValue, AppError> {
    let mut cookie = format!(
        "{SESSION_COOKIE}={id}; Path=/; Max-Age={SESSION_MAX_AGE_SECS}; HttpOnly; SameSite=Lax"
    );
    if secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
        .map_err(|err| AppError::Internal(format!("invalid session cookie: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_cookie_is_found_among_others() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; session=abc123; lang=en"),
        );
        assert_eq!(session_cookie(&headers).as_deref(), Some("abc123"));
    }

    #[test]
    fn missing_or_empty_cookie_is_none() {
        let mut headers = HeaderMap::new();
        assert_eq!(session_cookie(&headers), None);

        headers.insert(header::COOKIE, HeaderValue::from_static("session=; other=1"));
        assert_eq!(session_cookie(&headers), None);

        headers.insert(header::COOKIE, HeaderValue::from_static("sessionx=abc"));
        assert_eq!(session_cookie(&headers), None);
    }

    #[test]
    fn set_cookie_carries_attributes() {
        let plain = session_set_cookie("abc", false).unwrap();
        assert_eq!(
            plain.to_str().unwrap(),
            "session=abc; Path=/; Max-Age=86400; HttpOnly; SameSite=Lax"
        );

        let secure = session_set_cookie("abc", true).unwrap();
        assert!(secure.to_str().unwrap().ends_with("; Secure"));
    }
}
