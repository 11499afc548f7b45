//! HTTP surface: the game, the storage health check and the OpenAPI browser.

use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{services::documentation::ApiDoc, state::SharedState};

/// `/game` routes.
pub mod game;
/// `/healthcheck` route.
pub mod health;

/// Every route tree, bound to the shared state.
///
/// Swagger UI is served under `/docs` and the raw document under `/api-doc/openapi.json`.
pub fn router(state: SharedState) -> Router<()> {
    let docs: Router<SharedState> = SwaggerUi::new("/docs")
        .url("/api-doc/openapi.json", ApiDoc::openapi())
        .into();

    Router::new()
        .merge(game::router())
        .merge(health::router())
        .merge(docs)
        .with_state(state)
}
