use utoipa::OpenApi;

#[derive(OpenApi)]
/// OpenAPI document of the words-weave backend.
#[openapi(
    info(
        title = "words-weave",
        description = "Daily quote-guessing game: steer a text generator until it reveals the hidden quote."
    ),
    paths(
        crate::routes::health::healthcheck,
        crate::routes::game::get_game,
        crate::routes::game::post_guess,
        crate::routes::game::next_challenge,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::health::HealthStatus,
            crate::dto::game::GameStateResponse,
            crate::dto::game::GuessRequest,
            crate::error::ErrorBody,
        )
    ),
    tags(
        (name = "health", description = "Snapshot storage status"),
        (name = "game", description = "Daily challenge gameplay"),
    )
)]
/// OpenAPI document of every public route.
pub struct ApiDoc;
