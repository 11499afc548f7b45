//! words-weave-back binary entrypoint wiring the game routes, rotation and snapshot storage.

use std::{env, net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use words_weave_back::{
    config::AppConfig,
    dao::{
        generator::{OpenAiGenerator, TextGenerator},
        quotes::QuotesClient,
        snapshot_store::{SnapshotStore, memory::MemorySnapshotStore},
        storage::StorageError,
    },
    routes,
    services::{
        archive_service,
        challenge_source::{BuiltinChallengeSource, ChallengeSource, RemoteChallengeSource},
        rotation,
        storage_supervisor::{self, SupervisorPolicy},
    },
    state::{AppState, SharedState, challenge::Catalog},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::load();

    let generator: Arc<dyn TextGenerator> = Arc::new(
        OpenAiGenerator::new(config.generator.clone()).context("building text generator")?,
    );
    let quotes = QuotesClient::new(config.quotes_url.clone()).context("building quotes client")?;
    let remote: Arc<dyn ChallengeSource> = Arc::new(RemoteChallengeSource::new(
        quotes,
        generator.clone(),
        config.generator.seed_prompt.clone(),
    ));

    let challenges = rotation::initial_challenges(
        remote.clone(),
        Arc::new(BuiltinChallengeSource),
        config.daily_challenges,
    )
    .await
    .context("loading initial challenges")?;
    let catalog =
        Catalog::new(config.daily_challenges, challenges).context("building challenge catalog")?;

    let app_state = AppState::new(config, catalog, generator, remote);

    start_snapshot_store(app_state.clone()).await;
    tokio::spawn(archive_initial_batch(app_state.clone()));
    tokio::spawn(rotation::run(app_state.clone()));

    let app = build_router(app_state);

    let port = env::var("PORT")
        .or_else(|_| env::var("SERVER_PORT"))
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8080);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(%addr, "starting server");

    let listener = TcpListener::bind(addr).await.context("binding server")?;
    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving axum")?;

    Ok(())
}

/// Pick the snapshot backend from `SNAPSHOT_STORE` (`memory`, `couch` or `mongo`).
///
/// Without the variable CouchDB is used when `COUCH_BASE_URL` is set, MongoDB otherwise.
async fn start_snapshot_store(state: SharedState) {
    let requested = env::var("SNAPSHOT_STORE").ok();
    let backend = requested.as_deref().unwrap_or_else(|| {
        if env::var_os("COUCH_BASE_URL").is_some() {
            "couch"
        } else {
            "mongo"
        }
    });

    match backend {
        "memory" => {
            info!("using in-memory snapshot store");
            state
                .set_snapshot_store(Arc::new(MemorySnapshotStore::new()))
                .await;
        }
        #[cfg(feature = "couch-store")]
        "couch" => {
            tokio::spawn(storage_supervisor::run(
                state,
                SupervisorPolicy::default(),
                connect_couch,
            ));
        }
        #[cfg(feature = "mongo-store")]
        "mongo" => {
            tokio::spawn(storage_supervisor::run(
                state,
                SupervisorPolicy::default(),
                connect_mongo,
            ));
        }
        other => {
            warn!(backend = other, "snapshot backend unavailable in this build; keeping snapshots in memory");
            state
                .set_snapshot_store(Arc::new(MemorySnapshotStore::new()))
                .await;
        }
    }
}

#[cfg(feature = "couch-store")]
async fn connect_couch() -> Result<Arc<dyn SnapshotStore>, StorageError> {
    use words_weave_back::dao::snapshot_store::couchdb::{CouchConfig, CouchSnapshotStore};

    let config = CouchConfig::from_env()?;
    let store = CouchSnapshotStore::connect(config).await?;
    Ok(Arc::new(store))
}

#[cfg(feature = "mongo-store")]
async fn connect_mongo() -> Result<Arc<dyn SnapshotStore>, StorageError> {
    use words_weave_back::dao::snapshot_store::mongodb::{MongoConfig, MongoSnapshotStore};

    let config = MongoConfig::from_env().await?;
    let store = MongoSnapshotStore::connect(config).await?;
    Ok(Arc::new(store))
}

/// Record the startup batch once a snapshot store becomes available.
async fn archive_initial_batch(state: SharedState) {
    let mut degraded = state.degraded_watcher();
    let connected = degraded.wait_for(|degraded| !*degraded).await.is_ok();
    if !connected {
        return;
    }
    let catalog = state.catalog().current().await;
    if let Err(err) = archive_service::archive_batch(&state, &catalog).await {
        warn!(error = %err, "failed to archive startup challenge batch");
    }
}

/// Build the top-level router and attach cross-cutting middleware layers.
fn build_router(state: SharedState) -> Router<()> {
    routes::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Configure tracing subscribers so logs include spans by default.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=debug".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Wait for Ctrl+C or SIGTERM and shut the server down gracefully.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = term.recv() => {},
                }
            }
            Err(err) => {
                warn!(error = %err, "failed to install SIGTERM handler; waiting for Ctrl+C only");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
