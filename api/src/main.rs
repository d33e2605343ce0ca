/// Relay API Server
///
/// Thin proxy between the browser control UI and the video platform:
/// issues sessions and tokens, forwards archive and experience composer
/// calls, and unpacks individual-stream archive bundles for playback.
mod auth;
mod config;
mod facts;
mod platform;
mod routes;

use std::path::Path;
use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;
use tracing::info;

use relay_shared::correlation::RenderArchiveMap;
use relay_shared::extract::{BundleExtractor, HttpFetcher, STATIC_PREFIX};

use crate::auth::Credentials;
use crate::config::Config;
use crate::platform::PlatformClient;

/// Shared application state for all API handlers.
pub struct AppState {
    pub platform: PlatformClient,
    pub renders: RenderArchiveMap,
    pub extractor: BundleExtractor,
}

/// Build the full router: API routes, extracted media, and the UI bundle.
pub fn build_router(state: Arc<AppState>, frontend_dir: &Path) -> Router {
    // CORS
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let extracted = ServeDir::new(state.extractor.root());
    let frontend = ServeDir::new(frontend_dir)
        .fallback(ServeFile::new(frontend_dir.join("index.html")));

    Router::new()
        .route("/_/health", get(routes::liveness))
        .route("/health", get(routes::health))
        // Sessions
        .route("/sessions", post(routes::create_session))
        .route("/sessions/:session_id/tokens", post(routes::create_token))
        // Archives
        .route("/archives", get(routes::list_archives))
        .route("/archives/start/audio-only", post(routes::start_audio_only))
        .route("/archives/start/composed", post(routes::start_composed))
        .route("/archives/start/individual", post(routes::start_individual))
        .route("/archives/extract", post(routes::extract_archive))
        .route("/archives/:archive_id/stop", post(routes::stop_archive))
        // Experience composer
        .route("/composer/start", post(routes::start_composer))
        .route("/composer/:render_id/stop", post(routes::stop_composer))
        .nest_service(STATIC_PREFIX, extracted)
        .fallback_service(frontend)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env
    dotenvy::dotenv().ok();

    // Init tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "relay_api=info,relay_shared=info,tower_http=info".into()),
        )
        .init();

    let config = Config::from_env()?;

    tokio::fs::create_dir_all(&config.extracted_dir).await?;
    info!("Extracting bundles into {}", config.extracted_dir.display());

    let credentials = Credentials::new(&config.api_key, &config.api_secret);
    let platform = PlatformClient::new(&config.api_url, credentials, config.upstream_timeout)?;
    let fetcher = HttpFetcher::new(config.fetch_timeout)?;

    // App state
    let state = Arc::new(AppState {
        platform,
        renders: RenderArchiveMap::new(),
        extractor: BundleExtractor::new(&config.extracted_dir, Arc::new(fetcher)),
    });

    let app = build_router(state, &config.frontend_dir);

    // Bind
    let addr = config.bind_addr();
    info!("Relay API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
