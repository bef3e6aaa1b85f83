//! HTTP host for the Conclave chat pipeline.
//!
//! # Endpoints
//!
//! - `GET /health` - Health check with the configured models
//! - `POST /chat` - Run one chat turn (also served at `POST /api/v1/chat`)
//! - `GET /` - Chat UI
//! - `GET /static/*` - UI assets
//!
//! Request bodies are capped (1 MiB by default) and CORS origins are
//! configurable.

pub mod routes;
pub mod state;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::HeaderValue;
use axum::routing::{get, post};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

pub use state::AppState;

pub const DEFAULT_BODY_LIMIT: usize = 1024 * 1024;

/// Assets shipped with this crate.
pub fn default_static_dir() -> PathBuf {
    PathBuf::from(concat!(env!("CARGO_MANIFEST_DIR"), "/static"))
}

#[derive(Debug, Clone)]
pub struct ServerOptions {
    /// `None` or a `*` entry allows any origin.
    pub cors_origins: Option<Vec<String>>,
    pub static_dir: PathBuf,
    pub body_limit: usize,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            cors_origins: None,
            static_dir: default_static_dir(),
            body_limit: DEFAULT_BODY_LIMIT,
        }
    }
}

fn cors_layer(origins: Option<&[String]>) -> CorsLayer {
    let base = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    let Some(origins) = origins.filter(|o| !o.iter().any(|s| s == "*")) else {
        return base.allow_origin(Any);
    };

    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    base.allow_origin(AllowOrigin::list(parsed))
}

/// Create the API router with all routes configured.
pub fn create_router(state: Arc<AppState>, options: &ServerOptions) -> Router {
    let index = options.static_dir.join("index.html");

    Router::new()
        .route("/health", get(routes::health))
        .route("/chat", post(routes::chat))
        .route("/api/v1/chat", post(routes::chat))
        .route_service("/", ServeFile::new(index))
        .nest_service("/static", ServeDir::new(&options.static_dir))
        .layer(DefaultBodyLimit::max(options.body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(options.cors_origins.as_deref()))
        .with_state(state)
}

/// Bind `addr` and serve until the process is stopped.
pub async fn serve(
    state: Arc<AppState>,
    addr: SocketAddr,
    options: ServerOptions,
) -> anyhow::Result<()> {
    if !options.static_dir.is_dir() {
        warn!(
            static_dir = %options.static_dir.display(),
            "Static directory not found; the chat UI will not be served"
        );
    }

    let router = create_router(state, &options);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!(%addr, "Starting Conclave server");

    axum::serve(listener, router).await?;

    Ok(())
}
