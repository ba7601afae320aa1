//! HTTP API: shared state, router and the helpers every handler uses.

mod channels;
mod dm_pairs;
mod files;
mod messages;
mod reactions;
mod threads;
mod upload;
mod users;

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::{
    extract::DefaultBodyLimit,
    http::Method,
    middleware,
    routing::{get, post},
    Json, Router,
};
use parley_shared::protocol::HealthResponse;
use parley_store::Database;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use uuid::Uuid;

use crate::avatar::AvatarGenerator;
use crate::blob_store::{BlobStore, FsBlobStore};
use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::rate_limit::{throttle, RateLimiter};

/// Multipart framing allowance on top of the upload limit.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

#[derive(Clone)]
pub struct AppState {
    /// One connection; locked for the duration of a single store call.
    pub db: Arc<Mutex<Database>>,
    pub blob_store: Arc<dyn BlobStore>,
    pub avatars: Arc<AvatarGenerator>,
    pub rate_limiter: RateLimiter,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    /// Open the database and blob store named by `config`.
    pub async fn from_config(config: ServerConfig) -> Result<Self, ServerError> {
        let db = match &config.database_path {
            Some(path) => {
                if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
                    std::fs::create_dir_all(dir).map_err(|e| {
                        ServerError::Internal(format!(
                            "Failed to create database directory '{}': {e}",
                            dir.display()
                        ))
                    })?;
                }
                info!(path = %path.display(), "opening database");
                Database::open_at(path)?
            }
            None => Database::new()?,
        };

        let blob_store = FsBlobStore::new(config.blob_storage_path.clone()).await?;

        Ok(Self {
            db: Arc::new(Mutex::new(db)),
            blob_store: Arc::new(blob_store),
            avatars: Arc::new(AvatarGenerator::new(config.avatar_generator_url.clone())),
            rate_limiter: RateLimiter::from_config(&config),
            config: Arc::new(config),
        })
    }

    /// Run `f` against the database. Never call this across an `.await`.
    pub fn with_db<T>(
        &self,
        f: impl FnOnce(&Database) -> parley_store::Result<T>,
    ) -> Result<T, ServerError> {
        let db = self
            .db
            .lock()
            .map_err(|_| ServerError::Internal("database lock poisoned".to_string()))?;
        f(&db).map_err(ServerError::from)
    }
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::OPTIONS])
        .allow_headers(Any);

    // Oversized uploads must reach the handler so they get the JSON 400.
    let body_limit = state
        .config
        .max_file_size
        .saturating_mul(2)
        .saturating_add(MULTIPART_OVERHEAD);

    Router::new()
        .route("/health", get(health_check))
        .route("/channels", get(channels::list).post(channels::create))
        .route("/dm-pairs", get(dm_pairs::list).post(dm_pairs::open))
        .route("/messages", get(messages::list).post(messages::create))
        .route("/reactions", post(reactions::toggle))
        .route("/threads", get(threads::list).post(threads::reply))
        .route(
            "/users",
            get(users::list)
                .post(users::create)
                .patch(users::update_status),
        )
        .route("/users/upload", post(users::upload_profile_image))
        .route("/files/upload", post(files::upload))
        .route("/files/:id", get(files::download))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(middleware::from_fn_with_state(
            state.rate_limiter.clone(),
            throttle,
        ))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

pub async fn serve(state: AppState, addr: SocketAddr) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    serve_listener(state, listener).await
}

/// Serve on an already bound listener (port 0 in tests).
pub async fn serve_listener(state: AppState, listener: TcpListener) -> anyhow::Result<()> {
    let app = build_router(state);

    info!(addr = %listener.local_addr()?, "Starting HTTP API server");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

/// `None` for absent or blank input, otherwise the trimmed value.
pub(crate) fn non_blank(raw: Option<String>) -> Option<String> {
    raw.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

/// Parse a required UUID field; missing and malformed are both 400.
pub(crate) fn parse_id(raw: Option<&str>, field: &str) -> Result<Uuid, ServerError> {
    parse_opt_id(raw, field)?.ok_or_else(|| ServerError::BadRequest(format!("{field} is required")))
}

pub(crate) fn parse_opt_id(raw: Option<&str>, field: &str) -> Result<Option<Uuid>, ServerError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(s) => Uuid::parse_str(s)
            .map(Some)
            .map_err(|_| ServerError::BadRequest(format!("Invalid {field}: {s}"))),
    }
}
