//! Server configuration loaded from environment variables.
//!
//! All settings have sensible defaults so the server can start with zero
//! configuration for local development.

use std::net::SocketAddr;
use std::path::PathBuf;

use parley_shared::constants::{DEFAULT_HTTP_PORT, MAX_FILE_SIZE};

/// Default-avatar generator queried with `?seed=<name>`.
pub const DEFAULT_AVATAR_GENERATOR_URL: &str = "https://api.dicebear.com/6.x/initials/svg";

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Socket address for the HTTP (axum) API server.
    /// Env: `HTTP_ADDR`
    /// Default: `0.0.0.0:8080`
    pub http_addr: SocketAddr,

    /// SQLite database file.
    /// Env: `DATABASE_PATH`
    /// Default: `None`, meaning the platform data directory.
    pub database_path: Option<PathBuf>,

    /// Filesystem path where uploaded blobs are stored.
    /// Env: `BLOB_STORAGE_PATH`
    /// Default: `./blobs`
    pub blob_storage_path: PathBuf,

    /// Upload limit in bytes, applied to every upload entry point.
    /// Env: `MAX_FILE_SIZE`
    /// Default: 5 MiB
    pub max_file_size: usize,

    /// Remote default-avatar generator. `None` renders avatars locally.
    /// Env: `AVATAR_GENERATOR_URL` (empty or `off` disables)
    pub avatar_generator_url: Option<String>,

    /// Sustained requests per second allowed per client IP.
    /// Env: `RATE_LIMIT_PER_SEC`
    /// Default: `20`
    pub rate_limit_per_sec: f64,

    /// Burst capacity of the per-IP token bucket.
    /// Env: `RATE_LIMIT_BURST`
    /// Default: `60`
    pub rate_limit_burst: f64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: ([0, 0, 0, 0], DEFAULT_HTTP_PORT).into(),
            database_path: None,
            blob_storage_path: PathBuf::from("./blobs"),
            max_file_size: MAX_FILE_SIZE,
            avatar_generator_url: Some(DEFAULT_AVATAR_GENERATOR_URL.to_string()),
            rate_limit_per_sec: 20.0,
            rate_limit_burst: 60.0,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`ServerConfig::from_env`] with an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(addr) = lookup("HTTP_ADDR") {
            match addr.parse::<SocketAddr>() {
                Ok(parsed) => config.http_addr = parsed,
                Err(_) => tracing::warn!(value = %addr, "Invalid HTTP_ADDR, using default"),
            }
        }

        if let Some(path) = lookup("DATABASE_PATH").filter(|p| !p.is_empty()) {
            config.database_path = Some(PathBuf::from(path));
        }

        if let Some(path) = lookup("BLOB_STORAGE_PATH").filter(|p| !p.is_empty()) {
            config.blob_storage_path = PathBuf::from(path);
        }

        if let Some(val) = lookup("MAX_FILE_SIZE") {
            match val.parse::<usize>() {
                Ok(n) if n > 0 => config.max_file_size = n,
                _ => tracing::warn!(value = %val, "Invalid MAX_FILE_SIZE, using default"),
            }
        }

        if let Some(url) = lookup("AVATAR_GENERATOR_URL") {
            let url = url.trim();
            config.avatar_generator_url = if url.is_empty() || url.eq_ignore_ascii_case("off") {
                None
            } else {
                Some(url.to_string())
            };
        }

        if let Some(val) = lookup("RATE_LIMIT_PER_SEC") {
            match val.parse::<f64>() {
                Ok(n) if n > 0.0 => config.rate_limit_per_sec = n,
                _ => tracing::warn!(value = %val, "Invalid RATE_LIMIT_PER_SEC, using default"),
            }
        }

        if let Some(val) = lookup("RATE_LIMIT_BURST") {
            match val.parse::<f64>() {
                Ok(n) if n >= 1.0 => config.rate_limit_burst = n,
                _ => tracing::warn!(value = %val, "Invalid RATE_LIMIT_BURST, using default"),
            }
        }

        // RUST_LOG is handled directly by tracing-subscriber's EnvFilter,
        // so we do not store it here.

        config
    }
}
