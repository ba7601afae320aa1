//! # parley-server
//!
//! HTTP backend for the Parley team chat.
//!
//! This crate provides:
//! - **REST API** (axum) for channels, direct messages, messages, reactions,
//!   threads, users and file uploads
//! - **Blob storage** behind the [`blob_store::BlobStore`] trait, with a
//!   content-addressed filesystem implementation
//! - **Default avatars** fetched from a generator or rendered locally
//! - **Per-IP rate limiting** to protect against abuse

pub mod api;
pub mod avatar;
pub mod blob_store;
pub mod config;
pub mod error;
pub mod rate_limit;
pub mod views;

pub use api::{build_router, serve, serve_listener, AppState};
pub use config::ServerConfig;
pub use error::ServerError;
