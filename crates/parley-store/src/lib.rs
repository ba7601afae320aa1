//! # parley-store
//!
//! Relational storage for the Parley chat server, backed by SQLite.
//!
//! The crate exposes a synchronous `Database` handle that wraps a
//! `rusqlite::Connection` and provides typed CRUD helpers for users,
//! channels, messages, reactions, threads and file records. Uniqueness that
//! the chat semantics depend on (one reaction per user/message/emoji, one
//! thread per message, one DM channel per user pair) is enforced by unique
//! indexes rather than by callers.

pub mod channels;
pub mod database;
pub mod dm_pairs;
pub mod files;
pub mod messages;
pub mod migrations;
pub mod models;
pub mod reactions;
pub mod threads;
pub mod users;

mod error;
mod sql;

pub use database::Database;
pub use error::{missing, Result, StoreError};
pub use models::*;
