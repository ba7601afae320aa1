//! # parley-client
//!
//! Client-side state controller for Parley: an HTTP [`ApiClient`], an
//! explicit [`ChatStore`] cache and a [`Session`] that composes the two into
//! the flows a chat UI needs (login, conversations, reactions, threads,
//! search).

pub mod api;
pub mod error;
pub mod session;
pub mod state;

pub use api::{ApiClient, Attachment};
pub use error::{ClientError, Result};
pub use session::Session;
pub use state::{ChatStore, SearchHit};
