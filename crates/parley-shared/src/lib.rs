//! # parley-shared
//!
//! Types shared by the Parley server and client: the JSON view models that
//! travel over HTTP, user status vocabulary, and the identity derivation
//! helpers that both sides must agree on (DM channel names, avatar
//! conversation ids).

pub mod constants;
pub mod error;
pub mod identity;
pub mod protocol;
pub mod types;

pub use error::IdentityError;
pub use types::{MessageTarget, UserStatus};
