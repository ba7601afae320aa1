use parley_shared::IdentityError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    /// Transport failure or undecodable response.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("Server responded {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Not logged in")]
    NotLoggedIn,

    #[error("No conversation is open")]
    NoConversation,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Identity(#[from] IdentityError),
}

impl ClientError {
    /// HTTP status of an API error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
