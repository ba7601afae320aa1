use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdentityError {
    #[error("Participant name must not be empty")]
    EmptyName,

    #[error("Not a direct-message channel: {0}")]
    NotDmChannel(String),

    #[error("Unknown user status: {0}")]
    UnknownStatus(String),
}
