use thiserror::Error;

/// Errors produced by the store layer.
#[derive(Error, Debug)]
pub enum StoreError {
    /// SQLite error.
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Failed to determine a platform data directory.
    #[error("Could not determine application data directory")]
    NoDataDir,

    /// Generic I/O error (e.g. creating the database directory).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A query expected exactly one row but found none.
    #[error("Record not found")]
    NotFound,

    /// A referenced row (user, channel, message, file) does not exist.
    #[error("{0} not found")]
    MissingReference(&'static str),

    /// Migration failure.
    #[error("Migration error: {0}")]
    Migration(String),

    /// A stored value could not be interpreted.
    #[error("Corrupt record: {0}")]
    Corrupt(String),
}

impl StoreError {
    /// Whether this error means "the thing you asked for does not exist".
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound | Self::MissingReference(_))
    }
}

/// Report a plain [`StoreError::NotFound`] as the named missing entity,
/// e.g. `db.get_user(id).map_err(missing("User"))`.
pub fn missing(what: &'static str) -> impl Fn(StoreError) -> StoreError {
    move |e| match e {
        StoreError::NotFound => StoreError::MissingReference(what),
        other => other,
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_names_only_plain_not_found() {
        assert!(matches!(
            missing("User")(StoreError::NotFound),
            StoreError::MissingReference("User")
        ));
        assert!(matches!(
            missing("User")(StoreError::Corrupt("x".into())),
            StoreError::Corrupt(_)
        ));
    }
}
