use rusqlite::ErrorCode;
use thiserror::Error;

/// Errors raised by the data-access layer.
///
/// The layer never decides on HTTP semantics; callers match on the variant
/// to pick a response.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("invalid database url '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// No connection could be established. Fatal for the caller, never retried.
    #[error("database connection failed: {0}")]
    Connection(String),

    /// Uniqueness or foreign-key violation. The transaction has been rolled back.
    #[error("constraint violation: {message}")]
    Constraint { message: String },

    #[error("{message}")]
    NotFound { message: String },

    #[error("session is closed")]
    SessionClosed,

    #[error("no active request context")]
    NoRequestContext,

    #[error("migration failed: {0}")]
    Migration(String),

    #[error("database error: {0}")]
    Sqlite(rusqlite::Error),
}

impl DbError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    pub fn is_constraint(&self) -> bool {
        matches!(self, Self::Constraint { .. })
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::SqliteFailure(code, message)
                if code.code == ErrorCode::ConstraintViolation =>
            {
                Self::Constraint {
                    message: message.unwrap_or_else(|| code.to_string()),
                }
            }
            rusqlite::Error::SqliteFailure(code, message)
                if code.code == ErrorCode::CannotOpen =>
            {
                Self::Connection(message.unwrap_or_else(|| code.to_string()))
            }
            other => Self::Sqlite(other),
        }
    }
}

impl From<r2d2::Error> for DbError {
    fn from(err: r2d2::Error) -> Self {
        Self::Connection(err.to_string())
    }
}
