//! Error handling for the advisory core.
//!
//! One flat enum using thiserror; the web layer decides which variants leak
//! to clients and which collapse into a generic internal error.

use thiserror::Error;

/// Main error type for the advisory core.
#[derive(Error, Debug)]
pub enum AdvisorError {
    /// Connection or SQL execution failure in the storage engine. Never
    /// surfaced verbatim to clients.
    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),

    /// A comparator-prefixed filter value whose remainder is not numeric.
    /// Aborts the whole filter compile; no partial filter application.
    #[error("invalid filter value: {0}")]
    FilterParse(String),

    #[error("account or password incorrect")]
    InvalidCredentials,

    #[error("account already registered")]
    AccountExists,

    #[error("user not found")]
    UserNotFound,

    #[error("password hashing failed: {0}")]
    PasswordHash(#[from] bcrypt::BcryptError),

    #[error("token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),
}

pub type Result<T> = std::result::Result<T, AdvisorError>;
