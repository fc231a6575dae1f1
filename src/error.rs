//! Crate-wide error type.

use thiserror::Error;

/// Errors surfaced by the supply orchestration engine.
#[derive(Error, Debug)]
pub enum Error {
    #[error("input error: {0}")]
    Input(String),

    #[error("operation cancelled")]
    Cancelled,

    #[error("credential revoked: {0}")]
    CredentialRevoked(String),

    #[error("draft expired")]
    DraftExpired,

    #[error("draft invalid: {0}")]
    DraftInvalid(String),

    #[error("draft retry cap exceeded after {0} attempts")]
    DraftRetriesExhausted(u32),

    #[error("marketplace error: {0}")]
    Marketplace(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("database error: {0}")]
    Database(String),

    #[error("connection pool error: {0}")]
    Connection(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// True for errors that must unwind the runner instead of being absorbed
    /// by the state machine (cancellation and credential revocation).
    #[must_use]
    pub fn is_fatal_to_runner(&self) -> bool {
        matches!(self, Error::Cancelled | Error::CredentialRevoked(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
