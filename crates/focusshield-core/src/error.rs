//! Core error types for focusshield-core.
//!
//! Every failure mode in this library degrades a feature (shielding,
//! history, persistence) rather than aborting the session. The error
//! hierarchy reflects that: callers propagate `PersistenceError` and
//! `BlockingError` where the outcome matters, and the timer service
//! logs and swallows them where it does not.

use std::path::PathBuf;
use thiserror::Error;

/// Umbrella error type for focusshield-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Preference-store read or write failed
    #[error("persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    /// App-shielding gateway call failed
    #[error("blocking error: {0}")]
    Blocking(#[from] BlockingError),

    /// Configuration rejected by validation
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Errors from the app-shielding gateway.
///
/// None of these are fatal to a session: the timer service degrades to
/// an unshielded session and keeps counting.
#[derive(Error, Debug)]
pub enum BlockingError {
    /// The platform has not granted app-shielding authorization.
    #[error("app-shielding permission denied")]
    PermissionDenied,

    /// The gateway call itself failed.
    #[error("shielding gateway failure: {0}")]
    Gateway(String),
}

/// Errors from the key-value preference store.
#[derive(Error, Debug)]
pub enum PersistenceError {
    /// The data directory could not be determined or created.
    #[error("data directory unavailable at {path}: {source}")]
    DataDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Read or write of a stored key failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A stored value could not be encoded or decoded.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration validation errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A field holds a value the timer cannot work with.
    #[error("invalid value for '{field}': {message}")]
    InvalidValue {
        field: &'static str,
        message: String,
    },
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
