//! Error types for notepad-core

use thiserror::Error;

/// Result type alias using notepad-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in notepad-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// HTTP transport error
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success response from the note service
    #[error("{message} ({status})")]
    Api { status: u16, message: String },

    /// Note or shared note not found
    #[error("Note not found: {0}")]
    NotFound(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Local storage error
    #[error("Storage error: {0}")]
    Storage(String),

    /// SQLite error
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// No speech capability was provided to the session
    #[error("Dictation is not supported in this environment")]
    DictationUnsupported,

    /// The buffer did not reach the server, so a dependent action was skipped
    #[error("Note not saved: {0}")]
    NotSaved(String),

    /// The editor session was closed (for example after deleting the note)
    #[error("Editor session is closed")]
    SessionClosed,
}

impl Error {
    /// Whether the error means the requested record does not exist.
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::Api { status: 404, .. })
    }
}
