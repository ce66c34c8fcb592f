//! Error types for the backup helper

use thiserror::Error;

/// Result type alias using the crate Error
pub type Result<T> = std::result::Result<T, Error>;

/// The two failure families callers care about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Notification credentials are missing or incomplete
    Authentication,

    /// Anything else: storage, network, process, serialization
    Operational,
}

/// Core error type shared by every crate in the workspace
#[derive(Error, Debug)]
pub enum Error {
    // Credential errors
    #[error("Authentication error: {message}")]
    Authentication { message: String },

    // Storage errors
    #[error("Storage error: {message}")]
    Storage { message: String },

    #[error("Storage path not found: {path}")]
    StoragePathNotFound { path: String },

    #[error("Invalid path: {path} ({reason})")]
    InvalidPath { path: String, reason: String },

    // Tabular data errors
    #[error("Invalid dataframe: {message}")]
    InvalidFrame { message: String },

    // Configuration errors
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    // External collaborators
    #[error("Command `{command}` failed: {message}")]
    Command { command: String, message: String },

    #[error("Notification error: {0}")]
    Notification(String),

    #[error("Spreadsheet error: {message}")]
    Spreadsheet { message: String },

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl Error {
    /// Classify this error into one of the two failure families
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Authentication { .. } => ErrorKind::Authentication,
            _ => ErrorKind::Operational,
        }
    }

    /// Returns true if this error was caused by missing credentials
    pub fn is_authentication(&self) -> bool {
        self.kind() == ErrorKind::Authentication
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<bincode::Error> for Error {
    fn from(e: bincode::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
