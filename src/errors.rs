//! Error types for the survey thumbnail

use std::fmt;

pub type Result<T> = std::result::Result<T, ThumbnailError>;

#[derive(Debug)]
pub enum ThumbnailError {
    /// HTTP request could not be completed
    Http(reqwest::Error),

    /// Service answered with a non-success status code
    Status { path: String, status: u16 },

    /// Response body was not the expected JSON shape
    Json(serde_json::Error),

    /// Request exceeded the configured timeout
    Timeout(String),

    /// Configuration error
    Config(String),

    /// Writing rendered output failed
    Io(std::io::Error),

    /// `init` was called on a widget that already has an API handler
    AlreadyInitialized,

    /// Operation needs an API handler but `init` was never called
    NotInitialized,
}

impl ThumbnailError {
    /// Short, stable name of the error kind for log fields
    pub fn kind(&self) -> &'static str {
        match self {
            ThumbnailError::Http(_) => "http",
            ThumbnailError::Status { .. } => "status",
            ThumbnailError::Json(_) => "json",
            ThumbnailError::Timeout(_) => "timeout",
            ThumbnailError::Config(_) => "config",
            ThumbnailError::Io(_) => "io",
            ThumbnailError::AlreadyInitialized => "already_initialized",
            ThumbnailError::NotInitialized => "not_initialized",
        }
    }
}

impl fmt::Display for ThumbnailError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ThumbnailError::Http(err) => write!(f, "HTTP error: {}", err),
            ThumbnailError::Status { path, status } => {
                write!(f, "Request to {} failed with status {}", path, status)
            }
            ThumbnailError::Json(err) => write!(f, "JSON error: {}", err),
            ThumbnailError::Timeout(path) => write!(f, "Request to {} timed out", path),
            ThumbnailError::Config(msg) => write!(f, "Configuration error: {}", msg),
            ThumbnailError::Io(err) => write!(f, "IO error: {}", err),
            ThumbnailError::AlreadyInitialized => write!(f, "Thumbnail is already initialized"),
            ThumbnailError::NotInitialized => write!(f, "Thumbnail has not been initialized"),
        }
    }
}

impl std::error::Error for ThumbnailError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ThumbnailError::Http(err) => Some(err),
            ThumbnailError::Json(err) => Some(err),
            ThumbnailError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ThumbnailError {
    fn from(err: reqwest::Error) -> Self {
        ThumbnailError::Http(err)
    }
}

impl From<serde_json::Error> for ThumbnailError {
    fn from(err: serde_json::Error) -> Self {
        ThumbnailError::Json(err)
    }
}

impl From<std::io::Error> for ThumbnailError {
    fn from(err: std::io::Error) -> Self {
        ThumbnailError::Io(err)
    }
}
