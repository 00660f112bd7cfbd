//! Error types module
//!
//! All fallible operations in the workspace surface an [`AppError`]. Faults reported
//! by the social platform client are typed separately as [`PlatformError`] because the
//! resolver and the reply step branch on their kind (ban, rate limit, stale object graph).
//!
//! `From<sqlx::Error>` is gated behind the `sqlx` feature so crates that never touch the
//! database do not pull sqlx in.

use std::io;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like unusable requests
    Debug,
    /// Warning level - for recoverable issues like flaky upload hosts
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Metadata describing how an error should be classified and reported
pub trait ErrorMetadata {
    /// Machine-readable error code (e.g., "DATABASE_ERROR")
    fn error_code(&self) -> &'static str;

    /// Whether the request that produced this error can be retried later
    fn is_recoverable(&self) -> bool;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

/// Faults surfaced by the platform client.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlatformError {
    /// The account is not allowed to act here (usually banned from the community).
    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// The client's object graph is too deep or inconsistent to keep walking.
    #[error("Structural fault: {0}")]
    Structural(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Platform error: {0}")]
    Other(String),
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(String),

    #[error(transparent)]
    Platform(#[from] PlatformError),

    #[error("Media fetch error: {0}")]
    Fetch(String),

    #[error("Media probe error: {0}")]
    Probe(String),

    #[error("Media transform error: {0}")]
    Transform(String),

    #[error("Upload host error: {0}")]
    UploadHost(String),

    #[error("Queue error: {0}")]
    Queue(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Record already exists: {0}")]
    AlreadyExists(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Internal error with source")]
    InternalWithSource {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

#[cfg(feature = "sqlx")]
impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Database(err.to_string())
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::InternalWithSource {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<io::Error> for AppError {
    fn from(err: io::Error) -> Self {
        AppError::Internal(format!("IO error: {}", err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::InvalidInput(format!("JSON parsing error: {}", err))
    }
}

/// Static metadata for each variant: (error_code, recoverable, log_level).
fn app_error_static_metadata(err: &AppError) -> (&'static str, bool, LogLevel) {
    match err {
        AppError::Database(_) => ("DATABASE_ERROR", true, LogLevel::Error),
        AppError::Platform(PlatformError::Forbidden(_)) => {
            ("PLATFORM_FORBIDDEN", false, LogLevel::Warn)
        }
        AppError::Platform(PlatformError::RateLimited(_)) => {
            ("PLATFORM_RATE_LIMITED", true, LogLevel::Warn)
        }
        AppError::Platform(PlatformError::Structural(_)) => {
            ("PLATFORM_STRUCTURAL", false, LogLevel::Warn)
        }
        AppError::Platform(PlatformError::NotFound(_)) => {
            ("PLATFORM_NOT_FOUND", false, LogLevel::Debug)
        }
        AppError::Platform(PlatformError::Other(_)) => ("PLATFORM_ERROR", true, LogLevel::Error),
        AppError::Fetch(_) => ("FETCH_ERROR", true, LogLevel::Warn),
        AppError::Probe(_) => ("PROBE_ERROR", false, LogLevel::Warn),
        AppError::Transform(_) => ("TRANSFORM_ERROR", true, LogLevel::Error),
        AppError::UploadHost(_) => ("UPLOAD_HOST_ERROR", true, LogLevel::Warn),
        AppError::Queue(_) => ("QUEUE_ERROR", true, LogLevel::Error),
        AppError::Config(_) => ("CONFIG_ERROR", false, LogLevel::Error),
        AppError::InvalidInput(_) => ("INVALID_INPUT", false, LogLevel::Debug),
        AppError::AlreadyExists(_) => ("ALREADY_EXISTS", false, LogLevel::Warn),
        AppError::Internal(_) => ("INTERNAL_ERROR", true, LogLevel::Error),
        AppError::InternalWithSource { .. } => ("INTERNAL_ERROR", true, LogLevel::Error),
    }
}

impl ErrorMetadata for AppError {
    fn error_code(&self) -> &'static str {
        app_error_static_metadata(self).0
    }

    fn is_recoverable(&self) -> bool {
        app_error_static_metadata(self).1
    }

    fn log_level(&self) -> LogLevel {
        app_error_static_metadata(self).2
    }
}
