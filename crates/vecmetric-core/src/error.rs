//! Shared error type across vecmetric crates.

use thiserror::Error;

/// Stable error categories (safe to match on or print in logs).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Vector declared more label keys than allowed.
    TooManyLabels,
    /// A vector with the same name is already registered.
    DuplicateName,
    /// Malformed name, bucket, delta or label tuple.
    InvalidArgument,
    /// Exposition handler could not be attached.
    HandlerBuildFailure,
    /// Exporter could not bind or its serve loop failed.
    ListenFailure,
    /// Exporter already starting or listening.
    AlreadyRunning,
    /// Configuration could not be parsed or validated.
    InvalidConfig,
    /// Internal failure.
    Internal,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::TooManyLabels => "TOO_MANY_LABELS",
            ErrorKind::DuplicateName => "DUPLICATE_NAME",
            ErrorKind::InvalidArgument => "INVALID_ARGUMENT",
            ErrorKind::HandlerBuildFailure => "HANDLER_BUILD_FAILURE",
            ErrorKind::ListenFailure => "LISTEN_FAILURE",
            ErrorKind::AlreadyRunning => "ALREADY_RUNNING",
            ErrorKind::InvalidConfig => "INVALID_CONFIG",
            ErrorKind::Internal => "INTERNAL",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, MetricError>;

/// Unified error type used by core and exporter.
#[derive(Debug, Error)]
pub enum MetricError {
    #[error("too many labels for {name}: {count} > {max}")]
    TooManyLabels { name: String, count: usize, max: usize },
    #[error("duplicate metric name: {0}")]
    DuplicateName(String),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("build metric handler failed: {0}")]
    HandlerBuildFailure(String),
    #[error("exporter at {addr} (path {path}) failed: {reason}")]
    ListenFailure {
        addr: String,
        path: String,
        reason: String,
    },
    #[error("exporter already running at {0}")]
    AlreadyRunning(String),
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    #[error("internal: {0}")]
    Internal(String),
}

impl MetricError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            MetricError::TooManyLabels { .. } => ErrorKind::TooManyLabels,
            MetricError::DuplicateName(_) => ErrorKind::DuplicateName,
            MetricError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            MetricError::HandlerBuildFailure(_) => ErrorKind::HandlerBuildFailure,
            MetricError::ListenFailure { .. } => ErrorKind::ListenFailure,
            MetricError::AlreadyRunning(_) => ErrorKind::AlreadyRunning,
            MetricError::InvalidConfig(_) => ErrorKind::InvalidConfig,
            MetricError::Internal(_) => ErrorKind::Internal,
        }
    }
}
