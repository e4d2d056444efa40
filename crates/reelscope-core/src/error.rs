//! Error types module
//!
//! Two layers of errors flow through the pipeline:
//!
//! - [`RemoteError`] is what a single remote operation returns. It carries
//!   enough detail to decide whether the call may be repeated.
//! - [`JobError`] is a classified failure of a pipeline stage. Every failure
//!   the caller can observe is a `JobError` whose [`ErrorKind`] decides how the
//!   orchestrator reacts to it.

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::io;

use serde::{Deserialize, Serialize};

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like validation failures
    Debug,
    /// Warning level - for degraded but recoverable outcomes
    Warn,
    /// Error level - for failures that abort a job
    Error,
}

/// Classification of a pipeline failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Network or service error talking to the remote service.
    TransientTransport,
    /// The remote service reported that it could not prepare the asset.
    RemoteProcessingFailed,
    /// The asset did not become ready within the polling budget.
    Timeout,
    /// The analysis call returned no usable text.
    EmptyResponse,
    /// The local media could not be decoded into a frame.
    DecodeFailure,
    /// Local file could not be read, written or removed.
    LocalIOFailure,
    /// The input was rejected, either locally or by the remote service.
    InvalidInput,
    /// Unexpected fault inside the pipeline.
    Internal,
}

/// Static metadata for each kind: (error_code, recoverable, log_level).
fn error_kind_static_metadata(kind: ErrorKind) -> (&'static str, bool, LogLevel) {
    match kind {
        ErrorKind::TransientTransport => ("TRANSIENT_TRANSPORT", true, LogLevel::Error),
        ErrorKind::RemoteProcessingFailed => ("REMOTE_PROCESSING_FAILED", false, LogLevel::Error),
        ErrorKind::Timeout => ("TIMEOUT", true, LogLevel::Error),
        ErrorKind::EmptyResponse => ("EMPTY_RESPONSE", false, LogLevel::Error),
        ErrorKind::DecodeFailure => ("DECODE_FAILURE", false, LogLevel::Warn),
        ErrorKind::LocalIOFailure => ("LOCAL_IO_FAILURE", false, LogLevel::Error),
        ErrorKind::InvalidInput => ("INVALID_INPUT", false, LogLevel::Debug),
        ErrorKind::Internal => ("INTERNAL_ERROR", false, LogLevel::Error),
    }
}

impl ErrorKind {
    /// Machine-readable error code (e.g., "TIMEOUT")
    pub fn error_code(&self) -> &'static str {
        error_kind_static_metadata(*self).0
    }

    /// Whether submitting the same job again later may succeed
    pub fn is_recoverable(&self) -> bool {
        error_kind_static_metadata(*self).1
    }

    /// Log level for this kind
    pub fn log_level(&self) -> LogLevel {
        error_kind_static_metadata(*self).2
    }

    /// Whether a failure of this kind aborts the whole job.
    ///
    /// Decode failures only cost the thumbnail.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, ErrorKind::DecodeFailure)
    }
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            ErrorKind::TransientTransport => write!(f, "transient_transport"),
            ErrorKind::RemoteProcessingFailed => write!(f, "remote_processing_failed"),
            ErrorKind::Timeout => write!(f, "timeout"),
            ErrorKind::EmptyResponse => write!(f, "empty_response"),
            ErrorKind::DecodeFailure => write!(f, "decode_failure"),
            ErrorKind::LocalIOFailure => write!(f, "local_io_failure"),
            ErrorKind::InvalidInput => write!(f, "invalid_input"),
            ErrorKind::Internal => write!(f, "internal"),
        }
    }
}

/// A classified pipeline failure with a human-readable message.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct JobError {
    pub kind: ErrorKind,
    pub message: String,
}

impl JobError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn transient(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::TransientTransport, message)
    }

    pub fn remote_processing_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::RemoteProcessingFailed, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Timeout, message)
    }

    pub fn empty_response(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::EmptyResponse, message)
    }

    pub fn decode_failure(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::DecodeFailure, message)
    }

    pub fn local_io(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::LocalIOFailure, message)
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidInput, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }
}

impl From<io::Error> for JobError {
    fn from(err: io::Error) -> Self {
        JobError::local_io(format!("IO error: {}", err))
    }
}

/// Error returned by a single call to the remote analysis service.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RemoteError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Service unavailable ({status}): {message}")]
    Unavailable { status: u16, message: String },

    #[error("Request rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Remote asset not found: {0}")]
    NotFound(String),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),
}

impl RemoteError {
    /// Whether repeating the identical call may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            RemoteError::Transport(_) | RemoteError::Unavailable { .. }
        )
    }

    /// Classify an HTTP status code returned by the service.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            404 => RemoteError::NotFound(message),
            408 | 429 | 500..=599 => RemoteError::Unavailable { status, message },
            _ => RemoteError::Rejected { status, message },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind_metadata_timeout() {
        let kind = ErrorKind::Timeout;
        assert_eq!(kind.error_code(), "TIMEOUT");
        assert!(kind.is_recoverable());
        assert!(kind.is_fatal());
        assert_eq!(kind.log_level(), LogLevel::Error);
    }

    #[test]
    fn test_decode_failure_is_not_fatal() {
        assert!(!ErrorKind::DecodeFailure.is_fatal());
        assert_eq!(ErrorKind::DecodeFailure.log_level(), LogLevel::Warn);
        assert!(ErrorKind::EmptyResponse.is_fatal());
    }

    #[test]
    fn test_job_error_display_includes_kind() {
        let err = JobError::remote_processing_failed("asset state FAILED");
        assert_eq!(err.kind, ErrorKind::RemoteProcessingFailed);
        assert_eq!(
            err.to_string(),
            "remote_processing_failed: asset state FAILED"
        );
    }

    #[test]
    fn test_io_error_maps_to_local_io_failure() {
        let err: JobError = io::Error::new(io::ErrorKind::PermissionDenied, "denied").into();
        assert_eq!(err.kind, ErrorKind::LocalIOFailure);
        assert!(err.message.contains("denied"));
    }

    #[test]
    fn test_remote_error_status_classification() {
        assert!(RemoteError::from_status(503, "busy").is_transient());
        assert!(RemoteError::from_status(429, "slow down").is_transient());
        assert!(RemoteError::from_status(408, "timeout").is_transient());
        assert!(!RemoteError::from_status(400, "bad mime").is_transient());
        assert_eq!(
            RemoteError::from_status(404, "files/abc"),
            RemoteError::NotFound("files/abc".to_string())
        );
        assert!(RemoteError::Transport("reset".to_string()).is_transient());
        assert!(!RemoteError::MalformedResponse("eof".to_string()).is_transient());
    }
}
