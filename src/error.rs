//! Error types for analytics-runner
//!
//! This module provides the error taxonomy used throughout the crate:
//! - Authentication failures against the SSO service ([`AuthenticationError`])
//! - Job outcomes that abort a run (timeout, failed or completed-with-errors status)
//! - Transport, I/O and decoding errors propagated as-is from the layers below
//! - Machine-readable error codes for log lines

use crate::types::JobId;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for analytics-runner operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for analytics-runner
///
/// Each variant carries enough context to produce a complete log line on its own.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "data_api_base_url")
        key: Option<String>,
    },

    /// The SSO service rejected the credentials or issued an unusable token
    #[error("authentication error: {0}")]
    Authentication(#[from] AuthenticationError),

    /// A job did not reach a terminal status before the wait deadline
    #[error("job wait has been terminated by timeout. Job id: {job_id}; timeout: {}s", .timeout.as_secs())]
    JobTimeout {
        /// The job that was being polled
        job_id: JobId,
        /// The deadline that was exceeded
        timeout: Duration,
    },

    /// A job finished with a failed or completed-with-errors status
    #[error(
        "the job 'job type: {job_type}; job id: {job_id}' stopped by error with status '{status}'. The errors are in the file '{}'",
        .error_file.display()
    )]
    JobFailed {
        /// Server-side job type (e.g., "FileUpload")
        job_type: String,
        /// The failed job
        job_id: JobId,
        /// Terminal status reported by the job service
        status: String,
        /// Absolute path of the downloaded error artifact
        error_file: PathBuf,
    },

    /// A service answered with a payload the client cannot use
    #[error("unexpected response from {service}: {reason}")]
    UnexpectedResponse {
        /// The service that produced the response (e.g., "file management")
        service: &'static str,
        /// What was wrong with it
        reason: String,
    },

    /// Network or HTTP status error
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// A service URL could not be built
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Authentication failures raised by [`Session`](crate::session::Session)
#[derive(Debug, Error)]
pub enum AuthenticationError {
    /// The SSO service answered with a non-success HTTP status
    #[error("SSO service rejected the token request with status {status}")]
    Rejected {
        /// HTTP status code returned by the SSO service
        status: u16,
    },

    /// The token does not carry the expected "Bearer " prefix
    #[error("authentication token is malformed: expected prefix '{prefix}'")]
    MalformedToken {
        /// The prefix that was expected
        prefix: &'static str,
    },

    /// Nothing follows the "Bearer " prefix
    #[error("Bearer authentication token is empty.")]
    EmptyToken,

    /// The token contains characters that cannot be sent in an HTTP header
    #[error("authentication token cannot be used as an HTTP header value")]
    InvalidHeaderValue,
}

impl Error {
    /// Create a configuration error for a specific key
    pub fn config(key: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            key: Some(key.into()),
        }
    }

    /// Machine-readable error code, stable across releases
    ///
    /// Used as a structured field in the terminal log line of a run.
    pub fn code(&self) -> &'static str {
        match self {
            Error::Config { .. } => "config_error",
            Error::Authentication(e) => match e {
                AuthenticationError::Rejected { .. } => "authentication_rejected",
                AuthenticationError::MalformedToken { .. } => "malformed_token",
                AuthenticationError::EmptyToken => "empty_token",
                AuthenticationError::InvalidHeaderValue => "invalid_token_header",
            },
            Error::JobTimeout { .. } => "job_timeout",
            Error::JobFailed { .. } => "job_failed",
            Error::UnexpectedResponse { .. } => "unexpected_response",
            Error::Network(_) => "network_error",
            Error::InvalidUrl(_) => "invalid_url",
            Error::Io(_) => "io_error",
            Error::Serialization(_) => "serialization_error",
        }
    }

    /// True for the outcomes that describe a job rather than the client
    ///
    /// Timeouts and failed job statuses are reported by the workflow as the
    /// run's terminal reason; everything else is an infrastructure failure.
    pub fn is_job_outcome(&self) -> bool {
        matches!(self, Error::JobTimeout { .. } | Error::JobFailed { .. })
    }
}
