//! Error types for session, credential and retry management.
//!
//! Errors are grouped by family so callers can decide quickly whether a
//! failure is fatal (bad configuration), transient (network, throttling,
//! server faults) or a credential dead-end.

mod mapping;

pub use mapping::{map_service_error, ServiceErrorResponse};

use std::time::Duration;
use thiserror::Error;

/// Prefix of every instance metadata service URL.
pub const METADATA_ENDPOINT_PREFIX: &str = "http://169.254.169.254/latest";

/// Top-level error type for the session subsystem.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Configuration-related errors.
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// Credential-related errors.
    #[error("Credentials error: {0}")]
    Credentials(#[from] CredentialsError),

    /// Network and transport errors.
    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    /// Errors returned by an AWS service.
    #[error("Service error: {0}")]
    Service(#[from] ServiceError),

    /// The retry budget was spent; wraps the most recent failure.
    #[error("Retries exhausted after {attempts} attempts: {source}")]
    RetriesExhausted {
        /// Total number of attempts made.
        attempts: u32,
        /// The last error observed.
        #[source]
        source: Box<SessionError>,
    },

    /// The caller cancelled the operation.
    #[error("Operation cancelled")]
    Cancelled,
}

impl SessionError {
    /// Returns true if the error belongs to the standard retryable classes.
    pub fn is_retryable(&self) -> bool {
        match self {
            SessionError::Network(e) => e.is_retryable(),
            SessionError::Service(e) => e.is_retryable(),
            SessionError::Credentials(e) => e.is_retryable(),
            _ => false,
        }
    }

    /// Returns true for errors that must abort the operation immediately.
    pub fn is_fatal(&self) -> bool {
        matches!(self, SessionError::Configuration(_))
    }

    /// Returns the retry delay hint if available.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            SessionError::Service(ServiceError::Throttling { retry_after, .. }) => *retry_after,
            _ => None,
        }
    }

    /// Returns the text of the underlying cause, if the error wraps one.
    ///
    /// Metadata-service failures report the URL that was being reached.
    pub fn underlying_cause(&self) -> Option<String> {
        match self {
            SessionError::Credentials(CredentialsError::Metadata { url, message }) => {
                Some(format!("{}: {}", url, message))
            }
            SessionError::RetriesExhausted { source, .. } => source.underlying_cause(),
            _ => None,
        }
    }

    /// Returns true if the failure came from an unreachable metadata endpoint.
    pub fn is_metadata_unreachable(&self) -> bool {
        self.underlying_cause()
            .map_or(false, |cause| cause.contains(METADATA_ENDPOINT_PREFIX))
    }

    /// Returns the AWS request ID if available.
    pub fn request_id(&self) -> Option<&str> {
        match self {
            SessionError::Service(e) => e.request_id(),
            _ => None,
        }
    }
}

/// Configuration-related errors. All of these are fatal.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    /// One or more literal region patterns match no known region.
    #[error(
        "connection config has invalid \"regions\": {}. Edit your connection configuration file and then restart",
        patterns.join(", ")
    )]
    InvalidRegions {
        /// The offending patterns.
        patterns: Vec<String>,
    },

    /// A region pattern could not be compiled.
    #[error("Invalid region pattern '{pattern}': {details}")]
    InvalidRegionPattern {
        /// The pattern.
        pattern: String,
        /// Compiler message.
        details: String,
    },

    /// Only one half of a static key pair was supplied.
    #[error("Partial credentials found in connection config, missing: {missing}")]
    PartialCredentials {
        /// The missing field name.
        missing: &'static str,
    },

    /// A retry setting is outside its allowed range.
    #[error(
        "connection config has invalid value for \"{field}\", it must be greater than or equal to 1. Edit your connection configuration file and then restart"
    )]
    InvalidRetrySetting {
        /// The configuration field name.
        field: &'static str,
    },

    /// An environment override could not be used.
    #[error("invalid value for environment variable \"{variable}\": {message}")]
    InvalidEnvironment {
        /// The environment variable.
        variable: &'static str,
        /// What was wrong with it.
        message: String,
    },

    /// Invalid endpoint URL.
    #[error("Invalid endpoint URL: {url}")]
    InvalidEndpoint {
        /// The invalid URL.
        url: String,
        /// Details about the validation error.
        details: String,
    },

    /// A session was requested without the region it needs.
    #[error("{operation} called without a region")]
    MissingRegion {
        /// The operation that needed the region.
        operation: &'static str,
    },

    /// The connection configuration could not be parsed.
    #[error("Invalid connection config: {message}")]
    Parse {
        /// Parser message.
        message: String,
    },
}

/// Credential-related errors.
#[derive(Debug, Error)]
pub enum CredentialsError {
    /// No credentials could be found.
    #[error("Credentials not found: no credentials could be loaded from any source")]
    NotFound,

    /// Credentials have expired.
    #[error("Credentials expired: session credentials expired at {expiration}")]
    Expired {
        /// When the credentials expired.
        expiration: String,
    },

    /// Credentials are invalid.
    #[error("Invalid credentials: {message}")]
    Invalid {
        /// Details about why credentials are invalid.
        message: String,
    },

    /// Shared profile file error.
    #[error("Profile error: {message}")]
    Profile {
        /// Details about the profile error.
        message: String,
    },

    /// The instance metadata service could not be used.
    #[error("Metadata service error at {url}: {message}")]
    Metadata {
        /// URL that was being requested.
        url: String,
        /// Underlying failure.
        message: String,
    },
}

impl CredentialsError {
    /// Metadata failures are transport failures underneath and may be retried.
    pub fn is_retryable(&self) -> bool {
        matches!(self, CredentialsError::Metadata { .. })
    }
}

/// Network and transport errors.
#[derive(Debug, Error)]
pub enum NetworkError {
    /// Connection failed.
    #[error("Connection failed: {message}")]
    ConnectionFailed {
        /// Error message.
        message: String,
    },

    /// Request timed out.
    #[error("Request timed out after {duration:?}")]
    Timeout {
        /// The timeout duration.
        duration: Duration,
    },

    /// Connection reset.
    #[error("read tcp: connection reset by peer")]
    ConnectionReset,

    /// Any other transport failure; not retried by default.
    #[error("Transport error: {message}")]
    Other {
        /// Error message.
        message: String,
    },
}

impl NetworkError {
    /// Returns true if the error is retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            NetworkError::ConnectionFailed { .. }
                | NetworkError::Timeout { .. }
                | NetworkError::ConnectionReset
        )
    }
}

/// Errors returned by an AWS service API.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The request was throttled.
    #[error("Throttled ({code}): {message}")]
    Throttling {
        /// AWS error code.
        code: String,
        /// Error message.
        message: String,
        /// Retry after duration hint.
        retry_after: Option<Duration>,
        /// AWS request ID.
        request_id: Option<String>,
    },

    /// 5xx response.
    #[error("Server error {status} ({code}): {message}")]
    Server {
        /// HTTP status code.
        status: u16,
        /// AWS error code.
        code: String,
        /// Error message.
        message: String,
        /// AWS request ID.
        request_id: Option<String>,
    },

    /// 4xx response.
    #[error("Client error {status} ({code}): {message}")]
    Client {
        /// HTTP status code.
        status: u16,
        /// AWS error code.
        code: String,
        /// Error message.
        message: String,
        /// AWS request ID.
        request_id: Option<String>,
    },
}

impl ServiceError {
    /// Returns the AWS error code.
    pub fn code(&self) -> &str {
        match self {
            ServiceError::Throttling { code, .. }
            | ServiceError::Server { code, .. }
            | ServiceError::Client { code, .. } => code,
        }
    }

    /// Returns the AWS request ID if available.
    pub fn request_id(&self) -> Option<&str> {
        match self {
            ServiceError::Throttling { request_id, .. }
            | ServiceError::Server { request_id, .. }
            | ServiceError::Client { request_id, .. } => request_id.as_deref(),
        }
    }

    /// Returns the HTTP status code if applicable.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            ServiceError::Throttling { .. } => None,
            ServiceError::Server { status, .. } | ServiceError::Client { status, .. } => {
                Some(*status)
            }
        }
    }

    /// Returns true if the error is retryable.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, ServiceError::Client { .. })
    }
}

impl From<reqwest::Error> for NetworkError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            NetworkError::Timeout {
                duration: Duration::ZERO,
            }
        } else if err.is_connect() {
            NetworkError::ConnectionFailed {
                message: err.to_string(),
            }
        } else {
            NetworkError::Other {
                message: err.to_string(),
            }
        }
    }
}

impl From<serde_json::Error> for ConfigurationError {
    fn from(err: serde_json::Error) -> Self {
        ConfigurationError::Parse {
            message: err.to_string(),
        }
    }
}
