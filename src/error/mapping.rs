//! Mapping from raw AWS error responses to typed service errors.

use super::*;

/// Parsed AWS error response.
#[derive(Debug, Clone, Default)]
pub struct ServiceErrorResponse {
    /// AWS error code (e.g., "ThrottlingException").
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// HTTP status code of the response.
    pub status: u16,
    /// AWS request ID.
    pub request_id: Option<String>,
    /// Value of a `Retry-After` header, in seconds.
    pub retry_after_secs: Option<u64>,
}

/// Error codes AWS services use to signal throttling.
const THROTTLING_CODES: &[&str] = &[
    "Throttling",
    "ThrottlingException",
    "ThrottledException",
    "RequestThrottledException",
    "TooManyRequestsException",
    "ProvisionedThroughputExceededException",
    "TransactionInProgressException",
    "RequestLimitExceeded",
    "BandwidthLimitExceeded",
    "LimitExceededException",
    "RequestThrottled",
    "SlowDown",
    "PriorRequestNotComplete",
    "EC2ThrottledException",
];

/// Error codes that are transient even though some services send them with 4xx.
const TRANSIENT_CODES: &[&str] = &[
    "RequestTimeout",
    "RequestTimeoutException",
    "IDPCommunicationError",
    "InternalError",
    "InternalFailure",
    "ServiceUnavailable",
];

/// Classify an AWS error response.
///
/// Throttling codes and HTTP 429 become [`ServiceError::Throttling`];
/// 5xx and known transient codes become [`ServiceError::Server`]; everything
/// else is a non-retryable [`ServiceError::Client`].
pub fn map_service_error(response: ServiceErrorResponse) -> ServiceError {
    let ServiceErrorResponse {
        code,
        message,
        status,
        request_id,
        retry_after_secs,
    } = response;

    if status == 429 || THROTTLING_CODES.contains(&code.as_str()) {
        return ServiceError::Throttling {
            code,
            message,
            retry_after: retry_after_secs.map(Duration::from_secs),
            request_id,
        };
    }

    if status >= 500 || TRANSIENT_CODES.contains(&code.as_str()) {
        return ServiceError::Server {
            status,
            code,
            message,
            request_id,
        };
    }

    ServiceError::Client {
        status,
        code,
        message,
        request_id,
    }
}
