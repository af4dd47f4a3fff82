use thiserror::Error;

use common::ServiceError;

/// Transport-level failures from the hosted backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("backend returned status {status}: {message}")]
    Status { status: u16, message: String },
    #[error("network error: {0}")]
    Network(String),
    #[error("request timed out: {0}")]
    Timeout(String),
    #[error("failed to decode backend response: {0}")]
    Decode(String),
}

impl StoreError {
    pub fn status(status: u16, message: impl Into<String>) -> Self {
        Self::Status { status, message: message.into() }
    }
}

impl From<reqwest::Error> for StoreError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            StoreError::Timeout(err.to_string())
        } else if err.is_decode() {
            StoreError::Decode(err.to_string())
        } else {
            StoreError::Network(err.to_string())
        }
    }
}

/// Classify transport failures into the service taxonomy. Status codes map
/// the way the backend uses them; anything 5xx is a retryable outage.
impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Status { status: 401, .. } => ServiceError::AuthRequired,
            StoreError::Status { status: 403, message } => ServiceError::PermissionDenied(message),
            StoreError::Status { status: 404, message } => ServiceError::NotFound(message),
            StoreError::Status { status: 429, .. } => ServiceError::RateLimited,
            StoreError::Status { status, message } if status >= 500 => {
                ServiceError::Unavailable { status, message }
            }
            StoreError::Status { message, .. } => ServiceError::Validation(message),
            StoreError::Network(msg) => ServiceError::Network(msg),
            StoreError::Timeout(msg) => ServiceError::Timeout(msg),
            StoreError::Decode(msg) => ServiceError::Unexpected(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_map_into_taxonomy() {
        let cases: Vec<(u16, &str)> = vec![
            (401, "AUTH_REQUIRED"),
            (403, "PERMISSION_DENIED"),
            (404, "NOT_FOUND"),
            (422, "VALIDATION_ERROR"),
            (429, "RATE_LIMITED"),
            (500, "SERVICE_UNAVAILABLE"),
            (503, "SERVICE_UNAVAILABLE"),
        ];
        for (status, code) in cases {
            let err: ServiceError = StoreError::status(status, "x").into();
            assert_eq!(err.code(), code, "status {}", status);
        }
    }

    #[test]
    fn only_server_errors_and_transport_failures_are_retryable() {
        let server: ServiceError = StoreError::status(502, "bad gateway").into();
        assert!(server.is_retryable());
        let network: ServiceError = StoreError::Network("connection reset".into()).into();
        assert!(network.is_retryable());
        let client: ServiceError = StoreError::status(409, "conflict").into();
        assert!(!client.is_retryable());
    }
}
