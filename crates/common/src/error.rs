use thiserror::Error;

/// Failure taxonomy for the access layer, grouped by origin.
///
/// Every operation funnels its failure through this type before it is
/// wrapped into a [`crate::ServiceResponse`]; the variant decides both the
/// machine-readable code and whether a retry is worth attempting.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("authentication required")]
    AuthRequired,
    #[error("validation error: {0}")]
    Validation(String),
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("timed out: {0}")]
    Timeout(String),
    #[error("service unavailable ({status}): {message}")]
    Unavailable { status: u16, message: String },
    #[error("rate limited, try again later")]
    RateLimited,
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl ServiceError {
    pub fn not_found(entity: &str) -> Self {
        Self::NotFound(format!("{} not found", entity))
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn permission(msg: impl Into<String>) -> Self {
        Self::PermissionDenied(msg.into())
    }

    pub fn unexpected(msg: impl Into<String>) -> Self {
        Self::Unexpected(msg.into())
    }

    /// Stable code for external mapping/logging.
    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::AuthRequired => "AUTH_REQUIRED",
            ServiceError::Validation(_) => "VALIDATION_ERROR",
            ServiceError::PermissionDenied(_) => "PERMISSION_DENIED",
            ServiceError::NotFound(_) => "NOT_FOUND",
            ServiceError::Network(_) => "NETWORK_ERROR",
            ServiceError::Timeout(_) => "TIMEOUT",
            ServiceError::Unavailable { .. } => "SERVICE_UNAVAILABLE",
            ServiceError::RateLimited => "RATE_LIMITED",
            ServiceError::Unexpected(_) => "UNEXPECTED_ERROR",
        }
    }

    /// Transient failures eligible for backoff-and-retry. `Unavailable` is
    /// only ever built from a server-error status (>= 500).
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ServiceError::Network(_)
                | ServiceError::Timeout(_)
                | ServiceError::Unavailable { .. }
                | ServiceError::RateLimited
        )
    }
}

#[cfg(test)]
mod tests {
    use super::ServiceError;

    #[test]
    fn codes_are_stable() {
        assert_eq!(ServiceError::AuthRequired.code(), "AUTH_REQUIRED");
        assert_eq!(ServiceError::validation("x").code(), "VALIDATION_ERROR");
        assert_eq!(ServiceError::not_found("station").code(), "NOT_FOUND");
        assert_eq!(ServiceError::unexpected("odd payload").code(), "UNEXPECTED_ERROR");
        assert_eq!(
            ServiceError::Unavailable { status: 503, message: "down".into() }.code(),
            "SERVICE_UNAVAILABLE"
        );
    }

    #[test]
    fn transient_failures_are_retryable() {
        assert!(ServiceError::Network("reset".into()).is_retryable());
        assert!(ServiceError::Timeout("10s".into()).is_retryable());
        assert!(ServiceError::RateLimited.is_retryable());
        assert!(ServiceError::Unavailable { status: 502, message: "bad gateway".into() }.is_retryable());
    }

    #[test]
    fn terminal_failures_are_not_retryable() {
        assert!(!ServiceError::AuthRequired.is_retryable());
        assert!(!ServiceError::validation("litres must be positive").is_retryable());
        assert!(!ServiceError::permission("admin only").is_retryable());
        assert!(!ServiceError::not_found("shift").is_retryable());
        assert!(!ServiceError::Unexpected("?".into()).is_retryable());
    }

    #[test]
    fn not_found_formats_entity() {
        assert_eq!(ServiceError::not_found("dealer").to_string(), "not found: dealer not found");
    }
}
