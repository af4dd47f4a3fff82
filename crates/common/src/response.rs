//! Uniform response envelope
//!
//! Every service operation resolves to a `ServiceResponse<T>`: a tagged
//! success/failure record with an optional message, an optional pagination
//! block and a production timestamp. Exactly one of `data`/`error` is
//! meaningful, discriminated by `success`.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::ServiceError;
use crate::pagination::PageInfo;

#[derive(Debug, Clone, Serialize)]
pub struct ServiceResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<PageInfo>,
    pub timestamp: DateTime<Utc>,
}

impl<T> ServiceResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            error: None,
            error_code: None,
            pagination: None,
            timestamp: Utc::now(),
        }
    }

    pub fn success_with_message(data: T, message: impl Into<String>) -> Self {
        let mut resp = Self::success(data);
        resp.message = Some(message.into());
        resp
    }

    /// Success envelope for list payloads, with the pagination block filled in.
    pub fn paginated(data: T, page: PageInfo) -> Self {
        let mut resp = Self::success(data);
        resp.pagination = Some(page);
        resp
    }

    pub fn error(message: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            message: None,
            error: Some(message.into()),
            error_code: Some(code.into()),
            pagination: None,
            timestamp: Utc::now(),
        }
    }

    /// Failure envelope derived from a classified error.
    pub fn failure(err: &ServiceError) -> Self {
        Self::error(err.to_string(), err.code())
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    /// Collapse the envelope into a plain `Result` for callers that prefer
    /// `?` over inspecting fields. A success envelope with no payload (unset
    /// `data`) is reported as unexpected.
    pub fn into_result(self) -> Result<T, ServiceError> {
        if self.success {
            self.data
                .ok_or_else(|| ServiceError::Unexpected("success response without data".into()))
        } else {
            let message = self.error.unwrap_or_else(|| "unknown failure".into());
            Err(match self.error_code.as_deref() {
                Some("AUTH_REQUIRED") => ServiceError::AuthRequired,
                Some("PERMISSION_DENIED") => ServiceError::PermissionDenied(message),
                Some("NOT_FOUND") => ServiceError::NotFound(message),
                Some("NETWORK_ERROR") => ServiceError::Network(message),
                Some("TIMEOUT") => ServiceError::Timeout(message),
                Some("SERVICE_UNAVAILABLE") => ServiceError::Unavailable { status: 503, message },
                Some("RATE_LIMITED") => ServiceError::RateLimited,
                Some("VALIDATION_ERROR") => ServiceError::Validation(message),
                _ => ServiceError::Unexpected(message),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_round_trip() {
        let resp = ServiceResponse::success(vec![1, 2, 3]);
        assert!(resp.success);
        assert_eq!(resp.data, Some(vec![1, 2, 3]));
        assert!(resp.error.is_none());
        assert!(resp.error_code.is_none());
    }

    #[test]
    fn error_round_trip() {
        let resp: ServiceResponse<()> = ServiceResponse::error("litres must be positive", "VALIDATION_ERROR");
        assert!(!resp.success);
        assert!(resp.data.is_none());
        assert_eq!(resp.error.as_deref(), Some("litres must be positive"));
        assert_eq!(resp.error_code.as_deref(), Some("VALIDATION_ERROR"));
    }

    #[test]
    fn failure_carries_code_and_message() {
        let err = ServiceError::not_found("station");
        let resp: ServiceResponse<()> = ServiceResponse::failure(&err);
        assert_eq!(resp.error_code.as_deref(), Some("NOT_FOUND"));
        assert_eq!(resp.error.as_deref(), Some("not found: station not found"));
    }

    #[test]
    fn paginated_attaches_block() {
        let info = crate::PageInfo::compute(1, 20, 45);
        let resp = ServiceResponse::paginated(vec!["a"], info);
        assert!(resp.success);
        assert_eq!(resp.pagination.unwrap().total_pages, 3);
    }

    #[test]
    fn into_result_round_trips_the_classification() {
        let ok = ServiceResponse::success(5u8).into_result().unwrap();
        assert_eq!(ok, 5);
        let err = ServiceResponse::<u8>::failure(&ServiceError::RateLimited)
            .into_result()
            .unwrap_err();
        assert_eq!(err.code(), "RATE_LIMITED");
    }

    #[test]
    fn serialization_skips_absent_fields() {
        let resp = ServiceResponse::success(7u32);
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["success"], serde_json::json!(true));
        assert_eq!(json["data"], serde_json::json!(7));
        assert!(json.get("error").is_none());
        assert!(json.get("pagination").is_none());
    }
}
