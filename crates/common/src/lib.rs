//! Shared building blocks for the PumpGuard access layer.
//! - Uniform success/failure response envelope returned by every service.
//! - Error taxonomy with stable machine-readable codes.
//! - Pagination helpers and the pagination block attached to list responses.
//! - Tracing subscriber initialization.

pub mod error;
pub mod logging;
pub mod pagination;
pub mod response;

pub use error::ServiceError;
pub use pagination::{PageInfo, Pagination};
pub use response::ServiceResponse;
