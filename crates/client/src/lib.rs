//! The request dispatcher and its policies.
//!
//! Every PumpGuard service call goes through [`Dispatcher::handle`] (or
//! [`Dispatcher::handle_paged`]): cache check, auth precondition, bounded
//! retry with exponential backoff, activity recording, and conversion of
//! every outcome into a [`common::ServiceResponse`]. The dispatcher never
//! panics on an operation failure and never lets one escape as `Err`.
//!
//! The cache and activity sink are injected trait objects so the policies
//! stay independent of the concrete backing implementations.

pub mod activity;
pub mod cache;
pub mod dispatcher;
pub mod middleware;
pub mod options;
pub mod retry;

pub use activity::{ActivityEntry, ActivityLogger, NoopActivityLogger};
pub use cache::{Cache, TtlCache};
pub use dispatcher::Dispatcher;
pub use options::RequestOptions;
pub use retry::RetryPolicy;
