//! Typed services over the PumpGuard backend.
//!
//! Each service wraps a slice of the schema behind validated inputs and a
//! uniform [`common::ServiceResponse`]; the [`PumpGuard`] facade wires them
//! to either the HTTP backend or injected test doubles.

pub mod activity;
pub mod activity_sink;
pub mod auth;
pub mod bulk;
pub mod ctx;
pub mod dashboard;
pub mod dealers;
pub mod deposits;
pub mod expenses;
pub mod facade;
pub mod inventory;
pub mod notifications;
pub mod omcs;
pub mod prices;
pub mod profiles;
pub mod reports;
pub mod sales;
pub mod settings;
pub mod shifts;
pub mod stations;
pub mod violations;

mod shape;

pub use bulk::{BulkFailure, BulkOutcome};
pub use ctx::{Actor, Ctx};
pub use dashboard::Overview;
pub use facade::PumpGuard;
pub use reports::GroupBy;
