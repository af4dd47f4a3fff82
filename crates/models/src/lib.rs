//! Entity records for the PumpGuard access layer.
//!
//! The backend owns every table shape; these structs just give the wire JSON
//! a typed surface on this side. Input DTOs live beside their records with
//! inline validation, mirroring how the backend rejects bad rows.

pub mod enums;
pub mod errors;
pub mod tables;

pub mod activity_log;
pub mod dealer;
pub mod deposit;
pub mod expense;
pub mod inventory;
pub mod notification;
pub mod omc;
pub mod price;
pub mod profile;
pub mod sale;
pub mod setting;
pub mod shift;
pub mod station;
pub mod violation;

pub use enums::{
    ApprovalStatus, ExpenseCategory, FuelType, InventoryKind, NotificationKind, Role, ShiftStatus,
    ViolationCategory, ViolationStatus,
};
pub use errors::ModelError;
