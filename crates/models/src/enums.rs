//! Wire enums (snake_case on the wire, matching the backend's check
//! constraints).

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    OmcAdmin,
    Dealer,
    Manager,
    Attendant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::OmcAdmin => "omc_admin",
            Role::Dealer => "dealer",
            Role::Manager => "manager",
            Role::Attendant => "attendant",
        }
    }

    pub fn parse(s: &str) -> Option<Role> {
        match s {
            "admin" => Some(Role::Admin),
            "omc_admin" => Some(Role::OmcAdmin),
            "dealer" => Some(Role::Dealer),
            "manager" => Some(Role::Manager),
            "attendant" => Some(Role::Attendant),
            _ => None,
        }
    }

    /// Roles allowed to manage platform-wide records (stations, OMCs,
    /// settings, bulk imports).
    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }

    /// Roles allowed to review expenses and close out shifts they oversee.
    pub fn can_manage_station(&self) -> bool {
        matches!(self, Role::Admin | Role::OmcAdmin | Role::Dealer | Role::Manager)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FuelType {
    Petrol,
    Diesel,
    Kerosene,
    Lpg,
}

impl FuelType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FuelType::Petrol => "petrol",
            FuelType::Diesel => "diesel",
            FuelType::Kerosene => "kerosene",
            FuelType::Lpg => "lpg",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationCategory {
    PriceGouging,
    MeterTampering,
    SafetyBreach,
    UnlicensedOperation,
    AdulteratedFuel,
    Other,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationStatus {
    Open,
    UnderReview,
    Resolved,
    Dismissed,
}

impl ViolationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ViolationStatus::Open => "open",
            ViolationStatus::UnderReview => "under_review",
            ViolationStatus::Resolved => "resolved",
            ViolationStatus::Dismissed => "dismissed",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShiftStatus {
    Open,
    Closed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
}

impl ApprovalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApprovalStatus::Pending => "pending",
            ApprovalStatus::Approved => "approved",
            ApprovalStatus::Rejected => "rejected",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    System,
    PriceChange,
    ViolationAlert,
    ShiftReminder,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InventoryKind {
    Dip,
    Delivery,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpenseCategory {
    Maintenance,
    Utilities,
    Wages,
    Transport,
    Other,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roles_round_trip_snake_case() {
        let json = serde_json::to_string(&Role::OmcAdmin).unwrap();
        assert_eq!(json, "\"omc_admin\"");
        assert_eq!(Role::parse("omc_admin"), Some(Role::OmcAdmin));
        assert_eq!(Role::parse("root"), None);
    }

    #[test]
    fn fuel_type_wire_names() {
        assert_eq!(serde_json::to_string(&FuelType::Lpg).unwrap(), "\"lpg\"");
        assert_eq!(FuelType::Diesel.as_str(), "diesel");
    }
}
