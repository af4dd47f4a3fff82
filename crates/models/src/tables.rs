//! Table names as the backend exposes them.

pub const STATIONS: &str = "stations";
pub const PROFILES: &str = "profiles";
pub const OMCS: &str = "omcs";
pub const DEALERS: &str = "dealers";
pub const FUEL_PRICES: &str = "fuel_prices";
pub const PRICE_CAPS: &str = "price_caps";
pub const SALES: &str = "sales";
pub const INVENTORY: &str = "inventory_records";
pub const SHIFTS: &str = "shifts";
pub const VIOLATIONS: &str = "violations";
pub const NOTIFICATIONS: &str = "notifications";
pub const EXPENSES: &str = "expenses";
pub const DEPOSITS: &str = "deposits";
pub const ACTIVITY_LOGS: &str = "activity_logs";
pub const APP_SETTINGS: &str = "app_settings";
