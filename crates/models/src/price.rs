use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::enums::FuelType;
use crate::errors::{positive, ModelError};

/// A posted pump price for one fuel at one station.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FuelPrice {
    pub id: Uuid,
    pub station_id: Uuid,
    pub fuel_type: FuelType,
    pub price: f64,
    pub set_by: Option<Uuid>,
    pub effective_from: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Per-OMC regulator cap on a fuel's pump price.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PriceCap {
    pub id: Uuid,
    pub omc_id: Uuid,
    pub fuel_type: FuelType,
    pub max_price: f64,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize)]
pub struct NewPrice {
    pub station_id: Uuid,
    pub fuel_type: FuelType,
    pub price: f64,
}

impl NewPrice {
    pub fn validate(&self) -> Result<(), ModelError> {
        positive(self.price, "price")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn price_must_be_positive_and_finite() {
        let mut p = NewPrice { station_id: Uuid::new_v4(), fuel_type: FuelType::Petrol, price: 0.0 };
        assert!(p.validate().is_err());
        p.price = f64::NAN;
        assert!(p.validate().is_err());
        p.price = 23.99;
        assert!(p.validate().is_ok());
    }
}
