use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::enums::FuelType;
use crate::errors::{positive, ModelError};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Sale {
    pub id: Uuid,
    pub station_id: Uuid,
    pub shift_id: Option<Uuid>,
    pub fuel_type: FuelType,
    pub litres: f64,
    pub unit_price: f64,
    pub amount: f64,
    pub recorded_by: Option<Uuid>,
    pub sold_on: NaiveDate,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize)]
pub struct NewSale {
    pub station_id: Uuid,
    pub shift_id: Option<Uuid>,
    pub fuel_type: FuelType,
    pub litres: f64,
    pub unit_price: f64,
    pub sold_on: NaiveDate,
}

impl NewSale {
    pub fn validate(&self) -> Result<(), ModelError> {
        positive(self.litres, "litres")?;
        positive(self.unit_price, "unit_price")?;
        Ok(())
    }

    /// Line amount, derived rather than trusted from the caller.
    pub fn amount(&self) -> f64 {
        self.litres * self.unit_price
    }
}

#[derive(Clone, Debug, Default)]
pub struct SaleFilter {
    pub station_id: Option<Uuid>,
    pub fuel_type: Option<FuelType>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}
