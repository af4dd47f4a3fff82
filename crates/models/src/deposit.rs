use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{non_empty, positive, ModelError};

/// A cash bank deposit recorded against a station.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Deposit {
    pub id: Uuid,
    pub station_id: Uuid,
    pub amount: f64,
    pub bank_reference: String,
    pub deposited_by: Option<Uuid>,
    pub deposited_on: NaiveDate,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize)]
pub struct NewDeposit {
    pub station_id: Uuid,
    pub amount: f64,
    pub bank_reference: String,
    pub deposited_on: NaiveDate,
}

impl NewDeposit {
    pub fn validate(&self) -> Result<(), ModelError> {
        positive(self.amount, "amount")?;
        non_empty(&self.bank_reference, "bank_reference")?;
        Ok(())
    }
}

/// Deposits vs sales for one station-day.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct DailySummary {
    pub deposited: f64,
    pub sold: f64,
    pub shortfall: f64,
}
