use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::enums::ShiftStatus;
use crate::errors::ModelError;

/// An attendant shift at a station. At most one open shift per station.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Shift {
    pub id: Uuid,
    pub station_id: Uuid,
    pub attendant_id: Option<Uuid>,
    pub status: ShiftStatus,
    pub opening_cash: f64,
    pub closing_cash: Option<f64>,
    pub expected_cash: Option<f64>,
    pub variance: Option<f64>,
    pub opened_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, Serialize)]
pub struct NewShift {
    pub station_id: Uuid,
    pub opening_cash: f64,
}

impl NewShift {
    pub fn validate(&self) -> Result<(), ModelError> {
        if !self.opening_cash.is_finite() || self.opening_cash < 0.0 {
            return Err(ModelError::Validation("opening_cash must be zero or positive".into()));
        }
        Ok(())
    }
}

#[derive(Clone, Debug)]
pub struct CloseShift {
    pub shift_id: Uuid,
    pub closing_cash: f64,
}

impl CloseShift {
    pub fn validate(&self) -> Result<(), ModelError> {
        if !self.closing_cash.is_finite() || self.closing_cash < 0.0 {
            return Err(ModelError::Validation("closing_cash must be zero or positive".into()));
        }
        Ok(())
    }
}
