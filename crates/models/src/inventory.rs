use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::enums::{FuelType, InventoryKind};
use crate::errors::{positive, ModelError};

/// One tank reading (dip) or stock delivery.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InventoryRecord {
    pub id: Uuid,
    pub station_id: Uuid,
    pub fuel_type: FuelType,
    pub kind: InventoryKind,
    pub litres: f64,
    pub recorded_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize)]
pub struct NewInventoryRecord {
    pub station_id: Uuid,
    pub fuel_type: FuelType,
    pub kind: InventoryKind,
    pub litres: f64,
}

impl NewInventoryRecord {
    pub fn validate(&self) -> Result<(), ModelError> {
        match self.kind {
            // A dip of zero is a legitimate empty-tank reading.
            InventoryKind::Dip => {
                if !self.litres.is_finite() || self.litres < 0.0 {
                    return Err(ModelError::Validation("litres must be zero or positive".into()));
                }
                Ok(())
            }
            InventoryKind::Delivery => positive(self.litres, "litres"),
        }
    }
}

/// Latest dip per fuel type at a station.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FuelLevel {
    pub fuel_type: FuelType,
    pub litres: f64,
    pub recorded_at: DateTime<Utc>,
}
