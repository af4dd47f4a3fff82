use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{non_empty, ModelError};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Dealer {
    pub id: Uuid,
    pub name: String,
    pub phone: Option<String>,
    pub omc_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize)]
pub struct NewDealer {
    pub name: String,
    pub phone: Option<String>,
    pub omc_id: Option<Uuid>,
}

impl NewDealer {
    pub fn validate(&self) -> Result<(), ModelError> {
        non_empty(&self.name, "name")
    }
}
