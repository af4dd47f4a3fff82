use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::enums::Role;
use crate::errors::{non_empty, ModelError};

/// A user profile row; keyed by the auth identity's id.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Profile {
    pub id: Uuid,
    pub email: String,
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub role: Role,
    pub omc_id: Option<Uuid>,
    pub station_id: Option<Uuid>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

impl ProfileUpdate {
    pub fn validate(&self) -> Result<(), ModelError> {
        if let Some(name) = &self.full_name {
            non_empty(name, "full_name")?;
        }
        if let Some(phone) = &self.phone {
            if phone.trim().len() < 7 {
                return Err(ModelError::Validation("phone number looks too short".into()));
            }
        }
        Ok(())
    }
}
