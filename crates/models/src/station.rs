use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{non_empty, ModelError};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Station {
    pub id: Uuid,
    pub name: String,
    pub code: String,
    pub region: String,
    pub address: Option<String>,
    pub omc_id: Option<Uuid>,
    pub dealer_id: Option<Uuid>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, Serialize)]
pub struct NewStation {
    pub name: String,
    pub code: String,
    pub region: String,
    pub address: Option<String>,
    pub omc_id: Option<Uuid>,
}

impl NewStation {
    pub fn validate(&self) -> Result<(), ModelError> {
        non_empty(&self.name, "name")?;
        non_empty(&self.region, "region")?;
        // Station codes follow the regulator's format: 2+ alphanumerics.
        if self.code.trim().len() < 2 || !self.code.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return Err(ModelError::Validation("code must be at least 2 alphanumeric characters".into()));
        }
        Ok(())
    }
}

/// Partial update; only present fields are written.
#[derive(Clone, Debug, Default, Serialize)]
pub struct StationUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub omc_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dealer_id: Option<Uuid>,
}

impl StationUpdate {
    pub fn validate(&self) -> Result<(), ModelError> {
        if let Some(name) = &self.name {
            non_empty(name, "name")?;
        }
        if let Some(region) = &self.region {
            non_empty(region, "region")?;
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.region.is_none()
            && self.address.is_none()
            && self.omc_id.is_none()
            && self.dealer_id.is_none()
    }
}

/// List filter; every field narrows the result when present.
#[derive(Clone, Debug, Default)]
pub struct StationFilter {
    pub region: Option<String>,
    pub omc_id: Option<Uuid>,
    pub active: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_station_rejects_bad_code() {
        let mut s = NewStation {
            name: "Shell Adenta".into(),
            code: "G".into(),
            region: "Greater Accra".into(),
            address: None,
            omc_id: None,
        };
        assert!(s.validate().is_err());
        s.code = "GA-104".into();
        assert!(s.validate().is_ok());
    }

    #[test]
    fn empty_update_is_detected() {
        assert!(StationUpdate::default().is_empty());
    }
}
