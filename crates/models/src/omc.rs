use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{non_empty, ModelError};

/// Oil marketing company.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Omc {
    pub id: Uuid,
    pub name: String,
    pub license_number: String,
    pub contact_email: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize)]
pub struct NewOmc {
    pub name: String,
    pub license_number: String,
    pub contact_email: Option<String>,
}

impl NewOmc {
    pub fn validate(&self) -> Result<(), ModelError> {
        non_empty(&self.name, "name")?;
        non_empty(&self.license_number, "license_number")?;
        if let Some(email) = &self.contact_email {
            if !email.contains('@') {
                return Err(ModelError::Validation("contact_email is not a valid address".into()));
            }
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct OmcUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
}
