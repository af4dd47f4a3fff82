use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::enums::{ViolationCategory, ViolationStatus};
use crate::errors::{non_empty, ModelError};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Violation {
    pub id: Uuid,
    pub station_id: Uuid,
    pub category: ViolationCategory,
    pub status: ViolationStatus,
    pub description: String,
    pub photo_url: Option<String>,
    pub reported_by: Option<Uuid>,
    pub resolved_by: Option<Uuid>,
    pub fine_amount: Option<f64>,
    pub resolution_note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug)]
pub struct NewViolation {
    pub station_id: Uuid,
    pub category: ViolationCategory,
    pub description: String,
    /// Raw photo bytes; uploaded to blob storage before the row is inserted.
    pub photo: Option<ViolationPhoto>,
}

#[derive(Clone, Debug)]
pub struct ViolationPhoto {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

impl NewViolation {
    pub fn validate(&self) -> Result<(), ModelError> {
        non_empty(&self.description, "description")?;
        if let Some(photo) = &self.photo {
            if photo.bytes.is_empty() {
                return Err(ModelError::Validation("photo is empty".into()));
            }
            if !photo.content_type.starts_with("image/") {
                return Err(ModelError::Validation("photo must be an image".into()));
            }
        }
        Ok(())
    }
}

/// Counts by status, as returned by the stats operation.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct ViolationStats {
    pub open: u64,
    pub under_review: u64,
    pub resolved: u64,
    pub dismissed: u64,
}

impl ViolationStats {
    pub fn total(&self) -> u64 {
        self.open + self.under_review + self.resolved + self.dismissed
    }
}
