use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A key/value application setting (JSON value, backend-owned schema).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AppSetting {
    pub key: String,
    pub value: serde_json::Value,
    pub updated_at: DateTime<Utc>,
}
