use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An audit-log row as stored in the backend.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ActivityLog {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub operation: String,
    pub success: bool,
    pub duration_ms: u64,
    pub detail: Option<String>,
    pub created_at: DateTime<Utc>,
}
