use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use common::ServiceError;

/// One audit record: who did what, how long it took, and whether it worked.
#[derive(Clone, Debug, Serialize)]
pub struct ActivityEntry {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub operation: String,
    pub success: bool,
    pub duration_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ActivityEntry {
    pub fn new(operation: &str, user_id: Option<Uuid>, success: bool, duration_ms: u64) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            operation: operation.to_string(),
            success,
            duration_ms,
            detail: None,
            created_at: Utc::now(),
        }
    }
}

/// Injected audit sink. A failing sink must never affect the primary
/// response; the dispatcher swallows record errors.
#[async_trait]
pub trait ActivityLogger: Send + Sync {
    async fn record(&self, entry: ActivityEntry) -> Result<(), ServiceError>;
}

pub struct NoopActivityLogger;

#[async_trait]
impl ActivityLogger for NoopActivityLogger {
    async fn record(&self, _entry: ActivityEntry) -> Result<(), ServiceError> {
        Ok(())
    }
}

/// In-memory sinks for tests.
pub mod mock {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct MemoryActivityLogger {
        entries: Mutex<Vec<ActivityEntry>>,
    }

    impl MemoryActivityLogger {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn entries(&self) -> Vec<ActivityEntry> {
            self.entries.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ActivityLogger for MemoryActivityLogger {
        async fn record(&self, entry: ActivityEntry) -> Result<(), ServiceError> {
            self.entries.lock().unwrap().push(entry);
            Ok(())
        }
    }

    /// Always fails; used to prove audit failures are swallowed.
    pub struct FailingActivityLogger;

    #[async_trait]
    impl ActivityLogger for FailingActivityLogger {
        async fn record(&self, _entry: ActivityEntry) -> Result<(), ServiceError> {
            Err(ServiceError::Unavailable { status: 503, message: "audit sink down".into() })
        }
    }
}
