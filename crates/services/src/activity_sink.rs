//! Table-backed audit sink: dispatcher activity entries become
//! `activity_logs` rows. The dispatcher swallows any failure from here.

use std::sync::Arc;

use async_trait::async_trait;

use client::{ActivityEntry, ActivityLogger};
use common::ServiceError;
use models::tables;
use store::TableStore;

pub struct TableActivityLogger {
    tables: Arc<dyn TableStore>,
}

impl TableActivityLogger {
    pub fn new(tables: Arc<dyn TableStore>) -> Self {
        Self { tables }
    }
}

#[async_trait]
impl ActivityLogger for TableActivityLogger {
    async fn record(&self, entry: ActivityEntry) -> Result<(), ServiceError> {
        let row = serde_json::to_value(&entry)
            .map_err(|e| ServiceError::Unexpected(e.to_string()))?;
        self.tables
            .insert(tables::ACTIVITY_LOGS, vec![row])
            .await
            .map_err(ServiceError::from)?;
        Ok(())
    }
}
