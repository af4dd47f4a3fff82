//! Reading and pruning the audit trail.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::instrument;

use client::RequestOptions;
use common::{PageInfo, Pagination, ServiceError, ServiceResponse};
use models::activity_log::ActivityLog;
use models::tables;
use store::query::TableQuery;

use crate::ctx::{require_admin, Ctx};
use crate::shape;

pub struct ActivityService {
    ctx: Arc<Ctx>,
}

impl ActivityService {
    pub(crate) fn new(ctx: Arc<Ctx>) -> Self {
        Self { ctx }
    }

    pub async fn list(&self, page: Pagination) -> ServiceResponse<Vec<ActivityLog>> {
        if let Err(err) = self.ctx.actor().await.and_then(|a| require_admin(&a)) {
            return ServiceResponse::failure(&err);
        }
        let (page_n, per_page) = page.normalize();
        let (offset, limit) = page.window();
        let tables_store = Arc::clone(&self.ctx.tables);
        self.ctx
            .dispatcher
            .handle_paged("activity.list", RequestOptions::new().authenticated(), move || {
                let tables_store = Arc::clone(&tables_store);
                async move {
                    let query = TableQuery::new(tables::ACTIVITY_LOGS)
                        .order_desc("created_at")
                        .with_count()
                        .range(offset, limit);
                    let result = tables_store.select(query).await.map_err(ServiceError::from)?;
                    let total = result.total.unwrap_or(result.rows.len() as u64);
                    let entries = shape::decode_rows(result.rows)?;
                    Ok((entries, PageInfo::compute(page_n, per_page, total)))
                }
            })
            .await
    }

    /// Delete audit rows older than the cutoff. Returns how many went.
    #[instrument(skip(self))]
    pub async fn purge_older_than(&self, cutoff: DateTime<Utc>) -> ServiceResponse<u64> {
        if let Err(err) = self.ctx.actor().await.and_then(|a| require_admin(&a)) {
            return ServiceResponse::failure(&err);
        }
        let tables_store = Arc::clone(&self.ctx.tables);
        self.ctx
            .dispatcher
            .handle("activity.purge", RequestOptions::new().authenticated().logged(), move || {
                let tables_store = Arc::clone(&tables_store);
                async move {
                    let query = TableQuery::new(tables::ACTIVITY_LOGS).lt("created_at", cutoff.to_rfc3339());
                    tables_store.delete(query).await.map_err(ServiceError::from)
                }
            })
            .await
    }
}
