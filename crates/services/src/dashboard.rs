//! Aggregated dashboard numbers. Sequential fetches, no transactional view:
//! the four counts may be mutually inconsistent under concurrent writes.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use client::RequestOptions;
use common::{ServiceError, ServiceResponse};
use models::tables;
use store::query::TableQuery;

use crate::ctx::Ctx;
use crate::shape;

const OVERVIEW_TTL: Duration = Duration::from_secs(60);
const OVERVIEW_KEY: &str = "dashboard:overview";

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct Overview {
    pub active_stations: u64,
    pub sales_today: f64,
    pub open_violations: u64,
    pub pending_expenses: u64,
}

pub struct DashboardService {
    ctx: Arc<Ctx>,
}

impl DashboardService {
    pub(crate) fn new(ctx: Arc<Ctx>) -> Self {
        Self { ctx }
    }

    pub async fn overview(&self) -> ServiceResponse<Overview> {
        let opts = RequestOptions::new().cached(OVERVIEW_KEY, OVERVIEW_TTL).retries(2);
        let tables_store = Arc::clone(&self.ctx.tables);
        self.ctx
            .dispatcher
            .handle("dashboard.overview", opts, move || {
                let tables_store = Arc::clone(&tables_store);
                async move {
                    let count = |query: TableQuery| {
                        let tables_store = Arc::clone(&tables_store);
                        async move {
                            let result = tables_store
                                .select(query.select("id").with_count().range(0, 1))
                                .await
                                .map_err(ServiceError::from)?;
                            Ok::<u64, ServiceError>(result.total.unwrap_or(result.rows.len() as u64))
                        }
                    };
                    let active_stations = count(TableQuery::new(tables::STATIONS).eq("active", true)).await?;
                    let open_violations = count(TableQuery::new(tables::VIOLATIONS).eq("status", "open")).await?;
                    let pending_expenses = count(TableQuery::new(tables::EXPENSES).eq("status", "pending")).await?;
                    let today = Utc::now().date_naive().to_string();
                    let sales = tables_store
                        .select(TableQuery::new(tables::SALES).eq("sold_on", today))
                        .await
                        .map_err(ServiceError::from)?;
                    Ok(Overview {
                        active_stations,
                        sales_today: shape::sum_field(&sales.rows, "amount"),
                        open_violations,
                        pending_expenses,
                    })
                }
            })
            .await
    }
}
