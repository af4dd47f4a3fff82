//! Station expenses and their review workflow.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde_json::json;
use tracing::instrument;
use uuid::Uuid;

use client::RequestOptions;
use common::{PageInfo, Pagination, ServiceError, ServiceResponse};
use models::expense::{Expense, NewExpense};
use models::{tables, ApprovalStatus};
use store::query::TableQuery;

use crate::ctx::{require_manager, scope_to_station, Ctx};
use crate::shape;

const MONTHLY_TTL: Duration = Duration::from_secs(300);

pub struct ExpensesService {
    ctx: Arc<Ctx>,
}

impl ExpensesService {
    pub(crate) fn new(ctx: Arc<Ctx>) -> Self {
        Self { ctx }
    }

    #[instrument(skip(self, input), fields(station = %input.station_id))]
    pub async fn submit(&self, input: NewExpense) -> ServiceResponse<Expense> {
        if let Err(err) = input.validate() {
            return ServiceResponse::failure(&err.into());
        }
        let actor = match self.ctx.actor().await {
            Ok(actor) => actor,
            Err(err) => return ServiceResponse::failure(&err),
        };
        let tables_store = Arc::clone(&self.ctx.tables);
        let actor_id = actor.id;
        self.ctx
            .dispatcher
            .handle("expenses.submit", RequestOptions::new().authenticated().logged(), move || {
                let tables_store = Arc::clone(&tables_store);
                let input = input.clone();
                async move {
                    let row = json!({
                        "id": Uuid::new_v4(),
                        "station_id": input.station_id,
                        "category": input.category,
                        "description": input.description,
                        "amount": input.amount,
                        "status": "pending",
                        "submitted_by": actor_id,
                        "reviewed_by": null,
                        "incurred_on": input.incurred_on,
                        "created_at": Utc::now(),
                    });
                    let rows = tables_store
                        .insert(tables::EXPENSES, vec![row])
                        .await
                        .map_err(ServiceError::from)?;
                    shape::decode_one(rows, "expense")
                }
            })
            .await
    }

    pub async fn list(
        &self,
        status: Option<ApprovalStatus>,
        page: Pagination,
    ) -> ServiceResponse<Vec<Expense>> {
        let actor = match self.ctx.actor().await {
            Ok(actor) => actor,
            Err(err) => return ServiceResponse::failure(&err),
        };
        let (page_n, per_page) = page.normalize();
        let (offset, limit) = page.window();
        let tables_store = Arc::clone(&self.ctx.tables);
        self.ctx
            .dispatcher
            .handle_paged("expenses.list", RequestOptions::new().authenticated(), move || {
                let tables_store = Arc::clone(&tables_store);
                let actor = actor.clone();
                async move {
                    let mut query = TableQuery::new(tables::EXPENSES)
                        .order_desc("created_at")
                        .with_count()
                        .range(offset, limit);
                    if let Some(status) = status {
                        query = query.eq("status", status.as_str());
                    }
                    query = scope_to_station(query, &actor);
                    let result = tables_store.select(query).await.map_err(ServiceError::from)?;
                    let total = result.total.unwrap_or(result.rows.len() as u64);
                    let expenses = shape::decode_rows(result.rows)?;
                    Ok((expenses, PageInfo::compute(page_n, per_page, total)))
                }
            })
            .await
    }

    /// Approve or reject a pending expense.
    #[instrument(skip(self))]
    pub async fn review(&self, id: Uuid, approve: bool) -> ServiceResponse<Expense> {
        let actor = match self.ctx.actor().await {
            Ok(actor) => actor,
            Err(err) => return ServiceResponse::failure(&err),
        };
        if let Err(err) = require_manager(&actor) {
            return ServiceResponse::failure(&err);
        }
        let tables_store = Arc::clone(&self.ctx.tables);
        let actor_id = actor.id;
        let operation = if approve { "expenses.approve" } else { "expenses.reject" };
        self.ctx
            .dispatcher
            .handle(operation, RequestOptions::new().authenticated().logged(), move || {
                let tables_store = Arc::clone(&tables_store);
                async move {
                    let current = tables_store
                        .select(TableQuery::new(tables::EXPENSES).eq("id", id.to_string()))
                        .await
                        .map_err(ServiceError::from)?;
                    let expense: Expense = shape::decode_one(current.rows, "expense")?;
                    if expense.status != ApprovalStatus::Pending {
                        return Err(ServiceError::validation("expense has already been reviewed"));
                    }
                    let status = if approve { "approved" } else { "rejected" };
                    let query = TableQuery::new(tables::EXPENSES).eq("id", id.to_string());
                    let patch = json!({ "status": status, "reviewed_by": actor_id });
                    let rows = tables_store.update(query, patch).await.map_err(ServiceError::from)?;
                    shape::decode_one(rows, "expense")
                }
            })
            .await
    }

    /// Approved spend for one station-month.
    pub async fn monthly_total(&self, station_id: Uuid, year: i32, month: u32) -> ServiceResponse<f64> {
        if !(1..=12).contains(&month) {
            return ServiceResponse::failure(&ServiceError::validation("month must be 1..=12"));
        }
        let opts = RequestOptions::new()
            .cached(format!("expenses:monthly:{}:{}-{:02}", station_id, year, month), MONTHLY_TTL).retries(2);
        let tables_store = Arc::clone(&self.ctx.tables);
        self.ctx
            .dispatcher
            .handle("expenses.monthly_total", opts, move || {
                let tables_store = Arc::clone(&tables_store);
                async move {
                    let from = format!("{:04}-{:02}-01", year, month);
                    let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
                    let to = format!("{:04}-{:02}-01", next_year, next_month);
                    let query = TableQuery::new(tables::EXPENSES)
                        .eq("station_id", station_id.to_string())
                        .eq("status", "approved")
                        .gte("incurred_on", from)
                        .lt("incurred_on", to);
                    let result = tables_store.select(query).await.map_err(ServiceError::from)?;
                    Ok(shape::sum_field(&result.rows, "amount"))
                }
            })
            .await
    }
}
