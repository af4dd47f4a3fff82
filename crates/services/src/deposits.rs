//! Bank deposits and the deposits-vs-sales daily summary.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use serde_json::json;
use tracing::instrument;
use uuid::Uuid;

use client::RequestOptions;
use common::{PageInfo, Pagination, ServiceError, ServiceResponse};
use models::deposit::{DailySummary, Deposit, NewDeposit};
use models::tables;
use store::query::TableQuery;

use crate::ctx::Ctx;
use crate::shape;

pub struct DepositsService {
    ctx: Arc<Ctx>,
}

impl DepositsService {
    pub(crate) fn new(ctx: Arc<Ctx>) -> Self {
        Self { ctx }
    }

    #[instrument(skip(self, input), fields(station = %input.station_id))]
    pub async fn record(&self, input: NewDeposit) -> ServiceResponse<Deposit> {
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
            .handle("deposits.record", RequestOptions::new().authenticated().logged(), move || {
                let tables_store = Arc::clone(&tables_store);
                let input = input.clone();
                async move {
                    let row = json!({
                        "id": Uuid::new_v4(),
                        "station_id": input.station_id,
                        "amount": input.amount,
                        "bank_reference": input.bank_reference,
                        "deposited_by": actor_id,
                        "deposited_on": input.deposited_on,
                        "created_at": Utc::now(),
                    });
                    let rows = tables_store
                        .insert(tables::DEPOSITS, vec![row])
                        .await
                        .map_err(ServiceError::from)?;
                    shape::decode_one(rows, "deposit")
                }
            })
            .await
    }

    pub async fn list(&self, station_id: Uuid, page: Pagination) -> ServiceResponse<Vec<Deposit>> {
        let (page_n, per_page) = page.normalize();
        let (offset, limit) = page.window();
        let tables_store = Arc::clone(&self.ctx.tables);
        self.ctx
            .dispatcher
            .handle_paged("deposits.list", RequestOptions::new(), move || {
                let tables_store = Arc::clone(&tables_store);
                async move {
                    let query = TableQuery::new(tables::DEPOSITS)
                        .eq("station_id", station_id.to_string())
                        .order_desc("deposited_on")
                        .with_count()
                        .range(offset, limit);
                    let result = tables_store.select(query).await.map_err(ServiceError::from)?;
                    let total = result.total.unwrap_or(result.rows.len() as u64);
                    let deposits = shape::decode_rows(result.rows)?;
                    Ok((deposits, PageInfo::compute(page_n, per_page, total)))
                }
            })
            .await
    }

    /// How much of the day's takings made it to the bank.
    pub async fn daily_summary(&self, station_id: Uuid, day: NaiveDate) -> ServiceResponse<DailySummary> {
        let tables_store = Arc::clone(&self.ctx.tables);
        self.ctx
            .dispatcher
            .handle("deposits.daily_summary", RequestOptions::new(), move || {
                let tables_store = Arc::clone(&tables_store);
                async move {
                    let deposits = tables_store
                        .select(
                            TableQuery::new(tables::DEPOSITS)
                                .eq("station_id", station_id.to_string())
                                .eq("deposited_on", day.to_string()),
                        )
                        .await
                        .map_err(ServiceError::from)?;
                    let sales = tables_store
                        .select(
                            TableQuery::new(tables::SALES)
                                .eq("station_id", station_id.to_string())
                                .eq("sold_on", day.to_string()),
                        )
                        .await
                        .map_err(ServiceError::from)?;
                    let deposited = shape::sum_field(&deposits.rows, "amount");
                    let sold = shape::sum_field(&sales.rows, "amount");
                    Ok(DailySummary { deposited, sold, shortfall: sold - deposited })
                }
            })
            .await
    }
}
