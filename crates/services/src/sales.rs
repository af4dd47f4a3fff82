//! Fuel sales.

use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, Utc};
use serde_json::json;
use tracing::instrument;
use uuid::Uuid;

use client::RequestOptions;
use common::{PageInfo, Pagination, ServiceError, ServiceResponse};
use models::sale::{NewSale, Sale, SaleFilter};
use models::tables;
use store::query::TableQuery;

use crate::ctx::{scope_to_station, Ctx};
use crate::shape;

const DAILY_TOTAL_TTL: Duration = Duration::from_secs(60);

pub struct SalesService {
    ctx: Arc<Ctx>,
}

impl SalesService {
    pub(crate) fn new(ctx: Arc<Ctx>) -> Self {
        Self { ctx }
    }

    /// Record a sale; the line amount is derived, never trusted from input.
    #[instrument(skip(self, input), fields(station = %input.station_id))]
    pub async fn record(&self, input: NewSale) -> ServiceResponse<Sale> {
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
            .handle("sales.record", RequestOptions::new().authenticated().logged(), move || {
                let tables_store = Arc::clone(&tables_store);
                let input = input.clone();
                async move {
                    let row = json!({
                        "id": Uuid::new_v4(),
                        "station_id": input.station_id,
                        "shift_id": input.shift_id,
                        "fuel_type": input.fuel_type,
                        "litres": input.litres,
                        "unit_price": input.unit_price,
                        "amount": input.amount(),
                        "recorded_by": actor_id,
                        "sold_on": input.sold_on,
                        "created_at": Utc::now(),
                    });
                    let rows = tables_store
                        .insert(tables::SALES, vec![row])
                        .await
                        .map_err(ServiceError::from)?;
                    shape::decode_one(rows, "sale")
                }
            })
            .await
    }

    pub async fn list(&self, filter: SaleFilter, page: Pagination) -> ServiceResponse<Vec<Sale>> {
        let actor = match self.ctx.actor().await {
            Ok(actor) => actor,
            Err(err) => return ServiceResponse::failure(&err),
        };
        let (page_n, per_page) = page.normalize();
        let (offset, limit) = page.window();
        let tables_store = Arc::clone(&self.ctx.tables);
        self.ctx
            .dispatcher
            .handle_paged("sales.list", RequestOptions::new().authenticated(), move || {
                let tables_store = Arc::clone(&tables_store);
                let filter = filter.clone();
                let actor = actor.clone();
                async move {
                    let mut query = TableQuery::new(tables::SALES)
                        .order_desc("created_at")
                        .with_count()
                        .range(offset, limit);
                    if let Some(station_id) = filter.station_id {
                        query = query.eq("station_id", station_id.to_string());
                    }
                    if let Some(fuel) = filter.fuel_type {
                        query = query.eq("fuel_type", fuel.as_str());
                    }
                    if let Some(from) = filter.from {
                        query = query.gte("sold_on", from.to_string());
                    }
                    if let Some(to) = filter.to {
                        query = query.lte("sold_on", to.to_string());
                    }
                    query = scope_to_station(query, &actor);
                    let result = tables_store.select(query).await.map_err(ServiceError::from)?;
                    let total = result.total.unwrap_or(result.rows.len() as u64);
                    let sales = shape::decode_rows(result.rows)?;
                    Ok((sales, PageInfo::compute(page_n, per_page, total)))
                }
            })
            .await
    }

    /// Total takings for one station-day.
    pub async fn daily_total(&self, station_id: Uuid, day: NaiveDate) -> ServiceResponse<f64> {
        let opts = RequestOptions::new()
            .cached(format!("sales:daily:{}:{}", station_id, day), DAILY_TOTAL_TTL).retries(2);
        let tables_store = Arc::clone(&self.ctx.tables);
        self.ctx
            .dispatcher
            .handle("sales.daily_total", opts, move || {
                let tables_store = Arc::clone(&tables_store);
                async move {
                    let query = TableQuery::new(tables::SALES)
                        .eq("station_id", station_id.to_string())
                        .eq("sold_on", day.to_string());
                    let result = tables_store.select(query).await.map_err(ServiceError::from)?;
                    Ok(shape::sum_field(&result.rows, "amount"))
                }
            })
            .await
    }
}
