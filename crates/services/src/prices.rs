//! Pump prices and regulator caps.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde_json::json;
use tracing::instrument;
use uuid::Uuid;

use client::RequestOptions;
use common::{PageInfo, Pagination, ServiceError, ServiceResponse};
use models::price::{FuelPrice, NewPrice, PriceCap};
use models::{tables, FuelType, Role};
use store::query::TableQuery;

use crate::ctx::{require_manager, Ctx};
use crate::shape;

const BOARD_TTL: Duration = Duration::from_secs(60);

pub struct PricesService {
    ctx: Arc<Ctx>,
}

impl PricesService {
    pub(crate) fn new(ctx: Arc<Ctx>) -> Self {
        Self { ctx }
    }

    fn board_key(station_id: Uuid) -> String {
        format!("prices:board:{}", station_id)
    }

    /// Current price board: the latest posted price per fuel type.
    pub async fn board(&self, station_id: Uuid) -> ServiceResponse<Vec<FuelPrice>> {
        let opts = RequestOptions::new().cached(Self::board_key(station_id), BOARD_TTL).retries(2);
        let tables_store = Arc::clone(&self.ctx.tables);
        self.ctx
            .dispatcher
            .handle("prices.board", opts, move || {
                let tables_store = Arc::clone(&tables_store);
                async move {
                    let query = TableQuery::new(tables::FUEL_PRICES)
                        .eq("station_id", station_id.to_string())
                        .order_desc("effective_from");
                    let result = tables_store.select(query).await.map_err(ServiceError::from)?;
                    let prices: Vec<FuelPrice> = shape::decode_rows(result.rows)?;
                    // rows are newest first; keep the first per fuel
                    let mut board: Vec<FuelPrice> = Vec::new();
                    for price in prices {
                        if !board.iter().any(|p| p.fuel_type == price.fuel_type) {
                            board.push(price);
                        }
                    }
                    Ok(board)
                }
            })
            .await
    }

    /// Post a new price. Rejected when it exceeds the OMC's regulator cap.
    #[instrument(skip(self, input), fields(station = %input.station_id, fuel = input.fuel_type.as_str()))]
    pub async fn set_price(&self, input: NewPrice) -> ServiceResponse<FuelPrice> {
        if let Err(err) = input.validate() {
            return ServiceResponse::failure(&err.into());
        }
        let actor = match self.ctx.actor().await {
            Ok(actor) => actor,
            Err(err) => return ServiceResponse::failure(&err),
        };
        if let Err(err) = require_manager(&actor) {
            return ServiceResponse::failure(&err);
        }
        let tables_store = Arc::clone(&self.ctx.tables);
        let actor_id = actor.id;
        let resp: ServiceResponse<FuelPrice> = self
            .ctx
            .dispatcher
            .handle("prices.set_price", RequestOptions::new().authenticated().logged(), move || {
                let tables_store = Arc::clone(&tables_store);
                let input = input.clone();
                async move {
                    // the station's OMC decides which cap applies
                    let station = tables_store
                        .select(TableQuery::new(tables::STATIONS).eq("id", input.station_id.to_string()))
                        .await
                        .map_err(ServiceError::from)?;
                    if station.rows.is_empty() {
                        return Err(ServiceError::not_found("station"));
                    }
                    let omc_id = station.rows[0].get("omc_id").and_then(|v| v.as_str()).map(str::to_string);
                    if let Some(omc_id) = omc_id {
                        let caps = tables_store
                            .select(
                                TableQuery::new(tables::PRICE_CAPS)
                                    .eq("omc_id", omc_id)
                                    .eq("fuel_type", input.fuel_type.as_str()),
                            )
                            .await
                            .map_err(ServiceError::from)?;
                        if let Some(max) = caps.rows.first().and_then(|c| c.get("max_price")).and_then(|v| v.as_f64()) {
                            if input.price > max {
                                return Err(ServiceError::validation(format!(
                                    "price {:.2} exceeds the OMC cap of {:.2}",
                                    input.price, max
                                )));
                            }
                        }
                    }
                    let row = json!({
                        "id": Uuid::new_v4(),
                        "station_id": input.station_id,
                        "fuel_type": input.fuel_type,
                        "price": input.price,
                        "set_by": actor_id,
                        "effective_from": Utc::now(),
                        "created_at": Utc::now(),
                    });
                    let rows = tables_store
                        .insert(tables::FUEL_PRICES, vec![row])
                        .await
                        .map_err(ServiceError::from)?;
                    shape::decode_one(rows, "price")
                }
            })
            .await;
        if resp.is_success() {
            if let Some(price) = &resp.data {
                self.ctx.cache.invalidate(&Self::board_key(price.station_id));
            }
        }
        resp
    }

    /// Set the regulator cap for one OMC and fuel. Admins, or the OMC's own
    /// admin.
    #[instrument(skip(self))]
    pub async fn set_cap(&self, omc_id: Uuid, fuel_type: FuelType, max_price: f64) -> ServiceResponse<PriceCap> {
        if !(max_price.is_finite() && max_price > 0.0) {
            return ServiceResponse::failure(&ServiceError::validation("max_price must be positive"));
        }
        let actor = match self.ctx.actor().await {
            Ok(actor) => actor,
            Err(err) => return ServiceResponse::failure(&err),
        };
        let allowed = actor.role.is_admin()
            || (actor.role == Role::OmcAdmin && actor.omc_id == Some(omc_id));
        if !allowed {
            return ServiceResponse::failure(&ServiceError::permission(
                "only an admin or the OMC's own admin may set a cap",
            ));
        }
        let tables_store = Arc::clone(&self.ctx.tables);
        self.ctx
            .dispatcher
            .handle("prices.set_cap", RequestOptions::new().authenticated().logged(), move || {
                let tables_store = Arc::clone(&tables_store);
                async move {
                    // replace any existing cap for this OMC/fuel pair
                    let existing = TableQuery::new(tables::PRICE_CAPS)
                        .eq("omc_id", omc_id.to_string())
                        .eq("fuel_type", fuel_type.as_str());
                    tables_store.delete(existing).await.map_err(ServiceError::from)?;
                    let row = json!({
                        "id": Uuid::new_v4(),
                        "omc_id": omc_id,
                        "fuel_type": fuel_type,
                        "max_price": max_price,
                        "created_at": Utc::now(),
                    });
                    let rows = tables_store
                        .insert(tables::PRICE_CAPS, vec![row])
                        .await
                        .map_err(ServiceError::from)?;
                    shape::decode_one(rows, "price cap")
                }
            })
            .await
    }

    pub async fn history(&self, station_id: Uuid, page: Pagination) -> ServiceResponse<Vec<FuelPrice>> {
        let (page_n, per_page) = page.normalize();
        let (offset, limit) = page.window();
        let tables_store = Arc::clone(&self.ctx.tables);
        self.ctx
            .dispatcher
            .handle_paged("prices.history", RequestOptions::new(), move || {
                let tables_store = Arc::clone(&tables_store);
                async move {
                    let query = TableQuery::new(tables::FUEL_PRICES)
                        .eq("station_id", station_id.to_string())
                        .order_desc("effective_from")
                        .with_count()
                        .range(offset, limit);
                    let result = tables_store.select(query).await.map_err(ServiceError::from)?;
                    let total = result.total.unwrap_or(result.rows.len() as u64);
                    let prices = shape::decode_rows(result.rows)?;
                    Ok((prices, PageInfo::compute(page_n, per_page, total)))
                }
            })
            .await
    }
}
