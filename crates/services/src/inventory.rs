//! Tank inventory: dips, deliveries, current levels.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde_json::json;
use tracing::instrument;
use uuid::Uuid;

use client::RequestOptions;
use common::{PageInfo, Pagination, ServiceError, ServiceResponse};
use models::inventory::{FuelLevel, InventoryRecord, NewInventoryRecord};
use models::{tables, InventoryKind};
use store::query::TableQuery;

use crate::ctx::Ctx;
use crate::shape;

const LEVELS_TTL: Duration = Duration::from_secs(60);

pub struct InventoryService {
    ctx: Arc<Ctx>,
}

impl InventoryService {
    pub(crate) fn new(ctx: Arc<Ctx>) -> Self {
        Self { ctx }
    }

    fn levels_key(station_id: Uuid) -> String {
        format!("inventory:levels:{}", station_id)
    }

    pub async fn record_dip(&self, input: NewInventoryRecord) -> ServiceResponse<InventoryRecord> {
        self.record("inventory.record_dip", InventoryKind::Dip, input).await
    }

    pub async fn record_delivery(&self, input: NewInventoryRecord) -> ServiceResponse<InventoryRecord> {
        self.record("inventory.record_delivery", InventoryKind::Delivery, input).await
    }

    #[instrument(skip(self, input), fields(station = %input.station_id))]
    async fn record(
        &self,
        operation: &str,
        kind: InventoryKind,
        mut input: NewInventoryRecord,
    ) -> ServiceResponse<InventoryRecord> {
        input.kind = kind;
        if let Err(err) = input.validate() {
            return ServiceResponse::failure(&err.into());
        }
        let actor = match self.ctx.actor().await {
            Ok(actor) => actor,
            Err(err) => return ServiceResponse::failure(&err),
        };
        let tables_store = Arc::clone(&self.ctx.tables);
        let actor_id = actor.id;
        let resp: ServiceResponse<InventoryRecord> = self
            .ctx
            .dispatcher
            .handle(operation, RequestOptions::new().authenticated().logged(), move || {
                let tables_store = Arc::clone(&tables_store);
                let input = input.clone();
                async move {
                    let row = json!({
                        "id": Uuid::new_v4(),
                        "station_id": input.station_id,
                        "fuel_type": input.fuel_type,
                        "kind": input.kind,
                        "litres": input.litres,
                        "recorded_by": actor_id,
                        "created_at": Utc::now(),
                    });
                    let rows = tables_store
                        .insert(tables::INVENTORY, vec![row])
                        .await
                        .map_err(ServiceError::from)?;
                    shape::decode_one(rows, "inventory record")
                }
            })
            .await;
        if resp.is_success() {
            if let Some(record) = &resp.data {
                self.ctx.cache.invalidate(&Self::levels_key(record.station_id));
            }
        }
        resp
    }

    /// Latest dip per fuel type.
    pub async fn levels(&self, station_id: Uuid) -> ServiceResponse<Vec<FuelLevel>> {
        let opts = RequestOptions::new().cached(Self::levels_key(station_id), LEVELS_TTL).retries(2);
        let tables_store = Arc::clone(&self.ctx.tables);
        self.ctx
            .dispatcher
            .handle("inventory.levels", opts, move || {
                let tables_store = Arc::clone(&tables_store);
                async move {
                    let query = TableQuery::new(tables::INVENTORY)
                        .eq("station_id", station_id.to_string())
                        .eq("kind", "dip")
                        .order_desc("created_at");
                    let result = tables_store.select(query).await.map_err(ServiceError::from)?;
                    let records: Vec<InventoryRecord> = shape::decode_rows(result.rows)?;
                    let mut levels: Vec<FuelLevel> = Vec::new();
                    for record in records {
                        if !levels.iter().any(|l| l.fuel_type == record.fuel_type) {
                            levels.push(FuelLevel {
                                fuel_type: record.fuel_type,
                                litres: record.litres,
                                recorded_at: record.created_at,
                            });
                        }
                    }
                    Ok(levels)
                }
            })
            .await
    }

    /// Levels below `threshold_litres`.
    pub async fn low_stock(&self, station_id: Uuid, threshold_litres: f64) -> ServiceResponse<Vec<FuelLevel>> {
        let levels = self.levels(station_id).await;
        if !levels.is_success() {
            return levels;
        }
        let mut resp = levels;
        if let Some(data) = resp.data.take() {
            resp.data = Some(data.into_iter().filter(|l| l.litres < threshold_litres).collect());
        }
        resp
    }

    pub async fn history(&self, station_id: Uuid, page: Pagination) -> ServiceResponse<Vec<InventoryRecord>> {
        let (page_n, per_page) = page.normalize();
        let (offset, limit) = page.window();
        let tables_store = Arc::clone(&self.ctx.tables);
        self.ctx
            .dispatcher
            .handle_paged("inventory.history", RequestOptions::new(), move || {
                let tables_store = Arc::clone(&tables_store);
                async move {
                    let query = TableQuery::new(tables::INVENTORY)
                        .eq("station_id", station_id.to_string())
                        .order_desc("created_at")
                        .with_count()
                        .range(offset, limit);
                    let result = tables_store.select(query).await.map_err(ServiceError::from)?;
                    let total = result.total.unwrap_or(result.rows.len() as u64);
                    let records = shape::decode_rows(result.rows)?;
                    Ok((records, PageInfo::compute(page_n, per_page, total)))
                }
            })
            .await
    }
}
