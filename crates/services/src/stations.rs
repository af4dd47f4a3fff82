//! Station registry.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde_json::json;
use tracing::instrument;
use uuid::Uuid;

use client::RequestOptions;
use common::{PageInfo, Pagination, ServiceError, ServiceResponse};
use models::station::{NewStation, Station, StationFilter, StationUpdate};
use models::tables;
use store::query::TableQuery;

use crate::ctx::{require_admin, scope_to_omc, Ctx};
use crate::shape;

const LIST_TTL: Duration = Duration::from_secs(5);
const GET_TTL: Duration = Duration::from_secs(30);

pub struct StationsService {
    ctx: Arc<Ctx>,
}

impl StationsService {
    pub(crate) fn new(ctx: Arc<Ctx>) -> Self {
        Self { ctx }
    }

    fn list_key(page: u32, per_page: u32, filter: &StationFilter) -> String {
        format!(
            "stations:list:{}:{}:{}:{}:{}",
            page,
            per_page,
            filter.region.as_deref().unwrap_or("-"),
            filter.omc_id.map(|id| id.to_string()).unwrap_or_else(|| "-".into()),
            filter.active.map(|a| a.to_string()).unwrap_or_else(|| "-".into()),
        )
    }

    /// Drop the list entries a mutation is known to affect.
    pub(crate) fn invalidate_lists(&self) {
        let default = Pagination::default();
        self.ctx
            .cache
            .invalidate(&Self::list_key(default.page, default.per_page, &StationFilter::default()));
    }

    pub async fn list(&self, filter: StationFilter, page: Pagination) -> ServiceResponse<Vec<Station>> {
        let (page_n, per_page) = page.normalize();
        let (offset, limit) = page.window();
        let opts = RequestOptions::new().cached(Self::list_key(page_n, per_page, &filter), LIST_TTL).retries(2);
        let ctx = Arc::clone(&self.ctx);
        self.ctx
            .dispatcher
            .handle_paged("stations.list", opts, move || {
                let ctx = Arc::clone(&ctx);
                let filter = filter.clone();
                async move {
                    let actor = ctx.actor().await.ok();
                    let mut query = TableQuery::new(tables::STATIONS)
                        .order("name")
                        .with_count()
                        .range(offset, limit);
                    if let Some(region) = &filter.region {
                        query = query.eq("region", region.clone());
                    }
                    if let Some(omc_id) = filter.omc_id {
                        query = query.eq("omc_id", omc_id.to_string());
                    }
                    if let Some(active) = filter.active {
                        query = query.eq("active", active);
                    }
                    if let Some(actor) = &actor {
                        query = scope_to_omc(query, actor);
                    }
                    let result = ctx.tables.select(query).await.map_err(ServiceError::from)?;
                    let total = result.total.unwrap_or(result.rows.len() as u64);
                    let stations = shape::decode_rows(result.rows)?;
                    Ok((stations, PageInfo::compute(page_n, per_page, total)))
                }
            })
            .await
    }

    pub async fn get(&self, id: Uuid) -> ServiceResponse<Station> {
        let opts = RequestOptions::new().cached(format!("stations:get:{}", id), GET_TTL).retries(2);
        let tables_store = Arc::clone(&self.ctx.tables);
        self.ctx
            .dispatcher
            .handle("stations.get", opts, move || {
                let tables_store = Arc::clone(&tables_store);
                async move {
                    let query = TableQuery::new(tables::STATIONS).eq("id", id.to_string());
                    let result = tables_store.select(query).await.map_err(ServiceError::from)?;
                    shape::decode_one(result.rows, "station")
                }
            })
            .await
    }

    #[instrument(skip(self, input), fields(code = %input.code))]
    pub async fn create(&self, input: NewStation) -> ServiceResponse<Station> {
        if let Err(err) = input.validate() {
            return ServiceResponse::failure(&err.into());
        }
        if let Err(err) = self.ctx.actor().await.and_then(|a| require_admin(&a)) {
            return ServiceResponse::failure(&err);
        }
        let tables_store = Arc::clone(&self.ctx.tables);
        let resp = self
            .ctx
            .dispatcher
            .handle(
                "stations.create",
                RequestOptions::new().authenticated().logged(),
                move || {
                    let tables_store = Arc::clone(&tables_store);
                    let input = input.clone();
                    async move {
                        let row = json!({
                            "id": Uuid::new_v4(),
                            "name": input.name,
                            "code": input.code,
                            "region": input.region,
                            "address": input.address,
                            "omc_id": input.omc_id,
                            "dealer_id": null,
                            "active": true,
                            "created_at": Utc::now(),
                            "updated_at": null,
                        });
                        let rows = tables_store
                            .insert(tables::STATIONS, vec![row])
                            .await
                            .map_err(ServiceError::from)?;
                        shape::decode_one(rows, "station")
                    }
                },
            )
            .await;
        if resp.is_success() {
            self.invalidate_lists();
        }
        resp
    }

    #[instrument(skip(self, update))]
    pub async fn update(&self, id: Uuid, update: StationUpdate) -> ServiceResponse<Station> {
        if update.is_empty() {
            return ServiceResponse::failure(&ServiceError::validation("no fields to update"));
        }
        if let Err(err) = update.validate() {
            return ServiceResponse::failure(&err.into());
        }
        if let Err(err) = self.ctx.actor().await.and_then(|a| require_admin(&a)) {
            return ServiceResponse::failure(&err);
        }
        let tables_store = Arc::clone(&self.ctx.tables);
        let resp = self
            .ctx
            .dispatcher
            .handle(
                "stations.update",
                RequestOptions::new().authenticated().logged(),
                move || {
                    let tables_store = Arc::clone(&tables_store);
                    let update = update.clone();
                    async move {
                        let mut patch = serde_json::to_value(&update)
                            .map_err(|e| ServiceError::Unexpected(e.to_string()))?;
                        if let Some(obj) = patch.as_object_mut() {
                            obj.insert("updated_at".into(), json!(Utc::now()));
                        }
                        let query = TableQuery::new(tables::STATIONS).eq("id", id.to_string());
                        let rows =
                            tables_store.update(query, patch).await.map_err(ServiceError::from)?;
                        shape::decode_one(rows, "station")
                    }
                },
            )
            .await;
        if resp.is_success() {
            self.ctx.cache.invalidate(&format!("stations:get:{}", id));
            self.invalidate_lists();
        }
        resp
    }

    #[instrument(skip(self))]
    pub async fn set_active(&self, id: Uuid, active: bool) -> ServiceResponse<Station> {
        if let Err(err) = self.ctx.actor().await.and_then(|a| require_admin(&a)) {
            return ServiceResponse::failure(&err);
        }
        let tables_store = Arc::clone(&self.ctx.tables);
        let resp = self
            .ctx
            .dispatcher
            .handle(
                "stations.set_active",
                RequestOptions::new().authenticated().logged(),
                move || {
                    let tables_store = Arc::clone(&tables_store);
                    async move {
                        let query = TableQuery::new(tables::STATIONS).eq("id", id.to_string());
                        let patch = json!({ "active": active, "updated_at": Utc::now() });
                        let rows =
                            tables_store.update(query, patch).await.map_err(ServiceError::from)?;
                        shape::decode_one(rows, "station")
                    }
                },
            )
            .await;
        if resp.is_success() {
            self.ctx.cache.invalidate(&format!("stations:get:{}", id));
            self.invalidate_lists();
        }
        resp
    }
}
