//! Oil marketing companies.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde_json::json;
use tracing::instrument;
use uuid::Uuid;

use client::RequestOptions;
use common::{ServiceError, ServiceResponse};
use models::omc::{NewOmc, Omc, OmcUpdate};
use models::tables;
use store::query::TableQuery;

use crate::ctx::{require_admin, Ctx};
use crate::shape;

// OMCs change rarely; a long TTL keeps dropdowns cheap.
const LIST_TTL: Duration = Duration::from_secs(600);
const LIST_KEY: &str = "omcs:list";

pub struct OmcsService {
    ctx: Arc<Ctx>,
}

impl OmcsService {
    pub(crate) fn new(ctx: Arc<Ctx>) -> Self {
        Self { ctx }
    }

    pub async fn list(&self) -> ServiceResponse<Vec<Omc>> {
        let opts = RequestOptions::new().cached(LIST_KEY, LIST_TTL).retries(2);
        let tables_store = Arc::clone(&self.ctx.tables);
        self.ctx
            .dispatcher
            .handle("omcs.list", opts, move || {
                let tables_store = Arc::clone(&tables_store);
                async move {
                    let query = TableQuery::new(tables::OMCS).eq("active", true).order("name");
                    let result = tables_store.select(query).await.map_err(ServiceError::from)?;
                    shape::decode_rows(result.rows)
                }
            })
            .await
    }

    pub async fn get(&self, id: Uuid) -> ServiceResponse<Omc> {
        let tables_store = Arc::clone(&self.ctx.tables);
        self.ctx
            .dispatcher
            .handle("omcs.get", RequestOptions::new(), move || {
                let tables_store = Arc::clone(&tables_store);
                async move {
                    let query = TableQuery::new(tables::OMCS).eq("id", id.to_string());
                    let result = tables_store.select(query).await.map_err(ServiceError::from)?;
                    shape::decode_one(result.rows, "OMC")
                }
            })
            .await
    }

    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create(&self, input: NewOmc) -> ServiceResponse<Omc> {
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
            .handle("omcs.create", RequestOptions::new().authenticated().logged(), move || {
                let tables_store = Arc::clone(&tables_store);
                let input = input.clone();
                async move {
                    let row = json!({
                        "id": Uuid::new_v4(),
                        "name": input.name,
                        "license_number": input.license_number,
                        "contact_email": input.contact_email,
                        "active": true,
                        "created_at": Utc::now(),
                    });
                    let rows = tables_store
                        .insert(tables::OMCS, vec![row])
                        .await
                        .map_err(ServiceError::from)?;
                    shape::decode_one(rows, "OMC")
                }
            })
            .await;
        if resp.is_success() {
            self.ctx.cache.invalidate(LIST_KEY);
        }
        resp
    }

    #[instrument(skip(self, update))]
    pub async fn update(&self, id: Uuid, update: OmcUpdate) -> ServiceResponse<Omc> {
        if let Err(err) = self.ctx.actor().await.and_then(|a| require_admin(&a)) {
            return ServiceResponse::failure(&err);
        }
        let tables_store = Arc::clone(&self.ctx.tables);
        let resp = self
            .ctx
            .dispatcher
            .handle("omcs.update", RequestOptions::new().authenticated().logged(), move || {
                let tables_store = Arc::clone(&tables_store);
                let update = update.clone();
                async move {
                    let patch = serde_json::to_value(&update)
                        .map_err(|e| ServiceError::Unexpected(e.to_string()))?;
                    let query = TableQuery::new(tables::OMCS).eq("id", id.to_string());
                    let rows = tables_store.update(query, patch).await.map_err(ServiceError::from)?;
                    shape::decode_one(rows, "OMC")
                }
            })
            .await;
        if resp.is_success() {
            self.ctx.cache.invalidate(LIST_KEY);
        }
        resp
    }
}
