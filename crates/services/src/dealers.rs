//! Dealers and their station assignments.

use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use tracing::instrument;
use uuid::Uuid;

use client::RequestOptions;
use common::{PageInfo, Pagination, ServiceError, ServiceResponse};
use models::dealer::{Dealer, NewDealer};
use models::station::Station;
use models::tables;
use store::query::TableQuery;

use crate::ctx::{require_admin, Ctx};
use crate::shape;

pub struct DealersService {
    ctx: Arc<Ctx>,
}

impl DealersService {
    pub(crate) fn new(ctx: Arc<Ctx>) -> Self {
        Self { ctx }
    }

    pub async fn list(&self, page: Pagination) -> ServiceResponse<Vec<Dealer>> {
        let (page_n, per_page) = page.normalize();
        let (offset, limit) = page.window();
        let tables_store = Arc::clone(&self.ctx.tables);
        self.ctx
            .dispatcher
            .handle_paged("dealers.list", RequestOptions::new(), move || {
                let tables_store = Arc::clone(&tables_store);
                async move {
                    let query = TableQuery::new(tables::DEALERS)
                        .order("name")
                        .with_count()
                        .range(offset, limit);
                    let result = tables_store.select(query).await.map_err(ServiceError::from)?;
                    let total = result.total.unwrap_or(result.rows.len() as u64);
                    let dealers = shape::decode_rows(result.rows)?;
                    Ok((dealers, PageInfo::compute(page_n, per_page, total)))
                }
            })
            .await
    }

    pub async fn get(&self, id: Uuid) -> ServiceResponse<Dealer> {
        let tables_store = Arc::clone(&self.ctx.tables);
        self.ctx
            .dispatcher
            .handle("dealers.get", RequestOptions::new(), move || {
                let tables_store = Arc::clone(&tables_store);
                async move {
                    let query = TableQuery::new(tables::DEALERS).eq("id", id.to_string());
                    let result = tables_store.select(query).await.map_err(ServiceError::from)?;
                    shape::decode_one(result.rows, "dealer")
                }
            })
            .await
    }

    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create(&self, input: NewDealer) -> ServiceResponse<Dealer> {
        if let Err(err) = input.validate() {
            return ServiceResponse::failure(&err.into());
        }
        if let Err(err) = self.ctx.actor().await.and_then(|a| require_admin(&a)) {
            return ServiceResponse::failure(&err);
        }
        let tables_store = Arc::clone(&self.ctx.tables);
        self.ctx
            .dispatcher
            .handle("dealers.create", RequestOptions::new().authenticated().logged(), move || {
                let tables_store = Arc::clone(&tables_store);
                let input = input.clone();
                async move {
                    let row = json!({
                        "id": Uuid::new_v4(),
                        "name": input.name,
                        "phone": input.phone,
                        "omc_id": input.omc_id,
                        "created_at": Utc::now(),
                    });
                    let rows = tables_store
                        .insert(tables::DEALERS, vec![row])
                        .await
                        .map_err(ServiceError::from)?;
                    shape::decode_one(rows, "dealer")
                }
            })
            .await
    }

    /// Point a station at a dealer. The station row carries the link.
    #[instrument(skip(self))]
    pub async fn assign_station(&self, dealer_id: Uuid, station_id: Uuid) -> ServiceResponse<Station> {
        if let Err(err) = self.ctx.actor().await.and_then(|a| require_admin(&a)) {
            return ServiceResponse::failure(&err);
        }
        let tables_store = Arc::clone(&self.ctx.tables);
        let resp = self
            .ctx
            .dispatcher
            .handle(
                "dealers.assign_station",
                RequestOptions::new().authenticated().logged(),
                move || {
                    let tables_store = Arc::clone(&tables_store);
                    async move {
                        // the dealer must exist before the station points at it
                        let dealer = tables_store
                            .select(TableQuery::new(tables::DEALERS).eq("id", dealer_id.to_string()))
                            .await
                            .map_err(ServiceError::from)?;
                        if dealer.rows.is_empty() {
                            return Err(ServiceError::not_found("dealer"));
                        }
                        let query = TableQuery::new(tables::STATIONS).eq("id", station_id.to_string());
                        let patch = json!({ "dealer_id": dealer_id, "updated_at": Utc::now() });
                        let rows =
                            tables_store.update(query, patch).await.map_err(ServiceError::from)?;
                        shape::decode_one(rows, "station")
                    }
                },
            )
            .await;
        if resp.is_success() {
            self.ctx.cache.invalidate(&format!("stations:get:{}", station_id));
        }
        resp
    }
}
