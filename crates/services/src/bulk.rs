//! Bulk imports. Inserts go out in fixed-size chunks; a failed chunk is
//! recorded row by row and the import carries on. Nothing is rolled back.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::instrument;
use uuid::Uuid;

use client::RequestOptions;
use common::{ServiceError, ServiceResponse};
use models::price::NewPrice;
use models::station::NewStation;
use models::tables;
use store::TableStore;

use crate::ctx::{require_admin, Ctx};

const CHUNK_SIZE: usize = 50;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BulkFailure {
    /// Zero-based index into the submitted rows.
    pub index: usize,
    pub message: String,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct BulkOutcome {
    pub inserted: u64,
    pub failures: Vec<BulkFailure>,
}

pub struct BulkService {
    ctx: Arc<Ctx>,
}

impl BulkService {
    pub(crate) fn new(ctx: Arc<Ctx>) -> Self {
        Self { ctx }
    }

    #[instrument(skip(self, rows), fields(rows = rows.len()))]
    pub async fn import_stations(&self, rows: Vec<NewStation>) -> ServiceResponse<BulkOutcome> {
        if let Err(err) = self.ctx.actor().await.and_then(|a| require_admin(&a)) {
            return ServiceResponse::failure(&err);
        }
        let tables_store = Arc::clone(&self.ctx.tables);
        let resp = self
            .ctx
            .dispatcher
            .handle("bulk.import_stations", RequestOptions::new().authenticated().logged(), move || {
                let tables_store = Arc::clone(&tables_store);
                let rows = rows.clone();
                async move {
                    let mut outcome = BulkOutcome::default();
                    let mut valid = Vec::with_capacity(rows.len());
                    for (index, station) in rows.iter().enumerate() {
                        match station.validate() {
                            Ok(()) => valid.push((
                                index,
                                json!({
                                    "id": Uuid::new_v4(),
                                    "name": station.name,
                                    "code": station.code,
                                    "region": station.region,
                                    "address": station.address,
                                    "omc_id": station.omc_id,
                                    "dealer_id": null,
                                    "active": true,
                                    "created_at": Utc::now(),
                                    "updated_at": null,
                                }),
                            )),
                            Err(err) => outcome
                                .failures
                                .push(BulkFailure { index, message: err.to_string() }),
                        }
                    }
                    insert_chunks(&*tables_store, tables::STATIONS, valid, &mut outcome).await;
                    Ok(outcome)
                }
            })
            .await;
        if resp.is_success() {
            crate::stations::StationsService::new(Arc::clone(&self.ctx)).invalidate_lists();
        }
        resp
    }

    #[instrument(skip(self, rows), fields(rows = rows.len()))]
    pub async fn import_prices(&self, rows: Vec<NewPrice>) -> ServiceResponse<BulkOutcome> {
        let actor = match self.ctx.actor().await {
            Ok(actor) => actor,
            Err(err) => return ServiceResponse::failure(&err),
        };
        if let Err(err) = require_admin(&actor) {
            return ServiceResponse::failure(&err);
        }
        let stations: BTreeSet<Uuid> = rows.iter().map(|r| r.station_id).collect();
        let tables_store = Arc::clone(&self.ctx.tables);
        let actor_id = actor.id;
        let resp = self
            .ctx
            .dispatcher
            .handle("bulk.import_prices", RequestOptions::new().authenticated().logged(), move || {
                let tables_store = Arc::clone(&tables_store);
                let rows = rows.clone();
                async move {
                    let mut outcome = BulkOutcome::default();
                    let mut valid = Vec::with_capacity(rows.len());
                    let now = Utc::now();
                    for (index, price) in rows.iter().enumerate() {
                        match price.validate() {
                            Ok(()) => valid.push((
                                index,
                                json!({
                                    "id": Uuid::new_v4(),
                                    "station_id": price.station_id,
                                    "fuel_type": price.fuel_type,
                                    "price": price.price,
                                    "set_by": actor_id,
                                    "effective_from": now,
                                    "created_at": now,
                                }),
                            )),
                            Err(err) => outcome
                                .failures
                                .push(BulkFailure { index, message: err.to_string() }),
                        }
                    }
                    insert_chunks(&*tables_store, tables::FUEL_PRICES, valid, &mut outcome).await;
                    Ok(outcome)
                }
            })
            .await;
        if resp.is_success() {
            for station in stations {
                self.ctx.cache.invalidate(&format!("prices:board:{}", station));
            }
        }
        resp
    }
}

/// Insert pre-validated rows in chunks. A chunk that fails marks each of its
/// rows failed and the remaining chunks still go out.
async fn insert_chunks(
    tables_store: &dyn TableStore,
    table: &str,
    rows: Vec<(usize, serde_json::Value)>,
    outcome: &mut BulkOutcome,
) {
    for chunk in rows.chunks(CHUNK_SIZE) {
        let payload: Vec<_> = chunk.iter().map(|(_, row)| row.clone()).collect();
        match tables_store.insert(table, payload).await {
            Ok(inserted) => outcome.inserted += inserted.len() as u64,
            Err(err) => {
                let message = ServiceError::from(err).to_string();
                for (index, _) in chunk {
                    outcome.failures.push(BulkFailure { index: *index, message: message.clone() });
                }
            }
        }
    }
}
