//! Attendant shifts and cash reconciliation.

use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use tracing::instrument;
use uuid::Uuid;

use client::RequestOptions;
use common::{PageInfo, Pagination, ServiceError, ServiceResponse};
use models::shift::{CloseShift, NewShift, Shift};
use models::tables;
use store::query::TableQuery;

use crate::ctx::{require_manager, Ctx};
use crate::shape;

pub struct ShiftsService {
    ctx: Arc<Ctx>,
}

impl ShiftsService {
    pub(crate) fn new(ctx: Arc<Ctx>) -> Self {
        Self { ctx }
    }

    /// Open a shift. A station can only have one open shift at a time.
    #[instrument(skip(self, input), fields(station = %input.station_id))]
    pub async fn open(&self, input: NewShift) -> ServiceResponse<Shift> {
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
            .handle("shifts.open", RequestOptions::new().authenticated().logged(), move || {
                let tables_store = Arc::clone(&tables_store);
                let input = input.clone();
                async move {
                    let open = tables_store
                        .select(
                            TableQuery::new(tables::SHIFTS)
                                .eq("station_id", input.station_id.to_string())
                                .eq("status", "open"),
                        )
                        .await
                        .map_err(ServiceError::from)?;
                    if !open.rows.is_empty() {
                        return Err(ServiceError::validation("station already has an open shift"));
                    }
                    let row = json!({
                        "id": Uuid::new_v4(),
                        "station_id": input.station_id,
                        "attendant_id": actor_id,
                        "status": "open",
                        "opening_cash": input.opening_cash,
                        "closing_cash": null,
                        "expected_cash": null,
                        "variance": null,
                        "opened_at": Utc::now(),
                        "closed_at": null,
                    });
                    let rows = tables_store
                        .insert(tables::SHIFTS, vec![row])
                        .await
                        .map_err(ServiceError::from)?;
                    shape::decode_one(rows, "shift")
                }
            })
            .await
    }

    /// Close a shift and reconcile the drawer: expected cash is the opening
    /// float plus the shift's recorded sales; variance is what the drawer
    /// actually held minus that.
    #[instrument(skip(self, input), fields(shift = %input.shift_id))]
    pub async fn close(&self, input: CloseShift) -> ServiceResponse<Shift> {
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
        self.ctx
            .dispatcher
            .handle("shifts.close", RequestOptions::new().authenticated().logged(), move || {
                let tables_store = Arc::clone(&tables_store);
                let input = input.clone();
                async move {
                    let found = tables_store
                        .select(TableQuery::new(tables::SHIFTS).eq("id", input.shift_id.to_string()))
                        .await
                        .map_err(ServiceError::from)?;
                    let shift: Shift = shape::decode_one(found.rows, "shift")?;
                    if shift.closed_at.is_some() {
                        return Err(ServiceError::validation("shift is already closed"));
                    }
                    let sales = tables_store
                        .select(TableQuery::new(tables::SALES).eq("shift_id", input.shift_id.to_string()))
                        .await
                        .map_err(ServiceError::from)?;
                    let sold = shape::sum_field(&sales.rows, "amount");
                    let expected = shift.opening_cash + sold;
                    let variance = input.closing_cash - expected;
                    let patch = json!({
                        "status": "closed",
                        "closing_cash": input.closing_cash,
                        "expected_cash": expected,
                        "variance": variance,
                        "closed_at": Utc::now(),
                    });
                    let query = TableQuery::new(tables::SHIFTS).eq("id", input.shift_id.to_string());
                    let rows = tables_store.update(query, patch).await.map_err(ServiceError::from)?;
                    shape::decode_one(rows, "shift")
                }
            })
            .await
    }

    /// The station's open shift, if any.
    pub async fn current(&self, station_id: Uuid) -> ServiceResponse<Option<Shift>> {
        let tables_store = Arc::clone(&self.ctx.tables);
        self.ctx
            .dispatcher
            .handle("shifts.current", RequestOptions::new(), move || {
                let tables_store = Arc::clone(&tables_store);
                async move {
                    let query = TableQuery::new(tables::SHIFTS)
                        .eq("station_id", station_id.to_string())
                        .eq("status", "open");
                    let result = tables_store.select(query).await.map_err(ServiceError::from)?;
                    let mut shifts: Vec<Shift> = shape::decode_rows(result.rows)?;
                    Ok(if shifts.is_empty() { None } else { Some(shifts.swap_remove(0)) })
                }
            })
            .await
    }

    pub async fn list(&self, station_id: Uuid, page: Pagination) -> ServiceResponse<Vec<Shift>> {
        let (page_n, per_page) = page.normalize();
        let (offset, limit) = page.window();
        let tables_store = Arc::clone(&self.ctx.tables);
        self.ctx
            .dispatcher
            .handle_paged("shifts.list", RequestOptions::new(), move || {
                let tables_store = Arc::clone(&tables_store);
                async move {
                    let query = TableQuery::new(tables::SHIFTS)
                        .eq("station_id", station_id.to_string())
                        .order_desc("opened_at")
                        .with_count()
                        .range(offset, limit);
                    let result = tables_store.select(query).await.map_err(ServiceError::from)?;
                    let total = result.total.unwrap_or(result.rows.len() as u64);
                    let shifts = shape::decode_rows(result.rows)?;
                    Ok((shifts, PageInfo::compute(page_n, per_page, total)))
                }
            })
            .await
    }
}
