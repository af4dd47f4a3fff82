//! Violation reporting and resolution.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde_json::json;
use tracing::instrument;
use uuid::Uuid;

use client::RequestOptions;
use common::{PageInfo, Pagination, ServiceError, ServiceResponse};
use models::violation::{NewViolation, Violation, ViolationStats};
use models::{tables, ViolationStatus};
use store::query::TableQuery;

use crate::ctx::{require_manager, scope_to_station, Ctx};
use crate::shape;

const STATS_TTL: Duration = Duration::from_secs(60);
const STATS_KEY: &str = "violations:stats";

pub struct ViolationsService {
    ctx: Arc<Ctx>,
}

impl ViolationsService {
    pub(crate) fn new(ctx: Arc<Ctx>) -> Self {
        Self { ctx }
    }

    /// Report a violation. A photo, when supplied, is uploaded to blob
    /// storage first; the row then carries its public URL. The two steps are
    /// best-effort sequential: an orphaned photo is possible if the insert
    /// fails.
    #[instrument(skip(self, input), fields(station = %input.station_id))]
    pub async fn report(&self, input: NewViolation) -> ServiceResponse<Violation> {
        if let Err(err) = input.validate() {
            return ServiceResponse::failure(&err.into());
        }
        let actor = match self.ctx.actor().await {
            Ok(actor) => actor,
            Err(err) => return ServiceResponse::failure(&err),
        };
        let tables_store = Arc::clone(&self.ctx.tables);
        let blobs = Arc::clone(&self.ctx.blobs);
        let bucket = self.ctx.photo_bucket.clone();
        let actor_id = actor.id;
        let resp = self
            .ctx
            .dispatcher
            .handle("violations.report", RequestOptions::new().authenticated().logged(), move || {
                let tables_store = Arc::clone(&tables_store);
                let blobs = Arc::clone(&blobs);
                let bucket = bucket.clone();
                let input = input.clone();
                async move {
                    let id = Uuid::new_v4();
                    let photo_url = match &input.photo {
                        Some(photo) => {
                            let ext = photo.content_type.rsplit('/').next().unwrap_or("jpg");
                            let path = format!("violations/{}.{}", id, ext);
                            let url = blobs
                                .upload(&bucket, &path, photo.bytes.clone(), &photo.content_type)
                                .await
                                .map_err(ServiceError::from)?;
                            Some(url)
                        }
                        None => None,
                    };
                    let row = json!({
                        "id": id,
                        "station_id": input.station_id,
                        "category": input.category,
                        "status": "open",
                        "description": input.description,
                        "photo_url": photo_url,
                        "reported_by": actor_id,
                        "resolved_by": null,
                        "fine_amount": null,
                        "resolution_note": null,
                        "created_at": Utc::now(),
                        "resolved_at": null,
                    });
                    let rows = tables_store
                        .insert(tables::VIOLATIONS, vec![row])
                        .await
                        .map_err(ServiceError::from)?;
                    shape::decode_one(rows, "violation")
                }
            })
            .await;
        if resp.is_success() {
            self.ctx.cache.invalidate(STATS_KEY);
        }
        resp
    }

    pub async fn list(
        &self,
        status: Option<ViolationStatus>,
        page: Pagination,
    ) -> ServiceResponse<Vec<Violation>> {
        let actor = match self.ctx.actor().await {
            Ok(actor) => actor,
            Err(err) => return ServiceResponse::failure(&err),
        };
        let (page_n, per_page) = page.normalize();
        let (offset, limit) = page.window();
        let tables_store = Arc::clone(&self.ctx.tables);
        self.ctx
            .dispatcher
            .handle_paged("violations.list", RequestOptions::new().authenticated(), move || {
                let tables_store = Arc::clone(&tables_store);
                let actor = actor.clone();
                async move {
                    let mut query = TableQuery::new(tables::VIOLATIONS)
                        .order_desc("created_at")
                        .with_count()
                        .range(offset, limit);
                    if let Some(status) = status {
                        query = query.eq("status", status.as_str());
                    }
                    query = scope_to_station(query, &actor);
                    let result = tables_store.select(query).await.map_err(ServiceError::from)?;
                    let total = result.total.unwrap_or(result.rows.len() as u64);
                    let violations = shape::decode_rows(result.rows)?;
                    Ok((violations, PageInfo::compute(page_n, per_page, total)))
                }
            })
            .await
    }

    /// Resolve with an optional fine.
    #[instrument(skip(self, note))]
    pub async fn resolve(
        &self,
        id: Uuid,
        fine_amount: Option<f64>,
        note: Option<String>,
    ) -> ServiceResponse<Violation> {
        if let Some(fine) = fine_amount {
            if !(fine.is_finite() && fine >= 0.0) {
                return ServiceResponse::failure(&ServiceError::validation(
                    "fine_amount must be zero or positive",
                ));
            }
        }
        self.close_out("violations.resolve", id, ViolationStatus::Resolved, fine_amount, note).await
    }

    #[instrument(skip(self, note))]
    pub async fn dismiss(&self, id: Uuid, note: Option<String>) -> ServiceResponse<Violation> {
        self.close_out("violations.dismiss", id, ViolationStatus::Dismissed, None, note).await
    }

    async fn close_out(
        &self,
        operation: &str,
        id: Uuid,
        status: ViolationStatus,
        fine_amount: Option<f64>,
        note: Option<String>,
    ) -> ServiceResponse<Violation> {
        let actor = match self.ctx.actor().await {
            Ok(actor) => actor,
            Err(err) => return ServiceResponse::failure(&err),
        };
        if let Err(err) = require_manager(&actor) {
            return ServiceResponse::failure(&err);
        }
        let tables_store = Arc::clone(&self.ctx.tables);
        let actor_id = actor.id;
        let resp = self
            .ctx
            .dispatcher
            .handle(operation, RequestOptions::new().authenticated().logged(), move || {
                let tables_store = Arc::clone(&tables_store);
                let note = note.clone();
                async move {
                    let current = tables_store
                        .select(TableQuery::new(tables::VIOLATIONS).eq("id", id.to_string()))
                        .await
                        .map_err(ServiceError::from)?;
                    let violation: Violation = shape::decode_one(current.rows, "violation")?;
                    if violation.resolved_at.is_some() {
                        return Err(ServiceError::validation("violation is already closed"));
                    }
                    let patch = json!({
                        "status": status,
                        "resolved_by": actor_id,
                        "fine_amount": fine_amount,
                        "resolution_note": note,
                        "resolved_at": Utc::now(),
                    });
                    let query = TableQuery::new(tables::VIOLATIONS).eq("id", id.to_string());
                    let rows = tables_store.update(query, patch).await.map_err(ServiceError::from)?;
                    shape::decode_one(rows, "violation")
                }
            })
            .await;
        if resp.is_success() {
            self.ctx.cache.invalidate(STATS_KEY);
        }
        resp
    }

    /// Counts by status across everything the backend returns.
    pub async fn stats(&self) -> ServiceResponse<ViolationStats> {
        let opts = RequestOptions::new().cached(STATS_KEY, STATS_TTL).retries(2);
        let tables_store = Arc::clone(&self.ctx.tables);
        self.ctx
            .dispatcher
            .handle("violations.stats", opts, move || {
                let tables_store = Arc::clone(&tables_store);
                async move {
                    let query = TableQuery::new(tables::VIOLATIONS).select("id,status");
                    let result = tables_store.select(query).await.map_err(ServiceError::from)?;
                    let mut stats = ViolationStats::default();
                    for row in &result.rows {
                        match row.get("status").and_then(|v| v.as_str()) {
                            Some("open") => stats.open += 1,
                            Some("under_review") => stats.under_review += 1,
                            Some("resolved") => stats.resolved += 1,
                            Some("dismissed") => stats.dismissed += 1,
                            _ => {}
                        }
                    }
                    Ok(stats)
                }
            })
            .await
    }
}
