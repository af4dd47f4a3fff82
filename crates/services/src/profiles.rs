//! User profiles and role administration.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tracing::instrument;
use uuid::Uuid;

use client::RequestOptions;
use common::{PageInfo, Pagination, ServiceError, ServiceResponse};
use models::profile::{Profile, ProfileUpdate};
use models::{tables, Role};
use store::query::TableQuery;

use crate::ctx::{require_admin, Ctx};
use crate::shape;

const ME_TTL: Duration = Duration::from_secs(30);

pub struct ProfilesService {
    ctx: Arc<Ctx>,
}

impl ProfilesService {
    pub(crate) fn new(ctx: Arc<Ctx>) -> Self {
        Self { ctx }
    }

    pub async fn me(&self) -> ServiceResponse<Profile> {
        let actor = match self.ctx.actor().await {
            Ok(actor) => actor,
            Err(err) => return ServiceResponse::failure(&err),
        };
        let opts = RequestOptions::new()
            .authenticated()
            .cached(format!("profiles:me:{}", actor.id), ME_TTL).retries(2);
        let tables_store = Arc::clone(&self.ctx.tables);
        self.ctx
            .dispatcher
            .handle("profiles.me", opts, move || {
                let tables_store = Arc::clone(&tables_store);
                async move {
                    let query = TableQuery::new(tables::PROFILES).eq("id", actor.id.to_string());
                    let result = tables_store.select(query).await.map_err(ServiceError::from)?;
                    shape::decode_one(result.rows, "profile")
                }
            })
            .await
    }

    pub async fn list(&self, page: Pagination) -> ServiceResponse<Vec<Profile>> {
        if let Err(err) = self.ctx.actor().await.and_then(|a| require_admin(&a)) {
            return ServiceResponse::failure(&err);
        }
        let (page_n, per_page) = page.normalize();
        let (offset, limit) = page.window();
        let tables_store = Arc::clone(&self.ctx.tables);
        self.ctx
            .dispatcher
            .handle_paged("profiles.list", RequestOptions::new().authenticated(), move || {
                let tables_store = Arc::clone(&tables_store);
                async move {
                    let query = TableQuery::new(tables::PROFILES)
                        .order("email")
                        .with_count()
                        .range(offset, limit);
                    let result = tables_store.select(query).await.map_err(ServiceError::from)?;
                    let total = result.total.unwrap_or(result.rows.len() as u64);
                    let profiles = shape::decode_rows(result.rows)?;
                    Ok((profiles, PageInfo::compute(page_n, per_page, total)))
                }
            })
            .await
    }

    pub async fn update_me(&self, update: ProfileUpdate) -> ServiceResponse<Profile> {
        if let Err(err) = update.validate() {
            return ServiceResponse::failure(&err.into());
        }
        let actor = match self.ctx.actor().await {
            Ok(actor) => actor,
            Err(err) => return ServiceResponse::failure(&err),
        };
        let tables_store = Arc::clone(&self.ctx.tables);
        let resp = self
            .ctx
            .dispatcher
            .handle("profiles.update_me", RequestOptions::new().authenticated(), move || {
                let tables_store = Arc::clone(&tables_store);
                let update = update.clone();
                async move {
                    let patch = serde_json::to_value(&update)
                        .map_err(|e| ServiceError::Unexpected(e.to_string()))?;
                    let query = TableQuery::new(tables::PROFILES).eq("id", actor.id.to_string());
                    let rows = tables_store.update(query, patch).await.map_err(ServiceError::from)?;
                    shape::decode_one(rows, "profile")
                }
            })
            .await;
        if resp.is_success() {
            self.ctx.cache.invalidate(&format!("profiles:me:{}", actor.id));
        }
        resp
    }

    #[instrument(skip(self))]
    pub async fn set_role(&self, user_id: Uuid, role: Role) -> ServiceResponse<Profile> {
        self.admin_patch("profiles.set_role", user_id, json!({ "role": role })).await
    }

    #[instrument(skip(self))]
    pub async fn set_active(&self, user_id: Uuid, active: bool) -> ServiceResponse<Profile> {
        self.admin_patch("profiles.set_active", user_id, json!({ "active": active })).await
    }

    async fn admin_patch(
        &self,
        operation: &str,
        user_id: Uuid,
        patch: serde_json::Value,
    ) -> ServiceResponse<Profile> {
        if let Err(err) = self.ctx.actor().await.and_then(|a| require_admin(&a)) {
            return ServiceResponse::failure(&err);
        }
        let tables_store = Arc::clone(&self.ctx.tables);
        let resp = self
            .ctx
            .dispatcher
            .handle(operation, RequestOptions::new().authenticated().logged(), move || {
                let tables_store = Arc::clone(&tables_store);
                let patch = patch.clone();
                async move {
                    let query = TableQuery::new(tables::PROFILES).eq("id", user_id.to_string());
                    let rows = tables_store.update(query, patch).await.map_err(ServiceError::from)?;
                    shape::decode_one(rows, "profile")
                }
            })
            .await;
        if resp.is_success() {
            self.ctx.cache.invalidate(&format!("profiles:me:{}", user_id));
        }
        resp
    }
}
