//! Per-user notifications.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde_json::json;
use tracing::instrument;
use uuid::Uuid;

use client::RequestOptions;
use common::{PageInfo, Pagination, ServiceError, ServiceResponse};
use models::notification::{NewNotification, Notification};
use models::tables;
use store::query::TableQuery;

use crate::ctx::{require_admin, Ctx};
use crate::shape;

const UNREAD_TTL: Duration = Duration::from_secs(30);

pub struct NotificationsService {
    ctx: Arc<Ctx>,
}

impl NotificationsService {
    pub(crate) fn new(ctx: Arc<Ctx>) -> Self {
        Self { ctx }
    }

    fn unread_key(user_id: Uuid) -> String {
        format!("notifications:unread:{}", user_id)
    }

    pub async fn list_mine(&self, page: Pagination) -> ServiceResponse<Vec<Notification>> {
        let actor = match self.ctx.actor().await {
            Ok(actor) => actor,
            Err(err) => return ServiceResponse::failure(&err),
        };
        let (page_n, per_page) = page.normalize();
        let (offset, limit) = page.window();
        let tables_store = Arc::clone(&self.ctx.tables);
        self.ctx
            .dispatcher
            .handle_paged("notifications.list_mine", RequestOptions::new().authenticated(), move || {
                let tables_store = Arc::clone(&tables_store);
                async move {
                    let query = TableQuery::new(tables::NOTIFICATIONS)
                        .eq("recipient_id", actor.id.to_string())
                        .order_desc("created_at")
                        .with_count()
                        .range(offset, limit);
                    let result = tables_store.select(query).await.map_err(ServiceError::from)?;
                    let total = result.total.unwrap_or(result.rows.len() as u64);
                    let notifications = shape::decode_rows(result.rows)?;
                    Ok((notifications, PageInfo::compute(page_n, per_page, total)))
                }
            })
            .await
    }

    pub async fn unread_count(&self) -> ServiceResponse<u64> {
        let actor = match self.ctx.actor().await {
            Ok(actor) => actor,
            Err(err) => return ServiceResponse::failure(&err),
        };
        let opts = RequestOptions::new()
            .authenticated()
            .cached(Self::unread_key(actor.id), UNREAD_TTL).retries(2);
        let tables_store = Arc::clone(&self.ctx.tables);
        self.ctx
            .dispatcher
            .handle("notifications.unread_count", opts, move || {
                let tables_store = Arc::clone(&tables_store);
                async move {
                    let query = TableQuery::new(tables::NOTIFICATIONS)
                        .select("id")
                        .eq("recipient_id", actor.id.to_string())
                        .eq("read", false)
                        .with_count()
                        .range(0, 1);
                    let result = tables_store.select(query).await.map_err(ServiceError::from)?;
                    Ok(result.total.unwrap_or(result.rows.len() as u64))
                }
            })
            .await
    }

    pub async fn mark_read(&self, id: Uuid) -> ServiceResponse<Notification> {
        let actor = match self.ctx.actor().await {
            Ok(actor) => actor,
            Err(err) => return ServiceResponse::failure(&err),
        };
        let tables_store = Arc::clone(&self.ctx.tables);
        let resp = self
            .ctx
            .dispatcher
            .handle("notifications.mark_read", RequestOptions::new().authenticated(), move || {
                let tables_store = Arc::clone(&tables_store);
                async move {
                    // only the recipient's own row can flip
                    let query = TableQuery::new(tables::NOTIFICATIONS)
                        .eq("id", id.to_string())
                        .eq("recipient_id", actor.id.to_string());
                    let rows = tables_store
                        .update(query, json!({ "read": true }))
                        .await
                        .map_err(ServiceError::from)?;
                    shape::decode_one(rows, "notification")
                }
            })
            .await;
        if resp.is_success() {
            self.ctx.cache.invalidate(&Self::unread_key(actor.id));
        }
        resp
    }

    pub async fn mark_all_read(&self) -> ServiceResponse<u64> {
        let actor = match self.ctx.actor().await {
            Ok(actor) => actor,
            Err(err) => return ServiceResponse::failure(&err),
        };
        let tables_store = Arc::clone(&self.ctx.tables);
        let resp = self
            .ctx
            .dispatcher
            .handle("notifications.mark_all_read", RequestOptions::new().authenticated(), move || {
                let tables_store = Arc::clone(&tables_store);
                async move {
                    let query = TableQuery::new(tables::NOTIFICATIONS)
                        .eq("recipient_id", actor.id.to_string())
                        .eq("read", false);
                    let rows = tables_store
                        .update(query, json!({ "read": true }))
                        .await
                        .map_err(ServiceError::from)?;
                    Ok(rows.len() as u64)
                }
            })
            .await;
        if resp.is_success() {
            self.ctx.cache.invalidate(&Self::unread_key(actor.id));
        }
        resp
    }

    /// Push a notification to one user. Admin only.
    #[instrument(skip(self, input), fields(recipient = %input.recipient_id))]
    pub async fn send(&self, input: NewNotification) -> ServiceResponse<Notification> {
        if let Err(err) = input.validate() {
            return ServiceResponse::failure(&err.into());
        }
        if let Err(err) = self.ctx.actor().await.and_then(|a| require_admin(&a)) {
            return ServiceResponse::failure(&err);
        }
        let tables_store = Arc::clone(&self.ctx.tables);
        let resp: ServiceResponse<Notification> = self
            .ctx
            .dispatcher
            .handle("notifications.send", RequestOptions::new().authenticated(), move || {
                let tables_store = Arc::clone(&tables_store);
                let input = input.clone();
                async move {
                    let row = json!({
                        "id": Uuid::new_v4(),
                        "recipient_id": input.recipient_id,
                        "kind": input.kind,
                        "title": input.title,
                        "body": input.body,
                        "read": false,
                        "created_at": Utc::now(),
                    });
                    let rows = tables_store
                        .insert(tables::NOTIFICATIONS, vec![row])
                        .await
                        .map_err(ServiceError::from)?;
                    shape::decode_one(rows, "notification")
                }
            })
            .await;
        if resp.is_success() {
            if let Some(n) = &resp.data {
                self.ctx.cache.invalidate(&Self::unread_key(n.recipient_id));
            }
        }
        resp
    }
}
