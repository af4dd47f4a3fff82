//! Application settings stored as backend key/value rows.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde_json::{json, Value};
use tracing::instrument;

use client::RequestOptions;
use common::{ServiceError, ServiceResponse};
use models::setting::AppSetting;
use models::tables;
use store::query::TableQuery;

use crate::ctx::{require_admin, Ctx};
use crate::shape;

const SETTINGS_TTL: Duration = Duration::from_secs(300);
const ALL_KEY: &str = "settings:all";

pub struct SettingsService {
    ctx: Arc<Ctx>,
}

impl SettingsService {
    pub(crate) fn new(ctx: Arc<Ctx>) -> Self {
        Self { ctx }
    }

    fn get_key(key: &str) -> String {
        format!("settings:get:{}", key)
    }

    pub async fn get(&self, key: &str) -> ServiceResponse<AppSetting> {
        let opts = RequestOptions::new().cached(Self::get_key(key), SETTINGS_TTL).retries(2);
        let tables_store = Arc::clone(&self.ctx.tables);
        let key = key.to_owned();
        self.ctx
            .dispatcher
            .handle("settings.get", opts, move || {
                let tables_store = Arc::clone(&tables_store);
                let key = key.clone();
                async move {
                    let result = tables_store
                        .select(TableQuery::new(tables::APP_SETTINGS).eq("key", key))
                        .await
                        .map_err(ServiceError::from)?;
                    shape::decode_one(result.rows, "setting")
                }
            })
            .await
    }

    pub async fn all(&self) -> ServiceResponse<Vec<AppSetting>> {
        let opts = RequestOptions::new().cached(ALL_KEY, SETTINGS_TTL).retries(2);
        let tables_store = Arc::clone(&self.ctx.tables);
        self.ctx
            .dispatcher
            .handle("settings.all", opts, move || {
                let tables_store = Arc::clone(&tables_store);
                async move {
                    let result = tables_store
                        .select(TableQuery::new(tables::APP_SETTINGS).order("key"))
                        .await
                        .map_err(ServiceError::from)?;
                    shape::decode_rows(result.rows)
                }
            })
            .await
    }

    /// Upsert one setting. Admin only.
    #[instrument(skip(self, value))]
    pub async fn set(&self, key: &str, value: Value) -> ServiceResponse<AppSetting> {
        if key.trim().is_empty() {
            return ServiceResponse::failure(&ServiceError::validation("key must not be empty"));
        }
        if let Err(err) = self.ctx.actor().await.and_then(|a| require_admin(&a)) {
            return ServiceResponse::failure(&err);
        }
        let tables_store = Arc::clone(&self.ctx.tables);
        let key_owned = key.to_owned();
        let resp = self
            .ctx
            .dispatcher
            .handle("settings.set", RequestOptions::new().authenticated().logged(), move || {
                let tables_store = Arc::clone(&tables_store);
                let key = key_owned.clone();
                let value = value.clone();
                async move {
                    // delete-then-insert upsert, same shape the backend's
                    // merge-duplicates header would produce
                    let query = TableQuery::new(tables::APP_SETTINGS).eq("key", key.clone());
                    tables_store.delete(query).await.map_err(ServiceError::from)?;
                    let row = json!({ "key": key, "value": value, "updated_at": Utc::now() });
                    let rows = tables_store
                        .insert(tables::APP_SETTINGS, vec![row])
                        .await
                        .map_err(ServiceError::from)?;
                    shape::decode_one(rows, "setting")
                }
            })
            .await;
        if resp.is_success() {
            self.ctx.cache.invalidate(ALL_KEY);
            self.ctx.cache.invalidate(&Self::get_key(key));
        }
        resp
    }
}
