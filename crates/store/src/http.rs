//! reqwest implementations of the store traits against the hosted backend:
//! `{base}/rest/v1` for tables, `{base}/auth/v1` for identity and
//! `{base}/storage/v1` for blobs. The current session is held in an
//! `ArcSwapOption` shared by all three clients: read on every request,
//! swapped on sign-in/refresh/sign-out.

use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwapOption;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::StoreError;
use crate::query::TableQuery;
use crate::{AuthStore, AuthUser, BlobStore, TableRows, TableStore};

#[derive(Clone, Debug)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: DateTime<Utc>,
    pub user: AuthUser,
}

impl Session {
    pub fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now()
    }
}

/// Shared, hot-swappable session slot.
pub type SessionHandle = Arc<ArcSwapOption<Session>>;

/// Fresh, signed-out session slot for wiring up the three clients.
pub fn session_handle() -> SessionHandle {
    Arc::new(ArcSwapOption::empty())
}

pub fn build_client(connect_timeout: Duration, request_timeout: Duration) -> Result<Client, StoreError> {
    Client::builder()
        .connect_timeout(connect_timeout)
        .timeout(request_timeout)
        .build()
        .map_err(StoreError::from)
}

async fn check_status(resp: Response) -> Result<Response, StoreError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let message = resp.text().await.unwrap_or_default();
    let message = extract_message(&message);
    Err(StoreError::status(status.as_u16(), message))
}

/// The backend wraps errors as `{"message": "..."}`; fall back to raw text.
fn extract_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_string))
        .unwrap_or_else(|| {
            let trimmed = body.trim();
            if trimmed.is_empty() { "request failed".to_string() } else { trimmed.to_string() }
        })
}

/// `Content-Range: 0-9/57` (or `*/57` for an empty page).
fn parse_content_range(value: &str) -> Option<u64> {
    value.rsplit('/').next()?.trim().parse().ok()
}

// ---------------------------------------------------------------------------
// Tables

pub struct HttpStore {
    base_url: String,
    api_key: String,
    client: Client,
    session: SessionHandle,
}

impl HttpStore {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>, client: Client, session: SessionHandle) -> Self {
        Self { base_url: base_url.into(), api_key: api_key.into(), client, session }
    }

    fn request(&self, method: Method, table: &str) -> RequestBuilder {
        let url = format!("{}/rest/v1/{}", self.base_url, table);
        let bearer = match self.session.load_full() {
            Some(session) => session.access_token.clone(),
            None => self.api_key.clone(),
        };
        self.client
            .request(method, url)
            .header("apikey", &self.api_key)
            .header(AUTHORIZATION, format!("Bearer {}", bearer))
    }
}

#[async_trait]
impl TableStore for HttpStore {
    async fn select(&self, query: TableQuery) -> Result<TableRows, StoreError> {
        let mut req = self.request(Method::GET, &query.table).query(&query.render());
        if query.count {
            req = req.header("Prefer", "count=exact");
        }
        let resp = check_status(req.send().await?).await?;
        let total = if query.count {
            resp.headers()
                .get("content-range")
                .and_then(|v| v.to_str().ok())
                .and_then(parse_content_range)
        } else {
            None
        };
        let rows: Vec<Value> = resp.json().await?;
        Ok(TableRows { rows, total })
    }

    async fn insert(&self, table: &str, rows: Vec<Value>) -> Result<Vec<Value>, StoreError> {
        let resp = self
            .request(Method::POST, table)
            .header("Prefer", "return=representation")
            .json(&rows)
            .send()
            .await?;
        let resp = check_status(resp).await?;
        Ok(resp.json().await?)
    }

    async fn update(&self, query: TableQuery, patch: Value) -> Result<Vec<Value>, StoreError> {
        let resp = self
            .request(Method::PATCH, &query.table)
            .query(&query.render())
            .header("Prefer", "return=representation")
            .json(&patch)
            .send()
            .await?;
        let resp = check_status(resp).await?;
        Ok(resp.json().await?)
    }

    async fn delete(&self, query: TableQuery) -> Result<u64, StoreError> {
        let resp = self
            .request(Method::DELETE, &query.table)
            .query(&query.render())
            .header("Prefer", "return=representation")
            .send()
            .await?;
        let resp = check_status(resp).await?;
        let rows: Vec<Value> = resp.json().await?;
        Ok(rows.len() as u64)
    }
}

// ---------------------------------------------------------------------------
// Auth

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    expires_in: i64,
    user: WireUser,
}

#[derive(Deserialize)]
struct WireUser {
    id: Uuid,
    email: String,
    #[serde(default)]
    user_metadata: Value,
}

impl WireUser {
    fn into_auth_user(self) -> AuthUser {
        let claim_uuid = |key: &str| {
            self.user_metadata
                .get(key)
                .and_then(|v| v.as_str())
                .and_then(|s| Uuid::parse_str(s).ok())
        };
        let role = self
            .user_metadata
            .get("role")
            .and_then(|v| v.as_str())
            .map(str::to_string);
        AuthUser {
            id: self.id,
            email: self.email,
            role,
            omc_id: claim_uuid("omc_id"),
            station_id: claim_uuid("station_id"),
        }
    }
}

pub struct AuthClient {
    base_url: String,
    api_key: String,
    client: Client,
    session: SessionHandle,
}

impl AuthClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>, client: Client, session: SessionHandle) -> Self {
        Self { base_url: base_url.into(), api_key: api_key.into(), client, session }
    }

    async fn token_request(&self, grant_type: &str, body: Value) -> Result<Session, StoreError> {
        let url = format!("{}/auth/v1/token?grant_type={}", self.base_url, grant_type);
        let resp = self
            .client
            .post(url)
            .header("apikey", &self.api_key)
            .json(&body)
            .send()
            .await?;
        let resp = check_status(resp).await?;
        let token: TokenResponse = resp.json().await?;
        Ok(Session {
            access_token: token.access_token,
            refresh_token: token.refresh_token,
            expires_at: Utc::now() + chrono::Duration::seconds(token.expires_in),
            user: token.user.into_auth_user(),
        })
    }

    /// One refresh attempt; on failure the stale session is dropped.
    async fn refresh(&self, refresh_token: &str) -> Option<Session> {
        let body = serde_json::json!({ "refresh_token": refresh_token });
        match self.token_request("refresh_token", body).await {
            Ok(session) => Some(session),
            Err(err) => {
                warn!(error = %err, "session refresh failed, dropping session");
                None
            }
        }
    }
}

#[async_trait]
impl AuthStore for AuthClient {
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser, StoreError> {
        let body = serde_json::json!({ "email": email, "password": password });
        let session = self.token_request("password", body).await?;
        let user = session.user.clone();
        self.session.store(Some(Arc::new(session)));
        debug!(user = %user.id, "signed in");
        Ok(user)
    }

    async fn sign_out(&self) -> Result<(), StoreError> {
        if let Some(session) = self.session.load_full() {
            let url = format!("{}/auth/v1/logout", self.base_url);
            let result = self
                .client
                .post(url)
                .header("apikey", &self.api_key)
                .header(AUTHORIZATION, format!("Bearer {}", session.access_token))
                .send()
                .await;
            if let Err(err) = result {
                // Local sign-out still succeeds; the token will expire upstream.
                warn!(error = %err, "logout call failed");
            }
        }
        self.session.store(None);
        Ok(())
    }

    async fn current_user(&self) -> Result<Option<AuthUser>, StoreError> {
        let Some(session) = self.session.load_full() else {
            return Ok(None);
        };
        if !session.is_expired() {
            return Ok(Some(session.user.clone()));
        }
        let Some(refresh_token) = session.refresh_token.clone() else {
            self.session.store(None);
            return Ok(None);
        };
        match self.refresh(&refresh_token).await {
            Some(renewed) => {
                let user = renewed.user.clone();
                self.session.store(Some(Arc::new(renewed)));
                Ok(Some(user))
            }
            None => {
                self.session.store(None);
                Ok(None)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Blobs

pub struct HttpBlobStore {
    base_url: String,
    api_key: String,
    client: Client,
    session: SessionHandle,
}

impl HttpBlobStore {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>, client: Client, session: SessionHandle) -> Self {
        Self { base_url: base_url.into(), api_key: api_key.into(), client, session }
    }

    fn headers(&self, content_type: Option<&str>) -> Result<HeaderMap, StoreError> {
        let mut headers = HeaderMap::new();
        let bearer = match self.session.load_full() {
            Some(session) => session.access_token.clone(),
            None => self.api_key.clone(),
        };
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", bearer))
                .map_err(|e| StoreError::Decode(e.to_string()))?,
        );
        headers.insert(
            "apikey",
            HeaderValue::from_str(&self.api_key).map_err(|e| StoreError::Decode(e.to_string()))?,
        );
        if let Some(ct) = content_type {
            headers.insert(
                CONTENT_TYPE,
                HeaderValue::from_str(ct).map_err(|e| StoreError::Decode(e.to_string()))?,
            );
        }
        Ok(headers)
    }
}

#[async_trait]
impl BlobStore for HttpBlobStore {
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, StoreError> {
        let url = format!("{}/storage/v1/object/{}/{}", self.base_url, bucket, path);
        let resp = self
            .client
            .post(url)
            .headers(self.headers(Some(content_type))?)
            .body(bytes)
            .send()
            .await?;
        check_status(resp).await?;
        Ok(self.public_url(bucket, path))
    }

    async fn remove(&self, bucket: &str, path: &str) -> Result<(), StoreError> {
        let url = format!("{}/storage/v1/object/{}/{}", self.base_url, bucket, path);
        let resp = self.client.delete(url).headers(self.headers(None)?).send().await?;
        match check_status(resp).await {
            Ok(_) => Ok(()),
            // Removing an already-gone object is a no-op.
            Err(StoreError::Status { status, .. }) if status == StatusCode::NOT_FOUND.as_u16() => Ok(()),
            Err(err) => Err(err),
        }
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        format!("{}/storage/v1/object/public/{}/{}", self.base_url, bucket, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> AuthUser {
        AuthUser {
            id: Uuid::new_v4(),
            email: "a@b.c".into(),
            role: Some("admin".into()),
            omc_id: None,
            station_id: None,
        }
    }

    #[test]
    fn session_expiry_is_clock_based() {
        let live = Session {
            access_token: "t".into(),
            refresh_token: None,
            expires_at: Utc::now() + chrono::Duration::minutes(5),
            user: user(),
        };
        assert!(!live.is_expired());
        let stale = Session { expires_at: Utc::now() - chrono::Duration::seconds(1), ..live };
        assert!(stale.is_expired());
    }

    #[test]
    fn content_range_parses_totals() {
        assert_eq!(parse_content_range("0-9/57"), Some(57));
        assert_eq!(parse_content_range("*/0"), Some(0));
        assert_eq!(parse_content_range("garbage"), None);
    }

    #[test]
    fn error_message_prefers_backend_json() {
        assert_eq!(extract_message(r#"{"message":"row not found"}"#), "row not found");
        assert_eq!(extract_message("plain failure"), "plain failure");
        assert_eq!(extract_message(""), "request failed");
    }

    #[test]
    fn metadata_claims_become_typed_fields() {
        let omc = Uuid::new_v4();
        let wire = WireUser {
            id: Uuid::new_v4(),
            email: "d@e.f".into(),
            user_metadata: serde_json::json!({ "role": "omc_admin", "omc_id": omc.to_string() }),
        };
        let auth = wire.into_auth_user();
        assert_eq!(auth.role.as_deref(), Some("omc_admin"));
        assert_eq!(auth.omc_id, Some(omc));
        assert_eq!(auth.station_id, None);
    }
}
