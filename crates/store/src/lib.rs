//! Backing-store client for the PumpGuard access layer.
//!
//! The hosted backend (auth + relational tables + blob storage) is reached
//! over HTTP; this crate gives it three trait seams so every consumer can be
//! wired against the real service or the in-memory `mock` implementations.
//! No multi-table atomicity exists upstream: multi-step writes are
//! best-effort sequential calls with no rollback on partial failure.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

pub mod error;
pub mod http;
pub mod mock;
pub mod query;

pub use error::StoreError;
pub use http::{AuthClient, HttpBlobStore, HttpStore, Session, SessionHandle};
pub use query::{Filter, Op, TableQuery};

/// Rows returned by a select, plus the exact total when the query asked for
/// a count.
#[derive(Clone, Debug, Default)]
pub struct TableRows {
    pub rows: Vec<Value>,
    pub total: Option<u64>,
}

/// Relational table operations.
#[async_trait]
pub trait TableStore: Send + Sync {
    async fn select(&self, query: TableQuery) -> Result<TableRows, StoreError>;
    async fn insert(&self, table: &str, rows: Vec<Value>) -> Result<Vec<Value>, StoreError>;
    async fn update(&self, query: TableQuery, patch: Value) -> Result<Vec<Value>, StoreError>;
    async fn delete(&self, query: TableQuery) -> Result<u64, StoreError>;
}

/// The authenticated identity, with the claims the backend stamps into the
/// token metadata.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: String,
    pub role: Option<String>,
    pub omc_id: Option<Uuid>,
    pub station_id: Option<Uuid>,
}

/// Authentication operations against the hosted auth endpoint.
#[async_trait]
pub trait AuthStore: Send + Sync {
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser, StoreError>;
    async fn sign_out(&self) -> Result<(), StoreError>;
    /// The current identity, or `None` when no usable session exists.
    async fn current_user(&self) -> Result<Option<AuthUser>, StoreError>;
}

/// Blob storage operations (violation photos).
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Uploads and returns the public URL of the stored object.
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, StoreError>;
    async fn remove(&self, bucket: &str, path: &str) -> Result<(), StoreError>;
    fn public_url(&self, bucket: &str, path: &str) -> String;
}
