//! In-memory store implementations for tests and doc examples.
//!
//! `MemoryStore` evaluates the same filter/order/range semantics the backend
//! applies, counts select calls, and can be primed to fail so retry paths can
//! be exercised deterministically.

use std::cmp::Ordering;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering as AtomicOrdering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::StoreError;
use crate::query::{Filter, Op, TableQuery};
use crate::{AuthStore, AuthUser, BlobStore, TableRows, TableStore};

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<HashMap<String, Vec<Value>>>,
    failures: Mutex<VecDeque<StoreError>>,
    select_calls: AtomicU32,
    write_calls: AtomicU32,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, table: &str, rows: Vec<Value>) {
        self.tables.lock().unwrap().entry(table.to_string()).or_default().extend(rows);
    }

    pub fn rows(&self, table: &str) -> Vec<Value> {
        self.tables.lock().unwrap().get(table).cloned().unwrap_or_default()
    }

    /// Queue a failure; each table operation consumes at most one.
    pub fn fail_next(&self, err: StoreError) {
        self.failures.lock().unwrap().push_back(err);
    }

    pub fn select_calls(&self) -> u32 {
        self.select_calls.load(AtomicOrdering::SeqCst)
    }

    pub fn write_calls(&self) -> u32 {
        self.write_calls.load(AtomicOrdering::SeqCst)
    }

    fn take_failure(&self) -> Option<StoreError> {
        self.failures.lock().unwrap().pop_front()
    }

    fn matching_rows(&self, query: &TableQuery) -> Vec<Value> {
        let tables = self.tables.lock().unwrap();
        let mut rows: Vec<Value> = tables
            .get(&query.table)
            .map(|rows| rows.iter().filter(|row| matches_all(row, &query.filters)).cloned().collect())
            .unwrap_or_default();
        for (column, desc) in query.order.iter().rev() {
            rows.sort_by(|a, b| {
                let ord = cmp_values(field(a, column), field(b, column));
                if *desc { ord.reverse() } else { ord }
            });
        }
        rows
    }
}

#[async_trait]
impl TableStore for MemoryStore {
    async fn select(&self, query: TableQuery) -> Result<TableRows, StoreError> {
        self.select_calls.fetch_add(1, AtomicOrdering::SeqCst);
        if let Some(err) = self.take_failure() {
            return Err(err);
        }
        let all = self.matching_rows(&query);
        let total = if query.count { Some(all.len() as u64) } else { None };
        let rows = match query.range {
            Some((offset, limit)) => {
                all.into_iter().skip(offset as usize).take(limit as usize).collect()
            }
            None => all,
        };
        Ok(TableRows { rows, total })
    }

    async fn insert(&self, table: &str, rows: Vec<Value>) -> Result<Vec<Value>, StoreError> {
        self.write_calls.fetch_add(1, AtomicOrdering::SeqCst);
        if let Some(err) = self.take_failure() {
            return Err(err);
        }
        self.seed(table, rows.clone());
        Ok(rows)
    }

    async fn update(&self, query: TableQuery, patch: Value) -> Result<Vec<Value>, StoreError> {
        self.write_calls.fetch_add(1, AtomicOrdering::SeqCst);
        if let Some(err) = self.take_failure() {
            return Err(err);
        }
        let mut tables = self.tables.lock().unwrap();
        let mut updated = Vec::new();
        if let Some(rows) = tables.get_mut(&query.table) {
            for row in rows.iter_mut() {
                if matches_all(row, &query.filters) {
                    if let (Some(obj), Some(patch_obj)) = (row.as_object_mut(), patch.as_object()) {
                        for (k, v) in patch_obj {
                            obj.insert(k.clone(), v.clone());
                        }
                    }
                    updated.push(row.clone());
                }
            }
        }
        Ok(updated)
    }

    async fn delete(&self, query: TableQuery) -> Result<u64, StoreError> {
        self.write_calls.fetch_add(1, AtomicOrdering::SeqCst);
        if let Some(err) = self.take_failure() {
            return Err(err);
        }
        let mut tables = self.tables.lock().unwrap();
        let Some(rows) = tables.get_mut(&query.table) else {
            return Ok(0);
        };
        let before = rows.len();
        rows.retain(|row| !matches_all(row, &query.filters));
        Ok((before - rows.len()) as u64)
    }
}

fn field<'a>(row: &'a Value, column: &str) -> &'a Value {
    row.get(column).unwrap_or(&Value::Null)
}

fn matches_all(row: &Value, filters: &[Filter]) -> bool {
    filters.iter().all(|f| matches_one(field(row, &f.column), f))
}

fn matches_one(actual: &Value, filter: &Filter) -> bool {
    match filter.op {
        Op::Eq => scalar_eq(actual, &filter.value),
        Op::Neq => !scalar_eq(actual, &filter.value),
        Op::Gt => cmp_values(actual, &filter.value) == Ordering::Greater,
        Op::Gte => cmp_values(actual, &filter.value) != Ordering::Less,
        Op::Lt => cmp_values(actual, &filter.value) == Ordering::Less,
        Op::Lte => cmp_values(actual, &filter.value) != Ordering::Greater,
        Op::Like => match (actual.as_str(), filter.value.as_str()) {
            (Some(text), Some(pattern)) => like_match(text, pattern),
            _ => false,
        },
        Op::In => filter
            .value
            .as_array()
            .map(|list| list.iter().any(|v| scalar_eq(actual, v)))
            .unwrap_or(false),
        Op::IsNull => actual.is_null(),
    }
}

fn scalar_eq(a: &Value, b: &Value) -> bool {
    a == b || scalar_string(a) == scalar_string(b)
}

fn scalar_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Numbers compare numerically; everything else falls back to the string
/// form, which orders ISO dates correctly.
fn cmp_values(a: &Value, b: &Value) -> Ordering {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        _ => scalar_string(a).cmp(&scalar_string(b)),
    }
}

fn like_match(text: &str, pattern: &str) -> bool {
    if !pattern.contains('%') {
        return text == pattern;
    }
    let parts: Vec<&str> = pattern.split('%').collect();
    let mut pos = 0;
    for (i, part) in parts.iter().enumerate() {
        if part.is_empty() {
            continue;
        }
        if i == 0 {
            if !text.starts_with(part) {
                return false;
            }
            pos = part.len();
        } else if i == parts.len() - 1 {
            return text.len() >= pos && text[pos..].ends_with(part);
        } else {
            match text[pos..].find(part) {
                Some(found) => pos += found + part.len(),
                None => return false,
            }
        }
    }
    true
}

#[derive(Default)]
pub struct MockAuth {
    current: Mutex<Option<AuthUser>>,
    accounts: Mutex<HashMap<String, (String, AuthUser)>>,
}

impl MockAuth {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an account usable via `sign_in`.
    pub fn register(&self, email: &str, password: &str, user: AuthUser) {
        self.accounts
            .lock()
            .unwrap()
            .insert(email.to_string(), (password.to_string(), user));
    }

    /// Force an authenticated identity without going through `sign_in`.
    pub fn authenticate(&self, user: AuthUser) {
        *self.current.lock().unwrap() = Some(user);
    }
}

#[async_trait]
impl AuthStore for MockAuth {
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser, StoreError> {
        let accounts = self.accounts.lock().unwrap();
        match accounts.get(email) {
            Some((expected, user)) if expected == password => {
                *self.current.lock().unwrap() = Some(user.clone());
                Ok(user.clone())
            }
            _ => Err(StoreError::status(401, "invalid login credentials")),
        }
    }

    async fn sign_out(&self) -> Result<(), StoreError> {
        *self.current.lock().unwrap() = None;
        Ok(())
    }

    async fn current_user(&self) -> Result<Option<AuthUser>, StoreError> {
        Ok(self.current.lock().unwrap().clone())
    }
}

#[derive(Default)]
pub struct MemoryBlobStore {
    objects: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn object(&self, bucket: &str, path: &str) -> Option<Vec<u8>> {
        self.objects.lock().unwrap().get(&format!("{}/{}", bucket, path)).cloned()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        _content_type: &str,
    ) -> Result<String, StoreError> {
        self.objects.lock().unwrap().insert(format!("{}/{}", bucket, path), bytes);
        Ok(self.public_url(bucket, path))
    }

    async fn remove(&self, bucket: &str, path: &str) -> Result<(), StoreError> {
        self.objects.lock().unwrap().remove(&format!("{}/{}", bucket, path));
        Ok(())
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        format!("memory://{}/{}", bucket, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn store_with_stations() -> MemoryStore {
        let store = MemoryStore::new();
        store.seed(
            "stations",
            vec![
                json!({"id": "1", "name": "Shell Adenta", "region": "Greater Accra", "active": true}),
                json!({"id": "2", "name": "Goil Kumasi", "region": "Ashanti", "active": true}),
                json!({"id": "3", "name": "Star Tamale", "region": "Northern", "active": false}),
            ],
        );
        store
    }

    #[tokio::test]
    async fn select_applies_filters_order_and_range() {
        let store = store_with_stations();
        let q = TableQuery::new("stations").eq("active", true).order_desc("name").with_count();
        let result = store.select(q).await.unwrap();
        assert_eq!(result.total, Some(2));
        assert_eq!(result.rows[0]["name"], "Shell Adenta");

        let paged = store
            .select(TableQuery::new("stations").order("name").range(1, 1))
            .await
            .unwrap();
        assert_eq!(paged.rows.len(), 1);
        assert_eq!(paged.rows[0]["name"], "Shell Adenta");
        assert_eq!(store.select_calls(), 2);
    }

    #[tokio::test]
    async fn update_patches_matching_rows_only() {
        let store = store_with_stations();
        let updated = store
            .update(TableQuery::new("stations").eq("id", "3"), json!({"active": true}))
            .await
            .unwrap();
        assert_eq!(updated.len(), 1);
        let all = store
            .select(TableQuery::new("stations").eq("active", true))
            .await
            .unwrap();
        assert_eq!(all.rows.len(), 3);
    }

    #[tokio::test]
    async fn delete_reports_removed_count() {
        let store = store_with_stations();
        let removed = store
            .delete(TableQuery::new("stations").eq("region", "Ashanti"))
            .await
            .unwrap();
        assert_eq!(removed, 1);
        assert_eq!(store.rows("stations").len(), 2);
    }

    #[tokio::test]
    async fn primed_failure_is_consumed_once() {
        let store = store_with_stations();
        store.fail_next(StoreError::status(503, "maintenance"));
        let first = store.select(TableQuery::new("stations")).await;
        assert!(first.is_err());
        let second = store.select(TableQuery::new("stations")).await;
        assert!(second.is_ok());
    }

    #[test]
    fn like_patterns_match_sql_semantics() {
        assert!(like_match("Shell Adenta", "Shell%"));
        assert!(like_match("Shell Adenta", "%Adenta"));
        assert!(like_match("Shell Adenta", "%ll Ad%"));
        assert!(like_match("Shell Adenta", "Shell Adenta"));
        assert!(!like_match("Goil Kumasi", "Shell%"));
    }

    #[tokio::test]
    async fn mock_auth_round_trip() {
        let auth = MockAuth::new();
        let user = AuthUser {
            id: uuid::Uuid::new_v4(),
            email: "ops@pumpguard.app".into(),
            role: Some("admin".into()),
            omc_id: None,
            station_id: None,
        };
        auth.register("ops@pumpguard.app", "s3cret", user.clone());
        assert!(auth.sign_in("ops@pumpguard.app", "wrong").await.is_err());
        let signed = auth.sign_in("ops@pumpguard.app", "s3cret").await.unwrap();
        assert_eq!(signed.id, user.id);
        assert!(auth.current_user().await.unwrap().is_some());
        auth.sign_out().await.unwrap();
        assert!(auth.current_user().await.unwrap().is_none());
    }
}
