//! The request dispatcher.
//!
//! Fixed behavior sequence: cache check → auth precondition → execute with
//! retry → on success fill the cache and record activity → wrap into a
//! `ServiceResponse`. All failures, including panicking preconditions like a
//! missing identity, come back as failure envelopes; the dispatcher itself
//! never returns `Err`.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::time::sleep;
use tracing::{debug, warn};

use common::{PageInfo, ServiceError, ServiceResponse};
use store::AuthStore;

use crate::activity::{ActivityEntry, ActivityLogger};
use crate::cache::Cache;
use crate::options::RequestOptions;
use crate::retry::RetryPolicy;

pub struct Dispatcher {
    auth: Arc<dyn AuthStore>,
    cache: Arc<dyn Cache>,
    activity: Arc<dyn ActivityLogger>,
    retry: RetryPolicy,
}

/// Items and page info cached together so a paged hit restores both.
#[derive(Serialize, Deserialize)]
struct CachedPage {
    items: serde_json::Value,
    page: PageInfo,
}

impl Dispatcher {
    pub fn new(
        auth: Arc<dyn AuthStore>,
        cache: Arc<dyn Cache>,
        activity: Arc<dyn ActivityLogger>,
        retry: RetryPolicy,
    ) -> Self {
        Self { auth, cache, activity, retry }
    }

    pub fn cache(&self) -> &Arc<dyn Cache> {
        &self.cache
    }

    /// Run `operation` under the supplied policy.
    ///
    /// The operation may be invoked several times (retries), so it is a
    /// factory closure producing a fresh future per attempt.
    pub async fn handle<T, F, Fut>(
        &self,
        name: &str,
        opts: RequestOptions,
        operation: F,
    ) -> ServiceResponse<T>
    where
        T: Serialize + DeserializeOwned,
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, ServiceError>>,
    {
        if let Some(hit) = self.cache_lookup::<T>(name, &opts) {
            return ServiceResponse::success(hit);
        }
        let started = Instant::now();
        let actor = match self.check_auth(name, &opts).await {
            Ok(actor) => actor,
            Err(err) => return self.fail(name, &opts, None, started, err).await,
        };
        match self.execute_with_retry(name, opts.retry_limit, &operation).await {
            Ok(value) => {
                if let Some(key) = &opts.cache_key {
                    match serde_json::to_value(&value) {
                        Ok(json) => self.cache.put(key, json, opts.cache_ttl),
                        Err(err) => warn!(operation = name, error = %err, "result not cacheable"),
                    }
                }
                self.record(name, &opts, actor, true, started).await;
                ServiceResponse::success(value)
            }
            Err(err) => self.fail(name, &opts, actor, started, err).await,
        }
    }

    /// Paged variant: the operation yields the page items together with the
    /// pagination block, and both are cached as one entry.
    pub async fn handle_paged<T, F, Fut>(
        &self,
        name: &str,
        opts: RequestOptions,
        operation: F,
    ) -> ServiceResponse<Vec<T>>
    where
        T: Serialize + DeserializeOwned,
        F: Fn() -> Fut,
        Fut: Future<Output = Result<(Vec<T>, PageInfo), ServiceError>>,
    {
        if let Some(page) = self.cache_lookup::<CachedPage>(name, &opts) {
            if let Ok(items) = serde_json::from_value::<Vec<T>>(page.items) {
                return ServiceResponse::paginated(items, page.page);
            }
            if let Some(key) = &opts.cache_key {
                self.cache.invalidate(key);
            }
        }
        let started = Instant::now();
        let actor = match self.check_auth(name, &opts).await {
            Ok(actor) => actor,
            Err(err) => return self.fail(name, &opts, None, started, err).await,
        };
        match self.execute_with_retry(name, opts.retry_limit, &operation).await {
            Ok((items, page)) => {
                if let Some(key) = &opts.cache_key {
                    match serde_json::to_value(&items) {
                        Ok(json) => {
                            let entry = CachedPage { items: json, page };
                            match serde_json::to_value(&entry) {
                                Ok(value) => self.cache.put(key, value, opts.cache_ttl),
                                Err(err) => warn!(operation = name, error = %err, "page not cacheable"),
                            }
                        }
                        Err(err) => warn!(operation = name, error = %err, "page not cacheable"),
                    }
                }
                self.record(name, &opts, actor, true, started).await;
                ServiceResponse::paginated(items, page)
            }
            Err(err) => self.fail(name, &opts, actor, started, err).await,
        }
    }

    fn cache_lookup<T: DeserializeOwned>(&self, name: &str, opts: &RequestOptions) -> Option<T> {
        let key = opts.cache_key.as_deref()?;
        let value = self.cache.get(key)?;
        match serde_json::from_value(value) {
            Ok(hit) => {
                debug!(operation = name, key, "cache hit");
                Some(hit)
            }
            Err(_) => {
                // A shape mismatch means the entry is stale; drop it.
                self.cache.invalidate(key);
                None
            }
        }
    }

    async fn check_auth(
        &self,
        name: &str,
        opts: &RequestOptions,
    ) -> Result<Option<uuid::Uuid>, ServiceError> {
        if !opts.require_auth {
            return Ok(None);
        }
        match self.auth.current_user().await {
            Ok(Some(user)) => Ok(Some(user.id)),
            Ok(None) => {
                debug!(operation = name, "no authenticated identity");
                Err(ServiceError::AuthRequired)
            }
            Err(err) => {
                debug!(operation = name, error = %err, "identity lookup failed");
                Err(ServiceError::AuthRequired)
            }
        }
    }

    async fn execute_with_retry<T, F, Fut>(
        &self,
        name: &str,
        retry_limit: u32,
        operation: &F,
    ) -> Result<T, ServiceError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, ServiceError>>,
    {
        let mut attempt_index = 0u32;
        loop {
            match operation().await {
                Ok(value) => {
                    if attempt_index > 0 {
                        debug!(operation = name, retries = attempt_index, "succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(err) if attempt_index < retry_limit && err.is_retryable() => {
                    let delay = self.retry.backoff(attempt_index);
                    debug!(
                        operation = name,
                        attempt = attempt_index + 1,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "transient failure, backing off"
                    );
                    sleep(delay).await;
                    attempt_index += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn fail<T>(
        &self,
        name: &str,
        opts: &RequestOptions,
        actor: Option<uuid::Uuid>,
        started: Instant,
        err: ServiceError,
    ) -> ServiceResponse<T> {
        warn!(operation = name, code = err.code(), error = %err, "operation failed");
        self.record(name, opts, actor, false, started).await;
        ServiceResponse::failure(&err)
    }

    async fn record(
        &self,
        name: &str,
        opts: &RequestOptions,
        actor: Option<uuid::Uuid>,
        success: bool,
        started: Instant,
    ) {
        if !opts.log_activity {
            return;
        }
        let entry = ActivityEntry::new(name, actor, success, started.elapsed().as_millis() as u64);
        if let Err(err) = self.activity.record(entry).await {
            // Audit failures never affect the primary response.
            warn!(operation = name, error = %err, "activity record dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    use serde_json::json;
    use store::mock::MockAuth;
    use store::AuthUser;

    use crate::activity::mock::{FailingActivityLogger, MemoryActivityLogger};
    use crate::cache::TtlCache;

    fn admin() -> AuthUser {
        AuthUser {
            id: uuid::Uuid::new_v4(),
            email: "ops@pumpguard.app".into(),
            role: Some("admin".into()),
            omc_id: None,
            station_id: None,
        }
    }

    fn dispatcher(auth: Arc<MockAuth>, activity: Arc<dyn ActivityLogger>) -> Dispatcher {
        Dispatcher::new(
            auth,
            Arc::new(TtlCache::new()),
            activity,
            RetryPolicy::new(Duration::from_secs(1), Duration::from_secs(30)),
        )
    }

    #[tokio::test]
    async fn cached_result_skips_the_operation() {
        let d = dispatcher(Arc::new(MockAuth::new()), Arc::new(MemoryActivityLogger::new()));
        let calls = Arc::new(AtomicU32::new(0));
        let opts = RequestOptions::new().cached("stations:list:{}", Duration::from_secs(5));

        for _ in 0..2 {
            let calls = calls.clone();
            let resp: ServiceResponse<Vec<serde_json::Value>> = d
                .handle("stations.list", opts.clone(), move || {
                    let calls = calls.clone();
                    async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        Ok(vec![json!({"id": 1})])
                    }
                })
                .await;
            assert!(resp.success);
            assert_eq!(resp.data.unwrap(), vec![json!({"id": 1})]);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn missing_identity_short_circuits_before_the_operation() {
        let d = dispatcher(Arc::new(MockAuth::new()), Arc::new(MemoryActivityLogger::new()));
        let calls = Arc::new(AtomicU32::new(0));
        let calls_in = calls.clone();
        let resp: ServiceResponse<u32> = d
            .handle("stations.create", RequestOptions::new().authenticated(), move || {
                let calls = calls_in.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(7)
                }
            })
            .await;
        assert!(!resp.success);
        assert_eq!(resp.error_code.as_deref(), Some("AUTH_REQUIRED"));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn authenticated_operation_runs_with_identity_present() {
        let auth = Arc::new(MockAuth::new());
        auth.authenticate(admin());
        let d = dispatcher(auth, Arc::new(MemoryActivityLogger::new()));
        let resp: ServiceResponse<u32> = d
            .handle("stations.create", RequestOptions::new().authenticated(), || async { Ok(7) })
            .await;
        assert!(resp.success);
        assert_eq!(resp.data, Some(7));
    }

    #[tokio::test(start_paused = true)]
    async fn retryable_failure_is_retried_with_exponential_backoff() {
        let d = dispatcher(Arc::new(MockAuth::new()), Arc::new(MemoryActivityLogger::new()));
        let calls = Arc::new(AtomicU32::new(0));
        let calls_in = calls.clone();
        let t0 = tokio::time::Instant::now();
        let resp: ServiceResponse<u32> = d
            .handle("sales.daily_total", RequestOptions::new().retries(2), move || {
                let calls = calls_in.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(ServiceError::Unavailable { status: 503, message: "maintenance".into() })
                }
            })
            .await;
        assert!(!resp.success);
        assert_eq!(resp.error_code.as_deref(), Some("SERVICE_UNAVAILABLE"));
        // three attempts total, 1s + 2s of backoff between them
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(t0.elapsed(), Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn operation_failing_then_succeeding_within_the_limit_returns_success() {
        let d = dispatcher(Arc::new(MockAuth::new()), Arc::new(MemoryActivityLogger::new()));
        let calls = Arc::new(AtomicU32::new(0));
        let calls_in = calls.clone();
        let resp: ServiceResponse<String> = d
            .handle("inventory.levels", RequestOptions::new().retries(3), move || {
                let calls = calls_in.clone();
                async move {
                    if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err(ServiceError::Network("connection reset".into()))
                    } else {
                        Ok("ok".to_string())
                    }
                }
            })
            .await;
        assert!(resp.success);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn non_retryable_failure_attempts_exactly_once() {
        let d = dispatcher(Arc::new(MockAuth::new()), Arc::new(MemoryActivityLogger::new()));
        let calls = Arc::new(AtomicU32::new(0));
        let calls_in = calls.clone();
        let resp: ServiceResponse<u32> = d
            .handle("prices.set", RequestOptions::new().retries(5), move || {
                let calls = calls_in.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(ServiceError::validation("price exceeds the OMC cap"))
                }
            })
            .await;
        assert!(!resp.success);
        assert_eq!(resp.error_code.as_deref(), Some("VALIDATION_ERROR"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn activity_is_recorded_for_success_and_failure() {
        let auth = Arc::new(MockAuth::new());
        let user = admin();
        auth.authenticate(user.clone());
        let logger = Arc::new(MemoryActivityLogger::new());
        let d = dispatcher(auth, logger.clone());

        let ok: ServiceResponse<u32> = d
            .handle("shifts.close", RequestOptions::new().authenticated().logged(), || async { Ok(1) })
            .await;
        assert!(ok.success);
        let bad: ServiceResponse<u32> = d
            .handle("shifts.close", RequestOptions::new().authenticated().logged(), || async {
                Err(ServiceError::not_found("shift"))
            })
            .await;
        assert!(!bad.success);

        let entries = logger.entries();
        assert_eq!(entries.len(), 2);
        assert!(entries[0].success);
        assert_eq!(entries[0].user_id, Some(user.id));
        assert_eq!(entries[0].operation, "shifts.close");
        assert!(!entries[1].success);
    }

    #[tokio::test]
    async fn audit_sink_failure_does_not_fail_the_operation() {
        let d = dispatcher(Arc::new(MockAuth::new()), Arc::new(FailingActivityLogger));
        let resp: ServiceResponse<u32> = d
            .handle("sales.record", RequestOptions::new().logged(), || async { Ok(42) })
            .await;
        assert!(resp.success);
        assert_eq!(resp.data, Some(42));
    }

    #[tokio::test]
    async fn paged_results_cache_items_and_page_info_together() {
        let d = dispatcher(Arc::new(MockAuth::new()), Arc::new(MemoryActivityLogger::new()));
        let calls = Arc::new(AtomicU32::new(0));
        let opts = RequestOptions::new().cached("sales:list:1:20", Duration::from_secs(5));

        for _ in 0..2 {
            let calls = calls.clone();
            let resp = d
                .handle_paged("sales.list", opts.clone(), move || {
                    let calls = calls.clone();
                    async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        Ok((vec![json!({"id": "s1"})], PageInfo::compute(1, 20, 45)))
                    }
                })
                .await;
            assert!(resp.success);
            assert_eq!(resp.pagination.unwrap().total_count, 45);
            assert_eq!(resp.data.unwrap().len(), 1);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn cache_entry_with_wrong_shape_is_treated_as_a_miss() {
        let cache = Arc::new(TtlCache::new());
        cache.put("profiles:me", json!("not a number"), None);
        let d = Dispatcher::new(
            Arc::new(MockAuth::new()),
            cache.clone(),
            Arc::new(MemoryActivityLogger::new()),
            RetryPolicy::default(),
        );
        let opts = RequestOptions::new().cached("profiles:me", Duration::from_secs(5));
        let resp: ServiceResponse<u32> = d.handle("profiles.me", opts, || async { Ok(9) }).await;
        assert_eq!(resp.data, Some(9));
        // the stale entry was replaced by the fresh result
        assert_eq!(cache.get("profiles:me"), Some(json!(9)));
    }
}
