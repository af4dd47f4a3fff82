use std::time::Duration;

/// Per-request policy knobs for the dispatcher.
///
/// Defaults: no auth precondition, no caching, no retries, no activity
/// record.
#[derive(Clone, Debug, Default)]
pub struct RequestOptions {
    /// Require a resolved identity before the operation runs.
    pub require_auth: bool,
    /// Read-through cache key; a prior successful result within its TTL is
    /// returned without running the operation.
    pub cache_key: Option<String>,
    /// `None` with a `cache_key` set means the entry never expires.
    pub cache_ttl: Option<Duration>,
    /// Additional attempts after an initial failure.
    pub retry_limit: u32,
    /// Record an audit entry after completion, success or failure.
    pub log_activity: bool,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn authenticated(mut self) -> Self {
        self.require_auth = true;
        self
    }

    pub fn cached(mut self, key: impl Into<String>, ttl: Duration) -> Self {
        self.cache_key = Some(key.into());
        self.cache_ttl = Some(ttl);
        self
    }

    pub fn retries(mut self, limit: u32) -> Self {
        self.retry_limit = limit;
        self
    }

    pub fn logged(mut self) -> Self {
        self.log_activity = true;
        self
    }
}
