use anyhow::Result;
use serde::Deserialize;
use anyhow::anyhow;
use std::time::Duration;

/// Client configuration: backend endpoint, HTTP timeouts, cache and retry knobs.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub retry: RetryConfig,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct BackendConfig {
    /// Base URL of the hosted backend, e.g. `https://abc.supabase.co`.
    #[serde(default)]
    pub url: String,
    /// Publishable API key sent with every request.
    #[serde(default)]
    pub api_key: String,
    /// Storage bucket holding violation photos.
    #[serde(default = "default_photo_bucket")]
    pub photo_bucket: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: default_connect_timeout(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_cache_enabled")]
    pub enabled: bool,
    #[serde(default = "default_cache_ttl")]
    pub default_ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { enabled: default_cache_enabled(), default_ttl_secs: default_cache_ttl() }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,
    #[serde(default = "default_backoff_max_ms")]
    pub backoff_max_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self { backoff_base_ms: default_backoff_base_ms(), backoff_max_ms: default_backoff_max_ms() }
    }
}

fn default_photo_bucket() -> String { "violation-photos".to_string() }
fn default_connect_timeout() -> u64 { 5 }
fn default_request_timeout() -> u64 { 30 }
fn default_cache_enabled() -> bool { true }
fn default_cache_ttl() -> u64 { 300 }
fn default_backoff_base_ms() -> u64 { 1_000 }
fn default_backoff_max_ms() -> u64 { 30_000 }

pub fn load_default() -> Result<AppConfig> {
    let path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| "pumpguard.toml".to_string());
    load_from_file(&path)
}

pub fn load_from_file(path: &str) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)?;
    let cfg: AppConfig = toml::from_str(&content)?;
    Ok(cfg)
}

impl AppConfig {
    /// Load from `CONFIG_PATH` (or `pumpguard.toml`), fill gaps from the
    /// environment and validate. Missing config file is fine as long as the
    /// environment provides the backend endpoint.
    pub fn load_and_validate() -> Result<Self> {
        let mut cfg = load_default().unwrap_or_default();
        cfg.normalize_and_validate()?;
        Ok(cfg)
    }

    /// Build entirely from environment variables (`PUMPGUARD_BACKEND_URL`,
    /// `PUMPGUARD_API_KEY`), e.g. for tooling that carries no config file.
    pub fn from_env() -> Result<Self> {
        let mut cfg = Self::default();
        cfg.normalize_and_validate()?;
        Ok(cfg)
    }

    pub fn normalize_and_validate(&mut self) -> Result<()> {
        self.backend.normalize_from_env();
        self.backend.validate()?;
        if self.http.request_timeout_secs == 0 || self.http.connect_timeout_secs == 0 {
            return Err(anyhow!("http timeouts must be positive seconds"));
        }
        if self.retry.backoff_base_ms == 0 {
            return Err(anyhow!("retry.backoff_base_ms must be >= 1"));
        }
        if self.retry.backoff_max_ms < self.retry.backoff_base_ms {
            return Err(anyhow!("retry.backoff_max_ms must be >= backoff_base_ms"));
        }
        Ok(())
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.http.connect_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.http.request_timeout_secs)
    }

    pub fn default_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache.default_ttl_secs)
    }

    pub fn backoff_base(&self) -> Duration {
        Duration::from_millis(self.retry.backoff_base_ms)
    }

    pub fn backoff_max(&self) -> Duration {
        Duration::from_millis(self.retry.backoff_max_ms)
    }
}

impl BackendConfig {
    pub fn normalize_from_env(&mut self) {
        // .env is optional; values already present in TOML win.
        let _ = dotenvy::dotenv();
        if self.url.trim().is_empty() {
            if let Ok(url) = std::env::var("PUMPGUARD_BACKEND_URL") {
                self.url = url;
            }
        }
        if self.api_key.trim().is_empty() {
            if let Ok(key) = std::env::var("PUMPGUARD_API_KEY") {
                self.api_key = key;
            }
        }
        while self.url.ends_with('/') {
            self.url.pop();
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.url.trim().is_empty() {
            return Err(anyhow!(
                "backend.url is empty; set it in the config file or via PUMPGUARD_BACKEND_URL"
            ));
        }
        let lower = self.url.to_lowercase();
        if !(lower.starts_with("https://") || lower.starts_with("http://")) {
            return Err(anyhow!("backend.url must start with https:// or http://"));
        }
        if self.api_key.trim().is_empty() {
            return Err(anyhow!(
                "backend.api_key is empty; set it in the config file or via PUMPGUARD_API_KEY"
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_sane() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.http.request_timeout_secs, 30);
        assert_eq!(cfg.cache.default_ttl_secs, 300);
        assert!(cfg.cache.enabled);
        assert_eq!(cfg.retry.backoff_base_ms, 1_000);
    }

    #[test]
    fn loads_from_toml_file() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(
            f,
            r#"
[backend]
url = "https://pg.example.com/"
api_key = "anon-key"

[cache]
default_ttl_secs = 60
"#
        )
        .unwrap();
        let mut cfg = load_from_file(f.path().to_str().unwrap()).unwrap();
        cfg.normalize_and_validate().unwrap();
        // trailing slash is stripped during normalization
        assert_eq!(cfg.backend.url, "https://pg.example.com");
        assert_eq!(cfg.cache.default_ttl_secs, 60);
        assert_eq!(cfg.http.request_timeout_secs, 30);
    }

    #[test]
    fn rejects_non_http_url() {
        let mut cfg = AppConfig::default();
        cfg.backend.url = "ftp://pg.example.com".into();
        cfg.backend.api_key = "k".into();
        assert!(cfg.normalize_and_validate().is_err());
    }

    #[test]
    fn rejects_backoff_max_below_base() {
        let mut cfg = AppConfig::default();
        cfg.backend.url = "https://pg.example.com".into();
        cfg.backend.api_key = "k".into();
        cfg.retry.backoff_base_ms = 2_000;
        cfg.retry.backoff_max_ms = 1_000;
        assert!(cfg.normalize_and_validate().is_err());
    }
}
