//! Native platform implementations
//!
//! Implements core platform traits using native Rust libraries:
//! - Cache: moka in-memory cache with TTL
//! - HttpClient: reqwest
//! - Clock: std::time::SystemTime
//! - Environment: std::env

use async_trait::async_trait;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use idgate_core::error::{OpenIdError, Result};
use idgate_core::platform::{Cache, Clock, Environment, HttpClient, HttpResponse};

/// In-memory cache with TTL, shared by all requests served by this process
pub struct MokaCache {
    cache: moka::future::Cache<String, Vec<u8>>,
}

impl MokaCache {
    pub fn new(ttl_secs: u64) -> Self {
        Self {
            cache: moka::future::Cache::builder()
                .max_capacity(1000)
                .time_to_live(Duration::from_secs(ttl_secs))
                .build(),
        }
    }
}

#[async_trait(?Send)]
impl Cache for MokaCache {
    async fn get_bytes(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.cache.get(key).await)
    }

    async fn put_bytes(&self, key: &str, value: &[u8], _ttl_secs: u64) -> Result<()> {
        // Cache-wide TTL applies; every entry here is a key set with the same lifetime.
        self.cache.insert(key.to_string(), value.to_vec()).await;
        Ok(())
    }

    async fn delete_bytes(&self, key: &str) -> Result<()> {
        self.cache.invalidate(key).await;
        Ok(())
    }
}

/// reqwest-based HTTP client
pub struct ReqwestHttpClient {
    client: reqwest::Client,
}

impl ReqwestHttpClient {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| OpenIdError::internal(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { client })
    }
}

#[async_trait(?Send)]
impl HttpClient for ReqwestHttpClient {
    async fn get(&self, url: &str, headers: &[(&str, &str)]) -> Result<HttpResponse> {
        let mut builder = self.client.get(url);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| OpenIdError::upstream_error(format!("HTTP GET failed: {}", e)))?;

        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| OpenIdError::upstream_error(format!("failed to read response: {}", e)))?
            .to_vec();

        Ok(HttpResponse { status, body })
    }
}

/// System clock using std::time
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_secs(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or(Duration::ZERO)
            .as_secs()
    }
}

/// Process environment variables
pub struct ProcessEnv;

impl Environment for ProcessEnv {
    fn get_var(&self, name: &str) -> Result<String> {
        std::env::var(name)
            .map_err(|_| OpenIdError::internal(format!("environment variable '{}' not set", name)))
    }
}
