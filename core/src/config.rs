//! Configuration loaded from the platform environment

use std::str::FromStr;

use jsonwebtoken::Algorithm;

use crate::error::{OpenIdError, Result};
use crate::oidc::Provider;
use crate::platform::Environment;

/// Cache TTL for fetched signing keys (1 hour)
pub const KEY_CACHE_TTL_SECS: u64 = 3600;

/// Allowed clock skew when checking `exp`/`nbf`
pub const CLOCK_LEEWAY_SECS: u64 = 60;

/// Application configuration loaded from environment
pub struct Config {
    /// Registered providers (`IDGATE_PROVIDERS`, JSON array)
    pub providers: Vec<Provider>,
    /// TTL for cached signing keys
    pub key_cache_ttl_secs: u64,
    /// Signature algorithms accepted on ID tokens
    pub allowed_algorithms: Vec<Algorithm>,
    /// Clock skew tolerance for time-based claims
    pub clock_leeway_secs: u64,
}

impl Config {
    /// Load configuration from platform environment
    pub fn from_env(env: &dyn Environment) -> Result<Self> {
        let providers = providers_from_env(env)?;

        let key_cache_ttl_secs = match env.get_var("IDGATE_KEY_CACHE_TTL_SECS") {
            Ok(v) => parse_secs("IDGATE_KEY_CACHE_TTL_SECS", &v)?,
            Err(_) => KEY_CACHE_TTL_SECS,
        };

        let clock_leeway_secs = match env.get_var("IDGATE_CLOCK_LEEWAY_SECS") {
            Ok(v) => parse_secs("IDGATE_CLOCK_LEEWAY_SECS", &v)?,
            Err(_) => CLOCK_LEEWAY_SECS,
        };

        let allowed_algorithms = match env.get_var("IDGATE_ALLOWED_ALGORITHMS") {
            Ok(v) => parse_algorithms(&v)?,
            Err(_) => vec![Algorithm::RS256],
        };

        Ok(Self {
            providers,
            key_cache_ttl_secs,
            allowed_algorithms,
            clock_leeway_secs,
        })
    }
}

/// Parse the provider registry from `IDGATE_PROVIDERS`
pub fn providers_from_env(env: &dyn Environment) -> Result<Vec<Provider>> {
    let raw = env
        .get_var("IDGATE_PROVIDERS")
        .map_err(|_| OpenIdError::internal("IDGATE_PROVIDERS not configured"))?;

    serde_json::from_str(&raw)
        .map_err(|e| OpenIdError::internal(format!("IDGATE_PROVIDERS is not valid JSON: {}", e)))
}

fn parse_secs(name: &str, value: &str) -> Result<u64> {
    value
        .trim()
        .parse()
        .map_err(|_| OpenIdError::internal(format!("{} must be a number of seconds", name)))
}

/// Parse a comma-separated algorithm list such as `RS256,ES256`
fn parse_algorithms(value: &str) -> Result<Vec<Algorithm>> {
    let algorithms = value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            Algorithm::from_str(s)
                .map_err(|_| OpenIdError::internal(format!("unknown signing algorithm: {}", s)))
        })
        .collect::<Result<Vec<_>>>()?;

    if algorithms.is_empty() {
        return Err(OpenIdError::internal(
            "IDGATE_ALLOWED_ALGORITHMS must name at least one algorithm",
        ));
    }

    Ok(algorithms)
}
