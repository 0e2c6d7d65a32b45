//! JWKS (JSON Web Key Set) handling
//!
//! Fetches provider key sets via discovery and caches them per issuer, so
//! flushing an issuer drops every key it published.

use async_trait::async_trait;
use jsonwebtoken::jwk::{Jwk, JwkSet};
use tracing::{debug, warn};

use super::discovery::{fetch_discovery, USER_AGENT};
use super::keys::SigningKeyGetter;
use crate::error::{OpenIdError, Result};
use crate::platform::{cache_get, cache_put, Cache, HttpClient};
use crate::request::RequestContext;

/// Fetch JWKS from a URI
pub async fn fetch_jwks(jwks_uri: &str, http: &dyn HttpClient) -> Result<JwkSet> {
    let response = http
        .get(
            jwks_uri,
            &[("Accept", "application/json"), ("User-Agent", USER_AGENT)],
        )
        .await
        .map_err(|e| OpenIdError::upstream_error(format!("failed to fetch JWKS: {}", e)))?;

    if response.status != 200 {
        return Err(OpenIdError::upstream_error(format!(
            "failed to fetch JWKS: HTTP {}",
            response.status
        )));
    }

    let jwks: JwkSet = response
        .json()
        .map_err(|e| OpenIdError::upstream_error(format!("invalid JWKS: {}", e)))?;

    Ok(jwks)
}

/// [`SigningKeyGetter`] that serves keys from the platform cache and falls
/// back to discovery + JWKS on a miss.
///
/// Keys are returned as JSON-serialized JWKs, to be decoded with
/// [`JwkDecoder`](super::keys::JwkDecoder).
pub struct JwksKeyResolver<'a> {
    cache: &'a dyn Cache,
    http: &'a dyn HttpClient,
    ttl_secs: u64,
}

impl<'a> JwksKeyResolver<'a> {
    pub fn new(cache: &'a dyn Cache, http: &'a dyn HttpClient, ttl_secs: u64) -> Self {
        Self {
            cache,
            http,
            ttl_secs,
        }
    }

    async fn fetch_key_set(&self, ctx: &RequestContext, issuer: &str) -> Result<JwkSet> {
        let discovery = fetch_discovery(issuer, self.http).await?;
        let jwks = fetch_jwks(&discovery.jwks_uri, self.http).await?;

        debug!(
            request_id = %ctx.request_id,
            issuer,
            keys = jwks.keys.len(),
            "fetched signing keys"
        );

        if let Err(e) = cache_put(self.cache, &cache_key(issuer), &jwks, self.ttl_secs).await {
            warn!(issuer, error = %e, "failed to cache signing keys");
        }

        Ok(jwks)
    }
}

#[async_trait(?Send)]
impl SigningKeyGetter for JwksKeyResolver<'_> {
    async fn get_signing_key(
        &self,
        ctx: &RequestContext,
        issuer: &str,
        kid: &str,
    ) -> Result<Vec<u8>> {
        // Cache read failures are treated as a miss
        if let Ok(Some(cached)) = cache_get::<JwkSet>(self.cache, &cache_key(issuer)).await {
            if let Some(jwk) = select_key(&cached, kid) {
                return encode_jwk(jwk);
            }
            debug!(issuer, kid, "key id not in cached key set, refetching");
        }

        let jwks = self.fetch_key_set(ctx, issuer).await?;

        let jwk = select_key(&jwks, kid).ok_or_else(|| {
            OpenIdError::key_not_found(format!(
                "no signing key with kid '{}' published by {}",
                kid, issuer
            ))
        })?;

        encode_jwk(jwk)
    }

    async fn flush_cached_signing_keys(&self, issuer: &str) -> Result<()> {
        debug!(issuer, "flushing cached signing keys");
        self.cache.delete_bytes(&cache_key(issuer)).await
    }
}

fn cache_key(issuer: &str) -> String {
    format!("signing-keys:{}", issuer)
}

/// Pick the key for `kid`; without a kid only a single-key set is unambiguous
fn select_key<'s>(jwks: &'s JwkSet, kid: &str) -> Option<&'s Jwk> {
    if kid.is_empty() {
        return match jwks.keys.as_slice() {
            [only] => Some(only),
            _ => None,
        };
    }

    jwks.find(kid)
}

fn encode_jwk(jwk: &Jwk) -> Result<Vec<u8>> {
    serde_json::to_vec(jwk)
        .map_err(|e| OpenIdError::internal(format!("failed to serialize JWK: {}", e)))
}
