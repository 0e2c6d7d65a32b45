//! OIDC Discovery document fetching
//!
//! Fetches and parses OpenID Connect discovery documents.

use serde::Deserialize;
use tracing::debug;

use crate::error::{OpenIdError, Result};
use crate::platform::HttpClient;

pub const USER_AGENT: &str = "idgate";

/// OIDC Discovery document (partial)
#[derive(Deserialize)]
pub struct DiscoveryDocument {
    pub issuer: String,
    pub jwks_uri: String,
}

/// Fetch OIDC discovery document for an issuer.
///
/// The document must name the same issuer it was fetched for. Its `jwks_uri`
/// decides which keys are trusted for that issuer, so a document claiming a
/// different issuer could plant another party's keys in the issuer's cache
/// entry.
pub async fn fetch_discovery(issuer: &str, http: &dyn HttpClient) -> Result<DiscoveryDocument> {
    validate_issuer_url(issuer)?;

    let discovery_url = format!("{}/.well-known/openid-configuration", issuer.trim_end_matches('/'));
    debug!(url = %discovery_url, "fetching discovery document");

    let response = http
        .get(
            &discovery_url,
            &[("Accept", "application/json"), ("User-Agent", USER_AGENT)],
        )
        .await
        .map_err(|e| OpenIdError::upstream_error(format!("failed to fetch discovery document: {}", e)))?;

    if response.status != 200 {
        return Err(OpenIdError::upstream_error(format!(
            "failed to fetch discovery document: HTTP {}",
            response.status
        )));
    }

    let doc: DiscoveryDocument = response
        .json()
        .map_err(|e| OpenIdError::upstream_error(format!("invalid discovery document: {}", e)))?;

    if doc.issuer != issuer && doc.issuer != issuer.trim_end_matches('/') {
        return Err(OpenIdError::upstream_error(format!(
            "issuer mismatch: expected '{}', got '{}'",
            issuer, doc.issuer
        )));
    }

    Ok(doc)
}

/// Validate issuer URL format per RFC 8414 and OpenID Connect Core 1.0
fn validate_issuer_url(issuer: &str) -> Result<()> {
    let url = url::Url::parse(issuer)
        .map_err(|_| OpenIdError::upstream_error(format!("issuer is not a URL: {}", issuer)))?;

    let is_localhost = matches!(url.host_str(), Some("localhost") | Some("127.0.0.1") | Some("::1"));
    if url.scheme() != "https" && !is_localhost {
        return Err(OpenIdError::upstream_error("issuer must use HTTPS"));
    }

    if url.query().is_some() {
        return Err(OpenIdError::upstream_error("issuer URL must not have query string"));
    }

    if url.fragment().is_some() {
        return Err(OpenIdError::upstream_error("issuer URL must not have fragment"));
    }

    if !url.username().is_empty() || url.password().is_some() {
        return Err(OpenIdError::upstream_error("issuer URL must not have userinfo"));
    }

    Ok(())
}
