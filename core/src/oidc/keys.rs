//! Signing-key lookup and decoding

use async_trait::async_trait;
use jsonwebtoken::jwk::Jwk;
use jsonwebtoken::DecodingKey;

use crate::error::{OpenIdError, Result};
use crate::request::RequestContext;

/// Source of raw signing-key material, addressed by issuer and key id.
///
/// Implementations own any caching. A flush for an issuer must be visible to
/// the next `get_signing_key` for that issuer.
#[async_trait(?Send)]
pub trait SigningKeyGetter {
    async fn get_signing_key(&self, ctx: &RequestContext, issuer: &str, kid: &str)
        -> Result<Vec<u8>>;

    async fn flush_cached_signing_keys(&self, issuer: &str) -> Result<()>;
}

/// Turns raw key material into a signature verification key
pub trait KeyDecoder {
    fn decode(&self, key: &[u8]) -> Result<DecodingKey>;
}

/// Decodes PEM-encoded RSA public keys
pub struct RsaPemDecoder;

impl KeyDecoder for RsaPemDecoder {
    fn decode(&self, key: &[u8]) -> Result<DecodingKey> {
        DecodingKey::from_rsa_pem(key)
            .map_err(|e| OpenIdError::invalid_key(format!("invalid RSA public key PEM: {}", e)))
    }
}

/// Decodes a single JSON-serialized JWK
pub struct JwkDecoder;

impl KeyDecoder for JwkDecoder {
    fn decode(&self, key: &[u8]) -> Result<DecodingKey> {
        let jwk: Jwk = serde_json::from_slice(key)
            .map_err(|e| OpenIdError::invalid_key(format!("invalid JWK: {}", e)))?;

        DecodingKey::from_jwk(&jwk)
            .map_err(|e| OpenIdError::invalid_key(format!("unusable JWK: {}", e)))
    }
}

/// Fetch and decode the verification key for an already validated issuer.
///
/// Errors from the getter or the decoder are returned as they are.
pub async fn resolve_signing_key(
    keys: &dyn SigningKeyGetter,
    decoder: &dyn KeyDecoder,
    ctx: &RequestContext,
    issuer: &str,
    kid: &str,
) -> Result<DecodingKey> {
    let raw = keys.get_signing_key(ctx, issuer, kid).await?;
    decoder.decode(&raw)
}
