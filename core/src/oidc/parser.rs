//! JWT parsing and signature verification
//!
//! The parser asks a [`KeyResolver`] for the verification key once per parse,
//! after the header and payload are decoded but before the signature is
//! checked.

use async_trait::async_trait;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Header, Validation};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::error::{OpenIdError, Result};
use crate::platform::Clock;

/// A token whose claims have been decoded but not yet verified
#[derive(Debug, Clone)]
pub struct UnverifiedToken {
    pub header: Header,
    pub claims: Map<String, Value>,
}

impl UnverifiedToken {
    /// Key id from the header, empty when absent
    pub fn kid(&self) -> &str {
        self.header.kid.as_deref().unwrap_or("")
    }
}

/// A token whose signature and time claims have been verified
#[derive(Debug, Clone)]
pub struct VerifiedToken {
    pub header: Header,
    pub claims: Map<String, Value>,
}

/// Supplies the verification key for a token being parsed
#[async_trait(?Send)]
pub trait KeyResolver {
    async fn resolve_key(&self, token: &UnverifiedToken) -> Result<DecodingKey>;
}

/// Parse failures, kept distinct so callers can react to a key mismatch
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("malformed token: {0}")]
    Malformed(String),

    #[error("signature does not match the supplied key")]
    SignatureInvalid,

    #[error("token has expired")]
    Expired,

    #[error("token is not yet valid")]
    NotYetValid,

    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// The key resolver failed; carries its error untouched
    #[error(transparent)]
    KeyResolution(OpenIdError),
}

impl From<ParseError> for OpenIdError {
    fn from(err: ParseError) -> Self {
        match err {
            ParseError::Malformed(message) => OpenIdError::MalformedToken { message },
            ParseError::SignatureInvalid => OpenIdError::SignatureInvalid,
            ParseError::Expired => OpenIdError::TokenExpired,
            ParseError::NotYetValid => OpenIdError::TokenNotYetValid,
            ParseError::UnsupportedAlgorithm(algorithm) => {
                OpenIdError::UnsupportedAlgorithm { algorithm }
            }
            ParseError::KeyResolution(inner) => inner,
        }
    }
}

/// Syntax parser and signature verifier
#[async_trait(?Send)]
pub trait TokenParser {
    async fn parse(
        &self,
        token: &str,
        resolver: &dyn KeyResolver,
    ) -> std::result::Result<VerifiedToken, ParseError>;
}

/// [`TokenParser`] backed by `jsonwebtoken`.
///
/// Time claims are checked against the platform clock rather than the
/// library's, so `exp`/`nbf` validation is disabled on the library side.
pub struct JwtParser<'a> {
    clock: &'a dyn Clock,
    algorithms: Vec<Algorithm>,
    leeway_secs: u64,
}

impl<'a> JwtParser<'a> {
    pub fn new(clock: &'a dyn Clock, algorithms: Vec<Algorithm>, leeway_secs: u64) -> Self {
        Self {
            clock,
            algorithms,
            leeway_secs,
        }
    }

    fn check_time_claims(&self, claims: &Map<String, Value>) -> std::result::Result<(), ParseError> {
        let now = self.clock.now_secs();

        let exp = numeric_date(claims, "exp")?
            .ok_or_else(|| ParseError::Malformed("token has no 'exp' claim".to_string()))?;
        if exp.saturating_add(self.leeway_secs) <= now {
            return Err(ParseError::Expired);
        }

        if let Some(nbf) = numeric_date(claims, "nbf")? {
            if nbf > now.saturating_add(self.leeway_secs) {
                return Err(ParseError::NotYetValid);
            }
        }

        Ok(())
    }
}

#[async_trait(?Send)]
impl TokenParser for JwtParser<'_> {
    async fn parse(
        &self,
        token: &str,
        resolver: &dyn KeyResolver,
    ) -> std::result::Result<VerifiedToken, ParseError> {
        let header = decode_header(token)
            .map_err(|e| ParseError::Malformed(format!("invalid JWT header: {}", e)))?;

        if !self.algorithms.contains(&header.alg) {
            return Err(ParseError::UnsupportedAlgorithm(format!("{:?}", header.alg)));
        }

        let unverified = UnverifiedToken {
            header,
            claims: extract_unverified_claims(token)?,
        };

        let key = resolver
            .resolve_key(&unverified)
            .await
            .map_err(ParseError::KeyResolution)?;

        let mut validation = Validation::new(unverified.header.alg);
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        let data = decode::<Map<String, Value>>(token, &key, &validation).map_err(|e| {
            match e.kind() {
                ErrorKind::InvalidSignature => ParseError::SignatureInvalid,
                ErrorKind::ExpiredSignature => ParseError::Expired,
                ErrorKind::ImmatureSignature => ParseError::NotYetValid,
                ErrorKind::InvalidAlgorithm => ParseError::UnsupportedAlgorithm(e.to_string()),
                _ => ParseError::Malformed(e.to_string()),
            }
        })?;

        self.check_time_claims(&data.claims)?;

        Ok(VerifiedToken {
            header: data.header,
            claims: data.claims,
        })
    }
}

/// Decode the payload without verifying the signature
fn extract_unverified_claims(token: &str) -> std::result::Result<Map<String, Value>, ParseError> {
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        return Err(ParseError::Malformed("invalid JWT format".to_string()));
    }

    let payload = base64_url_decode(parts[1])?;
    serde_json::from_slice(&payload)
        .map_err(|e| ParseError::Malformed(format!("invalid JWT claims: {}", e)))
}

/// Base64 URL decode
fn base64_url_decode(input: &str) -> std::result::Result<Vec<u8>, ParseError> {
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};

    URL_SAFE_NO_PAD
        .decode(input)
        .or_else(|_| {
            use base64::engine::general_purpose::URL_SAFE;
            URL_SAFE.decode(input)
        })
        .map_err(|e| ParseError::Malformed(format!("invalid base64: {}", e)))
}

/// Read a NumericDate claim (seconds since the epoch)
fn numeric_date(
    claims: &Map<String, Value>,
    name: &str,
) -> std::result::Result<Option<u64>, ParseError> {
    match claims.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => value
            .as_f64()
            .filter(|secs| *secs >= 0.0)
            .map(|secs| Some(secs as u64))
            .ok_or_else(|| ParseError::Malformed(format!("'{}' claim must be a numeric date", name))),
    }
}
