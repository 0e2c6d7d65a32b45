//! Per-request context and bearer-token extraction

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{OpenIdError, Result};
use crate::oidc::claims::{self, StringClaim};
use crate::oidc::VerifiedToken;

/// Context of the inbound request being authenticated.
///
/// Passed through to every collaborator call so logs and upstream fetches
/// can be correlated with the request that caused them.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub request_id: String,
}

impl RequestContext {
    pub fn new(request_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
        }
    }
}

/// Extract the ID token from an `Authorization: Bearer <token>` header value
pub fn extract_bearer_token(authorization: Option<&str>) -> Result<&str> {
    let header = authorization
        .filter(|h| !h.trim().is_empty())
        .ok_or_else(|| OpenIdError::missing_authorization("the Authorization header was not found"))?;

    let mut parts = header.split_whitespace();
    let (scheme, token) = match (parts.next(), parts.next(), parts.next()) {
        (Some(scheme), Some(token), None) => (scheme, token),
        _ => {
            return Err(OpenIdError::invalid_authorization(
                "the Authorization header must have the form 'Bearer <token>'",
            ))
        }
    };

    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(OpenIdError::invalid_authorization(format!(
            "the Authorization header scheme must be Bearer, got {}",
            scheme
        )));
    }

    Ok(token)
}

/// The authenticated identity behind an accepted ID token
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub issuer: String,
    pub subject: String,
    pub claims: Map<String, Value>,
}

impl User {
    /// Build the user view of a verified token.
    ///
    /// Only called on tokens whose `iss` and `sub` have already been validated.
    pub fn from_token(token: &VerifiedToken) -> Result<Self> {
        let issuer = match claims::issuer(&token.claims) {
            StringClaim::Present(iss) => iss.to_string(),
            _ => return Err(OpenIdError::internal("verified token lost its issuer")),
        };
        let subject = match claims::subject(&token.claims) {
            StringClaim::Present(sub) => sub.to_string(),
            _ => return Err(OpenIdError::internal("verified token lost its subject")),
        };

        Ok(Self {
            issuer,
            subject,
            claims: token.claims.clone(),
        })
    }
}
