//! Issuer, audience and subject checks against the provider registry

use serde_json::{Map, Value};

use super::claims::{self, StringClaim, StringListClaim};
use super::provider::Provider;
use crate::error::{OpenIdError, Result, ValidationErrorCode};

/// Google issues tokens with a scheme-less `iss`
const GOOGLE_ISSUER: &str = "accounts.google.com";
const GOOGLE_ISSUER_URL: &str = "https://accounts.google.com";

/// Resolve the token issuer to a registered provider.
///
/// The first provider in registry order whose issuer equals the claim (or,
/// for Google, its `https://` form) wins.
pub fn match_issuer<'p>(
    claims: &Map<String, Value>,
    providers: &'p [Provider],
) -> Result<&'p Provider> {
    let issuer = match claims::issuer(claims) {
        StringClaim::Present(iss) if !iss.is_empty() => iss,
        StringClaim::Present(_) | StringClaim::Absent => {
            return Err(OpenIdError::validation(
                ValidationErrorCode::InvalidIssuer,
                "the token 'iss' claim was not found or was empty",
            ))
        }
        StringClaim::WrongType(t) => {
            return Err(OpenIdError::validation(
                ValidationErrorCode::InvalidIssuerType,
                format!("invalid issuer type: {}", t),
            ))
        }
    };

    let alias = if issuer == GOOGLE_ISSUER {
        GOOGLE_ISSUER_URL
    } else {
        issuer
    };

    providers
        .iter()
        .find(|p| p.issuer == issuer || p.issuer == alias)
        .ok_or_else(|| {
            OpenIdError::validation(
                ValidationErrorCode::IssuerNotFound,
                format!("no provider was registered with issuer: {}", issuer),
            )
        })
}

/// Find the client id the token is addressed to.
///
/// Client ids are tried in configured order and, for each, audiences in
/// claim order; the first equal pair wins.
pub fn match_audience<'p>(claims: &Map<String, Value>, provider: &'p Provider) -> Result<&'p str> {
    let audiences = match claims::audiences(claims) {
        StringListClaim::Present(values) => values,
        StringListClaim::Absent => {
            return Err(OpenIdError::validation(
                ValidationErrorCode::InvalidAudience,
                "the token 'aud' claim was not found or was empty",
            ))
        }
        StringListClaim::WrongType(t) => {
            return Err(OpenIdError::validation(
                ValidationErrorCode::InvalidAudienceType,
                format!("invalid audiences type: {}", t),
            ))
        }
    };

    if audiences.iter().any(|aud| aud.is_empty()) {
        return Err(OpenIdError::validation(
            ValidationErrorCode::InvalidAudience,
            "the token 'aud' claim was not found or was empty",
        ));
    }

    for client_id in &provider.client_ids {
        if audiences.iter().any(|aud| *aud == client_id.as_str()) {
            return Ok(client_id.as_str());
        }
    }

    Err(OpenIdError::validation(
        ValidationErrorCode::AudienceNotFound,
        format!(
            "the provider {} does not have a client id matching any of the token audiences {:?}",
            provider.issuer, audiences
        ),
    ))
}

/// Require a non-empty string subject
pub fn validate_subject(claims: &Map<String, Value>) -> Result<&str> {
    match claims::subject(claims) {
        StringClaim::Present(sub) if !sub.is_empty() => Ok(sub),
        StringClaim::Present(_) | StringClaim::Absent => Err(OpenIdError::validation(
            ValidationErrorCode::InvalidSubject,
            "the token 'sub' claim was not found or was empty",
        )),
        StringClaim::WrongType(t) => Err(OpenIdError::validation(
            ValidationErrorCode::InvalidSubjectType,
            format!("invalid subject type: {}", t),
        )),
    }
}
