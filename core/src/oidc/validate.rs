//! ID token validation
//!
//! Drives the parser with a resolver that validates the issuer, audience and
//! subject claims before handing out a signing key. If the signature does not
//! match, the issuer's cached keys are flushed and the token is parsed once
//! more with a freshly fetched key. There is never a second retry.

use std::cell::OnceCell;

use async_trait::async_trait;
use jsonwebtoken::DecodingKey;
use tracing::{debug, warn};

use super::claims::{self, StringClaim};
use super::keys::{resolve_signing_key, KeyDecoder, SigningKeyGetter};
use super::matching::{match_audience, match_issuer, validate_subject};
use super::parser::{KeyResolver, ParseError, TokenParser, UnverifiedToken, VerifiedToken};
use super::provider::{validate_providers, ProviderSource};
use crate::error::{OpenIdError, Result, ValidationErrorCode};
use crate::request::RequestContext;

/// Validates ID tokens against the registered providers.
///
/// Holds only borrowed collaborators, so one instance can serve any number of
/// concurrent validations.
pub struct IdTokenValidator<'a> {
    providers: &'a dyn ProviderSource,
    parser: &'a dyn TokenParser,
    keys: &'a dyn SigningKeyGetter,
    decoder: &'a dyn KeyDecoder,
}

impl<'a> IdTokenValidator<'a> {
    pub fn new(
        providers: &'a dyn ProviderSource,
        parser: &'a dyn TokenParser,
        keys: &'a dyn SigningKeyGetter,
        decoder: &'a dyn KeyDecoder,
    ) -> Self {
        Self {
            providers,
            parser,
            keys,
            decoder,
        }
    }

    /// Validate a raw ID token, returning it once its claims and signature check out
    #[tracing::instrument(name = "validate_id_token", skip_all, fields(request_id = %ctx.request_id))]
    pub async fn validate(&self, ctx: &RequestContext, token: &str) -> Result<VerifiedToken> {
        let first_pass = ClaimsValidatingResolver {
            validator: self,
            ctx,
            proven_issuer: OnceCell::new(),
        };

        let outcome = self.parser.parse(token, &first_pass).await;

        match outcome {
            Ok(verified) => Ok(verified),
            Err(ParseError::SignatureInvalid) => {
                let renewal = RenewingResolver {
                    validator: self,
                    ctx,
                    proven_issuer: first_pass.proven_issuer.into_inner(),
                };

                self.parser
                    .parse(token, &renewal)
                    .await
                    .map_err(OpenIdError::from)
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// First-pass resolver: full claim validation, then key lookup
struct ClaimsValidatingResolver<'v, 'a> {
    validator: &'v IdTokenValidator<'a>,
    ctx: &'v RequestContext,
    /// Issuer of the matched provider, kept for the renewal pass
    proven_issuer: OnceCell<String>,
}

#[async_trait(?Send)]
impl KeyResolver for ClaimsValidatingResolver<'_, '_> {
    async fn resolve_key(&self, token: &UnverifiedToken) -> Result<DecodingKey> {
        let providers = self.validator.providers.providers().await?;
        validate_providers(&providers)?;

        let provider = match_issuer(&token.claims, &providers)?;
        let client_id = match_audience(&token.claims, provider)?;
        validate_subject(&token.claims)?;

        debug!(issuer = %provider.issuer, client_id, kid = token.kid(), "claims validated, fetching signing key");

        let _ = self.proven_issuer.set(provider.issuer.clone());

        resolve_signing_key(
            self.validator.keys,
            self.validator.decoder,
            self.ctx,
            &provider.issuer,
            token.kid(),
        )
        .await
    }
}

/// Renewal resolver: flush the issuer's cached keys and fetch again.
///
/// Claims were proven on the first pass and are not matched again.
struct RenewingResolver<'v, 'a> {
    validator: &'v IdTokenValidator<'a>,
    ctx: &'v RequestContext,
    proven_issuer: Option<String>,
}

impl RenewingResolver<'_, '_> {
    fn issuer<'t>(&'t self, token: &'t UnverifiedToken) -> Result<&'t str> {
        if let Some(issuer) = &self.proven_issuer {
            return Ok(issuer.as_str());
        }

        match claims::issuer(&token.claims) {
            StringClaim::Present(iss) if !iss.is_empty() => Ok(iss),
            _ => Err(OpenIdError::validation(
                ValidationErrorCode::InvalidIssuer,
                "the token 'iss' claim was not found or was empty",
            )),
        }
    }
}

#[async_trait(?Send)]
impl KeyResolver for RenewingResolver<'_, '_> {
    async fn resolve_key(&self, token: &UnverifiedToken) -> Result<DecodingKey> {
        let issuer = self.issuer(token)?;

        warn!(issuer, kid = token.kid(), "signature mismatch, renewing cached signing keys");

        self.validator.keys.flush_cached_signing_keys(issuer).await?;

        resolve_signing_key(
            self.validator.keys,
            self.validator.decoder,
            self.ctx,
            issuer,
            token.kid(),
        )
        .await
    }
}
