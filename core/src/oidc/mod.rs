//! OIDC (OpenID Connect) module
//!
//! Handles ID token validation: claim matching against registered providers,
//! signing-key resolution via discovery and JWKS, and signature verification.

pub mod claims;
mod discovery;
mod jwks;
mod keys;
mod matching;
mod parser;
mod provider;
mod validate;

pub use jwks::JwksKeyResolver;
pub use keys::{resolve_signing_key, JwkDecoder, KeyDecoder, RsaPemDecoder, SigningKeyGetter};
pub use matching::{match_audience, match_issuer, validate_subject};
pub use parser::{JwtParser, KeyResolver, ParseError, TokenParser, UnverifiedToken, VerifiedToken};
pub use provider::{validate_providers, Provider, ProviderSource, StaticProviders};
pub use validate::IdTokenValidator;
