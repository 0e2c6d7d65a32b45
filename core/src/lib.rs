//! idgate-core: Platform-agnostic OpenID Connect ID token validation
//!
//! This crate contains the claim matching, signing-key resolution and
//! key-rotation retry logic for validating ID tokens. It depends only on
//! abstract platform traits (Cache, HttpClient, Clock, Environment) and never
//! imports runtime-specific code.

pub mod config;
pub mod error;
pub mod oidc;
pub mod platform;
pub mod request;

#[cfg(test)]
pub mod test_support;
