//! Registered OpenID providers

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::{OpenIdError, Result, SetupErrorCode};

/// A trusted issuer and the client ids it issues tokens for
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Provider {
    pub issuer: String,
    pub client_ids: Vec<String>,
}

impl Provider {
    pub fn new(issuer: impl Into<String>, client_ids: Vec<String>) -> Self {
        Self {
            issuer: issuer.into(),
            client_ids,
        }
    }

    /// Check the provider is usable for matching
    pub fn validate(&self) -> Result<()> {
        if self.issuer.is_empty() {
            return Err(OpenIdError::setup(
                SetupErrorCode::InvalidIssuer,
                "provider issuer must not be empty",
            ));
        }

        if self.client_ids.is_empty() {
            return Err(OpenIdError::setup(
                SetupErrorCode::InvalidClientIds,
                format!("provider {} has no client ids", self.issuer),
            ));
        }

        Ok(())
    }
}

/// Validate a whole provider list before use
pub fn validate_providers(providers: &[Provider]) -> Result<()> {
    if providers.is_empty() {
        return Err(OpenIdError::setup(
            SetupErrorCode::EmptyProviderCollection,
            "no providers are registered",
        ));
    }

    providers.iter().try_for_each(Provider::validate)
}

/// Source of the current provider registry
#[async_trait(?Send)]
pub trait ProviderSource {
    async fn providers(&self) -> Result<Vec<Provider>>;
}

/// Fixed provider list, typically loaded once from configuration
pub struct StaticProviders(pub Vec<Provider>);

#[async_trait(?Send)]
impl ProviderSource for StaticProviders {
    async fn providers(&self) -> Result<Vec<Provider>> {
        Ok(self.0.clone())
    }
}
