//! Error types and HTTP status mapping

use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Result type alias for validation operations
pub type Result<T> = std::result::Result<T, OpenIdError>;

const UNAUTHORIZED: u16 = 401;

/// Claim-validation failure codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationErrorCode {
    InvalidIssuerType,
    InvalidIssuer,
    IssuerNotFound,
    InvalidAudienceType,
    InvalidAudience,
    AudienceNotFound,
    InvalidSubjectType,
    InvalidSubject,
}

impl ValidationErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidIssuerType => "invalid_issuer_type",
            Self::InvalidIssuer => "invalid_issuer",
            Self::IssuerNotFound => "issuer_not_found",
            Self::InvalidAudienceType => "invalid_audience_type",
            Self::InvalidAudience => "invalid_audience",
            Self::AudienceNotFound => "audience_not_found",
            Self::InvalidSubjectType => "invalid_subject_type",
            Self::InvalidSubject => "invalid_subject",
        }
    }
}

impl fmt::Display for ValidationErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A rejected claim, carrying the status to surface to the client.
///
/// These are terminal: the validator never retries after producing one.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{code}: {message}")]
pub struct ValidationError {
    pub code: ValidationErrorCode,
    pub message: String,
    pub http_status: u16,
}

impl ValidationError {
    pub fn new(code: ValidationErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            http_status: UNAUTHORIZED,
        }
    }
}

/// Provider registry problems detected before any token is examined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SetupErrorCode {
    EmptyProviderCollection,
    InvalidIssuer,
    InvalidClientIds,
}

impl SetupErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EmptyProviderCollection => "empty_provider_collection",
            Self::InvalidIssuer => "invalid_issuer",
            Self::InvalidClientIds => "invalid_client_ids",
        }
    }
}

/// OpenID validation error with HTTP status code mapping
#[derive(Error, Debug)]
pub enum OpenIdError {
    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("token signature does not match the signing key")]
    SignatureInvalid,

    #[error("token has expired")]
    TokenExpired,

    #[error("token is not yet valid")]
    TokenNotYetValid,

    #[error("malformed token: {message}")]
    MalformedToken { message: String },

    #[error("unsupported signing algorithm: {algorithm}")]
    UnsupportedAlgorithm { algorithm: String },

    #[error("missing authorization: {message}")]
    MissingAuthorization { message: String },

    #[error("invalid authorization header: {message}")]
    InvalidAuthorization { message: String },

    #[error("signing key not found: {message}")]
    KeyNotFound { message: String },

    #[error("invalid signing key: {message}")]
    InvalidKey { message: String },

    #[error("provider setup error: {message}")]
    Setup { code: SetupErrorCode, message: String },

    #[error("internal error: {message}")]
    Internal { message: String },

    #[error("upstream error: {message}")]
    Upstream { message: String },
}

impl OpenIdError {
    pub fn validation(code: ValidationErrorCode, message: impl Into<String>) -> Self {
        Self::Validation(ValidationError::new(code, message))
    }

    pub fn missing_authorization(message: impl Into<String>) -> Self {
        Self::MissingAuthorization {
            message: message.into(),
        }
    }

    pub fn invalid_authorization(message: impl Into<String>) -> Self {
        Self::InvalidAuthorization {
            message: message.into(),
        }
    }

    pub fn key_not_found(message: impl Into<String>) -> Self {
        Self::KeyNotFound {
            message: message.into(),
        }
    }

    pub fn invalid_key(message: impl Into<String>) -> Self {
        Self::InvalidKey {
            message: message.into(),
        }
    }

    pub fn setup(code: SetupErrorCode, message: impl Into<String>) -> Self {
        Self::Setup {
            code,
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    pub fn upstream_error(message: impl Into<String>) -> Self {
        Self::Upstream {
            message: message.into(),
        }
    }

    /// The claim-validation code, if this error came from claim matching
    pub fn validation_code(&self) -> Option<ValidationErrorCode> {
        match self {
            Self::Validation(e) => Some(e.code),
            _ => None,
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Validation(e) => e.http_status,
            Self::SignatureInvalid
            | Self::TokenExpired
            | Self::TokenNotYetValid
            | Self::MalformedToken { .. }
            | Self::UnsupportedAlgorithm { .. }
            | Self::KeyNotFound { .. } => UNAUTHORIZED,
            Self::MissingAuthorization { .. } | Self::InvalidAuthorization { .. } => 400,
            Self::Setup { .. } | Self::Internal { .. } => 500,
            Self::InvalidKey { .. } | Self::Upstream { .. } => 502,
        }
    }

    /// Get the error key for this error
    pub fn error_key(&self) -> &'static str {
        match self {
            Self::Validation(_)
            | Self::SignatureInvalid
            | Self::TokenExpired
            | Self::TokenNotYetValid
            | Self::MalformedToken { .. }
            | Self::UnsupportedAlgorithm { .. }
            | Self::KeyNotFound { .. } => "invalid_token",
            Self::MissingAuthorization { .. } | Self::InvalidAuthorization { .. } => {
                "invalid_request"
            }
            Self::Setup { .. } => "configuration_error",
            Self::Internal { .. } => "internal_error",
            Self::InvalidKey { .. } | Self::Upstream { .. } => "upstream_error",
        }
    }

    /// Fine-grained code for response bodies and logs
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(e) => e.code.as_str(),
            Self::SignatureInvalid => "signature_invalid",
            Self::TokenExpired => "token_expired",
            Self::TokenNotYetValid => "token_not_yet_valid",
            Self::MalformedToken { .. } => "malformed_token",
            Self::UnsupportedAlgorithm { .. } => "unsupported_algorithm",
            Self::MissingAuthorization { .. } => "authorization_header_not_found",
            Self::InvalidAuthorization { .. } => "authorization_header_wrong_format",
            Self::KeyNotFound { .. } => "kid_not_found",
            Self::InvalidKey { .. } => "invalid_signing_key",
            Self::Setup { code, .. } => code.as_str(),
            Self::Internal { .. } => "internal_error",
            Self::Upstream { .. } => "upstream_error",
        }
    }
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    pub message: String,
}

impl From<&OpenIdError> for ErrorResponse {
    fn from(err: &OpenIdError) -> Self {
        Self {
            error: err.error_key().to_string(),
            code: err.code().to_string(),
            message: err.to_string(),
        }
    }
}
