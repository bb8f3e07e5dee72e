//! Error types for the Token Vending Machine
//!
//! Every failure in a request flow is mapped to exactly one variant here.

/// Result type for TVM operations
pub type Result<T> = std::result::Result<T, TvmError>;

/// TVM outcome taxonomy
#[derive(Debug, thiserror::Error)]
pub enum TvmError {
    /// Malformed identifier, key, timestamp or signature
    #[error("Invalid request: {0}")]
    Validation(String),

    /// Identifier already registered
    #[error("Device already registered")]
    Conflict,

    /// Timestamp outside the freshness window, or unparseable
    #[error("Request timestamp is stale")]
    Stale,

    /// Signature mismatch or unknown identifier
    ///
    /// Carries no detail so both causes render identically.
    #[error("Unauthorized")]
    Unauthorized,

    /// Credential authority returned nothing or failed
    #[error("Credentials unavailable")]
    CredentialUnavailable,

    /// Serializing or sealing the response failed
    #[error("Packaging error: {0}")]
    Packaging(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Unexpected collaborator failure
    #[error("Internal error: {0}")]
    Internal(String),
}

impl TvmError {
    /// Whether the caller caused this outcome
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            TvmError::Validation(_) | TvmError::Conflict | TvmError::Stale | TvmError::Unauthorized
        )
    }

    /// Get HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            TvmError::Validation(_) => 400,
            TvmError::Conflict => 409,
            TvmError::Stale => 408,
            TvmError::Unauthorized => 401,
            TvmError::CredentialUnavailable => 500,
            TvmError::Packaging(_) => 500,
            TvmError::Config(_) => 500,
            TvmError::Internal(_) => 500,
        }
    }

    /// Short machine-readable kind, used in error bodies
    pub fn kind(&self) -> &'static str {
        match self {
            TvmError::Validation(_) => "validation_error",
            TvmError::Conflict => "conflict",
            TvmError::Stale => "request_timeout",
            TvmError::Unauthorized => "unauthorized",
            TvmError::CredentialUnavailable => "credential_unavailable",
            TvmError::Packaging(_) => "packaging_error",
            TvmError::Config(_) | TvmError::Internal(_) => "internal_error",
        }
    }
}

// Conversions from common error types
impl From<anyhow::Error> for TvmError {
    fn from(err: anyhow::Error) -> Self {
        TvmError::Internal(err.to_string())
    }
}

impl From<serde_json::Error> for TvmError {
    fn from(err: serde_json::Error) -> Self {
        TvmError::Packaging(format!("JSON error: {}", err))
    }
}

impl From<reqwest::Error> for TvmError {
    fn from(_: reqwest::Error) -> Self {
        TvmError::CredentialUnavailable
    }
}

impl From<validator::ValidationErrors> for TvmError {
    fn from(err: validator::ValidationErrors) -> Self {
        TvmError::Validation(err.to_string())
    }
}
