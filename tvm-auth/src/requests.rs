//! Boundary request types
//!
//! Format constraints on identifiers and keys are checked here, before the
//! token service is ever called.

use crate::{error::Result, service::TokenRequest};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

/// Printable ASCII without whitespace
fn printable_token(value: &str) -> std::result::Result<(), ValidationError> {
    if value.chars().all(|c| c.is_ascii_graphic()) {
        Ok(())
    } else {
        Err(ValidationError::new("printable_token"))
    }
}

/// Device registration request
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RegisterDeviceRequest {
    /// Unique device identifier
    #[validate(length(min = 24, max = 64), custom(function = "printable_token"))]
    pub uid: String,

    /// Device secret
    #[validate(length(min = 24, max = 127), custom(function = "printable_token"))]
    pub key: String,
}

impl RegisterDeviceRequest {
    /// Validate and return `(uid, key)`
    pub fn into_validated(self) -> Result<(String, String)> {
        self.validate()?;
        Ok((self.uid, self.key))
    }
}

/// Token request parameters
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct TokenRequestParams {
    /// Unique device identifier
    #[validate(length(min = 1, max = 64))]
    pub uid: String,

    /// Request timestamp (ISO-8601)
    #[validate(length(min = 1, max = 64))]
    pub timestamp: String,

    /// Base64 HMAC-SHA256 signature
    #[validate(length(min = 1, max = 128))]
    pub signature: String,
}

impl TokenRequestParams {
    /// Validate and convert into a [`TokenRequest`]
    pub fn into_token_request(self) -> Result<TokenRequest> {
        self.validate()?;
        Ok(TokenRequest::new(self.uid, self.timestamp, self.signature))
    }
}
