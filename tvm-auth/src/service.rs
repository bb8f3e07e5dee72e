//! Anonymous Token Service
//!
//! Registers devices, validates signed token requests and issues packaged
//! credentials. Stateless across calls: everything shared lives behind the
//! registry and authority traits.

use crate::{
    authority::CredentialAuthority,
    error::{Result, TvmError},
    freshness::{Clock, ClockSkewValidator, SystemClock},
    packaging::{ResponsePackager, SignedPayload},
    registry::DeviceRegistry,
    signature::SignatureVerifier,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// Token Request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRequest {
    /// Device identifier
    pub identifier: String,

    /// Request timestamp (ISO-8601)
    pub timestamp: String,

    /// Base64 HMAC-SHA256 of the timestamp under the device key
    pub signature: String,
}

impl TokenRequest {
    /// Create a token request
    pub fn new(
        identifier: impl Into<String>,
        timestamp: impl Into<String>,
        signature: impl Into<String>,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            timestamp: timestamp.into(),
            signature: signature.into(),
        }
    }
}

/// Anonymous Token Service
#[derive(Clone)]
pub struct AnonymousTokenService {
    registry: Arc<dyn DeviceRegistry>,
    authority: Arc<dyn CredentialAuthority>,
    clock: Arc<dyn Clock>,
    freshness: ClockSkewValidator,
    verifier: SignatureVerifier,
    packager: ResponsePackager,
}

impl AnonymousTokenService {
    /// Create a service on the system clock with the default freshness window
    pub fn new(registry: Arc<dyn DeviceRegistry>, authority: Arc<dyn CredentialAuthority>) -> Self {
        Self {
            registry,
            authority,
            clock: Arc::new(SystemClock),
            freshness: ClockSkewValidator::default(),
            verifier: SignatureVerifier::new(),
            packager: ResponsePackager::new(),
        }
    }

    /// Use a different clock
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Use a different freshness window
    pub fn with_freshness(mut self, freshness: ClockSkewValidator) -> Self {
        self.freshness = freshness;
        self
    }

    /// Register a device.
    ///
    /// `Ok(())` means registered; an identifier that is already bound yields
    /// [`TvmError::Conflict`] and leaves the existing key untouched.
    pub async fn register_device(&self, identifier: &str, secret_key: &str) -> Result<()> {
        let registered = self
            .registry
            .register(identifier, secret_key)
            .await
            .map_err(internal)?;

        if registered {
            debug!("device registered");
            Ok(())
        } else {
            debug!("device already registered");
            Err(TvmError::Conflict)
        }
    }

    /// Validate a token request: freshness first, then the signature.
    pub async fn validate_token_request(
        &self,
        identifier: &str,
        signature: &str,
        timestamp: &str,
    ) -> Result<()> {
        if !self.freshness.is_fresh(timestamp, self.clock.now()) {
            debug!("timestamp outside freshness window");
            return Err(TvmError::Stale);
        }

        let key = self
            .registry
            .lookup_key(identifier)
            .await
            .map_err(internal)?;

        if !self.verifier.verify(key.as_deref(), timestamp, signature) {
            debug!("signature rejected");
            return Err(TvmError::Unauthorized);
        }

        Ok(())
    }

    /// Issue packaged credentials for a validated device.
    ///
    /// The key is looked up again rather than carried over from validation.
    /// A device that vanished in between is [`TvmError::Unauthorized`].
    pub async fn issue_token(&self, identifier: &str) -> Result<SignedPayload> {
        let key = self
            .registry
            .lookup_key(identifier)
            .await
            .map_err(internal)?
            .ok_or(TvmError::Unauthorized)?;

        let credentials = match self.authority.issue(identifier).await {
            Ok(Some(credentials)) => credentials,
            Ok(None) => return Err(TvmError::CredentialUnavailable),
            Err(e) => {
                debug!(error = %e, "credential authority failed");
                return Err(TvmError::CredentialUnavailable);
            }
        };

        let payload = self
            .packager
            .package(&credentials, &key)
            .map_err(|e| match e {
                TvmError::Packaging(_) => e,
                other => TvmError::Packaging(other.to_string()),
            })?;

        debug!(access_key_id = %payload.access_key_id, "token issued");
        Ok(payload)
    }

    /// Validate a request and, on success, issue its token
    pub async fn request_token(&self, request: &TokenRequest) -> Result<SignedPayload> {
        self.validate_token_request(&request.identifier, &request.signature, &request.timestamp)
            .await?;
        self.issue_token(&request.identifier).await
    }
}

/// Registry failures surface as internal errors, whatever variant the store used
fn internal(err: TvmError) -> TvmError {
    match err {
        TvmError::Internal(_) => err,
        other => TvmError::Internal(other.to_string()),
    }
}
