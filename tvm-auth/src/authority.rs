//! Credential Authorities
//!
//! The credential authority mints the short-lived credentials handed to a
//! validated device. The service only sees the [`CredentialAuthority`] trait;
//! two implementations ship here:
//!
//! - [`LocalCredentialAuthority`]: mints random credentials in-process
//!   (development and tests)
//! - [`HttpCredentialAuthority`]: asks an STS-style federation endpoint

use crate::error::{Result, TvmError};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Utc};
use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tracing::debug;

/// Short-lived cloud credentials
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credentials {
    /// Access key identifier
    pub access_key_id: String,

    /// Secret access key
    pub secret_access_key: String,

    /// Session token
    pub session_token: String,

    /// Expiration instant set by the authority
    pub expiration: DateTime<Utc>,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("session_token", &"<redacted>")
            .field("expiration", &self.expiration)
            .finish()
    }
}

/// Issues credentials for a device identity.
///
/// `Ok(None)` and `Err(_)` both mean "no credentials for this request".
#[async_trait]
pub trait CredentialAuthority: Send + Sync {
    /// Issue credentials for `identifier`
    async fn issue(&self, identifier: &str) -> Result<Option<Credentials>>;
}

const ACCESS_KEY_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ234567";
const SECRET_KEY_CHARSET: &[u8] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

fn random_string(charset: &[u8], len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| charset[rng.gen_range(0..charset.len())] as char)
        .collect()
}

/// In-process credential authority
#[derive(Debug, Clone)]
pub struct LocalCredentialAuthority {
    session_duration: Duration,
}

impl LocalCredentialAuthority {
    /// Create an authority issuing credentials valid for `session_duration`
    pub fn new(session_duration: Duration) -> Self {
        Self { session_duration }
    }
}

impl Default for LocalCredentialAuthority {
    fn default() -> Self {
        Self::new(Duration::from_secs(crate::DEFAULT_SESSION_DURATION_SECS))
    }
}

#[async_trait]
impl CredentialAuthority for LocalCredentialAuthority {
    async fn issue(&self, identifier: &str) -> Result<Option<Credentials>> {
        let lifetime = chrono::Duration::from_std(self.session_duration)
            .map_err(|e| TvmError::Config(format!("Invalid session duration: {}", e)))?;

        let mut token = [0u8; 256];
        rand::thread_rng().fill_bytes(&mut token);

        debug!(name = %federation_name(identifier), "minting local credentials");

        Ok(Some(Credentials {
            access_key_id: format!("ASIA{}", random_string(ACCESS_KEY_CHARSET, 16)),
            secret_access_key: random_string(SECRET_KEY_CHARSET, 40),
            session_token: STANDARD.encode(token),
            expiration: Utc::now() + lifetime,
        }))
    }
}

/// Federation token request body
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FederationTokenRequest {
    /// Federated user name
    pub name: String,

    /// Requested credential lifetime
    pub duration_seconds: u64,
}

/// Credential authority backed by an STS-style HTTP endpoint
#[derive(Debug, Clone)]
pub struct HttpCredentialAuthority {
    endpoint: String,
    session_duration: Duration,
    client: reqwest::Client,
}

impl HttpCredentialAuthority {
    /// Create an authority posting to `endpoint`
    pub fn new(
        endpoint: impl Into<String>,
        session_duration: Duration,
        request_timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| TvmError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            endpoint: endpoint.into(),
            session_duration,
            client,
        })
    }
}

#[async_trait]
impl CredentialAuthority for HttpCredentialAuthority {
    async fn issue(&self, identifier: &str) -> Result<Option<Credentials>> {
        let request = FederationTokenRequest {
            name: federation_name(identifier),
            duration_seconds: self.session_duration.as_secs(),
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            debug!(status = %response.status(), "federation endpoint refused");
            return Ok(None);
        }

        let body = response.bytes().await?;
        match serde_json::from_slice::<Credentials>(&body) {
            Ok(credentials) => Ok(Some(credentials)),
            Err(e) => {
                debug!(error = %e, "federation endpoint returned malformed credentials");
                Ok(None)
            }
        }
    }
}

/// Derive a federated user name from a device identifier.
///
/// Federation names allow 2..=32 characters from `[A-Za-z0-9+=,.@_-]`.
pub fn federation_name(identifier: &str) -> String {
    let name: String = identifier
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || "+=,.@_-".contains(*c))
        .take(32)
        .collect();

    if name.len() < 2 {
        format!("tvm-{}", name)
    } else {
        name
    }
}
