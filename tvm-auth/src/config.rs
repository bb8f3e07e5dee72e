//! Configuration management for the Token Vending Machine
//!
//! Values come from, in increasing precedence: built-in defaults, a TOML
//! file, then `TVM_*` environment variables (a `.env` file is honoured).
//!
//! ```toml
//! freshness_window = "15m"
//!
//! [server]
//! host = "0.0.0.0"
//! port = 8080
//!
//! [authority]
//! kind = "http"
//! endpoint = "https://sts.internal.example/federation"
//! session_duration = "12h"
//! request_timeout = "10s"
//! ```

use crate::{
    authority::{CredentialAuthority, HttpCredentialAuthority, LocalCredentialAuthority},
    error::{Result, TvmError},
    freshness::ClockSkewValidator,
    DEFAULT_FRESHNESS_WINDOW_SECS, DEFAULT_SESSION_DURATION_SECS,
};
use humantime_serde::re::humantime;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Shortest session a federation endpoint will grant
pub const MIN_SESSION_DURATION: Duration = Duration::from_secs(15 * 60);

/// Longest session a federation endpoint will grant
pub const MAX_SESSION_DURATION: Duration = Duration::from_secs(36 * 60 * 60);

/// Application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TvmConfig {
    /// HTTP listener
    #[serde(default)]
    pub server: ServerConfig,

    /// Maximum accepted clock skew of request timestamps
    #[serde(default = "TvmConfig::default_freshness_window", with = "humantime_serde")]
    pub freshness_window: Duration,

    /// Credential authority
    #[serde(default)]
    pub authority: AuthorityConfig,
}

impl Default for TvmConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            freshness_window: Self::default_freshness_window(),
            authority: AuthorityConfig::default(),
        }
    }
}

/// HTTP listener configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind host
    pub host: String,
    /// Bind port
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

/// Which credential authority to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthorityKind {
    /// Mint credentials in-process
    Local,
    /// Call a federation endpoint
    Http,
}

/// Credential authority configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthorityConfig {
    /// Authority implementation
    pub kind: AuthorityKind,

    /// Federation endpoint URL (required for `http`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    /// Lifetime of issued credentials
    #[serde(default = "AuthorityConfig::default_session_duration", with = "humantime_serde")]
    pub session_duration: Duration,

    /// Timeout for federation endpoint calls
    #[serde(default = "AuthorityConfig::default_request_timeout", with = "humantime_serde")]
    pub request_timeout: Duration,
}

impl Default for AuthorityConfig {
    fn default() -> Self {
        Self {
            kind: AuthorityKind::Local,
            endpoint: None,
            session_duration: Self::default_session_duration(),
            request_timeout: Self::default_request_timeout(),
        }
    }
}

impl AuthorityConfig {
    fn default_session_duration() -> Duration {
        Duration::from_secs(DEFAULT_SESSION_DURATION_SECS)
    }

    fn default_request_timeout() -> Duration {
        Duration::from_secs(10)
    }
}

impl TvmConfig {
    fn default_freshness_window() -> Duration {
        Duration::from_secs(DEFAULT_FRESHNESS_WINDOW_SECS)
    }

    /// Load configuration: defaults, then `path` if given, then environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        dotenvy::dotenv().ok();

        let mut config = match path {
            Some(path) => {
                let content = std::fs::read_to_string(path).map_err(|e| {
                    TvmError::Config(format!("Failed to read {}: {}", path.display(), e))
                })?;
                Self::from_toml_str(&content)?
            }
            None => Self::default(),
        };

        config.apply_overrides(|name| std::env::var(name).ok())?;
        config.validate()?;

        Ok(config)
    }

    /// Parse a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| TvmError::Config(format!("Failed to parse config: {}", e)))
    }

    /// Apply `TVM_*` overrides from `lookup`
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("TVM_HOST") {
            self.server.host = host;
        }

        if let Some(port) = lookup("TVM_PORT") {
            self.server.port = port
                .parse()
                .map_err(|_| TvmError::Config(format!("Invalid TVM_PORT: {}", port)))?;
        }

        if let Some(window) = lookup("TVM_FRESHNESS_WINDOW") {
            self.freshness_window = parse_duration("TVM_FRESHNESS_WINDOW", &window)?;
        }

        if let Some(endpoint) = lookup("TVM_AUTHORITY_ENDPOINT") {
            self.authority.kind = AuthorityKind::Http;
            self.authority.endpoint = Some(endpoint);
        }

        if let Some(duration) = lookup("TVM_SESSION_DURATION") {
            self.authority.session_duration = parse_duration("TVM_SESSION_DURATION", &duration)?;
        }

        Ok(())
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<()> {
        if self.freshness_window.is_zero() {
            return Err(TvmError::Config(
                "freshness_window must be positive".to_string(),
            ));
        }

        let session = self.authority.session_duration;
        if session < MIN_SESSION_DURATION || session > MAX_SESSION_DURATION {
            return Err(TvmError::Config(format!(
                "session_duration {} outside {}..={}",
                humantime::format_duration(session),
                humantime::format_duration(MIN_SESSION_DURATION),
                humantime::format_duration(MAX_SESSION_DURATION),
            )));
        }

        if self.authority.kind == AuthorityKind::Http && self.authority.endpoint.is_none() {
            return Err(TvmError::Config(
                "authority.endpoint is required when kind = \"http\"".to_string(),
            ));
        }

        Ok(())
    }

    /// Socket address to bind
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Freshness validator for the configured window
    pub fn freshness_validator(&self) -> Result<ClockSkewValidator> {
        let window = chrono::Duration::from_std(self.freshness_window)
            .map_err(|e| TvmError::Config(format!("Invalid freshness_window: {}", e)))?;
        Ok(ClockSkewValidator::new(window))
    }

    /// Build the configured credential authority
    pub fn build_authority(&self) -> Result<Arc<dyn CredentialAuthority>> {
        match self.authority.kind {
            AuthorityKind::Local => Ok(Arc::new(LocalCredentialAuthority::new(
                self.authority.session_duration,
            ))),
            AuthorityKind::Http => {
                let endpoint = self.authority.endpoint.clone().ok_or_else(|| {
                    TvmError::Config("authority.endpoint is not set".to_string())
                })?;
                Ok(Arc::new(HttpCredentialAuthority::new(
                    endpoint,
                    self.authority.session_duration,
                    self.authority.request_timeout,
                )?))
            }
        }
    }
}

fn parse_duration(name: &str, value: &str) -> Result<Duration> {
    humantime::parse_duration(value)
        .map_err(|e| TvmError::Config(format!("Invalid {}: {}", name, e)))
}
