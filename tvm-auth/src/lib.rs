//! # tvm-auth: Anonymous-mode Token Vending Machine
//!
//! Exchanges a proven device identity for short-lived cloud credentials.
//!
//! ## Features
//!
//! - **Device Registration**: binds a device identifier to a secret key, once
//! - **Signed Token Requests**: timestamp freshness plus constant-time HMAC-SHA256 check
//! - **Credential Packaging**: secret-bearing fields sealed under a key only the device holds
//! - **Pluggable Collaborators**: device registry and credential authority behind traits
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │           DEVICE                                        │
//! │  Registers (uid, key) once, then signs timestamps       │
//! └─────────────────────────────────────────────────────────┘
//!                       ↓
//!         ┌─────────────────────────────┐
//!         │   HTTP BOUNDARY             │
//!         │   Format validation         │
//!         │   Outcome → status code     │
//!         └─────────────────────────────┘
//!                       ↓
//!         ┌─────────────────────────────┐
//!         │   ANONYMOUS TOKEN SERVICE   │
//!         │   Freshness → Signature     │
//!         │   Issue → Package           │
//!         └─────────────────────────────┘
//!               ↓                 ↓
//!   ┌──────────────────┐  ┌──────────────────────┐
//!   │ DEVICE REGISTRY  │  │ CREDENTIAL AUTHORITY │
//!   │ uid → secret key │  │ short-lived creds    │
//!   └──────────────────┘  └──────────────────────┘
//! ```

#![warn(missing_docs)]

pub mod authority;
pub mod config;
pub mod error;
pub mod freshness;
pub mod http;
pub mod packaging;
pub mod registry;
pub mod requests;
pub mod service;
pub mod signature;

// Re-exports for convenience
pub use authority::{
    CredentialAuthority, Credentials, HttpCredentialAuthority, LocalCredentialAuthority,
};
pub use config::TvmConfig;
pub use error::{Result, TvmError};
pub use freshness::{Clock, ClockSkewValidator, FixedClock, SystemClock};
pub use packaging::{ResponsePackager, SignedPayload};
pub use registry::{Device, DeviceRegistry, InMemoryDeviceRegistry};
pub use service::{AnonymousTokenService, TokenRequest};
pub use signature::SignatureVerifier;

/// Default freshness window (15 minutes)
pub const DEFAULT_FRESHNESS_WINDOW_SECS: u64 = 15 * 60;

/// Default session duration for issued credentials (12 hours)
pub const DEFAULT_SESSION_DURATION_SECS: u64 = 12 * 60 * 60;

/// Key-derivation context for payload sealing
pub const PAYLOAD_KDF_INFO: &[u8] = b"tvm-payload-v1";
