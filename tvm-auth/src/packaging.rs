//! Response Packaging
//!
//! Wraps issued credentials for transport. `accessKeyId` and `expiration`
//! travel in cleartext; `secretAccessKey` and `sessionToken` are sealed with
//! ChaCha20-Poly1305 under a key derived from the device secret:
//!
//! ```text
//! key   = HKDF-SHA256(ikm = device secret, info = "tvm-payload-v1")
//! aad   = accessKeyId || "\n" || expiration (RFC 3339)
//! nonce = 96 random bits
//! ```
//!
//! Binding the cleartext fields as associated data means a payload whose
//! access key or expiry was altered in transit fails to open.

use crate::{
    authority::Credentials,
    error::{Result, TvmError},
    PAYLOAD_KDF_INFO,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chacha20poly1305::{
    aead::{Aead, AeadCore, KeyInit, OsRng, Payload},
    ChaCha20Poly1305, Key, Nonce,
};
use chrono::{DateTime, SecondsFormat, Utc};
use hkdf::Hkdf;
use serde::{Deserialize, Serialize};
use sha2::Sha256;

const NONCE_LEN: usize = 12;

/// Packaged token response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedPayload {
    /// Access key identifier (cleartext)
    pub access_key_id: String,

    /// Expiration instant (cleartext)
    pub expiration: DateTime<Utc>,

    /// Base64 AEAD nonce
    pub nonce: String,

    /// Base64 sealed secret-bearing fields
    pub ciphertext: String,
}

impl SignedPayload {
    /// Serialize to the JSON document sent to the device
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Fields sealed inside the payload
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SealedFields {
    secret_access_key: String,
    session_token: String,
}

fn payload_cipher(device_key: &str) -> Result<ChaCha20Poly1305> {
    let hk = Hkdf::<Sha256>::new(None, device_key.as_bytes());
    let mut okm = [0u8; 32];
    hk.expand(PAYLOAD_KDF_INFO, &mut okm)
        .map_err(|e| TvmError::Packaging(format!("Key derivation failed: {}", e)))?;

    Ok(ChaCha20Poly1305::new(Key::from_slice(&okm)))
}

fn associated_data(access_key_id: &str, expiration: &DateTime<Utc>) -> Vec<u8> {
    format!(
        "{}\n{}",
        access_key_id,
        expiration.to_rfc3339_opts(SecondsFormat::AutoSi, true)
    )
    .into_bytes()
}

/// Response Packager
#[derive(Debug, Clone, Copy, Default)]
pub struct ResponsePackager;

impl ResponsePackager {
    /// Create a packager
    pub fn new() -> Self {
        Self
    }

    /// Seal `credentials` so only the holder of `device_key` can open them
    pub fn package(&self, credentials: &Credentials, device_key: &str) -> Result<SignedPayload> {
        let cipher = payload_cipher(device_key)?;

        let sealed = serde_json::to_vec(&SealedFields {
            secret_access_key: credentials.secret_access_key.clone(),
            session_token: credentials.session_token.clone(),
        })?;
        let aad = associated_data(&credentials.access_key_id, &credentials.expiration);

        let nonce = ChaCha20Poly1305::generate_nonce(&mut OsRng);
        let ciphertext = cipher
            .encrypt(
                &nonce,
                Payload {
                    msg: &sealed,
                    aad: &aad,
                },
            )
            .map_err(|e| TvmError::Packaging(format!("Encryption failed: {}", e)))?;

        Ok(SignedPayload {
            access_key_id: credentials.access_key_id.clone(),
            expiration: credentials.expiration,
            nonce: STANDARD.encode(nonce),
            ciphertext: STANDARD.encode(ciphertext),
        })
    }
}

/// Open a payload with the device key. This is the device-side inverse of
/// [`ResponsePackager::package`].
pub fn unpackage(payload: &SignedPayload, device_key: &str) -> Result<Credentials> {
    let cipher = payload_cipher(device_key)?;

    let nonce = STANDARD
        .decode(&payload.nonce)
        .map_err(|e| TvmError::Packaging(format!("Invalid nonce encoding: {}", e)))?;
    if nonce.len() != NONCE_LEN {
        return Err(TvmError::Packaging(format!(
            "Invalid nonce length: {}",
            nonce.len()
        )));
    }

    let ciphertext = STANDARD
        .decode(&payload.ciphertext)
        .map_err(|e| TvmError::Packaging(format!("Invalid ciphertext encoding: {}", e)))?;
    let aad = associated_data(&payload.access_key_id, &payload.expiration);

    let plaintext = cipher
        .decrypt(
            Nonce::from_slice(&nonce),
            Payload {
                msg: &ciphertext,
                aad: &aad,
            },
        )
        .map_err(|_| TvmError::Packaging("Payload authentication failed".to_string()))?;

    let sealed: SealedFields = serde_json::from_slice(&plaintext)?;

    Ok(Credentials {
        access_key_id: payload.access_key_id.clone(),
        secret_access_key: sealed.secret_access_key,
        session_token: sealed.session_token,
        expiration: payload.expiration,
    })
}
