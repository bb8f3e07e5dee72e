//! Device Registry
//!
//! Binds device identifiers to their secret keys. The only cross-request
//! ordering guarantee in the whole service lives here: registering an
//! identifier is atomic "insert if absent".

use crate::error::Result;
use async_trait::async_trait;
use std::collections::{hash_map::Entry, HashMap};
use std::fmt;
use tokio::sync::RwLock;

/// Registered device
#[derive(Clone, PartialEq, Eq)]
pub struct Device {
    /// Device identifier (opaque, validated at the boundary)
    pub identifier: String,

    /// Shared secret used for request signatures and payload sealing
    pub secret_key: String,
}

impl Device {
    /// Create a device record
    pub fn new(identifier: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            secret_key: secret_key.into(),
        }
    }
}

impl fmt::Debug for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Device")
            .field("identifier", &self.identifier)
            .field("secret_key", &"<redacted>")
            .finish()
    }
}

/// Device key store consumed by the token service.
///
/// `Err` is reserved for failures of the backing store itself.
#[async_trait]
pub trait DeviceRegistry: Send + Sync {
    /// Bind `identifier` to `secret_key` if it is not bound yet.
    ///
    /// Returns `false`, without mutating anything, when already bound.
    async fn register(&self, identifier: &str, secret_key: &str) -> Result<bool>;

    /// Look up the key bound to `identifier`
    async fn lookup_key(&self, identifier: &str) -> Result<Option<String>>;
}

/// In-memory registry
#[derive(Debug, Default)]
pub struct InMemoryDeviceRegistry {
    devices: RwLock<HashMap<String, Device>>,
}

impl InMemoryDeviceRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered devices
    pub async fn len(&self) -> usize {
        self.devices.read().await.len()
    }

    /// Whether no device is registered
    pub async fn is_empty(&self) -> bool {
        self.devices.read().await.is_empty()
    }

    #[cfg(test)]
    pub(crate) async fn remove(&self, identifier: &str) -> Option<Device> {
        self.devices.write().await.remove(identifier)
    }
}

#[async_trait]
impl DeviceRegistry for InMemoryDeviceRegistry {
    async fn register(&self, identifier: &str, secret_key: &str) -> Result<bool> {
        let mut devices = self.devices.write().await;

        match devices.entry(identifier.to_string()) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(slot) => {
                slot.insert(Device::new(identifier, secret_key));
                Ok(true)
            }
        }
    }

    async fn lookup_key(&self, identifier: &str) -> Result<Option<String>> {
        let devices = self.devices.read().await;
        Ok(devices.get(identifier).map(|d| d.secret_key.clone()))
    }
}
