//! Device transport capability and per-family client registry.
//!
//! The synchronization core never talks HTTP itself. It consumes the
//! `DeviceClient` capability, and a `ClientResolver` hands out the client
//! matching each configured device's family. Supporting a new device family
//! means adding another `DeviceClient` implementation and registering it.

pub mod prusalink;

use crate::Result;
use crate::models::{DeviceConfig, DeviceFamily, DeviceState};
use crate::services::remote::ListingEntry;
use std::collections::HashMap;
use std::path::Path;

/// Operations the synchronization core needs from a device.
///
/// Remote paths are absolute device paths as produced by
/// [`RemoteTree::device_path`](crate::services::remote::RemoteTree::device_path).
/// Mutating calls return `Ok(false)` when the device refuses the request
/// (e.g. deleting a file that is being printed) and `Err` only when the
/// device could not be reached or answered nonsense.
pub trait DeviceClient: Send + Sync {
    /// Identify the client family for logging and diagnostics.
    fn family(&self) -> DeviceFamily;

    fn query_state(&self, device: &DeviceConfig) -> Result<DeviceState>;

    /// Fetch the complete storage tree, rooted at the storage root.
    fn fetch_listing(&self, device: &DeviceConfig) -> Result<ListingEntry>;

    fn upload(&self, device: &DeviceConfig, local_path: &Path, remote_path: &str) -> Result<bool>;

    fn delete(&self, device: &DeviceConfig, remote_path: &str) -> Result<bool>;

    fn create_folder(&self, device: &DeviceConfig, remote_path: &str) -> Result<bool>;
}

/// Resolves the client responsible for a device.
pub trait ClientResolver: Sync {
    fn resolve(&self, device: &DeviceConfig) -> Option<&dyn DeviceClient>;
}

/// Clients keyed by device family.
#[derive(Default)]
pub struct ClientRegistry {
    clients: HashMap<DeviceFamily, Box<dyn DeviceClient>>,
}

impl ClientRegistry {
    /// Construct an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in client.
    pub fn with_defaults() -> Result<Self> {
        let mut registry = Self::new();
        registry.register(Box::new(prusalink::PrusaLinkClient::new()?));
        Ok(registry)
    }

    /// Register a client, replacing any previous client for its family.
    pub fn register(&mut self, client: Box<dyn DeviceClient>) {
        self.clients.insert(client.family(), client);
    }
}

impl ClientResolver for ClientRegistry {
    fn resolve(&self, device: &DeviceConfig) -> Option<&dyn DeviceClient> {
        self.clients.get(&device.family).map(|client| &**client)
    }
}
