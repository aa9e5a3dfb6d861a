//! Wiring a [`MockDevice`] to a client and dispatchers.

use std::path::Path;
use std::sync::Arc;

use junos_lifecycle::{LifecycleDispatcher, ReadLock};
use junos_session::{Client, ClientConfig};

use crate::mock_device::MockDevice;

/// Lock retry interval used by harness clients.
pub const LOCK_RETRY_SECS: u64 = 10;

/// Client configuration for a device reached through the harness, without
/// settle delays.
pub fn live_config() -> ClientConfig {
    let mut config = ClientConfig::default();
    config.device.host = "192.0.2.1".to_string();
    config.timing.lock_retry_secs = LOCK_RETRY_SECS;
    config.timing.settle_ms = 0;
    config
}

/// Client configuration writing creates to `set_file`.
pub fn offline_config(set_file: &Path, update_also: bool, delete_also: bool) -> ClientConfig {
    let mut config = live_config();
    config.files.fake_create_set_file = Some(set_file.to_path_buf());
    config.files.fake_update_also = update_also;
    config.files.fake_delete_also = delete_also;
    config
}

/// A mock device, a client on it and a shared read lock.
pub struct TestHarness {
    /// The device.
    pub device: MockDevice,
    /// Client connecting to `device`.
    pub client: Arc<Client>,
    /// Read lock shared by every dispatcher of the harness.
    pub read_lock: ReadLock,
}

impl TestHarness {
    /// Harness on `device` with [`live_config`].
    pub fn new(device: MockDevice) -> Self {
        Self::with_config(device, live_config())
    }

    /// Harness on `device` with a custom configuration.
    ///
    /// # Panics
    ///
    /// Panics if `config` does not validate.
    pub fn with_config(device: MockDevice, config: ClientConfig) -> Self {
        let client = match Client::new(config, Arc::new(device.clone())) {
            Ok(client) => client,
            Err(e) => panic!("invalid harness configuration: {}", e),
        };
        Self {
            device,
            client: Arc::new(client),
            read_lock: ReadLock::new(),
        }
    }

    /// Dispatcher for `type_name` sharing the harness read lock.
    pub fn dispatcher(&self, type_name: &str) -> LifecycleDispatcher {
        LifecycleDispatcher::new(type_name, Arc::clone(&self.client), self.read_lock.clone())
    }
}
