//! The device link seam.
//!
//! A [`DeviceLink`] is an open, authenticated channel to one device. The wire
//! protocol behind it (NETCONF over SSH on real hardware) lives outside this
//! crate; the session layer only needs the primitives below.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::DeviceConfig;
use crate::error::DeviceError;

/// Identity metadata fetched from the device when the link is opened.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemInformation {
    /// Hardware model (e.g. "srx345", "mx480", "vsrx").
    pub hardware_model: String,
    /// Operating system name.
    pub os_name: String,
    /// Operating system version.
    pub os_version: String,
    /// Configured host name.
    pub host_name: String,
}

impl SystemInformation {
    /// Creates system information with only the hardware model set.
    pub fn with_model(hardware_model: impl Into<String>) -> Self {
        Self {
            hardware_model: hardware_model.into(),
            ..Default::default()
        }
    }

    /// Returns true if the model is a security platform (SRX family).
    pub fn is_security_platform(&self) -> bool {
        let model = self.hardware_model.to_ascii_lowercase();
        model.starts_with("srx") || model.starts_with("vsrx")
    }
}

/// Raw primitives of an open device connection.
///
/// Implementations must not add their own delays; the session applies the
/// configured settle time after each call.
#[async_trait]
pub trait DeviceLink: Send {
    /// Identity metadata read when the link was opened.
    fn system_information(&self) -> &SystemInformation;

    /// Runs an operational command and returns its text reply.
    ///
    /// When the device answers with an error but still sends a body, report
    /// it as [`DeviceError::RpcWithReply`] so the session can tell an
    /// unconfigured hierarchy from a failure.
    async fn command(&mut self, cmd: &str) -> Result<String, DeviceError>;

    /// Runs an operational command and returns its raw XML reply.
    async fn command_xml(&mut self, cmd: &str) -> Result<String, DeviceError>;

    /// Tries once to take the candidate configuration lock.
    async fn try_lock(&mut self) -> bool;

    /// Loads `set`/`delete` statements into the candidate configuration.
    ///
    /// Returns the message the device attached to the load reply.
    async fn send_config(&mut self, lines: &[String]) -> Result<String, DeviceError>;

    /// Commits the candidate configuration with a log message.
    ///
    /// Warnings are returned even when the commit itself fails.
    async fn commit(&mut self, message: &str) -> (Vec<DeviceError>, Result<(), DeviceError>);

    /// Discards uncommitted candidate changes.
    async fn clear_candidate(&mut self) -> Vec<DeviceError>;

    /// Releases the candidate configuration lock.
    async fn unlock(&mut self) -> Vec<DeviceError>;

    /// Closes the connection.
    async fn close(&mut self) -> Result<(), DeviceError>;
}

/// Opens device links.
#[async_trait]
pub trait DeviceConnector: Send + Sync {
    /// Opens and authenticates a link to the device described by `config`.
    async fn connect(&self, config: &DeviceConfig) -> Result<Box<dyn DeviceLink>, DeviceError>;
}
