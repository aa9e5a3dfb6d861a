//! Client configuration.
//!
//! Loaded from TOML. Every field has a default so a file only needs the keys
//! it wants to change:
//!
//! ```toml
//! [device]
//! host = "192.0.2.1"
//! username = "netconf"
//! ssh_key_file = "/home/netconf/.ssh/id_ed25519"
//!
//! [timing]
//! lock_retry_secs = 5
//!
//! [files]
//! log_file = "/var/log/junos-session.log"
//! file_permission = 0o600
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{SessionError, SessionResult};

/// Connection parameters for the device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Device address (IP or host name).
    #[serde(default)]
    pub host: String,

    /// NETCONF port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Login user.
    #[serde(default = "default_username")]
    pub username: String,

    /// Login password.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    /// Private key in PEM format.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssh_key_pem: Option<String>,

    /// Path to a private key file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssh_key_file: Option<PathBuf>,

    /// Passphrase of the private key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_pass: Option<String>,

    /// SSH ciphers offered to the device.
    #[serde(default = "default_ssh_ciphers")]
    pub ssh_ciphers: Vec<String>,

    /// Timeout to establish the SSH connection in seconds (0 = transport default).
    #[serde(default)]
    pub ssh_timeout_to_establish_secs: u64,

    /// Configuration group used to delete interfaces instead of a plain delete.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_interface_delete: Option<String>,
}

/// Delays applied around device operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimingConfig {
    /// Wait between two attempts to take the candidate lock, in seconds.
    #[serde(default = "default_lock_retry_secs")]
    pub lock_retry_secs: u64,

    /// Settle delay after every command, stage and commit, in milliseconds.
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,

    /// Settle delay after closing the link, in seconds.
    #[serde(default)]
    pub close_settle_secs: u64,
}

/// Local files written by sessions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilesConfig {
    /// Audit log of every session step.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,

    /// Permission bits for created files.
    #[serde(default = "default_file_permission")]
    pub file_permission: u32,

    /// Write create statements to this file instead of the device.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fake_create_set_file: Option<PathBuf>,

    /// Also write update statements to the set file.
    #[serde(default)]
    pub fake_update_also: bool,

    /// Also write delete statements to the set file.
    #[serde(default)]
    pub fake_delete_also: bool,
}

/// Complete client configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Device connection parameters.
    #[serde(default)]
    pub device: DeviceConfig,

    /// Operation delays.
    #[serde(default)]
    pub timing: TimingConfig,

    /// Local file outputs.
    #[serde(default)]
    pub files: FilesConfig,
}

// Default functions
fn default_port() -> u16 {
    830
}

fn default_username() -> String {
    "netconf".to_string()
}

fn default_ssh_ciphers() -> Vec<String> {
    [
        "aes128-gcm@openssh.com",
        "chacha20-poly1305@openssh.com",
        "aes128-ctr",
        "aes192-ctr",
        "aes256-ctr",
        "aes128-cbc",
    ]
    .iter()
    .map(|c| c.to_string())
    .collect()
}

fn default_lock_retry_secs() -> u64 {
    10
}

fn default_settle_ms() -> u64 {
    100
}

fn default_file_permission() -> u32 {
    0o644
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: default_port(),
            username: default_username(),
            password: None,
            ssh_key_pem: None,
            ssh_key_file: None,
            key_pass: None,
            ssh_ciphers: default_ssh_ciphers(),
            ssh_timeout_to_establish_secs: 0,
            group_interface_delete: None,
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            lock_retry_secs: default_lock_retry_secs(),
            settle_ms: default_settle_ms(),
            close_settle_secs: 0,
        }
    }
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            log_file: None,
            file_permission: default_file_permission(),
            fake_create_set_file: None,
            fake_update_also: false,
            fake_delete_also: false,
        }
    }
}

impl DeviceConfig {
    /// Returns `host:port`, bracketing IPv6 literals.
    pub fn target(&self) -> String {
        if self.host.contains(':') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }

    /// SSH establish timeout, `None` when the transport default applies.
    pub fn ssh_timeout(&self) -> Option<Duration> {
        (self.ssh_timeout_to_establish_secs > 0)
            .then(|| Duration::from_secs(self.ssh_timeout_to_establish_secs))
    }
}

impl ClientConfig {
    /// Parses a configuration from TOML text.
    pub fn from_toml_str(content: &str) -> SessionResult<Self> {
        toml::from_str(content)
            .map_err(|e| SessionError::config(format!("failed to parse config: {}", e)))
    }

    /// Load configuration from file, falling back to defaults if file not found
    pub fn load_or_default(path: impl AsRef<Path>) -> SessionResult<Self> {
        let path = path.as_ref();

        match fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(|e| {
                SessionError::config(format!(
                    "failed to parse config file {}: {}",
                    path.display(),
                    e
                ))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "config file not found, using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(SessionError::Io(e)),
        }
    }

    /// Save configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> SessionResult<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| SessionError::config(format!("failed to serialize config: {}", e)))?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Wait between two lock attempts.
    pub fn lock_retry(&self) -> Duration {
        Duration::from_secs(self.timing.lock_retry_secs)
    }

    /// Settle delay after each device operation.
    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.timing.settle_ms)
    }

    /// Settle delay after closing a link.
    pub fn close_settle(&self) -> Duration {
        Duration::from_secs(self.timing.close_settle_secs)
    }

    /// Validate configuration
    pub fn validate(&self) -> SessionResult<()> {
        if self.files.fake_create_set_file.is_none() {
            if self.device.host.is_empty() {
                return Err(SessionError::config(
                    "device.host is required unless files.fake_create_set_file is set",
                ));
            }
            if self.files.fake_update_also || self.files.fake_delete_also {
                return Err(SessionError::config(
                    "files.fake_update_also and files.fake_delete_also need files.fake_create_set_file",
                ));
            }
        }

        if self.device.port == 0 {
            return Err(SessionError::config("device.port must be > 0"));
        }

        if self.files.file_permission > 0o777 {
            return Err(SessionError::config(format!(
                "files.file_permission {:#o} is not a valid permission",
                self.files.file_permission
            )));
        }

        Ok(())
    }
}
