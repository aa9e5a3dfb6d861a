//! Long-lived client handing out sessions.

use std::fmt;
use std::sync::Arc;

use tracing::{info, instrument};

use crate::audit::AuditLog;
use crate::config::ClientConfig;
use crate::context::OpContext;
use crate::error::{DeviceError, SessionError, SessionResult};
use crate::link::DeviceConnector;
use crate::session::{ConfigSession, Timing, TransactionBackend};
use crate::sink::FileSink;

/// Shared entry point for opening configuration sessions.
///
/// A client is cheap to share behind an `Arc`; every operation opens its own
/// session from it.
pub struct Client {
    config: ClientConfig,
    connector: Arc<dyn DeviceConnector>,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("target", &self.config.device.target())
            .field("fake_create_set_file", &self.config.files.fake_create_set_file)
            .finish_non_exhaustive()
    }
}

impl Client {
    /// Creates a client; the configuration is validated first.
    pub fn new(config: ClientConfig, connector: Arc<dyn DeviceConnector>) -> SessionResult<Self> {
        config.validate()?;
        Ok(Self { config, connector })
    }

    /// The client configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Returns true if creates are written to the offline set file.
    pub fn fake_create_set_file(&self) -> bool {
        self.config.files.fake_create_set_file.is_some()
    }

    /// Returns true if updates are also written to the offline set file.
    pub fn fake_update_also(&self) -> bool {
        self.fake_create_set_file() && self.config.files.fake_update_also
    }

    /// Returns true if deletes are also written to the offline set file.
    pub fn fake_delete_also(&self) -> bool {
        self.fake_create_set_file() && self.config.files.fake_delete_also
    }

    /// Group used to delete interfaces, if configured.
    pub fn group_interface_delete(&self) -> Option<&str> {
        self.config.device.group_interface_delete.as_deref()
    }

    fn audit_log(&self) -> Option<AuditLog> {
        self.config
            .files
            .log_file
            .as_ref()
            .map(|path| AuditLog::new(path, self.config.files.file_permission))
    }

    /// Opens a session on the device.
    ///
    /// Fails if the device cannot be reached, if `ctx` is done first, or if the
    /// device does not report its hardware model.
    #[instrument(skip(self, ctx), fields(target = %self.config.device.target()))]
    pub async fn start_session(&self, ctx: &OpContext) -> SessionResult<ConfigSession> {
        let target = self.config.device.target();
        if ctx.is_done() {
            return Err(SessionError::Connection {
                target,
                source: DeviceError::transport("operation cancelled before connecting"),
            });
        }

        let link = tokio::select! {
            link = self.connector.connect(&self.config.device) => link,
            _ = ctx.done() => Err(DeviceError::transport("operation cancelled while connecting")),
        }
        .map_err(|source| SessionError::Connection {
            target: target.clone(),
            source,
        })?;

        let session = ConfigSession::new(
            TransactionBackend::LiveDevice(link),
            Timing::from_config(&self.config),
            self.audit_log(),
        );
        let model = session
            .system_information()
            .map(|info| info.hardware_model.clone())
            .unwrap_or_default();
        if model.is_empty() {
            session.log("[startNewSession] missing hardware model").await;
            session.close().await;
            return Err(SessionError::MissingSystemInformation);
        }

        session.log("[startNewSession] started").await;
        info!(%target, %model, "Device session started");
        Ok(session)
    }

    /// Opens an offline session writing to the configured set file.
    pub fn offline_session(&self) -> SessionResult<ConfigSession> {
        let path = self.config.files.fake_create_set_file.as_ref().ok_or_else(|| {
            SessionError::internal("offline session requested without fake_create_set_file")
        })?;
        Ok(ConfigSession::new(
            TransactionBackend::FileSink(FileSink::new(path, self.config.files.file_permission)),
            Timing::from_config(&self.config),
            self.audit_log(),
        ))
    }
}
