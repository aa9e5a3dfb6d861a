//! Transactional configuration sessions for Junos devices.
//!
//! This crate owns the device side of a configuration change:
//!
//! - [`DeviceLink`] / [`DeviceConnector`]: the seam to the wire protocol
//! - [`ConfigSession`]: the lock → stage → commit → clear → close protocol
//! - [`TransactionBackend`]: a live device or an offline set file
//! - [`Client`]: opens sessions from a [`ClientConfig`]
//! - [`AuditLog`]: optional per-step audit file
//!
//! # Example
//!
//! ```ignore
//! use junos_session::{Client, ClientConfig, OpContext};
//!
//! async fn set_host_name(client: &Client, name: &str) -> junos_session::SessionResult<()> {
//!     let ctx = OpContext::new();
//!     let mut session = client.start_session(&ctx).await?;
//!     session.lock(&ctx).await?;
//!     let staged = session.stage(&[format!("set system host-name {}", name)]).await;
//!     let committed = match staged {
//!         Ok(()) => session.commit("set host-name").await.result,
//!         Err(e) => Err(e),
//!     };
//!     for e in session.clear().await {
//!         tracing::warn!(error = %e, "cleanup failed");
//!     }
//!     session.close().await;
//!     committed
//! }
//! ```

pub mod audit;
pub mod client;
pub mod config;
pub mod context;
pub mod error;
pub mod link;
pub mod output;
pub mod session;
pub mod sink;

// Re-export commonly used items at crate root
pub use audit::AuditLog;
pub use client::Client;
pub use config::{ClientConfig, DeviceConfig, FilesConfig, TimingConfig};
pub use context::OpContext;
pub use error::{DeviceError, SessionError, SessionResult};
pub use link::{DeviceConnector, DeviceLink, SystemInformation};
pub use session::{CommitOutcome, ConfigSession, Timing, TransactionBackend};
pub use sink::FileSink;
