//! Error types for device sessions.
//!
//! [`DeviceError`] is what a [`DeviceLink`](crate::DeviceLink) reports for a
//! failed primitive. [`SessionError`] is what the session layer reports to its
//! callers and wraps device errors with the step that produced them.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for session operations.
pub type SessionResult<T> = Result<T, SessionError>;

/// Error reported by a device link primitive.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeviceError {
    /// The transport to the device failed or was closed.
    #[error("transport error: {message}")]
    Transport {
        /// Error message.
        message: String,
    },

    /// The device answered the request with an error.
    #[error("{message}")]
    Rpc {
        /// Message returned by the device.
        message: String,
    },

    /// The device answered with an error and still sent a reply body.
    #[error("{message}")]
    RpcWithReply {
        /// Message returned by the device.
        message: String,
        /// Reply body that came with the error.
        reply: String,
    },
}

impl DeviceError {
    /// Creates a transport error.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Creates an error reported by the device itself.
    pub fn rpc(message: impl Into<String>) -> Self {
        Self::Rpc {
            message: message.into(),
        }
    }

    /// Creates a device error that carries the reply body it came with.
    pub fn rpc_with_reply(message: impl Into<String>, reply: impl Into<String>) -> Self {
        Self::RpcWithReply {
            message: message.into(),
            reply: reply.into(),
        }
    }
}

/// Errors that can occur while driving a configuration session.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The link to the device could not be established.
    #[error("failed to connect to {target}: {source}")]
    Connection {
        /// `host:port` of the device.
        target: String,
        /// The underlying device error.
        #[source]
        source: DeviceError,
    },

    /// The device did not report a hardware model when the link was opened.
    #[error("can't read model of device with <get-system-information/> netconf command")]
    MissingSystemInformation,

    /// Lock polling was cancelled before the lock was acquired.
    #[error("candidate configuration lock attempt aborted")]
    LockAborted,

    /// A device primitive failed.
    #[error("{operation}: {source}")]
    Device {
        /// The session step that failed (e.g. "config set", "command").
        operation: &'static str,
        /// The underlying device error.
        #[source]
        source: DeviceError,
    },

    /// The device rejected the commit.
    #[error("commit failed: {source}")]
    Commit {
        /// The underlying device error.
        #[source]
        source: DeviceError,
    },

    /// Writing the offline set file failed.
    #[error("failed to {action} '{}': {source}", path.display())]
    Sink {
        /// What was being done ("open file", "write in file", ...).
        action: &'static str,
        /// The sink file path.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: io::Error,
    },

    /// Client configuration is invalid or could not be loaded.
    #[error("configuration error: {message}")]
    Config {
        /// Error message.
        message: String,
    },

    /// IO error outside the offline sink.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// A session primitive was called in a mode that cannot serve it.
    #[error("internal error: {message}")]
    Internal {
        /// Error message.
        message: String,
    },
}

impl SessionError {
    /// Creates a device error for the given session step.
    pub fn device(operation: &'static str, source: DeviceError) -> Self {
        Self::Device { operation, source }
    }

    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns true if the error happened while opening the session.
    pub fn is_connection(&self) -> bool {
        matches!(
            self,
            SessionError::Connection { .. } | SessionError::MissingSystemInformation
        )
    }

    /// Returns true if this error indicates a transient condition
    /// that may succeed on a later attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SessionError::Connection { .. }
                | SessionError::Device {
                    source: DeviceError::Transport { .. },
                    ..
                }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SessionError::LockAborted;
        assert_eq!(
            err.to_string(),
            "candidate configuration lock attempt aborted"
        );
    }

    #[test]
    fn test_device_error() {
        let err = SessionError::device("config set", DeviceError::rpc("syntax error"));
        assert_eq!(err.to_string(), "config set: syntax error");
    }

    #[test]
    fn test_sink_error_names_path() {
        let err = SessionError::Sink {
            action: "open file",
            path: PathBuf::from("/tmp/set.conf"),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        };
        assert!(err.to_string().contains("'/tmp/set.conf'"));
        assert!(err.to_string().starts_with("failed to open file"));
    }

    #[test]
    fn test_is_connection() {
        assert!(SessionError::MissingSystemInformation.is_connection());
        assert!(!SessionError::LockAborted.is_connection());
    }

    #[test]
    fn test_is_retryable() {
        let transport = SessionError::device("command", DeviceError::transport("reset"));
        assert!(transport.is_retryable());
        let rpc = SessionError::device("command", DeviceError::rpc("unknown command"));
        assert!(!rpc.is_retryable());
        assert!(!SessionError::internal("bug").is_retryable());
    }
}
