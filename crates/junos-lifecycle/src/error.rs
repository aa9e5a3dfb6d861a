//! Lifecycle error taxonomy.

use junos_session::SessionError;
use thiserror::Error;

use crate::diag::FieldPath;

/// Result type alias for lifecycle steps.
pub type LifecycleResult<T> = Result<T, LifecycleError>;

/// Broad class of a lifecycle failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The session could not be opened.
    Connection,
    /// Lock polling was cancelled.
    LockAborted,
    /// A check, staging or removal hook failed, or the device refused the statements.
    Staging,
    /// The device rejected the commit.
    Commit,
    /// The committed state does not match what was asked for.
    Verification,
    /// A read hook failed.
    Read,
    /// The object does not exist on the device.
    NotFound,
    /// An import identifier has the wrong shape.
    BadIdentifier,
    /// The dispatcher was used against its contract.
    Internal,
}

/// Step that produced a staging-class failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StagePhase {
    /// Pre-check could not run.
    PreCheck,
    /// Pre-check found the object already configured.
    Duplicate,
    /// Staging the desired state failed.
    Set,
    /// Staging the removal failed.
    Delete,
}

/// Terminal failure of a lifecycle operation.
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// The session could not be opened.
    #[error("{0}")]
    Connection(SessionError),

    /// Lock polling was cancelled before the lock was taken.
    #[error("candidate configuration lock attempt aborted")]
    LockAborted,

    /// A check, staging or removal step failed.
    #[error("{message}")]
    Staging {
        /// Step that failed.
        phase: StagePhase,
        /// Attribute that caused the failure, when known.
        field: Option<FieldPath>,
        /// Error message.
        message: String,
    },

    /// The device rejected the commit.
    #[error("{message}")]
    Commit {
        /// Error message.
        message: String,
    },

    /// The state after commit does not match the plan.
    #[error("{message}")]
    Verification {
        /// Error message.
        message: String,
    },

    /// A read hook failed.
    #[error("{message}")]
    Read {
        /// Error message.
        message: String,
    },

    /// The object was not found on the device.
    #[error("{message}")]
    NotFound {
        /// Error message.
        message: String,
    },

    /// The import identifier does not split into the expected components.
    #[error(
        "{} element(s) in id with separator {separator:?} (expected {expected} elements, found {found})",
        id_mismatch(.expected, .found)
    )]
    BadIdentifier {
        /// Separator between components.
        separator: &'static str,
        /// Number of components required.
        expected: usize,
        /// Number of components found.
        found: usize,
    },

    /// Contract violation inside the dispatcher or its hooks.
    #[error("internal error: {message}")]
    Internal {
        /// Error message.
        message: String,
    },
}

fn id_mismatch(expected: &usize, found: &usize) -> &'static str {
    if found < expected {
        "missing"
    } else {
        "too many"
    }
}

impl LifecycleError {
    /// Pre-check could not run.
    pub fn pre_check(message: impl Into<String>) -> Self {
        Self::staging(StagePhase::PreCheck, None, message)
    }

    /// Pre-check found the object already configured.
    pub fn duplicate(message: impl Into<String>) -> Self {
        Self::staging(StagePhase::Duplicate, None, message)
    }

    /// Staging-class failure at `phase`, optionally scoped to a field.
    pub fn staging(phase: StagePhase, field: Option<FieldPath>, message: impl Into<String>) -> Self {
        Self::Staging {
            phase,
            field,
            message: message.into(),
        }
    }

    /// Commit rejected by the device.
    pub fn commit(message: impl Into<String>) -> Self {
        Self::Commit {
            message: message.into(),
        }
    }

    /// Post-commit verification failure.
    pub fn verification(message: impl Into<String>) -> Self {
        Self::Verification {
            message: message.into(),
        }
    }

    /// Read hook failure.
    pub fn read(message: impl Into<String>) -> Self {
        Self::Read {
            message: message.into(),
        }
    }

    /// Object not found.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// Contract violation.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Class of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            LifecycleError::Connection(_) => ErrorKind::Connection,
            LifecycleError::LockAborted => ErrorKind::LockAborted,
            LifecycleError::Staging { .. } => ErrorKind::Staging,
            LifecycleError::Commit { .. } => ErrorKind::Commit,
            LifecycleError::Verification { .. } => ErrorKind::Verification,
            LifecycleError::Read { .. } => ErrorKind::Read,
            LifecycleError::NotFound { .. } => ErrorKind::NotFound,
            LifecycleError::BadIdentifier { .. } => ErrorKind::BadIdentifier,
            LifecycleError::Internal { .. } => ErrorKind::Internal,
        }
    }

    /// Short title used when reporting this error.
    pub fn summary(&self) -> &'static str {
        match self {
            LifecycleError::Connection(_) => "Start Session Error",
            LifecycleError::LockAborted => "Config Lock Error",
            LifecycleError::Staging { phase, .. } => match phase {
                StagePhase::PreCheck => "Pre Check Error",
                StagePhase::Duplicate => "Duplicate Configuration Error",
                StagePhase::Set => "Config Set Error",
                StagePhase::Delete => "Config Del Error",
            },
            LifecycleError::Commit { .. } => "Config Commit Error",
            LifecycleError::Verification { .. } => "Post Check Error",
            LifecycleError::Read { .. } => "Config Read Error",
            LifecycleError::NotFound { .. } => "Not Found Error",
            LifecycleError::BadIdentifier { .. } => "Bad ID Format",
            LifecycleError::Internal { .. } => "Internal Error",
        }
    }

    /// Attribute the error is scoped to, if any.
    pub fn field(&self) -> Option<&FieldPath> {
        match self {
            LifecycleError::Staging { field, .. } => field.as_ref(),
            _ => None,
        }
    }
}

/// Renders `error` with its causes, skipping a cause the message wrapping it
/// already ends with.
pub(crate) fn describe(error: &anyhow::Error) -> String {
    let mut out = String::new();
    for cause in error.chain() {
        let msg = cause.to_string();
        if out.ends_with(&msg) {
            continue;
        }
        if !out.is_empty() {
            out.push_str(": ");
        }
        out.push_str(&msg);
    }
    out
}
