//! Assertions on the state a lifecycle operation leaves on a [`MockDevice`].

use thiserror::Error;

use crate::mock_device::MockDevice;

/// Verification error types
#[derive(Error, Debug)]
pub enum VerificationError {
    #[error("candidate configuration lock still held")]
    LockHeld,

    #[error("{count} uncommitted candidate statement(s) left: {statements:?}")]
    CandidateNotEmpty { count: usize, statements: Vec<String> },

    #[error("{count} device link(s) left open")]
    LinksOpen { count: usize },

    #[error("expected configuration under '{path}', found none")]
    NotConfigured { path: String },

    #[error("unexpected configuration under '{path}': {statements:?}")]
    StillConfigured { path: String, statements: Vec<String> },

    #[error("expected commit messages {expected:?}, got {actual:?}")]
    CommitMismatch {
        expected: Vec<String>,
        actual: Vec<String>,
    },
}

/// Result type for verification operations
pub type VerifyResult<T> = Result<T, VerificationError>;

/// Device state verification helper
pub struct DeviceVerifier<'a> {
    device: &'a MockDevice,
}

impl<'a> DeviceVerifier<'a> {
    /// Create a new verifier
    pub fn new(device: &'a MockDevice) -> Self {
        Self { device }
    }

    /// Verify the device is back to idle: unlocked, empty candidate, no open
    /// link
    pub fn assert_released(&self) -> VerifyResult<()> {
        if self.device.is_locked() {
            return Err(VerificationError::LockHeld);
        }
        let candidate = self.device.candidate();
        if !candidate.is_empty() {
            return Err(VerificationError::CandidateNotEmpty {
                count: candidate.len(),
                statements: candidate,
            });
        }
        let open = self.device.open_links();
        if open != 0 {
            return Err(VerificationError::LinksOpen { count: open });
        }
        Ok(())
    }

    /// Verify that something is configured under `path`
    pub fn assert_configured(&self, path: &str) -> VerifyResult<()> {
        if self.statements_under(path).is_empty() {
            return Err(VerificationError::NotConfigured {
                path: path.to_string(),
            });
        }
        Ok(())
    }

    /// Verify that nothing is configured under `path`
    pub fn assert_not_configured(&self, path: &str) -> VerifyResult<()> {
        let statements = self.statements_under(path);
        if !statements.is_empty() {
            return Err(VerificationError::StillConfigured {
                path: path.to_string(),
                statements,
            });
        }
        Ok(())
    }

    /// Verify the exact sequence of commit messages
    pub fn assert_commits(&self, expected: &[&str]) -> VerifyResult<()> {
        let actual = self.device.commit_messages();
        if actual != expected {
            return Err(VerificationError::CommitMismatch {
                expected: expected.iter().map(|s| s.to_string()).collect(),
                actual,
            });
        }
        Ok(())
    }

    fn statements_under(&self, path: &str) -> Vec<String> {
        self.device
            .running()
            .into_iter()
            .filter(|stmt| stmt == path || stmt.starts_with(&format!("{} ", path)))
            .collect()
    }
}
