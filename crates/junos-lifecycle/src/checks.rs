//! Reusable create checks.

use async_trait::async_trait;
use junos_session::output::{show_config_display_set, EMPTY_W};
use junos_session::{ConfigSession, SessionResult};

use crate::contract::CreateCheck;
use crate::error::LifecycleError;

/// Returns true if anything is configured at `path`.
pub async fn config_exists(session: &mut ConfigSession, path: &str) -> SessionResult<bool> {
    let reply = session.command(&show_config_display_set(path)).await?;
    Ok(reply.trim() != EMPTY_W && !reply.trim().is_empty())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Expectation {
    Absent,
    Present,
}

/// Checks whether a configuration hierarchy exists.
///
/// As a pre-check it rejects duplicates; as a post-check it verifies the
/// committed object is visible.
#[derive(Debug, Clone)]
pub struct ConfigExistence {
    path: String,
    description: String,
    expect: Expectation,
}

impl ConfigExistence {
    /// Fails with a duplicate error if `path` is already configured.
    pub fn must_be_absent(path: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            description: description.into(),
            expect: Expectation::Absent,
        }
    }

    /// Fails with a verification error if `path` is not configured.
    pub fn must_exist(path: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            description: description.into(),
            expect: Expectation::Present,
        }
    }

    /// Configuration path checked.
    pub fn path(&self) -> &str {
        &self.path
    }
}

#[async_trait]
impl CreateCheck for ConfigExistence {
    async fn check(&self, session: &mut ConfigSession) -> Result<(), LifecycleError> {
        let exists = config_exists(session, &self.path).await;
        match self.expect {
            Expectation::Absent => match exists {
                Ok(false) => Ok(()),
                Ok(true) => Err(LifecycleError::duplicate(format!(
                    "{} already exists",
                    self.description
                ))),
                Err(e) => Err(LifecycleError::pre_check(e.to_string())),
            },
            Expectation::Present => match exists {
                Ok(true) => Ok(()),
                Ok(false) => Err(LifecycleError::verification(format!(
                    "{} does not exists after commit => check your config",
                    self.description
                ))),
                Err(e) => Err(LifecycleError::verification(e.to_string())),
            },
        }
    }
}

/// Rejects devices that are not security platforms (SRX family).
///
/// Offline sessions always pass.
#[derive(Debug, Clone)]
pub struct RequireSecurityPlatform {
    resource: String,
}

impl RequireSecurityPlatform {
    /// Check for `resource`, named in the error message.
    pub fn new(resource: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
        }
    }
}

#[async_trait]
impl CreateCheck for RequireSecurityPlatform {
    async fn check(&self, session: &mut ConfigSession) -> Result<(), LifecycleError> {
        if session.check_compatibility_security() {
            return Ok(());
        }
        let model = session
            .system_information()
            .map(|info| info.hardware_model.clone())
            .unwrap_or_default();
        Err(LifecycleError::pre_check(format!(
            "{} not compatible with Junos device {:?}",
            self.resource, model
        )))
    }
}
