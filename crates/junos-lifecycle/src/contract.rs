//! Capabilities a resource record provides to the dispatcher.
//!
//! A record opts into operations by implementing the matching traits:
//!
//! | Operation      | Required traits              |
//! |----------------|------------------------------|
//! | create         | [`FirstStage`]               |
//! | read, import   | [`Readable`]                 |
//! | update         | [`Removable`] + [`Stageable`] |
//! | delete         | [`Removable`]                |
//!
//! Reads are keyed by 0, 1, 2 or 4 identifying strings; a record states its
//! arity by returning the matching [`ReadStrategy`] variant.

use std::fmt;

use async_trait::async_trait;
use junos_session::{ConfigSession, SessionError};

use crate::diag::FieldPath;
use crate::error::{describe, LifecycleError, StagePhase};

/// Failure of a staging hook, optionally scoped to the attribute at fault.
#[derive(Debug)]
pub struct StageFailure {
    /// Attribute that caused the failure, when known.
    pub field: Option<FieldPath>,
    /// Underlying error.
    pub error: anyhow::Error,
}

impl StageFailure {
    /// Failure caused by the attribute at `field`.
    pub fn at(field: FieldPath, error: impl Into<anyhow::Error>) -> Self {
        Self {
            field: Some(field),
            error: error.into(),
        }
    }

    /// Failure with a plain message caused by the attribute at `field`.
    pub fn at_msg(field: FieldPath, message: impl fmt::Display + fmt::Debug + Send + Sync + 'static) -> Self {
        Self::at(field, anyhow::Error::msg(message))
    }

    /// Converts into a lifecycle error for the given phase.
    pub fn into_error(self, phase: StagePhase) -> LifecycleError {
        LifecycleError::staging(phase, self.field, describe(&self.error))
    }
}

impl fmt::Display for StageFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.field {
            Some(field) => write!(f, "{}: {}", field, describe(&self.error)),
            None => write!(f, "{}", describe(&self.error)),
        }
    }
}

impl From<anyhow::Error> for StageFailure {
    fn from(error: anyhow::Error) -> Self {
        Self { field: None, error }
    }
}

impl From<SessionError> for StageFailure {
    fn from(error: SessionError) -> Self {
        Self {
            field: None,
            error: error.into(),
        }
    }
}

/// Tells whether a record carries an identity.
///
/// After a read, a record without identity means the object is absent on the
/// device.
pub trait NullIdentity {
    /// Returns true if the record has no identity.
    fn null_id(&self) -> bool;
}

/// Emits the configuration statements describing the desired state.
#[async_trait]
pub trait Stageable: Send + Sync {
    /// Stages the record on `session`, typically with a single
    /// [`ConfigSession::stage`] call.
    async fn stage(&self, session: &mut ConfigSession) -> Result<(), StageFailure>;
}

/// A record that can be created.
pub trait FirstStage: Stageable {
    /// Fills the identity from the identifying attributes once the object
    /// exists.
    fn fill_identity(&mut self);
}

/// Emits the statements removing the object.
#[async_trait]
pub trait Removable: Send + Sync {
    /// Stages the full removal of the object.
    async fn remove(&self, session: &mut ConfigSession) -> anyhow::Result<()>;

    /// Stages the removal done before re-staging on update.
    ///
    /// Records that keep part of their hierarchy across updates override this
    /// to delete only the options they own.
    async fn remove_options(&self, session: &mut ConfigSession) -> anyhow::Result<()> {
        self.remove(session).await
    }
}

/// Populates a singleton record that has no identifying key.
#[async_trait]
pub trait ReadKeyless: Send {
    /// Reads the object into `self`.
    async fn read_keyless(&mut self, session: &mut ConfigSession) -> anyhow::Result<()>;
}

/// Populates a record identified by one key.
#[async_trait]
pub trait ReadByName: Send {
    /// Reads the object named `name` into `self`.
    async fn read_by_name(&mut self, name: &str, session: &mut ConfigSession) -> anyhow::Result<()>;
}

/// Populates a record identified by two keys.
#[async_trait]
pub trait ReadByPair: Send {
    /// Reads the object identified by `first` and `second` into `self`.
    async fn read_by_pair(
        &mut self,
        first: &str,
        second: &str,
        session: &mut ConfigSession,
    ) -> anyhow::Result<()>;
}

/// Populates a record identified by four keys.
#[async_trait]
pub trait ReadByQuad: Send {
    /// Reads the object identified by `keys` into `self`.
    async fn read_by_quad(&mut self, keys: [&str; 4], session: &mut ConfigSession) -> anyhow::Result<()>;
}

/// Number of identifying keys of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyArity {
    /// Singleton object.
    Keyless,
    /// One key.
    Single,
    /// Two keys.
    Pair,
    /// Four keys.
    Quad,
}

impl KeyArity {
    /// Number of keys.
    pub fn count(self) -> usize {
        match self {
            KeyArity::Keyless => 0,
            KeyArity::Single => 1,
            KeyArity::Pair => 2,
            KeyArity::Quad => 4,
        }
    }
}

/// The read capability a record exposes, tagged by arity.
pub enum ReadStrategy<'a> {
    /// Singleton read.
    Keyless(&'a mut dyn ReadKeyless),
    /// Read by one key.
    ByName(&'a mut dyn ReadByName),
    /// Read by two keys.
    ByPair(&'a mut dyn ReadByPair),
    /// Read by four keys.
    ByQuad(&'a mut dyn ReadByQuad),
}

impl fmt::Debug for ReadStrategy<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ReadStrategy").field(&self.arity()).finish()
    }
}

impl ReadStrategy<'_> {
    /// Number of keys this strategy takes.
    pub fn arity(&self) -> KeyArity {
        match self {
            ReadStrategy::Keyless(_) => KeyArity::Keyless,
            ReadStrategy::ByName(_) => KeyArity::Single,
            ReadStrategy::ByPair(_) => KeyArity::Pair,
            ReadStrategy::ByQuad(_) => KeyArity::Quad,
        }
    }

    /// Runs the read with `keys`.
    ///
    /// The number of keys must match [`arity`](Self::arity) exactly; a
    /// mismatch is an internal error and no read is attempted.
    pub async fn read(self, keys: &[String], session: &mut ConfigSession) -> Result<(), LifecycleError> {
        let expected = self.arity().count();
        if keys.len() != expected {
            return Err(LifecycleError::internal(format!(
                "read called with {} key(s), record takes {}",
                keys.len(),
                expected
            )));
        }

        let result = match self {
            ReadStrategy::Keyless(r) => r.read_keyless(session).await,
            ReadStrategy::ByName(r) => r.read_by_name(&keys[0], session).await,
            ReadStrategy::ByPair(r) => r.read_by_pair(&keys[0], &keys[1], session).await,
            ReadStrategy::ByQuad(r) => {
                let quad = [
                    keys[0].as_str(),
                    keys[1].as_str(),
                    keys[2].as_str(),
                    keys[3].as_str(),
                ];
                r.read_by_quad(quad, session).await
            }
        };
        result.map_err(|e| LifecycleError::read(describe(&e)))
    }
}

/// A record that can be read back from the device.
pub trait Readable: NullIdentity + Send {
    /// Returns the read capability of this record.
    fn read_strategy(&mut self) -> ReadStrategy<'_>;
}

/// A check run against the device inside a create or update transaction.
///
/// Pre-checks typically reject duplicates or incompatible platforms; post-checks
/// verify the committed object is visible.
#[async_trait]
pub trait CreateCheck: Send + Sync {
    /// Runs the check.
    async fn check(&self, session: &mut ConfigSession) -> Result<(), LifecycleError>;
}
