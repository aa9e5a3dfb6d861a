//! Lifecycle orchestration for Junos configuration objects.
//!
//! This crate provides the generic driver that turns a resource record into
//! a full create/read/update/delete/import lifecycle:
//!
//! - [`LifecycleDispatcher`]: runs each operation as one transaction
//! - [`contract`]: the capability traits a record implements
//! - [`Diagnostics`]: warnings and errors reported back to the caller
//! - [`ReadLock`]: serializes reads across dispatchers
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────┐
//! │  LifecycleDispatcher │  create / read / update / delete / import_state
//! └──────────┬───────────┘
//!            │ start_session, lock, commit, clear, close
//! ┌──────────▼───────────┐
//! │  junos_session       │  ConfigSession over a device link or set file
//! └──────────────────────┘
//! ```

pub mod checks;
pub mod contract;
pub mod diag;
pub mod dispatcher;
pub mod error;
pub mod import;
pub mod read_lock;

// Re-export commonly used items at crate root
pub use checks::{config_exists, ConfigExistence, RequireSecurityPlatform};
pub use contract::{
    CreateCheck, FirstStage, KeyArity, NullIdentity, ReadByName, ReadByPair, ReadByQuad,
    ReadKeyless, ReadStrategy, Readable, Removable, StageFailure, Stageable,
};
pub use diag::{Diagnostic, Diagnostics, FieldPath, Severity};
pub use dispatcher::{LifecycleDispatcher, Outcome, StateChange};
pub use error::{ErrorKind, LifecycleError, LifecycleResult, StagePhase};
pub use import::{join_id, split_import_id};
pub use read_lock::ReadLock;
