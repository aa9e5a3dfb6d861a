//! Generic create/read/update/delete/import driver.
//!
//! Every mutating operation follows the same transaction shape:
//!
//! ```text
//! start session -> lock -> [pre-check] -> stage -> commit -> [post-check]
//!                     \__ on every exit after lock: clear + unlock, close
//! ```
//!
//! Reads open their own session and hold the shared [`ReadLock`] while the
//! record's read hook runs.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;

use futures::FutureExt;
use junos_session::{Client, ConfigSession, OpContext, SessionError};
use tracing::{debug, info, instrument, warn};

use crate::contract::{CreateCheck, FirstStage, Readable, Removable, Stageable};
use crate::diag::{Diagnostics, CLEAR_WARNING_SUMMARY, COMMIT_WARNING_SUMMARY};
use crate::error::{describe, LifecycleError, LifecycleResult, StagePhase};
use crate::import::split_import_id;
use crate::read_lock::ReadLock;

/// What the caller should do with its stored state.
#[derive(Debug)]
pub enum StateChange<T> {
    /// Leave the stored state untouched.
    Keep,
    /// Replace the stored state.
    Set(T),
    /// Drop the stored state.
    Remove,
}

/// Result of a lifecycle operation.
#[derive(Debug)]
pub struct Outcome<T> {
    /// Everything reported during the operation, in order.
    pub diagnostics: Diagnostics,
    /// State transition for the caller.
    pub state: StateChange<T>,
}

impl<T> Outcome<T> {
    fn keep(diagnostics: Diagnostics) -> Self {
        Self {
            diagnostics,
            state: StateChange::Keep,
        }
    }

    fn set(diagnostics: Diagnostics, value: T) -> Self {
        Self {
            diagnostics,
            state: StateChange::Set(value),
        }
    }

    fn remove(diagnostics: Diagnostics) -> Self {
        Self {
            diagnostics,
            state: StateChange::Remove,
        }
    }

    fn failed(mut diagnostics: Diagnostics, error: LifecycleError) -> Self {
        diagnostics.add_error(error);
        Self::keep(diagnostics)
    }

    /// Returns true if no error was reported.
    pub fn is_ok(&self) -> bool {
        !self.diagnostics.has_error()
    }

    /// The new state, if the operation set one.
    pub fn into_value(self) -> Option<T> {
        match self.state {
            StateChange::Set(value) => Some(value),
            StateChange::Keep | StateChange::Remove => None,
        }
    }
}

/// Drives the lifecycle of one resource type.
#[derive(Debug, Clone)]
pub struct LifecycleDispatcher {
    type_name: String,
    client: Arc<Client>,
    read_lock: ReadLock,
}

impl LifecycleDispatcher {
    /// Creates a dispatcher for `type_name`.
    ///
    /// `read_lock` must be shared by every dispatcher reading from the same
    /// device.
    pub fn new(type_name: impl Into<String>, client: Arc<Client>, read_lock: ReadLock) -> Self {
        Self {
            type_name: type_name.into(),
            client,
            read_lock,
        }
    }

    /// Resource type name, used in commit messages.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// The client sessions are opened from.
    pub fn client(&self) -> &Arc<Client> {
        &self.client
    }

    /// Creates the object described by `plan`.
    ///
    /// `pre_check` runs under the lock before staging, `post_check` after a
    /// successful commit. In offline mode the plan is appended to the set
    /// file and neither check runs.
    #[instrument(skip_all, fields(resource = %self.type_name))]
    pub async fn create<P>(
        &self,
        ctx: &OpContext,
        mut plan: P,
        pre_check: Option<&dyn CreateCheck>,
        post_check: Option<&dyn CreateCheck>,
    ) -> Outcome<P>
    where
        P: FirstStage,
    {
        let mut diags = Diagnostics::new();

        if self.client.fake_create_set_file() {
            let mut session = match self.client.offline_session() {
                Ok(session) => session,
                Err(e) => return Outcome::failed(diags, LifecycleError::internal(e.to_string())),
            };
            let staged = plan.stage(&mut session).await;
            session.close().await;
            if let Err(failure) = staged {
                return Outcome::failed(diags, failure.into_error(StagePhase::Set));
            }
            plan.fill_identity();
            debug!("Create written to offline set file");
            return Outcome::set(diags, plan);
        }

        let mut session = match self.open_locked(ctx).await {
            Ok(session) => session,
            Err(e) => return Outcome::failed(diags, e),
        };
        let steps = self.create_steps(&mut session, &plan, pre_check, post_check, &mut diags);
        let result = AssertUnwindSafe(steps).catch_unwind().await;
        if !Self::release(session, result, &mut diags).await {
            return Outcome::keep(diags);
        }

        plan.fill_identity();
        info!("Resource created");
        Outcome::set(diags, plan)
    }

    /// Reads the object identified by `keys` into `data`.
    ///
    /// An absent object yields [`StateChange::Remove`].
    pub async fn read<P>(&self, ctx: &OpContext, keys: &[String], data: P) -> Outcome<P>
    where
        P: Readable,
    {
        self.read_with(ctx, keys, data, |_| {}).await
    }

    /// Like [`read`](Self::read), running `before_set` on the record before
    /// it is returned.
    #[instrument(skip_all, fields(resource = %self.type_name, keys = ?keys))]
    pub async fn read_with<P, F>(
        &self,
        ctx: &OpContext,
        keys: &[String],
        mut data: P,
        before_set: F,
    ) -> Outcome<P>
    where
        P: Readable,
        F: FnOnce(&mut P) + Send,
    {
        let diags = Diagnostics::new();

        if let Err(e) = self.read_locked(ctx, keys, &mut data).await {
            return Outcome::failed(diags, e);
        }
        if data.null_id() {
            debug!("Resource not found on device");
            return Outcome::remove(diags);
        }
        before_set(&mut data);
        Outcome::set(diags, data)
    }

    /// Replaces the object described by `state` with `plan`.
    ///
    /// The stored state's options are removed and the plan re-staged in one
    /// commit. `post_check` runs after the commit.
    #[instrument(skip_all, fields(resource = %self.type_name))]
    pub async fn update<S, P>(
        &self,
        ctx: &OpContext,
        state: &S,
        plan: P,
        post_check: Option<&dyn CreateCheck>,
    ) -> Outcome<P>
    where
        S: Removable,
        P: Stageable,
    {
        let mut diags = Diagnostics::new();

        if self.client.fake_update_also() {
            let mut session = match self.client.offline_session() {
                Ok(session) => session,
                Err(e) => return Outcome::failed(diags, LifecycleError::internal(e.to_string())),
            };
            let staged = Self::replace(&mut session, state, &plan).await;
            session.close().await;
            if let Err(e) = staged {
                return Outcome::failed(diags, e);
            }
            debug!("Update written to offline set file");
            return Outcome::set(diags, plan);
        }

        let mut session = match self.open_locked(ctx).await {
            Ok(session) => session,
            Err(e) => return Outcome::failed(diags, e),
        };
        let steps = self.update_steps(&mut session, state, &plan, post_check, &mut diags);
        let result = AssertUnwindSafe(steps).catch_unwind().await;
        if !Self::release(session, result, &mut diags).await {
            return Outcome::keep(diags);
        }

        info!("Resource updated");
        Outcome::set(diags, plan)
    }

    /// Removes the object described by `state`.
    #[instrument(skip_all, fields(resource = %self.type_name))]
    pub async fn delete<S>(&self, ctx: &OpContext, state: &S) -> Outcome<S>
    where
        S: Removable,
    {
        let mut diags = Diagnostics::new();

        if self.client.fake_delete_also() {
            let mut session = match self.client.offline_session() {
                Ok(session) => session,
                Err(e) => return Outcome::failed(diags, LifecycleError::internal(e.to_string())),
            };
            let removed = state.remove(&mut session).await;
            session.close().await;
            if let Err(e) = removed {
                return Outcome::failed(diags, Self::delete_error(e));
            }
            debug!("Delete written to offline set file");
            return Outcome::remove(diags);
        }

        let mut session = match self.open_locked(ctx).await {
            Ok(session) => session,
            Err(e) => return Outcome::failed(diags, e),
        };
        let steps = self.delete_steps(&mut session, state, &mut diags);
        let result = AssertUnwindSafe(steps).catch_unwind().await;
        if !Self::release(session, result, &mut diags).await {
            return Outcome::keep(diags);
        }

        info!("Resource deleted");
        Outcome::remove(diags)
    }

    /// Imports the object identified by `id` into `data`.
    ///
    /// `id` is split according to the record's key arity before any session
    /// is opened. An absent object fails with `not_found_message`.
    #[instrument(skip_all, fields(resource = %self.type_name, id = %id))]
    pub async fn import_state<P>(
        &self,
        ctx: &OpContext,
        id: &str,
        mut data: P,
        not_found_message: impl Into<String>,
    ) -> Outcome<P>
    where
        P: Readable,
    {
        let diags = Diagnostics::new();

        let keys = match split_import_id(id, data.read_strategy().arity()) {
            Ok(keys) => keys,
            Err(e) => return Outcome::failed(diags, e),
        };
        if let Err(e) = self.read_locked(ctx, &keys, &mut data).await {
            return Outcome::failed(diags, e);
        }
        if data.null_id() {
            return Outcome::failed(diags, LifecycleError::not_found(not_found_message));
        }
        info!("Resource imported");
        Outcome::set(diags, data)
    }

    async fn open_locked(&self, ctx: &OpContext) -> LifecycleResult<ConfigSession> {
        let mut session = self
            .client
            .start_session(ctx)
            .await
            .map_err(LifecycleError::Connection)?;
        if let Err(e) = session.lock(ctx).await {
            session.close().await;
            return Err(match e {
                SessionError::LockAborted => LifecycleError::LockAborted,
                other => LifecycleError::internal(other.to_string()),
            });
        }
        Ok(session)
    }

    async fn read_locked<P>(
        &self,
        ctx: &OpContext,
        keys: &[String],
        data: &mut P,
    ) -> LifecycleResult<()>
    where
        P: Readable,
    {
        let mut session = self
            .client
            .start_session(ctx)
            .await
            .map_err(LifecycleError::Connection)?;
        let result = {
            let _guard = self.read_lock.acquire().await;
            AssertUnwindSafe(data.read_strategy().read(keys, &mut session))
                .catch_unwind()
                .await
        };
        session.close().await;
        match result {
            Ok(read) => read,
            Err(payload) => panic::resume_unwind(payload),
        }
    }

    async fn create_steps<P>(
        &self,
        session: &mut ConfigSession,
        plan: &P,
        pre_check: Option<&dyn CreateCheck>,
        post_check: Option<&dyn CreateCheck>,
        diags: &mut Diagnostics,
    ) -> LifecycleResult<()>
    where
        P: FirstStage,
    {
        if let Some(check) = pre_check {
            check.check(session).await?;
        }
        plan.stage(session)
            .await
            .map_err(|f| f.into_error(StagePhase::Set))?;
        self.commit(session, "create", diags).await?;
        if let Some(check) = post_check {
            check.check(session).await?;
        }
        Ok(())
    }

    async fn update_steps<S, P>(
        &self,
        session: &mut ConfigSession,
        state: &S,
        plan: &P,
        post_check: Option<&dyn CreateCheck>,
        diags: &mut Diagnostics,
    ) -> LifecycleResult<()>
    where
        S: Removable,
        P: Stageable,
    {
        Self::replace(session, state, plan).await?;
        self.commit(session, "update", diags).await?;
        if let Some(check) = post_check {
            check.check(session).await?;
        }
        Ok(())
    }

    async fn delete_steps<S>(
        &self,
        session: &mut ConfigSession,
        state: &S,
        diags: &mut Diagnostics,
    ) -> LifecycleResult<()>
    where
        S: Removable,
    {
        state.remove(session).await.map_err(Self::delete_error)?;
        self.commit(session, "delete", diags).await
    }

    /// Clears, unlocks and closes a locked session once its steps are done,
    /// then re-raises a panic from the steps.
    ///
    /// Returns true if the steps succeeded. A failure is added to `diags`
    /// ahead of the cleanup warnings.
    async fn release(
        mut session: ConfigSession,
        result: thread::Result<LifecycleResult<()>>,
        diags: &mut Diagnostics,
    ) -> bool {
        let cleanup = session.clear().await;
        session.close().await;

        let committed = match result {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                warn!(error = %e, summary = e.summary(), "Lifecycle operation failed");
                diags.add_error(e);
                false
            }
            Err(payload) => panic::resume_unwind(payload),
        };
        diags.append_warnings(CLEAR_WARNING_SUMMARY, cleanup);
        committed
    }

    async fn commit(
        &self,
        session: &mut ConfigSession,
        action: &str,
        diags: &mut Diagnostics,
    ) -> LifecycleResult<()> {
        let outcome = session
            .commit(&format!("{} resource {}", action, self.type_name))
            .await;
        diags.append_warnings(COMMIT_WARNING_SUMMARY, outcome.warnings);
        outcome
            .result
            .map_err(|e| LifecycleError::commit(e.to_string()))
    }

    async fn replace<S, P>(session: &mut ConfigSession, state: &S, plan: &P) -> LifecycleResult<()>
    where
        S: Removable,
        P: Stageable,
    {
        state
            .remove_options(session)
            .await
            .map_err(Self::delete_error)?;
        plan.stage(session)
            .await
            .map_err(|f| f.into_error(StagePhase::Set))
    }

    fn delete_error(error: anyhow::Error) -> LifecycleError {
        LifecycleError::staging(StagePhase::Delete, None, describe(&error))
    }
}
