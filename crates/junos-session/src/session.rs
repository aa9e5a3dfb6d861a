//! Configuration session: the lock/stage/commit/clear protocol.
//!
//! A [`ConfigSession`] is created for one logical operation and consumed by
//! [`ConfigSession::close`]. Its backend is either a live device link or an
//! offline set file; the protocol steps that only make sense on a device fail
//! with an internal error on the file backend instead of doing nothing.
//!
//! The expected sequence for a mutating operation is
//! `lock → stage… → commit → clear → close`, where `clear` must run on every
//! path once `lock` succeeded.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::audit::AuditLog;
use crate::config::ClientConfig;
use crate::context::OpContext;
use crate::error::{DeviceError, SessionError, SessionResult};
use crate::link::{DeviceLink, SystemInformation};
use crate::output::EMPTY_W;
use crate::sink::FileSink;

/// Delays applied by a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    /// Wait between two lock attempts.
    pub lock_retry: Duration,
    /// Settle delay after each device operation.
    pub settle: Duration,
    /// Settle delay after closing the link.
    pub close_settle: Duration,
}

impl Timing {
    /// Timing taken from the client configuration.
    pub fn from_config(config: &ClientConfig) -> Self {
        Self {
            lock_retry: config.lock_retry(),
            settle: config.settle(),
            close_settle: config.close_settle(),
        }
    }

    /// No delays at all.
    pub fn immediate() -> Self {
        Self {
            lock_retry: Duration::ZERO,
            settle: Duration::ZERO,
            close_settle: Duration::ZERO,
        }
    }
}

impl Default for Timing {
    fn default() -> Self {
        Self::from_config(&ClientConfig::default())
    }
}

/// Where staged statements go.
pub enum TransactionBackend {
    /// Statements are loaded on a device and committed there.
    LiveDevice(Box<dyn DeviceLink>),
    /// Statements are appended to a local set file.
    FileSink(FileSink),
}

impl fmt::Debug for TransactionBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionBackend::LiveDevice(link) => f
                .debug_tuple("LiveDevice")
                .field(&link.system_information().hardware_model)
                .finish(),
            TransactionBackend::FileSink(sink) => f.debug_tuple("FileSink").field(sink).finish(),
        }
    }
}

/// Result of a commit attempt.
///
/// Warnings are kept even when the commit was rejected.
#[derive(Debug)]
pub struct CommitOutcome {
    /// Non-fatal messages reported by the device.
    pub warnings: Vec<DeviceError>,
    /// Whether the commit was accepted.
    pub result: SessionResult<()>,
}

impl CommitOutcome {
    /// Returns true if the commit was accepted.
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// One configuration transaction against one backend.
#[derive(Debug)]
pub struct ConfigSession {
    backend: TransactionBackend,
    timing: Timing,
    audit: Option<AuditLog>,
}

impl ConfigSession {
    /// Creates a session over `backend`.
    pub fn new(backend: TransactionBackend, timing: Timing, audit: Option<AuditLog>) -> Self {
        Self {
            backend,
            timing,
            audit,
        }
    }

    /// The session backend.
    pub fn backend(&self) -> &TransactionBackend {
        &self.backend
    }

    /// Returns true if the session drives a live device.
    pub fn has_device(&self) -> bool {
        matches!(self.backend, TransactionBackend::LiveDevice(_))
    }

    /// Identity of the device, `None` in offline mode.
    pub fn system_information(&self) -> Option<&SystemInformation> {
        match &self.backend {
            TransactionBackend::LiveDevice(link) => Some(link.system_information()),
            TransactionBackend::FileSink(_) => None,
        }
    }

    /// Returns true if the device supports security features (SRX family).
    ///
    /// Always true in offline mode where no device can be asked.
    pub fn check_compatibility_security(&self) -> bool {
        self.system_information()
            .map_or(true, SystemInformation::is_security_platform)
    }

    /// Writes a line to the audit log, if one is configured.
    // Must not borrow self: links are Send but not Sync.
    pub fn log(&self, message: impl Into<String>) -> impl Future<Output = ()> + Send + 'static {
        let message = message.into();
        let audit = self.audit.clone();
        async move {
            debug!(target: "junos_session::audit", "{}", message);
            if let Some(audit) = audit {
                audit.record(&message).await;
            }
        }
    }

    fn live_link(&mut self) -> Option<&mut dyn DeviceLink> {
        match &mut self.backend {
            TransactionBackend::LiveDevice(link) => Some(link.as_mut()),
            TransactionBackend::FileSink(_) => None,
        }
    }

    fn require_link(&mut self, operation: &str) -> SessionResult<&mut dyn DeviceLink> {
        self.live_link().ok_or_else(|| {
            SessionError::internal(format!(
                "{} call without connection on device",
                operation
            ))
        })
    }

    // Same constraint as `log`.
    fn settle(&self) -> impl Future<Output = ()> + Send + 'static {
        let delay = self.timing.settle;
        async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }
    }

    /// Runs an operational command and returns its text reply.
    ///
    /// A device error whose reply is the [`EMPTY_W`] marker is not an
    /// error: the hierarchy is simply not configured.
    pub async fn command(&mut self, cmd: &str) -> SessionResult<String> {
        let reply = self.require_link("command")?.command(cmd).await;
        self.log(format!("[command] cmd: {:?}", cmd)).await;
        self.settle().await;
        match reply {
            Ok(read) => {
                self.log(format!("[command] read: {:?}", read)).await;
                Ok(read)
            }
            Err(DeviceError::RpcWithReply { message, reply }) if reply == EMPTY_W => {
                self.log(format!("[command] read: {:?} (ignored err: {:?})", reply, message))
                    .await;
                Ok(reply)
            }
            Err(e) => {
                self.log(format!("[command] err: {:?}", e.to_string())).await;
                Err(SessionError::device("command", e))
            }
        }
    }

    /// Runs an operational command and returns its raw XML reply.
    pub async fn command_xml(&mut self, cmd: &str) -> SessionResult<String> {
        let reply = self.require_link("commandXML")?.command_xml(cmd).await;
        self.log(format!("[commandXML] cmd: {:?}", cmd)).await;
        self.settle().await;
        match reply {
            Ok(read) => {
                self.log(format!("[commandXML] read: {:?}", read)).await;
                Ok(read)
            }
            Err(e) => {
                self.log(format!("[commandXML] err: {:?}", e.to_string())).await;
                Err(SessionError::device("command xml", e))
            }
        }
    }

    /// Takes the candidate configuration lock.
    ///
    /// Retries every `lock_retry` until the lock is taken or `ctx` is done;
    /// there is no attempt limit.
    pub async fn lock(&mut self, ctx: &OpContext) -> SessionResult<()> {
        let mut attempts: u64 = 0;
        loop {
            if ctx.is_done() {
                self.log("[configLock] aborted").await;
                return Err(SessionError::LockAborted);
            }
            attempts += 1;
            if self.require_link("configLock")?.try_lock().await {
                self.log("[configLock] locked").await;
                info!(attempts, "Candidate configuration locked");
                self.settle().await;
                return Ok(());
            }
            self.log("[configLock] sleep to wait the lock").await;
            debug!(attempts, retry_in = ?self.timing.lock_retry, "Candidate configuration busy");
            tokio::select! {
                _ = ctx.done() => {
                    self.log("[configLock] aborted").await;
                    return Err(SessionError::LockAborted);
                }
                _ = tokio::time::sleep(self.timing.lock_retry) => {}
            }
        }
    }

    /// Stages statements, in order.
    ///
    /// On a device they are loaded into the candidate configuration; in
    /// offline mode they are appended to the set file.
    pub async fn stage(&mut self, lines: &[String]) -> SessionResult<()> {
        let offline = match &self.backend {
            TransactionBackend::FileSink(sink) => Some(sink.clone()),
            TransactionBackend::LiveDevice(_) => None,
        };
        if let Some(sink) = offline {
            let result = sink.append(lines).await;
            let entry = match &result {
                Ok(()) => format!(
                    "[configSet] {} line(s) written to {:?}",
                    lines.len(),
                    sink.path().display().to_string()
                ),
                Err(e) => format!("[configSet] err: {:?}", e.to_string()),
            };
            self.log(entry).await;
            return result;
        }

        let reply = self.require_link("configSet")?.send_config(lines).await;
        self.settle().await;
        self.log(format!("[configSet] cmd: {:?}", lines)).await;
        match reply {
            Ok(message) => {
                self.log(format!("[configSet] message: {:?}", message)).await;
                Ok(())
            }
            Err(e) => {
                self.log(format!("[configSet] err: {:?}", e.to_string())).await;
                Err(SessionError::device("config set", e))
            }
        }
    }

    /// Commits the candidate configuration with `message` as commit log.
    pub async fn commit(&mut self, message: &str) -> CommitOutcome {
        self.log(format!("[commitConf] commit {:?}", message)).await;
        let link = match self.require_link("commitConf") {
            Ok(link) => link,
            Err(e) => {
                return CommitOutcome {
                    warnings: Vec::new(),
                    result: Err(e),
                }
            }
        };
        let (warnings, result) = link.commit(message).await;
        self.settle().await;

        for w in &warnings {
            self.log(format!("[commitConf] commit warning: {:?}", w.to_string())).await;
            warn!(warning = %w, "Commit warning");
        }
        let result = match result {
            Ok(()) => {
                info!(commit_log = message, "Configuration committed");
                Ok(())
            }
            Err(source) => {
                self.log(format!("[commitConf] commit error: {:?}", source.to_string())).await;
                Err(SessionError::Commit { source })
            }
        };

        CommitOutcome { warnings, result }
    }

    /// Discards uncommitted candidate changes and releases the lock.
    ///
    /// Both steps are always attempted; every error from either is returned.
    /// Nothing to do in offline mode.
    pub async fn clear(&mut self) -> Vec<SessionError> {
        let mut errs = Vec::new();

        let Some(link) = self.live_link() else {
            return errs;
        };
        errs.extend(
            link.clear_candidate()
                .await
                .into_iter()
                .map(|e| SessionError::device("config clear", e)),
        );
        self.settle().await;
        self.log("[configClear] config clear").await;

        if let Some(link) = self.live_link() {
            errs.extend(
                link.unlock()
                    .await
                    .into_iter()
                    .map(|e| SessionError::device("config unlock", e)),
            );
        }
        self.settle().await;
        self.log("[configClear] config unlock").await;

        for e in &errs {
            warn!(error = %e, "Config clear/unlock failed");
        }
        errs
    }

    /// Closes the session and its link.
    ///
    /// Close failures are logged and never returned.
    pub async fn close(mut self) {
        let result = match self.live_link() {
            Some(link) => link.close().await,
            None => return,
        };
        if !self.timing.close_settle.is_zero() {
            tokio::time::sleep(self.timing.close_settle).await;
        }
        match result {
            Ok(()) => self.log("[closeSession] closed").await,
            Err(e) => {
                self.log(format!("[closeSession] err: {:?}", e.to_string())).await;
                warn!(error = %e, "Failed to close device session");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    /// Minimal link recording every primitive call.
    struct RecordingLink {
        info: SystemInformation,
        calls: Arc<Mutex<Vec<String>>>,
        busy_attempts: usize,
        commit_warnings: Vec<DeviceError>,
        commit_error: Option<DeviceError>,
        clear_errors: Vec<DeviceError>,
        unlock_errors: Vec<DeviceError>,
        command_error: Option<DeviceError>,
    }

    impl RecordingLink {
        fn new(calls: Arc<Mutex<Vec<String>>>) -> Self {
            Self {
                info: SystemInformation::with_model("srx345"),
                calls,
                busy_attempts: 0,
                commit_warnings: Vec::new(),
                commit_error: None,
                clear_errors: Vec::new(),
                unlock_errors: Vec::new(),
                command_error: None,
            }
        }

        fn record(&self, call: impl Into<String>) {
            self.calls.lock().unwrap().push(call.into());
        }
    }

    #[async_trait]
    impl DeviceLink for RecordingLink {
        fn system_information(&self) -> &SystemInformation {
            &self.info
        }

        async fn command(&mut self, cmd: &str) -> Result<String, DeviceError> {
            self.record(format!("command {}", cmd));
            match self.command_error.clone() {
                Some(e) => Err(e),
                None => Ok(crate::output::EMPTY_W.to_string()),
            }
        }

        async fn command_xml(&mut self, cmd: &str) -> Result<String, DeviceError> {
            self.record(format!("command_xml {}", cmd));
            Ok("<ok/>".to_string())
        }

        async fn try_lock(&mut self) -> bool {
            self.record("try_lock");
            if self.busy_attempts > 0 {
                self.busy_attempts -= 1;
                false
            } else {
                true
            }
        }

        async fn send_config(&mut self, lines: &[String]) -> Result<String, DeviceError> {
            for line in lines {
                self.record(format!("send {}", line));
            }
            Ok(String::new())
        }

        async fn commit(&mut self, message: &str) -> (Vec<DeviceError>, Result<(), DeviceError>) {
            self.record(format!("commit {}", message));
            let result = match self.commit_error.clone() {
                Some(e) => Err(e),
                None => Ok(()),
            };
            (self.commit_warnings.clone(), result)
        }

        async fn clear_candidate(&mut self) -> Vec<DeviceError> {
            self.record("clear_candidate");
            self.clear_errors.clone()
        }

        async fn unlock(&mut self) -> Vec<DeviceError> {
            self.record("unlock");
            self.unlock_errors.clone()
        }

        async fn close(&mut self) -> Result<(), DeviceError> {
            self.record("close");
            Err(DeviceError::transport("already closed by peer"))
        }
    }

    fn live_session(link: RecordingLink) -> ConfigSession {
        ConfigSession::new(
            TransactionBackend::LiveDevice(Box::new(link)),
            Timing::immediate(),
            None,
        )
    }

    fn lines(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_lock_retries_until_free() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let mut link = RecordingLink::new(calls.clone());
        link.busy_attempts = 2;
        let mut session = live_session(link);

        session.lock(&OpContext::new()).await.unwrap();

        assert_eq!(*calls.lock().unwrap(), ["try_lock", "try_lock", "try_lock"]);
    }

    #[tokio::test]
    async fn test_lock_aborts_on_cancelled_context() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let mut session = live_session(RecordingLink::new(calls.clone()));
        let ctx = OpContext::new();
        ctx.cancel();

        let err = session.lock(&ctx).await.unwrap_err();

        assert!(matches!(err, SessionError::LockAborted));
        assert!(calls.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_lock_aborts_during_retry_wait() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let mut link = RecordingLink::new(calls.clone());
        link.busy_attempts = usize::MAX;
        let mut session = ConfigSession::new(
            TransactionBackend::LiveDevice(Box::new(link)),
            Timing {
                lock_retry: Duration::from_secs(10),
                ..Timing::immediate()
            },
            None,
        );
        let ctx = OpContext::new().with_timeout(Duration::from_secs(25));

        let err = session.lock(&ctx).await.unwrap_err();

        assert!(matches!(err, SessionError::LockAborted));
        // Attempts at t=0, 10s and 20s; the deadline hits during the third wait.
        assert_eq!(calls.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_command_error_with_empty_reply_is_not_configured() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let mut link = RecordingLink::new(calls.clone());
        link.command_error = Some(DeviceError::rpc_with_reply(
            "statement not found",
            EMPTY_W,
        ));
        let mut session = live_session(link);

        let read = session
            .command("show configuration snmp | display set relative")
            .await
            .unwrap();

        assert_eq!(read, EMPTY_W);
    }

    #[tokio::test]
    async fn test_command_error_with_other_reply_fails() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let mut link = RecordingLink::new(calls.clone());
        link.command_error = Some(DeviceError::rpc_with_reply("syntax error", "show snmpp"));
        let mut session = live_session(link);

        let err = session.command("show snmpp").await.unwrap_err();

        assert!(matches!(err, SessionError::Device { .. }));
        assert!(err.to_string().contains("syntax error"));
    }

    #[tokio::test]
    async fn test_stage_sends_in_order() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let mut session = live_session(RecordingLink::new(calls.clone()));

        session
            .stage(&lines(&["set a", "set a b", "delete c"]))
            .await
            .unwrap();

        assert_eq!(
            *calls.lock().unwrap(),
            ["send set a", "send set a b", "send delete c"]
        );
    }

    #[tokio::test]
    async fn test_commit_keeps_warnings_on_failure() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let mut link = RecordingLink::new(calls.clone());
        link.commit_warnings = vec![DeviceError::rpc("w1"), DeviceError::rpc("w2")];
        link.commit_error = Some(DeviceError::rpc("commit check failed"));
        let mut session = live_session(link);

        let outcome = session.commit("create resource x").await;

        assert_eq!(outcome.warnings.len(), 2);
        assert!(matches!(outcome.result, Err(SessionError::Commit { .. })));
        assert!(!outcome.is_ok());
    }

    #[tokio::test]
    async fn test_clear_collects_errors_from_both_steps() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let mut link = RecordingLink::new(calls.clone());
        link.clear_errors = vec![DeviceError::rpc("discard failed")];
        link.unlock_errors = vec![DeviceError::rpc("unlock failed")];
        let mut session = live_session(link);

        let errs = session.clear().await;

        assert_eq!(errs.len(), 2);
        assert_eq!(*calls.lock().unwrap(), ["clear_candidate", "unlock"]);
    }

    #[tokio::test]
    async fn test_close_swallows_errors() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let session = live_session(RecordingLink::new(calls.clone()));

        session.close().await;

        assert_eq!(*calls.lock().unwrap(), ["close"]);
    }

    #[tokio::test]
    async fn test_offline_stage_appends_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out/set.conf");
        let mut session = ConfigSession::new(
            TransactionBackend::FileSink(FileSink::new(&path, 0o644)),
            Timing::immediate(),
            None,
        );

        session.stage(&lines(&["set a", "set b"])).await.unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "set a\nset b\n");
        assert!(!session.has_device());
        assert!(session.clear().await.is_empty());
    }

    #[tokio::test]
    async fn test_offline_device_primitives_fail_fast() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = ConfigSession::new(
            TransactionBackend::FileSink(FileSink::new(dir.path().join("set.conf"), 0o644)),
            Timing::immediate(),
            None,
        );

        assert!(matches!(
            session.lock(&OpContext::new()).await,
            Err(SessionError::Internal { .. })
        ));
        assert!(matches!(
            session.command("show version").await,
            Err(SessionError::Internal { .. })
        ));
        assert!(matches!(
            session.commit("x").await.result,
            Err(SessionError::Internal { .. })
        ));
    }

    #[tokio::test]
    async fn test_audit_log_records_steps() {
        let dir = tempfile::tempdir().unwrap();
        let audit = AuditLog::new(dir.path().join("audit.log"), 0o644);
        let calls = Arc::new(Mutex::new(Vec::new()));
        let mut session = ConfigSession::new(
            TransactionBackend::LiveDevice(Box::new(RecordingLink::new(calls))),
            Timing::immediate(),
            Some(audit.clone()),
        );

        session.lock(&OpContext::new()).await.unwrap();
        session.stage(&lines(&["set a"])).await.unwrap();
        let _ = session.commit("m").await;
        session.clear().await;
        session.close().await;

        let content = std::fs::read_to_string(audit.path()).unwrap();
        for tag in [
            "[configLock] locked",
            "[configSet] cmd",
            "[commitConf] commit",
            "[configClear] config unlock",
            "[closeSession] err",
        ] {
            assert!(content.contains(tag), "missing {} in audit log", tag);
        }
    }

    #[test]
    fn test_compatibility_security() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let session = live_session(RecordingLink::new(calls.clone()));
        assert!(session.check_compatibility_security());

        let mut link = RecordingLink::new(calls);
        link.info = SystemInformation::with_model("mx960");
        assert!(!live_session(link).check_compatibility_security());
    }
}
