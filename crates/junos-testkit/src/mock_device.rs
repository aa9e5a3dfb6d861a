//! In-memory Junos device.
//!
//! [`MockDevice`] implements both [`DeviceConnector`] and, through the links
//! it hands out, [`DeviceLink`]. Every link shares the device state, so
//! concurrent sessions contend for the same candidate lock and see the same
//! running configuration.
//!
//! Staged statements are kept as a candidate and applied to the running
//! configuration on commit; `show configuration <path> | display set` and
//! `| display set relative` are answered from the running configuration.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use junos_session::output::{
    CMD_SHOW_CONFIG, DELETE_LS, EMPTY_W, PIPE_DISPLAY_SET, PIPE_DISPLAY_SET_RELATIVE, SET_LS,
    XML_END_TAG_CONFIG_OUT, XML_START_TAG_CONFIG_OUT,
};
use junos_session::{DeviceConfig, DeviceConnector, DeviceError, DeviceLink, SystemInformation};
use parking_lot::Mutex;

/// One primitive call received by the device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceCall {
    /// A link was requested.
    Connect,
    /// Text command.
    Command(String),
    /// XML command.
    CommandXml(String),
    /// Lock attempt.
    TryLock,
    /// Statements loaded into the candidate.
    SendConfig(Vec<String>),
    /// Commit with its log message.
    Commit(String),
    /// Candidate discarded.
    ClearCandidate,
    /// Lock released.
    Unlock,
    /// Link closed.
    Close,
}

#[derive(Debug, Default)]
struct DeviceState {
    info: SystemInformation,
    calls: Vec<DeviceCall>,
    running: Vec<String>,
    candidate: Vec<String>,
    locked: bool,
    busy_attempts: usize,
    open_links: usize,
    active_commands: usize,
    max_active_commands: usize,
    command_delay: Option<Duration>,
    connect_error: Option<String>,
    send_error: Option<String>,
    commit_warnings: Vec<String>,
    commit_error: Option<String>,
    clear_errors: Vec<String>,
    unlock_errors: Vec<String>,
    close_error: Option<String>,
    empty_as_error: bool,
}

impl DeviceState {
    fn apply_candidate(&mut self) {
        for line in std::mem::take(&mut self.candidate) {
            if let Some(stmt) = line.strip_prefix(SET_LS) {
                let stmt = stmt.trim().to_string();
                if !self.running.contains(&stmt) {
                    self.running.push(stmt);
                }
            } else if let Some(path) = line.strip_prefix(DELETE_LS) {
                let path = path.trim();
                self.running.retain(|stmt| !under_path(stmt, path));
            }
        }
    }

    fn show(&self, cmd: &str) -> Result<String, DeviceError> {
        let Some(rest) = cmd.strip_prefix(CMD_SHOW_CONFIG) else {
            return Err(DeviceError::rpc(format!("syntax error: {}", cmd)));
        };
        let (path, relative) = if let Some(path) = rest.strip_suffix(PIPE_DISPLAY_SET_RELATIVE) {
            (path.trim(), true)
        } else if let Some(path) = rest.strip_suffix(PIPE_DISPLAY_SET) {
            (path.trim(), false)
        } else {
            return Err(DeviceError::rpc(format!("unsupported output format: {}", cmd)));
        };

        let lines: Vec<String> = self
            .running
            .iter()
            .filter(|stmt| under_path(stmt, path))
            .filter_map(|stmt| {
                if !relative {
                    return Some(format!("{}{}", SET_LS, stmt));
                }
                let tail = stmt[path.len()..].trim();
                (!tail.is_empty()).then(|| format!("{}{}", SET_LS, tail))
            })
            .collect();
        if lines.is_empty() {
            if self.empty_as_error {
                return Err(DeviceError::rpc_with_reply(
                    format!("statement not found: {}", path),
                    EMPTY_W,
                ));
            }
            return Ok(EMPTY_W.to_string());
        }

        let mut reply = String::from("\n");
        reply.push_str(XML_START_TAG_CONFIG_OUT);
        reply.push('\n');
        for line in lines {
            reply.push_str(&line);
            reply.push('\n');
        }
        reply.push_str(XML_END_TAG_CONFIG_OUT);
        Ok(reply)
    }
}

fn under_path(stmt: &str, path: &str) -> bool {
    stmt == path
        || stmt
            .strip_prefix(path)
            .is_some_and(|rest| rest.starts_with(' '))
}

/// Shared in-memory device.
///
/// Cloning yields another handle on the same device.
#[derive(Debug, Clone, Default)]
pub struct MockDevice {
    state: Arc<Mutex<DeviceState>>,
}

impl MockDevice {
    /// Device reporting `hardware_model`.
    pub fn new(hardware_model: impl Into<String>) -> Self {
        let device = Self::default();
        device.state.lock().info = SystemInformation {
            hardware_model: hardware_model.into(),
            os_name: "junos".to_string(),
            os_version: "23.4R1".to_string(),
            host_name: "lab-fw01".to_string(),
        };
        device
    }

    /// Security platform.
    pub fn srx() -> Self {
        Self::new("srx345")
    }

    /// Routing platform, without security features.
    pub fn mx() -> Self {
        Self::new("mx480")
    }

    /// Refuses the first `attempts` lock attempts.
    pub fn with_busy_lock(self, attempts: usize) -> Self {
        self.state.lock().busy_attempts = attempts;
        self
    }

    /// Fails every connection attempt.
    pub fn with_connect_error(self, message: impl Into<String>) -> Self {
        self.state.lock().connect_error = Some(message.into());
        self
    }

    /// Rejects every loaded statement batch.
    pub fn with_send_error(self, message: impl Into<String>) -> Self {
        self.state.lock().send_error = Some(message.into());
        self
    }

    /// Returns these warnings with every commit.
    pub fn with_commit_warnings<I, S>(self, warnings: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.state.lock().commit_warnings = warnings.into_iter().map(Into::into).collect();
        self
    }

    /// Rejects every commit.
    pub fn with_commit_error(self, message: impl Into<String>) -> Self {
        self.state.lock().commit_error = Some(message.into());
        self
    }

    /// Fails candidate clearing and unlocking with these errors.
    pub fn with_cleanup_errors(self, clear: &[&str], unlock: &[&str]) -> Self {
        {
            let mut state = self.state.lock();
            state.clear_errors = clear.iter().map(|e| e.to_string()).collect();
            state.unlock_errors = unlock.iter().map(|e| e.to_string()).collect();
        }
        self
    }

    /// Fails every close.
    pub fn with_close_error(self, message: impl Into<String>) -> Self {
        self.state.lock().close_error = Some(message.into());
        self
    }

    /// Seeds the running configuration with `set` statements (without the
    /// `set ` prefix).
    pub fn with_running<I, S>(self, statements: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.state
            .lock()
            .running
            .extend(statements.into_iter().map(Into::into));
        self
    }

    /// Answers shows of unconfigured hierarchies with an error that still
    /// carries the empty marker as its reply.
    pub fn with_empty_as_error(self) -> Self {
        self.state.lock().empty_as_error = true;
        self
    }

    /// Delays every text command, to observe overlapping reads.
    pub fn with_command_delay(self, delay: Duration) -> Self {
        self.state.lock().command_delay = Some(delay);
        self
    }

    /// Every call received so far.
    pub fn calls(&self) -> Vec<DeviceCall> {
        self.state.lock().calls.clone()
    }

    /// Number of calls matching `predicate`.
    pub fn count_calls(&self, predicate: impl Fn(&DeviceCall) -> bool) -> usize {
        self.state.lock().calls.iter().filter(|c| predicate(c)).count()
    }

    /// Commit messages, in order.
    pub fn commit_messages(&self) -> Vec<String> {
        self.state
            .lock()
            .calls
            .iter()
            .filter_map(|c| match c {
                DeviceCall::Commit(message) => Some(message.clone()),
                _ => None,
            })
            .collect()
    }

    /// Every statement loaded into the candidate, in order.
    pub fn sent_lines(&self) -> Vec<String> {
        self.state
            .lock()
            .calls
            .iter()
            .filter_map(|c| match c {
                DeviceCall::SendConfig(lines) => Some(lines.clone()),
                _ => None,
            })
            .flatten()
            .collect()
    }

    /// Running configuration statements.
    pub fn running(&self) -> Vec<String> {
        self.state.lock().running.clone()
    }

    /// Uncommitted candidate statements.
    pub fn candidate(&self) -> Vec<String> {
        self.state.lock().candidate.clone()
    }

    /// Returns true if the candidate lock is held.
    pub fn is_locked(&self) -> bool {
        self.state.lock().locked
    }

    /// Links handed out and not yet closed.
    pub fn open_links(&self) -> usize {
        self.state.lock().open_links
    }

    /// Highest number of text commands observed in flight at once.
    pub fn max_concurrent_commands(&self) -> usize {
        self.state.lock().max_active_commands
    }

    fn record(&self, call: DeviceCall) {
        self.state.lock().calls.push(call);
    }
}

#[async_trait]
impl DeviceConnector for MockDevice {
    async fn connect(&self, _config: &DeviceConfig) -> Result<Box<dyn DeviceLink>, DeviceError> {
        let mut state = self.state.lock();
        state.calls.push(DeviceCall::Connect);
        if let Some(message) = &state.connect_error {
            return Err(DeviceError::transport(message.clone()));
        }
        state.open_links += 1;
        let info = state.info.clone();
        drop(state);

        Ok(Box::new(MockLink {
            device: self.clone(),
            info,
            holds_lock: false,
        }))
    }
}

/// Link to a [`MockDevice`].
#[derive(Debug)]
pub struct MockLink {
    device: MockDevice,
    info: SystemInformation,
    holds_lock: bool,
}

#[async_trait]
impl DeviceLink for MockLink {
    fn system_information(&self) -> &SystemInformation {
        &self.info
    }

    async fn command(&mut self, cmd: &str) -> Result<String, DeviceError> {
        let delay = {
            let mut state = self.device.state.lock();
            state.calls.push(DeviceCall::Command(cmd.to_string()));
            state.active_commands += 1;
            state.max_active_commands = state.max_active_commands.max(state.active_commands);
            state.command_delay
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.device.state.lock();
        state.active_commands -= 1;
        state.show(cmd)
    }

    async fn command_xml(&mut self, cmd: &str) -> Result<String, DeviceError> {
        self.device.record(DeviceCall::CommandXml(cmd.to_string()));
        Ok("<rpc-reply/>".to_string())
    }

    async fn try_lock(&mut self) -> bool {
        let mut state = self.device.state.lock();
        state.calls.push(DeviceCall::TryLock);
        if state.busy_attempts > 0 {
            state.busy_attempts -= 1;
            return false;
        }
        if state.locked {
            return false;
        }
        state.locked = true;
        self.holds_lock = true;
        true
    }

    async fn send_config(&mut self, lines: &[String]) -> Result<String, DeviceError> {
        let mut state = self.device.state.lock();
        state.calls.push(DeviceCall::SendConfig(lines.to_vec()));
        if let Some(message) = &state.send_error {
            return Err(DeviceError::rpc(message.clone()));
        }
        state.candidate.extend(lines.iter().cloned());
        Ok(String::new())
    }

    async fn commit(&mut self, message: &str) -> (Vec<DeviceError>, Result<(), DeviceError>) {
        let mut state = self.device.state.lock();
        state.calls.push(DeviceCall::Commit(message.to_string()));
        let warnings = state
            .commit_warnings
            .iter()
            .map(|w| DeviceError::rpc(w.clone()))
            .collect();
        if let Some(error) = &state.commit_error {
            return (warnings, Err(DeviceError::rpc(error.clone())));
        }
        state.apply_candidate();
        (warnings, Ok(()))
    }

    async fn clear_candidate(&mut self) -> Vec<DeviceError> {
        let mut state = self.device.state.lock();
        state.calls.push(DeviceCall::ClearCandidate);
        state.candidate.clear();
        state.clear_errors.iter().map(|e| DeviceError::rpc(e.clone())).collect()
    }

    async fn unlock(&mut self) -> Vec<DeviceError> {
        let mut state = self.device.state.lock();
        state.calls.push(DeviceCall::Unlock);
        if self.holds_lock {
            state.locked = false;
            self.holds_lock = false;
        }
        state.unlock_errors.iter().map(|e| DeviceError::rpc(e.clone())).collect()
    }

    async fn close(&mut self) -> Result<(), DeviceError> {
        let mut state = self.device.state.lock();
        state.calls.push(DeviceCall::Close);
        state.open_links = state.open_links.saturating_sub(1);
        match &state.close_error {
            Some(message) => Err(DeviceError::transport(message.clone())),
            None => Ok(()),
        }
    }
}
