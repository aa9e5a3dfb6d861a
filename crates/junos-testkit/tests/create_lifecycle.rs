//! Create lifecycle against a mock device
//!
//! Covers the transaction shape (lock, checks, stage, commit, cleanup), the
//! diagnostics it reports and the cleanup guarantees on every exit path.

use std::time::Duration;

use async_trait::async_trait;
use junos_lifecycle::{
    ErrorKind, FieldPath, FirstStage, LifecycleError, Severity, StageFailure, Stageable,
    StateChange,
};
use junos_session::{ConfigSession, OpContext};
use junos_testkit::{
    ApplicationSet, DeviceCall, DeviceVerifier, MockDevice, TestHarness, TunnelPairPolicy,
};
use pretty_assertions::assert_eq;
use tokio_test::assert_ok;

const APP_SET: &str = "junos_application_set";

fn show(path: &str) -> DeviceCall {
    DeviceCall::Command(format!("show configuration {} | display set", path))
}

/// Test a successful create with pre- and post-checks
///
/// Scenario:
/// 1. Create an application set on an empty device
/// 2. Verify the exact sequence of device calls
/// 3. Verify identity, commit message and running configuration
#[tokio::test]
async fn test_create_runs_full_transaction() {
    let h = TestHarness::new(MockDevice::srx());
    let dispatcher = h.dispatcher(APP_SET);
    let plan = ApplicationSet::new("web", &["junos-http", "junos-https"]);
    let (pre, post) = (plan.pre_check(), plan.post_check());

    let outcome = dispatcher
        .create(&OpContext::new(), plan, Some(&pre), Some(&post))
        .await;

    assert!(outcome.is_ok(), "{:?}", outcome.diagnostics);
    assert!(outcome.diagnostics.is_empty());
    let created = outcome.into_value().unwrap();
    assert_eq!(created.id.as_deref(), Some("web"));

    assert_eq!(
        h.device.calls(),
        vec![
            DeviceCall::Connect,
            DeviceCall::TryLock,
            show("applications application-set web"),
            DeviceCall::SendConfig(vec![
                "set applications application-set web application junos-http".to_string(),
                "set applications application-set web application junos-https".to_string(),
            ]),
            DeviceCall::Commit("create resource junos_application_set".to_string()),
            show("applications application-set web"),
            DeviceCall::ClearCandidate,
            DeviceCall::Unlock,
            DeviceCall::Close,
        ]
    );

    let verifier = DeviceVerifier::new(&h.device);
    assert_ok!(verifier.assert_released());
    assert_ok!(verifier.assert_configured("applications application-set web"));
}

/// Test that a duplicate is rejected before anything is staged
#[tokio::test]
async fn test_create_duplicate_rejected_by_pre_check() {
    let device =
        MockDevice::srx().with_running(["applications application-set web application junos-ssh"]);
    let h = TestHarness::new(device);
    let plan = ApplicationSet::new("web", &["junos-http"]);
    let pre = plan.pre_check();

    let outcome = h
        .dispatcher(APP_SET)
        .create(&OpContext::new(), plan, Some(&pre), None)
        .await;

    assert!(!outcome.is_ok());
    assert!(matches!(outcome.state, StateChange::Keep));
    let err = outcome.diagnostics.errors().next().unwrap();
    assert_eq!(err.summary(), "Duplicate Configuration Error");
    assert_eq!(err.to_string(), "application-set \"web\" already exists");

    assert_eq!(h.device.count_calls(|c| matches!(c, DeviceCall::SendConfig(_))), 0);
    assert_eq!(h.device.count_calls(|c| matches!(c, DeviceCall::Commit(_))), 0);
    assert_ok!(DeviceVerifier::new(&h.device).assert_released());
}

/// Test that a staging failure carries its field path and still cleans up
#[tokio::test]
async fn test_create_stage_failure_scoped_to_field() {
    let h = TestHarness::new(MockDevice::srx());

    let outcome = h
        .dispatcher(APP_SET)
        .create(&OpContext::new(), ApplicationSet::new("web", &[]), None, None)
        .await;

    let err = outcome.diagnostics.errors().next().unwrap();
    assert_eq!(err.summary(), "Config Set Error");
    assert_eq!(err.field(), Some(&FieldPath::root("applications")));
    assert_eq!(h.device.count_calls(|c| *c == DeviceCall::ClearCandidate), 1);
    assert_ok!(DeviceVerifier::new(&h.device).assert_released());
}

/// Test that a device refusing the statements aborts before commit
#[tokio::test]
async fn test_create_device_rejects_statements() {
    let h = TestHarness::new(MockDevice::srx().with_send_error("syntax error"));

    let outcome = h
        .dispatcher(APP_SET)
        .create(&OpContext::new(), ApplicationSet::new("web", &["junos-http"]), None, None)
        .await;

    let err = outcome.diagnostics.errors().next().unwrap();
    assert_eq!(err.summary(), "Config Set Error");
    assert_eq!(err.to_string(), "config set: syntax error");
    assert!(h.device.commit_messages().is_empty());
    assert_ok!(DeviceVerifier::new(&h.device).assert_released());
}

/// Test diagnostics ordering when the commit fails
///
/// Scenario:
/// 1. Device returns two warnings and then rejects the commit
/// 2. Clearing and unlocking both fail
/// 3. Expect: both commit warnings, commit error, then both cleanup warnings
/// 4. The candidate is cleared exactly once
#[tokio::test]
async fn test_create_commit_failure_reports_everything() {
    let device = MockDevice::srx()
        .with_commit_warnings(["statement has no effect", "interface ge-0/0/9 not present"])
        .with_commit_error("missing mandatory statement")
        .with_cleanup_errors(&["clear refused"], &["unlock refused"]);
    let h = TestHarness::new(device);

    let outcome = h
        .dispatcher(APP_SET)
        .create(&OpContext::new(), ApplicationSet::new("web", &["junos-http"]), None, None)
        .await;

    assert!(matches!(outcome.state, StateChange::Keep));
    let reported: Vec<(Severity, String, String)> = outcome
        .diagnostics
        .iter()
        .map(|d| (d.severity(), d.summary().to_string(), d.detail()))
        .collect();
    assert_eq!(
        reported,
        vec![
            (
                Severity::Warning,
                "Config Commit Warning".to_string(),
                "statement has no effect".to_string()
            ),
            (
                Severity::Warning,
                "Config Commit Warning".to_string(),
                "interface ge-0/0/9 not present".to_string()
            ),
            (
                Severity::Error,
                "Config Commit Error".to_string(),
                "commit failed: missing mandatory statement".to_string()
            ),
            (
                Severity::Warning,
                "Config Clear/Unlock Warning".to_string(),
                "config clear: clear refused".to_string()
            ),
            (
                Severity::Warning,
                "Config Clear/Unlock Warning".to_string(),
                "config unlock: unlock refused".to_string()
            ),
        ]
    );
    assert_eq!(h.device.count_calls(|c| *c == DeviceCall::ClearCandidate), 1);
    assert_eq!(h.device.count_calls(|c| *c == DeviceCall::Unlock), 1);
    assert_eq!(h.device.count_calls(|c| *c == DeviceCall::Close), 1);
}

/// Test that commit warnings and cleanup errors do not fail a create
#[tokio::test]
async fn test_create_succeeds_with_warnings() {
    let device = MockDevice::srx()
        .with_commit_warnings(["statement has no effect"])
        .with_cleanup_errors(&[], &["unlock refused"]);
    let h = TestHarness::new(device);

    let outcome = h
        .dispatcher(APP_SET)
        .create(&OpContext::new(), ApplicationSet::new("web", &["junos-http"]), None, None)
        .await;

    assert!(outcome.is_ok());
    assert_eq!(outcome.diagnostics.warnings().count(), 2);
    assert_eq!(outcome.into_value().unwrap().id.as_deref(), Some("web"));
}

/// Test that a failed post-check is a verification error after the commit
#[tokio::test]
async fn test_create_post_check_failure() {
    let h = TestHarness::new(MockDevice::srx());
    let plan = ApplicationSet::new("web", &["junos-http"]);
    // Check a hierarchy the plan does not create.
    let post = ApplicationSet::new("mail", &[]).post_check();

    let outcome = h
        .dispatcher(APP_SET)
        .create(&OpContext::new(), plan, None, Some(&post))
        .await;

    assert_eq!(outcome.diagnostics.error_kind(), Some(ErrorKind::Verification));
    assert!(matches!(outcome.state, StateChange::Keep));
    assert_eq!(h.device.commit_messages().len(), 1);
    assert_ok!(DeviceVerifier::new(&h.device).assert_released());
}

/// Test the security platform pre-check
#[tokio::test]
async fn test_create_requires_security_platform() {
    let plan = TunnelPairPolicy::new("trust", "to-vpn", "vpn", "from-vpn");
    let pre = TunnelPairPolicy::pre_check();

    let h = TestHarness::new(MockDevice::mx());
    let outcome = h
        .dispatcher("junos_security_policy_tunnel_pair_policy")
        .create(&OpContext::new(), plan.clone(), Some(&pre), None)
        .await;
    let err = outcome.diagnostics.errors().next().unwrap();
    assert_eq!(err.summary(), "Pre Check Error");
    assert!(err.to_string().contains("mx480"));

    let h = TestHarness::new(MockDevice::srx());
    let outcome = h
        .dispatcher("junos_security_policy_tunnel_pair_policy")
        .create(&OpContext::new(), plan, Some(&pre), None)
        .await;
    assert!(outcome.is_ok());
    assert_eq!(
        outcome.into_value().unwrap().id.as_deref(),
        Some("trust_-_to-vpn_-_vpn_-_from-vpn")
    );
}

/// Test that lock contention is retried until the lock is free
#[tokio::test(start_paused = true)]
async fn test_create_waits_for_busy_lock() {
    let h = TestHarness::new(MockDevice::srx().with_busy_lock(2));
    let start = tokio::time::Instant::now();

    let outcome = h
        .dispatcher(APP_SET)
        .create(&OpContext::new(), ApplicationSet::new("web", &["junos-http"]), None, None)
        .await;

    assert!(outcome.is_ok());
    assert_eq!(h.device.count_calls(|c| *c == DeviceCall::TryLock), 3);
    assert!(start.elapsed() >= Duration::from_secs(20));
}

/// Test that a deadline aborts lock polling without clearing
#[tokio::test(start_paused = true)]
async fn test_create_lock_aborted_by_deadline() {
    let h = TestHarness::new(MockDevice::srx().with_busy_lock(usize::MAX));
    let ctx = OpContext::new().with_timeout(Duration::from_secs(25));

    let outcome = h
        .dispatcher(APP_SET)
        .create(&ctx, ApplicationSet::new("web", &["junos-http"]), None, None)
        .await;

    assert_eq!(outcome.diagnostics.error_kind(), Some(ErrorKind::LockAborted));
    assert_eq!(h.device.count_calls(|c| *c == DeviceCall::TryLock), 3);
    assert_eq!(h.device.count_calls(|c| *c == DeviceCall::ClearCandidate), 0);
    assert_eq!(h.device.count_calls(|c| *c == DeviceCall::Close), 1);
    assert_eq!(h.device.open_links(), 0);
}

/// Test that an unreachable device fails before any lock attempt
#[tokio::test]
async fn test_create_connection_failure() {
    let h = TestHarness::new(MockDevice::srx().with_connect_error("connection refused"));

    let outcome = h
        .dispatcher(APP_SET)
        .create(&OpContext::new(), ApplicationSet::new("web", &["junos-http"]), None, None)
        .await;

    let err = outcome.diagnostics.errors().next().unwrap();
    assert!(matches!(err, LifecycleError::Connection(_)));
    assert_eq!(err.summary(), "Start Session Error");
    assert_eq!(h.device.calls(), vec![DeviceCall::Connect]);
}

/// Test that a device without a hardware model is refused and closed
#[tokio::test]
async fn test_create_missing_model() {
    let h = TestHarness::new(MockDevice::new(""));

    let outcome = h
        .dispatcher(APP_SET)
        .create(&OpContext::new(), ApplicationSet::new("web", &["junos-http"]), None, None)
        .await;

    assert_eq!(outcome.diagnostics.error_kind(), Some(ErrorKind::Connection));
    assert_eq!(h.device.calls(), vec![DeviceCall::Connect, DeviceCall::Close]);
}

#[derive(Debug)]
struct Exploding;

#[async_trait]
impl Stageable for Exploding {
    async fn stage(&self, session: &mut ConfigSession) -> Result<(), StageFailure> {
        session
            .stage(&["set system host-name half-done".to_string()])
            .await?;
        panic!("stage hook exploded");
    }
}

impl FirstStage for Exploding {
    fn fill_identity(&mut self) {}
}

/// Test that a panicking hook still clears, unlocks and closes the session
/// before the panic propagates
#[tokio::test]
async fn test_create_panic_cleans_up_then_propagates() {
    let h = TestHarness::new(MockDevice::srx());
    let dispatcher = h.dispatcher("junos_system");

    let task = tokio::spawn(async move {
        dispatcher
            .create(&OpContext::new(), Exploding, None, None)
            .await
    });
    let err = task.await.unwrap_err();
    assert!(err.is_panic());

    let calls = h.device.calls();
    assert_eq!(
        &calls[calls.len() - 3..],
        &[DeviceCall::ClearCandidate, DeviceCall::Unlock, DeviceCall::Close]
    );
    assert!(h.device.commit_messages().is_empty());
    assert_ok!(DeviceVerifier::new(&h.device).assert_released());
}
