//! End-to-end scenarios through the assembled engine
use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};
use gateward::{
    AuthDecision, AuthEngine, AuthError, AuthResult, EngineConfig, MailStatus, MailTransport,
    ManualClock, MemoryUserStore, NewUserRequest,
};
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct RecordingMailer {
    sent: Mutex<Vec<(String, String, String)>>,
}

impl RecordingMailer {
    fn sent(&self) -> Vec<(String, String, String)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl MailTransport for RecordingMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> AuthResult<()> {
        self.sent
            .lock()
            .unwrap()
            .push((to.to_string(), subject.to_string(), body.to_string()));
        Ok(())
    }
}

struct Harness {
    engine: AuthEngine,
    mailer: Arc<RecordingMailer>,
    clock: Arc<ManualClock>,
}

fn harness(config: EngineConfig) -> Harness {
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
    ));
    let mailer = Arc::new(RecordingMailer::default());
    let engine = AuthEngine::new(
        config,
        Arc::new(MemoryUserStore::new()),
        Some(mailer.clone() as Arc<dyn MailTransport>),
        clock.clone(),
    )
    .unwrap();
    Harness {
        engine,
        mailer,
        clock,
    }
}

fn lockout_config() -> EngineConfig {
    let mut config = EngineConfig::default();
    config.password.minimum_length = 8;
    config.password.check_common = true;
    config.lockout.allowed_failed_logins = 3;
    config.lockout.seconds_before_next_try = 600;
    config.signup.open_signup = true;
    config
}

fn self_approval_config() -> EngineConfig {
    let mut config = EngineConfig::default();
    config.password.minimum_length = 8;
    config.approval.secret_key = "a-long-enough-secret".to_string();
    config.approval.allow_self_approval_pattern = Some(r".*@example\.com$".to_string());
    config
}

fn token_from_body(body: &str) -> String {
    body.split("/confirm/")
        .nth(1)
        .expect("body carries an approval link")
        .split_whitespace()
        .next()
        .unwrap()
        .to_string()
}

#[tokio::test]
async fn signup_then_login_under_open_signup() {
    let h = harness(lockout_config());
    h.engine
        .signup
        .create_user(NewUserRequest::new("Alice", "Tr0ub4dor&3"))
        .await
        .unwrap();

    let decision = h
        .engine
        .verifier
        .authenticate("alice", "Tr0ub4dor&3", None)
        .await
        .unwrap();
    assert!(decision.is_accepted());
}

#[tokio::test]
async fn three_failures_then_success_after_the_window() {
    let h = harness(lockout_config());
    h.engine
        .signup
        .create_user(NewUserRequest::new("alice", "Tr0ub4dor&3"))
        .await
        .unwrap();

    for _ in 0..3 {
        let decision = h
            .engine
            .verifier
            .authenticate("alice", "wrong-password", None)
            .await
            .unwrap();
        assert_eq!(decision, AuthDecision::Reject);
    }

    // blocked even with the correct password
    let decision = h
        .engine
        .verifier
        .authenticate("alice", "Tr0ub4dor&3", None)
        .await
        .unwrap();
    assert_eq!(decision, AuthDecision::Reject);

    // 601 seconds after the last failure the window has elapsed
    h.clock.advance(Duration::seconds(601));
    let decision = h
        .engine
        .verifier
        .authenticate("alice", "Tr0ub4dor&3", None)
        .await
        .unwrap();
    assert!(decision.is_accepted());

    // the success cleared the count, so a fresh failure starts at 1
    h.engine
        .verifier
        .authenticate("alice", "wrong-password", None)
        .await
        .unwrap();
    assert!(!h.engine.lockout.is_blocked("alice"));
}

#[tokio::test]
async fn renewed_failure_within_the_window_keeps_blocking() {
    let h = harness(lockout_config());
    h.engine
        .signup
        .create_user(NewUserRequest::new("alice", "Tr0ub4dor&3"))
        .await
        .unwrap();

    for _ in 0..2 {
        h.engine
            .verifier
            .authenticate("alice", "wrong-password", None)
            .await
            .unwrap();
    }
    // third failure within the window reaches the threshold
    h.engine
        .verifier
        .authenticate("alice", "wrong-password", None)
        .await
        .unwrap();
    assert!(h.engine.lockout.is_blocked("alice"));
}

#[tokio::test]
async fn self_approval_signup_confirm_login() {
    let h = harness(self_approval_config());
    let outcome = h
        .engine
        .signup
        .create_user(NewUserRequest::new("alice", "Tr0ub4dor&3").with_email("alice@example.com"))
        .await
        .unwrap();
    assert!(!outcome.record.is_authorized);
    assert_eq!(outcome.approval_mail, MailStatus::Sent);

    // pending approval rejects exactly like a wrong password
    let pending = h
        .engine
        .verifier
        .authenticate("alice", "Tr0ub4dor&3", None)
        .await
        .unwrap();
    let wrong = h
        .engine
        .verifier
        .authenticate("alice", "wrong-password", None)
        .await
        .unwrap();
    assert_eq!(pending, wrong);

    let token = token_from_body(&h.mailer.sent()[0].2);
    assert_eq!(h.engine.signup.confirm(&token).await.unwrap(), "alice");

    let decision = h
        .engine
        .verifier
        .authenticate("alice", "Tr0ub4dor&3", None)
        .await
        .unwrap();
    assert!(decision.is_accepted());
}

#[tokio::test]
async fn approval_link_expires_after_fifteen_minutes() {
    let h = harness(self_approval_config());
    h.engine
        .signup
        .create_user(NewUserRequest::new("alice", "Tr0ub4dor&3").with_email("alice@example.com"))
        .await
        .unwrap();

    let token = token_from_body(&h.mailer.sent()[0].2);
    h.clock.advance(Duration::minutes(15));
    assert!(matches!(
        h.engine.signup.confirm(&token).await,
        Err(AuthError::ExpiredToken)
    ));
}

#[tokio::test]
async fn tampered_approval_link_is_rejected() {
    let h = harness(self_approval_config());
    h.engine
        .signup
        .create_user(NewUserRequest::new("alice", "Tr0ub4dor&3").with_email("alice@example.com"))
        .await
        .unwrap();

    let token = token_from_body(&h.mailer.sent()[0].2);
    let mut tampered = token.into_bytes();
    let last = tampered.len() - 1;
    tampered[last] = if tampered[last] == b'A' { b'B' } else { b'A' };
    let tampered = String::from_utf8(tampered).unwrap();

    assert!(matches!(
        h.engine.signup.confirm(&tampered).await,
        Err(AuthError::TamperedToken)
    ));
}

#[tokio::test]
async fn engine_refuses_forgeable_self_approval() {
    let mut config = self_approval_config();
    config.approval.secret_key = "short".to_string();
    let result = AuthEngine::new(
        config,
        Arc::new(MemoryUserStore::new()),
        None,
        Arc::new(ManualClock::new(Utc::now())),
    );
    assert!(matches!(result, Err(AuthError::SignerMisconfigured(_))));
}

#[tokio::test]
async fn password_policy_scenario() {
    let h = harness(lockout_config());

    let err = h
        .engine
        .signup
        .create_user(NewUserRequest::new("alice", "password"))
        .await
        .err()
        .unwrap();
    assert!(matches!(err, AuthError::WeakPassword));

    let err = h
        .engine
        .signup
        .create_user(NewUserRequest::new("alice", "short"))
        .await
        .err()
        .unwrap();
    assert!(matches!(err, AuthError::WeakPassword));

    assert!(h
        .engine
        .signup
        .create_user(NewUserRequest::new("alice", "Tr0ub4dor&3"))
        .await
        .is_ok());
}

#[tokio::test]
async fn concurrent_signups_surface_a_single_conflict() {
    let h = harness(lockout_config());
    let engine = Arc::new(h.engine);

    let a = {
        let engine = engine.clone();
        tokio::spawn(async move {
            engine
                .signup
                .create_user(NewUserRequest::new("alice", "Tr0ub4dor&3"))
                .await
        })
    };
    let b = {
        let engine = engine.clone();
        tokio::spawn(async move {
            engine
                .signup
                .create_user(NewUserRequest::new("alice", "Tr0ub4dor&3"))
                .await
        })
    };

    let results = [a.await.unwrap(), b.await.unwrap()];
    let ok = results.iter().filter(|r| r.is_ok()).count();
    let conflicts = results
        .iter()
        .filter(|r| matches!(r, Err(AuthError::Conflict(_))))
        .count();
    assert_eq!(ok + conflicts, 2);
    assert_eq!(ok, 1);
}
