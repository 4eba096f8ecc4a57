/// Brute-force lockout tracker
///
/// Sliding single-window policy: after `allowed_failed_logins` failures every
/// further attempt is blocked until `seconds_before_next_try` seconds have
/// passed since the *last* failure, so continued failures keep pushing the
/// unblock time forward. State is process-local best-effort protection, never
/// persisted.
use crate::clock::Clock;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone)]
struct AttemptState {
    fail_count: u32,
    last_attempt_at: DateTime<Utc>,
}

pub struct LockoutTracker {
    /// Absent entry means no recorded failures. Critical sections are O(1)
    /// and never perform I/O, so one map-level lock is enough.
    attempts: Mutex<HashMap<String, AttemptState>>,
    allowed_failed_logins: u32,
    seconds_before_next_try: i64,
    clock: Arc<dyn Clock>,
}

impl LockoutTracker {
    pub fn new(allowed_failed_logins: u32, seconds_before_next_try: i64, clock: Arc<dyn Clock>) -> Self {
        Self {
            attempts: Mutex::new(HashMap::new()),
            allowed_failed_logins,
            seconds_before_next_try,
            clock,
        }
    }

    /// Lockout is disabled entirely when the threshold is zero
    pub fn is_enabled(&self) -> bool {
        self.allowed_failed_logins > 0
    }

    /// Increment the failure counter, creating the entry at count 1
    pub fn record_failure(&self, username: &str) {
        let now = self.clock.now();
        let mut attempts = self.attempts.lock().expect("lockout lock poisoned");
        attempts
            .entry(username.to_string())
            .and_modify(|state| {
                state.fail_count += 1;
                state.last_attempt_at = now;
            })
            .or_insert(AttemptState {
                fail_count: 1,
                last_attempt_at: now,
            });
    }

    /// Whether further attempts for this username are currently blocked.
    ///
    /// An elapsed window does NOT clear the entry: only an explicit success
    /// does, so a renewed failure after the window immediately re-blocks.
    pub fn is_blocked(&self, username: &str) -> bool {
        if !self.is_enabled() {
            return false;
        }
        let attempts = self.attempts.lock().expect("lockout lock poisoned");
        let Some(state) = attempts.get(username) else {
            return false;
        };
        if state.fail_count < self.allowed_failed_logins {
            return false;
        }
        let elapsed = (self.clock.now() - state.last_attempt_at).num_seconds();
        elapsed <= self.seconds_before_next_try
    }

    /// Remove the entry entirely after a successful login
    pub fn clear_on_success(&self, username: &str) {
        let mut attempts = self.attempts.lock().expect("lockout lock poisoned");
        attempts.remove(username);
    }
}
