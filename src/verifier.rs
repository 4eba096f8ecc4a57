/// The credential-verification decision procedure
use crate::clock::Clock;
use crate::error::AuthResult;
use crate::lockout::LockoutTracker;
use crate::otp;
use crate::password;
use crate::store::UserStore;
use std::fmt;
use std::sync::Arc;

/// Caller-visible authentication outcome. Deliberately two-state: every
/// rejection looks the same from the outside so callers cannot distinguish
/// "no such user", "wrong password", "pending approval" or "locked out" and
/// enumerate accounts. The internal reason is logged only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthDecision {
    Accept { username: String },
    Reject,
}

impl AuthDecision {
    pub fn is_accepted(&self) -> bool {
        matches!(self, AuthDecision::Accept { .. })
    }
}

/// Internal reject reason, for logging/audit only
enum RejectReason {
    NoSuchUser,
    LockedOut,
    Unauthorized,
    BadPassword,
    BadOtp,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RejectReason::NoSuchUser => "no such user",
            RejectReason::LockedOut => "locked out",
            RejectReason::Unauthorized => "not authorized",
            RejectReason::BadPassword => "wrong password",
            RejectReason::BadOtp => "wrong one-time code",
        };
        f.write_str(s)
    }
}

/// Canonical form of a username: trimmed and lowercased, consistent with how
/// records are stored
pub fn normalize_username(raw: &str) -> String {
    raw.trim().to_lowercase()
}

pub struct CredentialVerifier {
    store: Arc<dyn UserStore>,
    lockout: Arc<LockoutTracker>,
    clock: Arc<dyn Clock>,
    /// Verified against when the user does not exist, so the absent-user path
    /// costs about the same as a wrong-password path
    dummy_hash: String,
}

impl CredentialVerifier {
    pub fn new(
        store: Arc<dyn UserStore>,
        lockout: Arc<LockoutTracker>,
        clock: Arc<dyn Clock>,
    ) -> AuthResult<Self> {
        let dummy_hash = password::hash_password("gateward-dummy-credential")?;
        Ok(Self {
            store,
            lockout,
            clock,
            dummy_hash,
        })
    }

    /// Decide whether the presented credentials are valid.
    ///
    /// Side effects: records failed attempts (except for unknown usernames
    /// and already-locked-out ones) and clears the lockout entry on success.
    /// Never mutates the record store.
    pub async fn authenticate(
        &self,
        username: &str,
        password_input: &str,
        otp_code: Option<&str>,
    ) -> AuthResult<AuthDecision> {
        let username = normalize_username(username);

        let Some(user) = self.store.find_by_username(&username).await? else {
            // equalize timing with the wrong-password path
            let _ = password::verify_password(password_input, &self.dummy_hash);
            return Ok(self.reject(&username, RejectReason::NoSuchUser));
        };

        // The lockout gate runs before any password work so a blocked caller
        // cannot learn whether the password would have matched.
        if self.lockout.is_enabled() && self.lockout.is_blocked(&username) {
            return Ok(self.reject(&username, RejectReason::LockedOut));
        }

        // All checks are evaluated before deciding; a single failure rejects.
        let authorized = user.is_authorized;
        let password_ok = password::verify_password(password_input, &user.password_hash)?;
        let otp_ok = if user.has_2fa {
            match (&user.otp_secret, otp_code) {
                (Some(secret), Some(code)) => otp::verify_code_at(secret, code, self.clock.now())?,
                _ => false,
            }
        } else {
            true
        };

        if authorized && password_ok && otp_ok {
            self.lockout.clear_on_success(&username);
            tracing::info!("Login accepted for {}", username);
            return Ok(AuthDecision::Accept { username });
        }

        let reason = if !password_ok {
            RejectReason::BadPassword
        } else if !otp_ok {
            RejectReason::BadOtp
        } else {
            RejectReason::Unauthorized
        };
        self.lockout.record_failure(&username);
        Ok(self.reject(&username, reason))
    }

    fn reject(&self, username: &str, reason: RejectReason) -> AuthDecision {
        tracing::debug!("Login rejected for {}: {}", username, reason);
        AuthDecision::Reject
    }
}
