/// Engine facade: wires configuration and collaborators into the components
use crate::clock::{Clock, SystemClock};
use crate::config::EngineConfig;
use crate::error::AuthResult;
use crate::lockout::LockoutTracker;
use crate::mailer::MailTransport;
use crate::policy::PasswordPolicy;
use crate::signup::SignupWorkflow;
use crate::store::UserStore;
use crate::token::ApprovalTokenService;
use crate::verifier::CredentialVerifier;
use std::sync::Arc;

/// The assembled authentication engine.
///
/// The host application supplies the record store and (optionally) a mail
/// transport; everything else is built from `EngineConfig`. Construction is
/// where the self-approval invariants are enforced: a too-short signing
/// secret is fatal, and configuring self-approval forces email collection at
/// signup.
pub struct AuthEngine {
    pub verifier: CredentialVerifier,
    pub signup: SignupWorkflow,
    pub lockout: Arc<LockoutTracker>,
    pub tokens: Option<Arc<ApprovalTokenService>>,
}

impl AuthEngine {
    pub fn new(
        mut config: EngineConfig,
        store: Arc<dyn UserStore>,
        mailer: Option<Arc<dyn MailTransport>>,
        clock: Arc<dyn Clock>,
    ) -> AuthResult<Self> {
        config.validate()?;

        if config.self_approval_enabled() && !config.signup.ask_email_on_signup {
            tracing::debug!("Self-approval is configured; forcing ask_email_on_signup");
            config.signup.ask_email_on_signup = true;
        }

        // The token signer exists whenever a usable secret is configured, so
        // previously issued confirmation links keep working even if the
        // pattern is later removed. Self-approval itself additionally
        // requires the pattern (validated above).
        let tokens = if config.approval.secret_key.len() >= crate::token::MIN_SECRET_LENGTH {
            Some(Arc::new(ApprovalTokenService::new(
                &config.approval.secret_key,
                clock.clone(),
            )?))
        } else {
            None
        };

        let lockout = Arc::new(LockoutTracker::new(
            config.lockout.allowed_failed_logins,
            config.lockout.seconds_before_next_try,
            clock.clone(),
        ));

        let policy = PasswordPolicy::new(
            config.password.minimum_length,
            config.password.check_common,
        );

        let verifier = CredentialVerifier::new(store.clone(), lockout.clone(), clock.clone())?;

        let signup = SignupWorkflow::new(
            store,
            policy,
            tokens.clone(),
            mailer,
            clock,
            config.signup,
            config.approval,
        )?;

        Ok(Self {
            verifier,
            signup,
            lockout,
            tokens,
        })
    }

    /// Convenience constructor using the wall clock
    pub fn with_system_clock(
        config: EngineConfig,
        store: Arc<dyn UserStore>,
        mailer: Option<Arc<dyn MailTransport>>,
    ) -> AuthResult<Self> {
        Self::new(config, store, mailer, Arc::new(SystemClock))
    }
}
