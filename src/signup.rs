/// Account creation and the self-service approval workflow
use crate::clock::Clock;
use crate::config::{ApprovalConfig, SignupConfig};
use crate::error::{AuthError, AuthResult};
use crate::mailer::MailTransport;
use crate::otp;
use crate::password;
use crate::policy::PasswordPolicy;
use crate::store::{UserRecord, UserStore};
use crate::token::ApprovalTokenService;
use crate::verifier::normalize_username;
use chrono::Duration;
use regex::Regex;
use std::collections::HashSet;
use std::sync::Arc;
use validator::Validate;

/// Fully-enumerated construction request; no dynamic attribute bags
#[derive(Debug, Clone, Validate)]
pub struct NewUserRequest {
    pub username: String,
    pub password: String,
    #[validate(email)]
    pub email: Option<String>,
    /// Enroll a TOTP second factor at creation time
    pub enable_2fa: bool,
}

impl NewUserRequest {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            email: None,
            enable_2fa: false,
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_2fa(mut self) -> Self {
        self.enable_2fa = true;
        self
    }
}

/// What happened to the approval mail for this signup. Delivery is
/// best-effort: a failure never rolls back the created pending account, it is
/// reported here so the caller can retry or alert an administrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MailStatus {
    /// Self-approval not configured or the email did not match the pattern
    NotRequested,
    Sent,
    Failed(String),
}

/// A created record plus the mail outcome
#[derive(Debug, Clone)]
pub struct SignupOutcome {
    pub record: UserRecord,
    pub approval_mail: MailStatus,
}

pub struct SignupWorkflow {
    store: Arc<dyn UserStore>,
    policy: PasswordPolicy,
    tokens: Option<Arc<ApprovalTokenService>>,
    mailer: Option<Arc<dyn MailTransport>>,
    clock: Arc<dyn Clock>,
    config: SignupConfig,
    approval: ApprovalConfig,
    self_approval_pattern: Option<Regex>,
    pre_authorized: HashSet<String>,
}

impl SignupWorkflow {
    pub fn new(
        store: Arc<dyn UserStore>,
        policy: PasswordPolicy,
        tokens: Option<Arc<ApprovalTokenService>>,
        mailer: Option<Arc<dyn MailTransport>>,
        clock: Arc<dyn Clock>,
        config: SignupConfig,
        approval: ApprovalConfig,
    ) -> AuthResult<Self> {
        let self_approval_pattern = approval
            .allow_self_approval_pattern
            .as_deref()
            .map(Regex::new)
            .transpose()
            .map_err(|e| AuthError::Validation(format!("Invalid self-approval pattern: {}", e)))?;

        let pre_authorized = config
            .pre_authorized
            .iter()
            .map(|name| normalize_username(name))
            .collect();

        Ok(Self {
            store,
            policy,
            tokens,
            mailer,
            clock,
            config,
            approval,
            self_approval_pattern,
            pre_authorized,
        })
    }

    /// Create a new pending-or-authorized account.
    ///
    /// Validation order: signup enabled, username shape, conflict, password
    /// policy. The approval mail (when the email matches the self-approval
    /// pattern) is attempted before the record is persisted; its outcome is
    /// reported separately in `SignupOutcome::approval_mail`.
    pub async fn create_user(&self, request: NewUserRequest) -> AuthResult<SignupOutcome> {
        if !self.config.enable_signup {
            return Err(AuthError::SignupDisabled);
        }

        let username = normalize_username(&request.username);
        validate_username(&username)?;

        request
            .validate()
            .map_err(|e| AuthError::Validation(e.to_string()))?;

        if self.store.find_by_username(&username).await?.is_some() {
            return Err(AuthError::Conflict(format!(
                "Username {} already taken",
                username
            )));
        }

        if !self.policy.is_acceptable(&request.password) {
            return Err(AuthError::WeakPassword);
        }

        let is_authorized = self.config.open_signup || self.pre_authorized.contains(&username);

        let (has_2fa, otp_secret) = if request.enable_2fa && self.config.allow_2fa {
            (true, Some(otp::generate_secret()))
        } else {
            (false, None)
        };

        let record = UserRecord {
            username: username.clone(),
            password_hash: password::hash_password(&request.password)?,
            email: request.email.clone(),
            is_authorized,
            has_2fa,
            otp_secret,
            created_at: self.clock.now(),
        };

        let approval_mail = if !is_authorized {
            self.maybe_send_approval_mail(&record).await?
        } else {
            MailStatus::NotRequested
        };

        // a racing duplicate signup surfaces here as Conflict
        self.store.insert(record.clone()).await?;
        tracing::info!(
            "Created account {} (authorized: {})",
            record.username,
            record.is_authorized
        );

        Ok(SignupOutcome {
            record,
            approval_mail,
        })
    }

    async fn maybe_send_approval_mail(&self, record: &UserRecord) -> AuthResult<MailStatus> {
        let (Some(pattern), Some(email)) = (&self.self_approval_pattern, &record.email) else {
            return Ok(MailStatus::NotRequested);
        };
        if !pattern.is_match(email) {
            return Ok(MailStatus::NotRequested);
        }

        let tokens = self.tokens.as_ref().ok_or_else(|| {
            AuthError::SignerMisconfigured(
                "Self-approval is configured but no token signer is available".to_string(),
            )
        })?;

        let token = tokens.generate(
            &record.username,
            Duration::minutes(self.approval.token_validity_minutes),
        )?;
        let approval_url = format!("/confirm/{}", token);
        let body = self.approval.email.body.replace("{approval_url}", &approval_url);

        let Some(mailer) = &self.mailer else {
            tracing::warn!(
                "Mail transport not configured, cannot deliver approval link for {}",
                record.username
            );
            return Ok(MailStatus::Failed("Mail transport not configured".to_string()));
        };

        match mailer
            .send(email, &self.approval.email.subject, &body)
            .await
        {
            Ok(()) => Ok(MailStatus::Sent),
            Err(e) => {
                tracing::warn!(
                    "Approval mail for {} failed, account is still created: {}",
                    record.username,
                    e
                );
                Ok(MailStatus::Failed(e.to_string()))
            }
        }
    }

    /// Activate the pending account named in a signed approval token.
    ///
    /// Idempotent: confirming an already-authorized account is a harmless
    /// no-op that still reports the username.
    pub async fn confirm(&self, token: &str) -> AuthResult<String> {
        let tokens = self.tokens.as_ref().ok_or_else(|| {
            AuthError::SignerMisconfigured(
                "Self-approval is not configured on this instance".to_string(),
            )
        })?;

        let username = tokens.verify(token)?;
        let mut user = self
            .store
            .find_by_username(&username)
            .await?
            .ok_or_else(|| AuthError::NoSuchUser(username.clone()))?;

        if user.is_authorized {
            tracing::info!("{} was already authorized", username);
            return Ok(username);
        }

        user.is_authorized = true;
        self.store.update(user).await?;
        tracing::info!("{} has been authorized", username);
        Ok(username)
    }

    /// Set the authorization flag directly (admin action)
    pub async fn set_authorization(&self, username: &str, authorized: bool) -> AuthResult<UserRecord> {
        let username = normalize_username(username);
        let mut user = self
            .store
            .find_by_username(&username)
            .await?
            .ok_or_else(|| AuthError::NoSuchUser(username.clone()))?;
        user.is_authorized = authorized;
        self.store.update(user.clone()).await?;
        Ok(user)
    }

    /// Flip the authorization flag (admin action)
    pub async fn toggle_authorization(&self, username: &str) -> AuthResult<UserRecord> {
        let username = normalize_username(username);
        let user = self
            .store
            .find_by_username(&username)
            .await?
            .ok_or_else(|| AuthError::NoSuchUser(username.clone()))?;
        self.set_authorization(&username, !user.is_authorized).await
    }

    /// Re-hash and persist a new password.
    ///
    /// The strength policy is deliberately NOT re-run here; only signup
    /// enforces it.
    pub async fn change_password(&self, username: &str, new_password: &str) -> AuthResult<()> {
        let username = normalize_username(username);
        let mut user = self
            .store
            .find_by_username(&username)
            .await?
            .ok_or_else(|| AuthError::NoSuchUser(username.clone()))?;
        user.password_hash = password::hash_password(new_password)?;
        self.store.update(user).await?;
        tracing::info!("Password changed for {}", username);
        Ok(())
    }

    /// Remove an account. Only permitted while it is not authorized, so an
    /// active account is never silently discarded.
    pub async fn delete_user(&self, username: &str) -> AuthResult<()> {
        let username = normalize_username(username);
        let user = self
            .store
            .find_by_username(&username)
            .await?
            .ok_or_else(|| AuthError::NoSuchUser(username.clone()))?;
        if user.is_authorized {
            return Err(AuthError::Conflict(format!(
                "{} is authorized and cannot be discarded",
                username
            )));
        }
        self.store.delete(&username).await?;
        tracing::info!("Deleted pending account {}", username);
        Ok(())
    }

    /// Administrative listing pass-through
    pub async fn list_users(&self) -> AuthResult<Vec<UserRecord>> {
        self.store.list_all().await
    }
}

/// Usernames may not be empty or contain commas or spaces
fn validate_username(username: &str) -> AuthResult<()> {
    if username.is_empty() {
        return Err(AuthError::InvalidUsername("empty username".to_string()));
    }
    if username.contains(',') || username.contains(' ') {
        return Err(AuthError::InvalidUsername(format!(
            "{} contains disallowed characters",
            username
        )));
    }
    Ok(())
}
