//! Gateward — a self-contained authentication-and-authorization engine for
//! multi-user login gateways.
//!
//! The engine decides whether a presented username/password/one-time-code is
//! valid, enforces brute-force lockout, enforces password-strength policy,
//! and manages a self-service account-approval workflow built on signed,
//! time-limited tokens.
//!
//! The surrounding host application brings the HTTP layer, the persistent
//! record store (via [`store::UserStore`]) and, when self-approval is used,
//! a mail transport (via [`mailer::MailTransport`]).

pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod lockout;
pub mod mailer;
pub mod otp;
pub mod password;
pub mod policy;
pub mod signup;
pub mod store;
pub mod token;
pub mod verifier;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::EngineConfig;
pub use engine::AuthEngine;
pub use error::{AuthError, AuthResult};
pub use lockout::LockoutTracker;
pub use mailer::{MailTransport, SmtpMailer};
pub use policy::PasswordPolicy;
pub use signup::{MailStatus, NewUserRequest, SignupOutcome, SignupWorkflow};
pub use store::{MemoryUserStore, UserRecord, UserStore};
pub use token::ApprovalTokenService;
pub use verifier::{AuthDecision, CredentialVerifier};
