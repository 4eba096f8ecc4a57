/// Unified error types for the Gateward engine
use thiserror::Error;

/// Main error type for the engine
#[derive(Error, Debug)]
pub enum AuthError {
    /// No record exists for the username. Never shown to an authenticating
    /// caller; folded into a plain rejection at the boundary.
    #[error("No such user: {0}")]
    NoSuchUser(String),

    /// Wrong password, wrong one-time code, or unauthorized account
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Too many failed attempts inside the lockout window
    #[error("Account is locked out")]
    LockedOut,

    /// Account exists but is not authorized to log in
    #[error("Account is not authorized")]
    Unauthorized,

    /// Duplicate username, or an operation refused on a live account
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Password rejected by the strength policy
    #[error("Password does not meet the strength policy")]
    WeakPassword,

    /// Username contains disallowed characters or is empty
    #[error("Invalid username: {0}")]
    InvalidUsername(String),

    /// Signup is disabled by configuration
    #[error("Signup is disabled")]
    SignupDisabled,

    /// Token signature did not verify, or the token could not be decoded
    #[error("Token is tampered or invalid")]
    TamperedToken,

    /// Token signature verified but the validity window has passed
    #[error("Token has expired")]
    ExpiredToken,

    /// Outbound mail could not be delivered
    #[error("Mail delivery failed: {0}")]
    MailDelivery(String),

    /// Signing secret too short; fatal at initialization
    #[error("Signer misconfigured: {0}")]
    SignerMisconfigured(String),

    /// Record store errors
    #[error("Store error: {0}")]
    Store(String),

    /// Validation errors (config, request fields)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// Whether this error may be shown verbatim to the end user. Authentication
    /// rejections are deliberately excluded: they all collapse into the same
    /// caller-visible decision to avoid username enumeration.
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            AuthError::Conflict(_)
                | AuthError::WeakPassword
                | AuthError::InvalidUsername(_)
                | AuthError::SignupDisabled
                | AuthError::TamperedToken
                | AuthError::ExpiredToken
        )
    }
}

/// Result type alias for engine operations
pub type AuthResult<T> = Result<T, AuthError>;
