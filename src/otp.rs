/// Second factor: RFC 6238 time-based one-time codes
use crate::error::{AuthError, AuthResult};
use chrono::{DateTime, Utc};
use totp_rs::{Algorithm, Secret, TOTP};

/// Time step in seconds
pub const OTP_STEP: u64 = 30;
/// Code length
pub const OTP_DIGITS: usize = 6;
/// Accepted drift, in steps, on either side of the current one
pub const OTP_SKEW: u8 = 1;

const ISSUER: &str = "gateward";

/// Generate a fresh base32-encoded secret for enrollment
pub fn generate_secret() -> String {
    Secret::generate_secret().to_encoded().to_string()
}

fn build(secret: &str, account: &str) -> AuthResult<TOTP> {
    let secret_bytes = Secret::Encoded(secret.to_string())
        .to_bytes()
        .map_err(|e| AuthError::Validation(format!("Invalid OTP secret: {}", e)))?;

    TOTP::new(
        Algorithm::SHA1,
        OTP_DIGITS,
        OTP_SKEW,
        OTP_STEP,
        secret_bytes,
        Some(ISSUER.to_string()),
        account.to_string(),
    )
    .map_err(|e| AuthError::Internal(format!("TOTP init failed: {}", e)))
}

/// Check a code against the secret at the given instant (±OTP_SKEW steps)
pub fn verify_code_at(secret: &str, code: &str, at: DateTime<Utc>) -> AuthResult<bool> {
    let totp = build(secret, "user")?;
    Ok(totp.check(code, at.timestamp().max(0) as u64))
}

/// Code valid at the given instant; used by enrollment flows and tests
pub fn code_at(secret: &str, at: DateTime<Utc>) -> AuthResult<String> {
    let totp = build(secret, "user")?;
    Ok(totp.generate(at.timestamp().max(0) as u64))
}

/// otpauth:// URI for manual enrollment in an authenticator app
pub fn provisioning_uri(secret: &str, account: &str) -> AuthResult<String> {
    let totp = build(secret, account)?;
    Ok(totp.get_url())
}
