/// Self-approval tokens: a keyed HS256 signature over a standard claims
/// payload, compact and safe to embed as a single URL path segment.
///
/// The service is stateless: it does not track consumption, so replay before
/// expiry re-verifies successfully and confirmation stays idempotent.
use crate::clock::Clock;
use crate::error::{AuthError, AuthResult};
use chrono::Duration;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Shorter secrets undermine the unforgeability guarantee the whole approval
/// workflow depends on
pub const MIN_SECRET_LENGTH: usize = 8;

#[derive(Debug, Serialize, Deserialize)]
struct ApprovalClaims {
    /// Username being approved
    sub: String,
    /// Issued at, seconds since epoch
    iat: i64,
    /// Expiry, seconds since epoch
    exp: i64,
}

pub struct ApprovalTokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    clock: Arc<dyn Clock>,
}

impl ApprovalTokenService {
    /// Refuses to initialize with a secret shorter than `MIN_SECRET_LENGTH`
    pub fn new(secret: &str, clock: Arc<dyn Clock>) -> AuthResult<Self> {
        if secret.len() < MIN_SECRET_LENGTH {
            return Err(AuthError::SignerMisconfigured(format!(
                "Signing secret must be at least {} characters",
                MIN_SECRET_LENGTH
            )));
        }
        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            clock,
        })
    }

    /// Sign `{username, now + valid_for}` into an opaque token string
    pub fn generate(&self, username: &str, valid_for: Duration) -> AuthResult<String> {
        let now = self.clock.now();
        let claims = ApprovalClaims {
            sub: username.to_string(),
            iat: now.timestamp(),
            exp: (now + valid_for).timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AuthError::Internal(format!("Token signing failed: {}", e)))
    }

    /// Verify signature and expiry, returning the embedded username.
    ///
    /// Signature failures and undecodable tokens are `TamperedToken`; a valid
    /// signature past its window is `ExpiredToken`. Expiry is checked against
    /// the injected clock, so the library's own exp validation is disabled.
    pub fn verify(&self, token: &str) -> AuthResult<String> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;

        let data = decode::<ApprovalClaims>(token, &self.decoding_key, &validation)
            .map_err(|e| {
                tracing::debug!("Approval token rejected: {}", e);
                AuthError::TamperedToken
            })?;

        if self.clock.now().timestamp() >= data.claims.exp {
            return Err(AuthError::ExpiredToken);
        }

        Ok(data.claims.sub)
    }
}
