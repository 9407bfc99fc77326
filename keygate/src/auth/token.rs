//! Session token issuance and verification.
//!
//! Tokens are HS256 JWTs: three dot-separated base64url segments (header,
//! claims, signature), where the signature is an HMAC over `header.payload`
//! with the configured secret. Tampering with the claims or the timestamps
//! invalidates the signature.
//!
//! Expiry is an exact `now > exp` comparison with zero leeway. Clock skew
//! between issuer and verifier is not tolerated; this is a known limitation,
//! not a bug.

use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::directory::User;
use crate::errors::Error;

/// The identity claims embedded in a session token.
///
/// This is the full trusted identity projection: only `id` and
/// `administrator` are safe to trust from a verified token. Anything richer
/// (API key, profile data) must be re-fetched from the directory on each use.
/// Embedded fields go stale until the holder re-authenticates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Directory id of the subject
    pub id: i64,
    /// Admin flag at issuance time
    pub administrator: bool,
    /// Issued at (unix seconds)
    pub iat: i64,
    /// Expiration time (unix seconds)
    pub exp: i64,
}

impl SessionClaims {
    /// Create new session claims for a user, expiring after the configured
    /// session timeout.
    pub fn new(user: &User, config: &Config) -> Self {
        let now = Utc::now();
        let exp = now + config.auth.session.timeout;

        Self {
            id: user.id,
            administrator: user.administrator,
            iat: now.timestamp(),
            exp: exp.timestamp(),
        }
    }
}

/// Why a token failed verification.
///
/// `Expired` and `Invalid` are normal per-request outcomes; `System` wraps
/// key/crypto failures that must surface as 500s.
#[derive(Debug, thiserror::Error)]
pub enum TokenVerifyError {
    #[error("token expired")]
    Expired,
    #[error("invalid token")]
    Invalid,
    #[error(transparent)]
    System(#[from] Error),
}

fn secret_key(config: &Config) -> Result<&str, Error> {
    config.secret_key.as_deref().ok_or_else(|| Error::Internal {
        operation: "session tokens: secret_key is required".to_string(),
    })
}

/// Issue a signed session token for a user.
///
/// Construction is atomic: either a fully signed token is returned, or
/// nothing is issued. No server-side record of the token is kept.
pub fn issue_session_token(user: &User, config: &Config) -> Result<String, Error> {
    let claims = SessionClaims::new(user, config);
    let key = EncodingKey::from_secret(secret_key(config)?.as_bytes());

    encode(&Header::default(), &claims, &key).map_err(|e| Error::Internal {
        operation: format!("sign session token: {e}"),
    })
}

/// Verify a session token and return its claims.
///
/// Distinguishes an expired token from a tampered/malformed one, and both
/// from system-level key failures.
pub fn verify_session_token(token: &str, config: &Config) -> Result<SessionClaims, TokenVerifyError> {
    let key = DecodingKey::from_secret(secret_key(config)?.as_bytes());

    // Exact expiry comparison; the jsonwebtoken default allows 60s of leeway
    let mut validation = Validation::default();
    validation.leeway = 0;

    let token_data = decode::<SessionClaims>(token, &key, &validation).map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenVerifyError::Expired,

        // Client errors - malformed tokens, bad signatures, invalid claims
        jsonwebtoken::errors::ErrorKind::InvalidToken
        | jsonwebtoken::errors::ErrorKind::InvalidSignature
        | jsonwebtoken::errors::ErrorKind::MissingRequiredClaim(_)
        | jsonwebtoken::errors::ErrorKind::InvalidIssuer
        | jsonwebtoken::errors::ErrorKind::InvalidAudience
        | jsonwebtoken::errors::ErrorKind::InvalidSubject
        | jsonwebtoken::errors::ErrorKind::ImmatureSignature
        | jsonwebtoken::errors::ErrorKind::Base64(_)
        | jsonwebtoken::errors::ErrorKind::Json(_)
        | jsonwebtoken::errors::ErrorKind::Utf8(_)
        | jsonwebtoken::errors::ErrorKind::InvalidAlgorithm => TokenVerifyError::Invalid,

        // Server errors - key issues, internal failures
        _ => TokenVerifyError::System(Error::Internal {
            operation: format!("verify session token: {e}"),
        }),
    })?;

    Ok(token_data.claims)
}
