//! The strategy framework and authentication orchestrator.
//!
//! A strategy couples a credential source with a verification method. The set
//! is closed: names from configuration are resolved into [`Strategy`] tags at
//! startup ([`Config::strategies`](crate::config::Config::strategies)), so the
//! per-request path dispatches on an enum, never on strings.
//!
//! Authentication is a two-state machine per request: `Pending` resolves to
//! either `Authenticated(user)` or `Rejected(reason)`, terminal either way.
//! There are no retries here - resubmission is the caller's concern - and no
//! side effects until a token is issued, so an abandoned attempt leaves
//! nothing to roll back.

use std::fmt;
use std::str::FromStr;

use axum::http::request::Parts;

use super::{extract, password, token, token::TokenVerifyError};
use crate::AppState;
use crate::directory::User;
use crate::errors::{Error, Result};

/// The closed set of verification strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    /// `Authorization: Basic` header, verified against the stored password hash
    Basic,
    /// `Authorization: Bearer` header holding a session token
    Bearer,
    /// Session token held in the configured cookie
    Cookie,
    /// API key in the `Authorization` header, prefix-stripped
    ApiKey,
}

impl FromStr for Strategy {
    type Err = Error;

    fn from_str(name: &str) -> Result<Self> {
        match name {
            "basic" => Ok(Strategy::Basic),
            "bearer" => Ok(Strategy::Bearer),
            "cookie" => Ok(Strategy::Cookie),
            "apikey" => Ok(Strategy::ApiKey),
            _ => Err(Error::UnknownStrategy { name: name.to_string() }),
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Strategy::Basic => "basic",
            Strategy::Bearer => "bearer",
            Strategy::Cookie => "cookie",
            Strategy::ApiKey => "apikey",
        };
        f.write_str(name)
    }
}

/// A credential extracted from a request.
///
/// Ephemeral: lives for one authentication attempt and is never persisted.
#[derive(Debug, Clone)]
pub enum Credential {
    UsernamePassword { username: String, password: String },
    BearerToken(String),
    ApiKey(String),
}

/// Why an authentication attempt was rejected.
///
/// These are normal outcomes, not errors. The orchestrator keeps them
/// distinct internally; user-facing surfaces collapse them into one generic
/// message so a caller cannot probe which usernames exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// No credential was present in the request (or it was malformed)
    MissingCredential,
    /// A credential was present but wrong: bad password, unknown username,
    /// unknown API key, or a bad token signature
    InvalidCredential,
    /// A structurally valid token past its expiry
    ExpiredToken,
}

impl RejectReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectReason::MissingCredential => "missing_credential",
            RejectReason::InvalidCredential => "invalid_credential",
            RejectReason::ExpiredToken => "expired_token",
        }
    }
}

/// The terminal outcome of one authentication attempt.
#[derive(Debug)]
pub enum AuthOutcome {
    Authenticated(User),
    Rejected(RejectReason),
}

/// Run extraction for exactly one strategy.
///
/// No other strategy's source is consulted: authenticating with `basic` never
/// reads the bearer header or the session cookie.
pub fn extract_credential(strategy: Strategy, parts: &Parts, state: &AppState) -> Option<Credential> {
    match strategy {
        Strategy::Basic => extract::basic_credentials(parts),
        Strategy::Bearer => extract::bearer_token(parts),
        Strategy::Cookie => extract::cookie_token(parts, &state.config.auth.session.cookie_name),
        Strategy::ApiKey => extract::api_key(parts, &state.config.auth.api_key_prefix),
    }
}

/// Authenticate a request with the given strategy: extraction, then
/// verification, then identity resolution.
///
/// Credential-outcome failures come back as `Ok(Rejected(..))`; only system
/// faults (malformed stored records, signing-key failures, directory errors)
/// surface as `Err`.
#[tracing::instrument(skip(parts, state))]
pub async fn authenticate(strategy: Strategy, parts: &Parts, state: &AppState) -> Result<AuthOutcome> {
    let Some(credential) = extract_credential(strategy, parts, state) else {
        tracing::trace!("No {strategy} credential present");
        return Ok(AuthOutcome::Rejected(RejectReason::MissingCredential));
    };

    match credential {
        Credential::UsernamePassword { username, password } => {
            let Some(user) = state.directory.find_by_username(&username).await? else {
                return Ok(AuthOutcome::Rejected(RejectReason::InvalidCredential));
            };
            let Some(hash) = user.password_hash.clone() else {
                // Identity exists but has no password credential
                return Ok(AuthOutcome::Rejected(RejectReason::InvalidCredential));
            };

            // Argon2 is CPU-bound; keep it off the async runtime.
            // MalformedStoredRecord propagates as a system fault here.
            let matches = tokio::task::spawn_blocking(move || password::verify_string(&password, &hash))
                .await
                .map_err(|e| Error::Internal {
                    operation: format!("spawn password verification task: {e}"),
                })??;

            if matches {
                tracing::debug!("Password authentication succeeded for user {}", user.id);
                Ok(AuthOutcome::Authenticated(user))
            } else {
                Ok(AuthOutcome::Rejected(RejectReason::InvalidCredential))
            }
        }

        Credential::BearerToken(raw) => {
            let claims = match token::verify_session_token(&raw, &state.config) {
                Ok(claims) => claims,
                Err(TokenVerifyError::Expired) => return Ok(AuthOutcome::Rejected(RejectReason::ExpiredToken)),
                Err(TokenVerifyError::Invalid) => return Ok(AuthOutcome::Rejected(RejectReason::InvalidCredential)),
                Err(TokenVerifyError::System(e)) => return Err(e),
            };

            // Claims carry only the id/administrator projection; the identity
            // must still exist in the directory.
            let Some(user) = state.directory.find_by_id(claims.id).await? else {
                return Ok(AuthOutcome::Rejected(RejectReason::InvalidCredential));
            };
            tracing::debug!("Token authentication succeeded for user {}", user.id);
            Ok(AuthOutcome::Authenticated(user))
        }

        Credential::ApiKey(key) => {
            let Some(user) = state.directory.find_by_api_key(&key).await? else {
                return Ok(AuthOutcome::Rejected(RejectReason::InvalidCredential));
            };
            tracing::debug!("API key authentication succeeded for user {}", user.id);
            Ok(AuthOutcome::Authenticated(user))
        }
    }
}
