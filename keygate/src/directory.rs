//! The user directory: identity records and lookup.
//!
//! The directory is a collaborator of the authentication core, injected into
//! [`AppState`](crate::AppState) at startup. Lookups are exact-match and
//! case-sensitive, and an unknown id/username/key is a normal `Ok(None)`,
//! never an error. `id` and `username` are unique within a directory.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::auth::password;
use crate::config::Config;
use crate::errors::{Error, Result};

/// An identity record.
///
/// The authentication core only ever reads these fields; mutation is the
/// directory's concern.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub administrator: bool,
    pub api_key: Option<String>,
    /// PHC-formatted argon2 hash. Users without one (e.g. federated
    /// identities) cannot authenticate with a password.
    pub password_hash: Option<String>,
}

/// Identity lookup operations consumed by the authentication core.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_by_id(&self, id: i64) -> Result<Option<User>>;
    async fn find_by_username(&self, username: &str) -> Result<Option<User>>;
    async fn find_by_api_key(&self, api_key: &str) -> Result<Option<User>>;
}

/// In-memory directory seeded from configuration at startup.
///
/// Seed passwords are hashed once during construction; the plaintext is
/// dropped afterwards. Read-only once built, so concurrent lookups need no
/// locking.
pub struct MemoryDirectory {
    users: Vec<User>,
}

impl MemoryDirectory {
    /// Build the directory from config seed entries, hashing seed passwords
    /// on blocking threads.
    pub async fn from_config(config: &Config) -> Result<Self> {
        let params = password::Argon2Params::from(&config.auth.password);

        let mut users = Vec::with_capacity(config.seed_users.len());
        for seed in &config.seed_users {
            let plaintext = seed.password.clone();
            let password_hash = tokio::task::spawn_blocking(move || password::hash_string_with_params(&plaintext, Some(params)))
                .await
                .map_err(|e| Error::Internal {
                    operation: format!("spawn password hashing task: {e}"),
                })??;

            users.push(User {
                id: seed.id,
                username: seed.username.clone(),
                administrator: seed.administrator,
                api_key: seed.api_key.clone(),
                password_hash: Some(password_hash),
            });
            tracing::debug!("Seeded directory user '{}'", seed.username);
        }

        Ok(Self { users })
    }

    /// Build a directory from pre-constructed records (used in tests).
    pub fn with_users(users: Vec<User>) -> Self {
        Self { users }
    }
}

#[async_trait]
impl UserDirectory for MemoryDirectory {
    async fn find_by_id(&self, id: i64) -> Result<Option<User>> {
        Ok(self.users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        Ok(self.users.iter().find(|u| u.username == username).cloned())
    }

    async fn find_by_api_key(&self, api_key: &str) -> Result<Option<User>> {
        // Scan every record and compare without early exit, so lookup time
        // does not depend on how close the candidate key is to a stored one.
        let mut found = None;
        for user in &self.users {
            if let Some(stored) = &user.api_key {
                if constant_time_eq(stored.as_bytes(), api_key.as_bytes()) {
                    found = Some(user.clone());
                }
            }
        }
        Ok(found)
    }
}

/// Constant-time byte comparison to prevent timing attacks.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}
