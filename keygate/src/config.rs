//! Application configuration management.
//!
//! Configuration is loaded from a YAML file with environment variable overrides. The configuration
//! file path defaults to `config.yaml` but can be specified via `-f` flag or `KEYGATE_CONFIG`
//! environment variable.
//!
//! ## Loading Priority
//!
//! Configuration sources are merged in the following order (later sources override earlier ones):
//!
//! 1. **YAML config file** - Base configuration (default: `config.yaml`)
//! 2. **Environment variables** - Variables prefixed with `KEYGATE_` override YAML values
//!
//! For nested config values, use double underscores in environment variables. For example,
//! `KEYGATE_AUTH__SESSION__COOKIE_NAME=session` sets the `auth.session.cookie_name` field.
//!
//! ## Environment Variable Examples
//!
//! ```bash
//! # Override server port
//! KEYGATE_PORT=8080
//!
//! # Set the token signing secret (required)
//! KEYGATE_SECRET_KEY="change-me"
//!
//! # Override nested values
//! KEYGATE_AUTH__SESSION__TIMEOUT=30m
//! ```

use clap::Parser;
use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use serde::{Deserialize, Serialize};
use std::{collections::HashSet, time::Duration};

use crate::auth::strategy::Strategy;
use crate::errors::Error;

/// Simple CLI args - just for specifying config file
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to configuration file
    #[arg(short = 'f', long, env = "KEYGATE_CONFIG", default_value = "config.yaml")]
    pub config: String,

    /// Validate configuration and exit without starting the server.
    /// Useful for CI/CD pipelines to catch config errors before deployment.
    #[arg(long)]
    pub validate: bool,
}

/// Main application configuration.
///
/// This is the root configuration structure loaded from YAML and environment variables.
/// All fields have sensible defaults defined in the `Default` implementation.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// HTTP server host to bind to (e.g., "0.0.0.0" for all interfaces)
    pub host: String,
    /// HTTP server port to bind to
    pub port: u16,
    /// Secret key for session token signing (required)
    pub secret_key: Option<String>,
    /// Authentication configuration
    pub auth: AuthConfig,
    /// Users seeded into the in-memory directory at startup.
    /// Seed passwords are hashed once during directory construction.
    pub seed_users: Vec<SeedUser>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            secret_key: None,
            auth: AuthConfig::default(),
            seed_users: vec![SeedUser::default()],
        }
    }
}

/// Authentication configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct AuthConfig {
    /// Verification strategies enabled at startup. Each name must belong to
    /// the closed strategy set (`basic`, `bearer`, `cookie`, `apikey`);
    /// anything else fails config validation before the server starts.
    pub strategies: Vec<String>,
    /// Session token and cookie configuration
    pub session: SessionConfig,
    /// Password hashing rules
    pub password: PasswordConfig,
    /// Prefix stripped from the Authorization header for API key requests
    pub api_key_prefix: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            strategies: vec![
                "basic".to_string(),
                "bearer".to_string(),
                "cookie".to_string(),
                "apikey".to_string(),
            ],
            session: SessionConfig::default(),
            password: PasswordConfig::default(),
            api_key_prefix: "Api-Key ".to_string(),
        }
    }
}

/// Session token and cookie configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionConfig {
    /// Session token lifetime (also the cookie Max-Age)
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
    /// Cookie name for the session token
    pub cookie_name: String,
    /// Set Secure flag on cookies (HTTPS only)
    pub cookie_secure: bool,
    /// SameSite cookie attribute ("strict", "lax", or "none")
    pub cookie_same_site: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60 * 60), // 1 hour
            cookie_name: "jwt".to_string(),
            cookie_secure: true,
            cookie_same_site: "strict".to_string(),
        }
    }
}

/// Password hashing rules.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct PasswordConfig {
    /// Minimum password length
    pub min_length: usize,
    /// Maximum password length
    pub max_length: usize,
    /// Argon2 memory cost in KiB (default: 19456 KiB = 19 MB, secure for production)
    pub argon2_memory_kib: u32,
    /// Argon2 iterations (default: 2, secure for production)
    pub argon2_iterations: u32,
    /// Argon2 parallelism (default: 1)
    pub argon2_parallelism: u32,
}

impl Default for PasswordConfig {
    fn default() -> Self {
        Self {
            min_length: 8,
            max_length: 64,
            // Secure defaults for production (Argon2id RFC recommendations)
            argon2_memory_kib: 19456, // 19 MB
            argon2_iterations: 2,
            argon2_parallelism: 1,
        }
    }
}

/// A user seeded into the directory at startup.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SeedUser {
    pub id: i64,
    pub username: String,
    /// Plaintext seed password; hashed during directory construction and
    /// never stored in plain form afterwards.
    pub password: String,
    #[serde(default)]
    pub administrator: bool,
    #[serde(default)]
    pub api_key: Option<String>,
}

impl Default for SeedUser {
    fn default() -> Self {
        Self {
            id: 1,
            username: "tutorial".to_string(),
            password: "password123".to_string(),
            administrator: true,
            api_key: Some("10ba038e-48da-487b-96e8-8d3b99b6d18a".to_string()),
        }
    }
}

impl Config {
    #[allow(clippy::result_large_err)]
    pub fn load(args: &Args) -> Result<Self, figment::Error> {
        let config: Self = Self::figment(args).extract()?;
        config.validate().map_err(|e| figment::Error::from(e.to_string()))?;
        Ok(config)
    }

    pub fn figment(args: &Args) -> Figment {
        Figment::new()
            // Load base config file
            .merge(Yaml::file(&args.config))
            // Environment variables can still override specific values
            .merge(Env::prefixed("KEYGATE_").split("__"))
    }

    /// Validate the configuration for consistency and required fields.
    ///
    /// Strategy names are resolved here, eagerly: an unknown strategy is a
    /// startup failure, never a per-request condition.
    pub fn validate(&self) -> Result<(), Error> {
        if self.secret_key.is_none() {
            return Err(Error::Internal {
                operation: "Config validation: secret_key is not configured. \
                     Please set KEYGATE_SECRET_KEY environment variable or add secret_key to config file."
                    .to_string(),
            });
        }

        if self.auth.strategies.is_empty() {
            return Err(Error::Internal {
                operation: "Config validation: no authentication strategies are enabled".to_string(),
            });
        }

        // Resolves each name against the closed strategy set
        self.strategies()?;

        if self.auth.password.min_length > self.auth.password.max_length {
            return Err(Error::Internal {
                operation: format!(
                    "Config validation: Invalid password configuration: min_length ({}) cannot be greater than max_length ({})",
                    self.auth.password.min_length, self.auth.password.max_length
                ),
            });
        }

        if self.auth.password.min_length < 1 {
            return Err(Error::Internal {
                operation: "Config validation: Invalid password configuration: min_length must be at least 1".to_string(),
            });
        }

        // Validate session timeout is reasonable
        if self.auth.session.timeout.as_secs() < 60 {
            return Err(Error::Internal {
                operation: "Config validation: session timeout is too short (minimum 1 minute)".to_string(),
            });
        }

        if self.auth.session.timeout.as_secs() > 86400 * 30 {
            return Err(Error::Internal {
                operation: "Config validation: session timeout is too long (maximum 30 days)".to_string(),
            });
        }

        if self.auth.api_key_prefix.is_empty() {
            return Err(Error::Internal {
                operation: "Config validation: api_key_prefix cannot be empty".to_string(),
            });
        }

        // Seed users must honor the directory uniqueness invariant
        let mut ids = HashSet::new();
        let mut usernames = HashSet::new();
        for user in &self.seed_users {
            if !ids.insert(user.id) {
                return Err(Error::Internal {
                    operation: format!("Config validation: duplicate seed user id {}", user.id),
                });
            }
            if !usernames.insert(user.username.as_str()) {
                return Err(Error::Internal {
                    operation: format!("Config validation: duplicate seed username '{}'", user.username),
                });
            }
        }

        Ok(())
    }

    /// The enabled strategies, resolved from the configured names once at startup.
    pub fn strategies(&self) -> Result<Vec<Strategy>, Error> {
        self.auth.strategies.iter().map(|name| name.parse()).collect()
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    fn args_for(path: &str) -> Args {
        Args {
            config: path.to_string(),
            validate: false,
        }
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.port, 3000);
        assert_eq!(config.auth.session.cookie_name, "jwt");
        assert_eq!(config.auth.session.timeout, Duration::from_secs(3600));
        assert_eq!(config.auth.api_key_prefix, "Api-Key ");
        assert_eq!(config.seed_users.len(), 1);
        assert_eq!(config.seed_users[0].username, "tutorial");
    }

    #[test]
    fn test_load_yaml_with_env_override() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "test.yaml",
                r#"
                secret_key: "file-secret"
                port: 4000
                auth:
                  session:
                    timeout: 30m
                "#,
            )?;
            jail.set_env("KEYGATE_PORT", "5000");

            let config = Config::load(&args_for("test.yaml")).expect("config should load");
            assert_eq!(config.secret_key.as_deref(), Some("file-secret"));
            // Env var wins over the file
            assert_eq!(config.port, 5000);
            assert_eq!(config.auth.session.timeout, Duration::from_secs(30 * 60));
            Ok(())
        });
    }

    #[test]
    fn test_missing_secret_key_fails_validation() {
        let config = Config::default();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unknown_strategy_fails_validation() {
        let mut config = Config {
            secret_key: Some("secret".to_string()),
            ..Default::default()
        };
        config.auth.strategies.push("oauth".to_string());

        let err = config.validate().unwrap_err();
        assert!(matches!(err, Error::UnknownStrategy { ref name } if name == "oauth"));
    }

    #[test]
    fn test_duplicate_seed_username_fails_validation() {
        let mut config = Config {
            secret_key: Some("secret".to_string()),
            ..Default::default()
        };
        config.seed_users.push(SeedUser {
            id: 2,
            username: "tutorial".to_string(),
            password: "another".to_string(),
            administrator: false,
            api_key: None,
        });

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_session_timeout_bounds() {
        let mut config = Config {
            secret_key: Some("secret".to_string()),
            ..Default::default()
        };

        config.auth.session.timeout = Duration::from_secs(10);
        assert!(config.validate().is_err());

        config.auth.session.timeout = Duration::from_secs(86400 * 31);
        assert!(config.validate().is_err());

        config.auth.session.timeout = Duration::from_secs(3600);
        assert!(config.validate().is_ok());
    }
}
