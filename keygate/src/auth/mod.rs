//! Authentication system.
//!
//! This module implements the credential-verification core:
//! - Password hashing and verification using Argon2
//! - Signed, expiring session tokens (HS256 JWTs)
//! - Interchangeable verification strategies over independent credential
//!   sources (Basic header, bearer token, session cookie, API key header)
//! - The orchestrator that runs extraction, verification, and identity
//!   resolution for one strategy per request
//!
//! # Authentication Methods
//!
//! | Strategy | Source | Verification |
//! |----------|--------|--------------|
//! | `basic` | `Authorization: Basic base64(user:pass)` | directory lookup + password hash |
//! | `bearer` | `Authorization: Bearer <token>` | token signature + expiry |
//! | `cookie` | session cookie (default name `jwt`) | token signature + expiry |
//! | `apikey` | `Authorization: Api-Key <key>` | directory lookup, constant-time |
//!
//! Strategies are read-only: only the interactive login path
//! ([`api::handlers::auth::login`](crate::api::handlers::auth::login)) issues
//! a token and sets the session cookie on top of password verification.
//!
//! # Usage in Handlers
//!
//! ```ignore
//! use keygate::auth::current_user::CookieUser;
//!
//! async fn protected_handler(CookieUser(user): CookieUser) -> String {
//!     format!("Hello, {}!", user.username)
//! }
//! ```

pub mod current_user;
pub mod extract;
pub mod password;
pub mod strategy;
pub mod token;
