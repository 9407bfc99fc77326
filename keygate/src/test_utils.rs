//! Shared helpers for unit tests.
//!
//! The config returned here uses deliberately cheap argon2 parameters so
//! tests that hash or verify passwords stay fast; everything else matches the
//! production defaults.

use std::sync::Arc;

use base64::{Engine, engine::general_purpose::STANDARD};

use crate::{AppState, Config, build_router, directory::MemoryDirectory, directory::User};

/// A fully-validated config with a test signing secret and fast hashing.
pub fn create_test_config() -> Config {
    let mut config = Config {
        secret_key: Some("test-secret-key-for-sessions".to_string()),
        ..Default::default()
    };
    config.auth.password.argon2_memory_kib = 256;
    config.auth.password.argon2_iterations = 1;
    config.auth.session.cookie_secure = false;
    config
}

/// State seeded from the default config (one `tutorial` user).
pub async fn create_test_state() -> AppState {
    let config = create_test_config();
    let directory = MemoryDirectory::from_config(&config)
        .await
        .expect("test directory should build");
    AppState::builder()
        .config(config)
        .directory(Arc::new(directory) as Arc<dyn crate::directory::UserDirectory>)
        .build()
}

/// State over an explicit set of pre-built records.
pub async fn create_test_state_with_users(users: Vec<User>) -> AppState {
    AppState::builder()
        .config(create_test_config())
        .directory(Arc::new(MemoryDirectory::with_users(users)) as Arc<dyn crate::directory::UserDirectory>)
        .build()
}

/// A test server over the full router.
pub async fn create_test_server() -> axum_test::TestServer {
    let state = create_test_state().await;
    let router = build_router(state).expect("test router should build");
    axum_test::TestServer::new(router).expect("test server should start")
}

/// The complete `Authorization` header value for Basic credentials.
pub fn encode_basic(username: &str, password: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!("{username}:{password}")))
}
