//! # keygate: an authentication gateway
//!
//! `keygate` verifies a caller's identity through one of several
//! interchangeable credential-verification strategies and issues
//! time-bounded, tamper-evident session tokens that downstream handlers
//! trust without re-verifying credentials on every call.
//!
//! ## Architecture
//!
//! The application is built on [Axum](https://github.com/tokio-rs/axum) for
//! the HTTP layer. Identity records live in a [`directory`] - an injected
//! collaborator behind the [`directory::UserDirectory`] trait, seeded from
//! configuration at startup in the bundled in-memory implementation.
//!
//! ### Request Flow
//!
//! A protected route names one strategy through its extractor type
//! ([`auth::current_user`]). The orchestrator ([`auth::strategy`]) runs that
//! strategy's credential extraction, verifies the credential (password hash,
//! token signature and expiry, or API key lookup), and resolves the identity
//! against the directory. The handler receives an authenticated
//! [`directory::User`] or the request ends with a 401.
//!
//! The login endpoint (`POST /auth`) is the one write path: successful
//! password verification issues a signed session token
//! ([`auth::token`]) and sets it as the session cookie. Failed logins
//! deliberately answer 200 with a fixed message so the response leaks
//! nothing about which usernames exist.
//!
//! All state is read-only after startup - configuration, the resolved
//! strategy set, and the directory are shared behind `Arc` with no locks -
//! so authentication attempts run concurrently without coordination.
//!
//! ## Quick Start
//!
//! ```no_run
//! use clap::Parser;
//! use keygate::{Application, Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     // Parse CLI arguments and load configuration
//!     let args = keygate::config::Args::parse();
//!     let config = Config::load(&args)?;
//!
//!     // Initialize structured logging
//!     keygate::telemetry::init_telemetry()?;
//!
//!     // Create and start the application
//!     let app = Application::new(config).await?;
//!
//!     // Run with graceful shutdown on Ctrl+C
//!     app.serve(async {
//!         tokio::signal::ctrl_c().await.expect("Failed to listen for Ctrl+C");
//!     })
//!     .await?;
//!
//!     Ok(())
//! }
//! ```

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use bon::Builder;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

pub mod api;
pub mod auth;
pub mod config;
pub mod directory;
pub mod errors;
pub mod telemetry;

#[cfg(test)]
pub mod test_utils;

pub use config::Config;
pub use errors::{Error, Result};

use auth::strategy::Strategy;
use directory::UserDirectory;

/// Shared application state, constructed once at startup.
///
/// The directory is injected rather than reached through a process-wide
/// singleton, so tests and alternative deployments can supply their own.
#[derive(Clone, Builder)]
pub struct AppState {
    pub config: Config,
    pub directory: Arc<dyn UserDirectory>,
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "keygate",
        description = "Authentication gateway: strategy-based credential verification and session token issuance"
    ),
    paths(
        api::handlers::auth::login,
        api::handlers::session::test,
        api::handlers::session::post_test,
        api::handlers::session::auth_test,
        api::handlers::session::key_test,
        api::handlers::session::user,
        api::handlers::session::me,
    ),
    components(schemas(
        api::models::auth::LoginRequest,
        api::models::auth::LoginBody,
        api::models::auth::ApiMessage,
        api::models::auth::AuthTestResponse,
        api::models::auth::KeyTestResponse,
        api::models::auth::IdentityResponse,
        api::handlers::session::PostTestRequest,
    ))
)]
struct ApiDoc;

/// Build the application router.
///
/// Routes for a strategy are only mounted when that strategy is enabled in
/// configuration; the strategy set itself was validated at startup, so name
/// resolution cannot fail per-request.
pub fn build_router(state: AppState) -> Result<Router> {
    let strategies = state.config.strategies()?;

    let mut router = Router::new()
        .route("/healthz", get(|| async { "OK" }))
        .route("/auth", post(api::handlers::auth::login))
        .route("/api/test", get(api::handlers::session::test))
        .route("/api/postTest", post(api::handlers::session::post_test));

    if strategies.contains(&Strategy::Basic) {
        router = router.route("/api/authTest", get(api::handlers::session::auth_test));
    }
    if strategies.contains(&Strategy::ApiKey) {
        router = router.route("/api/keyTest", get(api::handlers::session::key_test));
    }
    if strategies.contains(&Strategy::Cookie) {
        router = router.route("/user", get(api::handlers::session::user));
    }
    if strategies.contains(&Strategy::Bearer) {
        router = router.route("/api/me", get(api::handlers::session::me));
    }

    Ok(router
        .merge(Scalar::with_url("/docs", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .with_state(state))
}

/// The application: configuration, directory, and router bundled for serving.
///
/// 1. **Initialize**: [`Application::new`] validates config, seeds the
///    directory, and builds the router
/// 2. **Serve**: [`Application::serve`] binds a TCP port and handles requests
///    until the shutdown future resolves
pub struct Application {
    router: Router,
    config: Config,
}

impl Application {
    /// Create a new application instance with all resources initialized.
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        config.validate()?;

        let directory: Arc<dyn UserDirectory> = Arc::new(directory::MemoryDirectory::from_config(&config).await?);
        info!("Directory seeded with {} user(s)", config.seed_users.len());

        let state = AppState::builder().config(config.clone()).directory(directory).build();
        let router = build_router(state)?;

        Ok(Self { router, config })
    }

    /// Start serving the application
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!(
            "keygate listening on http://{}, available at http://localhost:{}",
            bind_addr, self.config.port
        );

        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("Shutdown complete");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{create_test_config, create_test_state};
    use axum::http::StatusCode;

    #[tokio::test]
    async fn test_healthz() {
        let server = crate::test_utils::create_test_server().await;
        let response = server.get("/healthz").await;
        response.assert_status_ok();
        response.assert_text("OK");
    }

    #[tokio::test]
    async fn test_disabled_strategy_routes_are_not_mounted() {
        let mut config = create_test_config();
        config.auth.strategies = vec!["basic".to_string()];

        let state = {
            let mut state = create_test_state().await;
            state.config = config;
            state
        };
        let router = build_router(state).unwrap();
        let server = axum_test::TestServer::new(router).unwrap();

        // Cookie strategy disabled: its route does not exist at all
        let response = server.get("/user").await;
        response.assert_status(StatusCode::NOT_FOUND);

        // Basic strategy still mounted
        let response = server.get("/api/authTest").await;
        response.assert_status(StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_openapi_docs_served() {
        let server = crate::test_utils::create_test_server().await;
        let response = server.get("/docs").await;
        response.assert_status_ok();
    }
}
