//! The interactive login endpoint.
//!
//! This is the one path with a side effect beyond verification: on success it
//! issues a session token and instructs the client to store it in the session
//! cookie. The other strategies are read-only.

use axum::{Json, extract::State};

use crate::{
    AppState,
    api::models::auth::{LoginRequest, LoginResponse},
    auth::{password, token},
    config::Config,
    errors::Error,
};

/// Login with username and password.
///
/// Every credential failure - unknown username, missing stored hash, wrong
/// password - produces the same HTTP 200 response with a fixed message. The
/// uniform status and body are deliberate: a probing client learns nothing
/// about which usernames exist. Only system faults (corrupt stored records,
/// signing failures) break the pattern with a 500.
#[utoipa::path(
    post,
    path = "/auth",
    request_body = LoginRequest,
    tag = "authentication",
    responses(
        (status = 200, description = "Login outcome; success:false for bad credentials", body = crate::api::models::auth::LoginBody),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn login(State(state): State<AppState>, Json(request): Json<LoginRequest>) -> Result<LoginResponse, Error> {
    // Find user by username
    let Some(user) = state.directory.find_by_username(&request.username).await? else {
        return Ok(LoginResponse::failure());
    };

    // Users without a stored hash cannot log in with a password
    let Some(hash) = user.password_hash.clone() else {
        return Ok(LoginResponse::failure());
    };

    // Verify password on a blocking thread to avoid blocking the async runtime
    let candidate = request.password.clone();
    let is_valid = tokio::task::spawn_blocking(move || password::verify_string(&candidate, &hash))
        .await
        .map_err(|e| Error::Internal {
            operation: format!("spawn password verification task: {e}"),
        })??;

    if !is_valid {
        return Ok(LoginResponse::failure());
    }

    // Issue the session token and hand the cookie to the client
    let session_token = token::issue_session_token(&user, &state.config)?;
    let cookie = create_session_cookie(&session_token, &state.config);

    tracing::info!("User {} logged in", user.id);
    Ok(LoginResponse::success(user.username, session_token, cookie))
}

/// Helper function to create a session cookie
fn create_session_cookie(token: &str, config: &Config) -> String {
    let session = &config.auth.session;
    let mut cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite={}; Max-Age={}",
        session.cookie_name,
        token,
        session.cookie_same_site,
        session.timeout.as_secs()
    );
    if session.cookie_secure {
        cookie.push_str("; Secure");
    }
    cookie
}
