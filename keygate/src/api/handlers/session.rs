//! Identity-bearing endpoints.
//!
//! Each protected route names exactly one strategy through its extractor;
//! the handler body only ever sees an already-authenticated identity.

use axum::{Json, http::StatusCode};

use crate::{
    api::models::auth::{ApiMessage, AuthTestResponse, IdentityResponse, KeyTestResponse},
    auth::current_user::{ApiKeyUser, BasicUser, BearerUser, CookieUser},
};
use serde::Deserialize;
use utoipa::ToSchema;

/// Unauthenticated liveness check.
#[utoipa::path(
    get,
    path = "/api/test",
    tag = "general",
    responses(
        (status = 200, description = "Hello world", body = ApiMessage),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn test() -> Json<ApiMessage> {
    Json(ApiMessage {
        success: true,
        message: "Hello World!".to_string(),
    })
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct PostTestRequest {
    #[serde(default)]
    pub message: Option<String>,
}

/// Unauthenticated echo endpoint.
#[utoipa::path(
    post,
    path = "/api/postTest",
    request_body = PostTestRequest,
    tag = "general",
    responses(
        (status = 200, description = "Echoed message", body = ApiMessage),
        (status = 400, description = "No message in the request body", body = ApiMessage),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn post_test(Json(request): Json<PostTestRequest>) -> (StatusCode, Json<ApiMessage>) {
    match request.message {
        Some(message) => (
            StatusCode::OK,
            Json(ApiMessage {
                success: true,
                message: format!("Your message was:\n\"{message}\""),
            }),
        ),
        None => (
            StatusCode::BAD_REQUEST,
            Json(ApiMessage {
                success: false,
                message: "No message was present in the request body.".to_string(),
            }),
        ),
    }
}

/// Smoke endpoint for the `basic` strategy.
#[utoipa::path(
    get,
    path = "/api/authTest",
    tag = "authentication",
    responses(
        (status = 200, description = "Authenticated via Basic credentials", body = AuthTestResponse),
        (status = 401, description = "Missing or invalid credentials"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn auth_test(BasicUser(user): BasicUser) -> Json<AuthTestResponse> {
    Json(AuthTestResponse {
        success: true,
        username: user.username,
    })
}

/// Smoke endpoint for the `apikey` strategy.
#[utoipa::path(
    get,
    path = "/api/keyTest",
    tag = "authentication",
    responses(
        (status = 200, description = "Authenticated via API key", body = KeyTestResponse),
        (status = 401, description = "Missing or invalid API key"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn key_test(ApiKeyUser(user): ApiKeyUser) -> Json<KeyTestResponse> {
    Json(KeyTestResponse {
        success: true,
        user: user.username,
    })
}

/// The current user's identity, resolved from the session cookie.
#[utoipa::path(
    get,
    path = "/user",
    tag = "authentication",
    responses(
        (status = 200, description = "The authenticated identity", body = IdentityResponse),
        (status = 401, description = "Missing, invalid, or expired session"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn user(CookieUser(user): CookieUser) -> Json<IdentityResponse> {
    Json(IdentityResponse::from(user))
}

/// The current user's identity, resolved from a bearer token.
#[utoipa::path(
    get,
    path = "/api/me",
    tag = "authentication",
    responses(
        (status = 200, description = "The authenticated identity", body = IdentityResponse),
        (status = 401, description = "Missing, invalid, or expired token"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn me(BearerUser(user): BearerUser) -> Json<IdentityResponse> {
    Json(IdentityResponse::from(user))
}

#[cfg(test)]
mod tests {
    use crate::api::models::auth::{IdentityResponse, KeyTestResponse, LoginBody};
    use crate::test_utils::{create_test_server, encode_basic};
    use axum::http::StatusCode;
    use chrono::Utc;
    use jsonwebtoken::{EncodingKey, Header, encode};
    use serde_json::json;

    const SEEDED_API_KEY: &str = "10ba038e-48da-487b-96e8-8d3b99b6d18a";

    #[tokio::test]
    async fn test_open_endpoints() {
        let server = create_test_server().await;

        let response = server.get("/api/test").await;
        response.assert_status_ok();
        response.assert_json_contains(&json!({ "success": true, "message": "Hello World!" }));

        let response = server.post("/api/postTest").json(&json!({ "message": "hi" })).await;
        response.assert_status_ok();
        response.assert_json_contains(&json!({ "success": true }));

        let response = server.post("/api/postTest").json(&json!({})).await;
        response.assert_status(StatusCode::BAD_REQUEST);
        response.assert_json_contains(&json!({ "success": false }));
    }

    #[tokio::test]
    async fn test_basic_strategy_endpoint() {
        let server = create_test_server().await;

        let response = server
            .get("/api/authTest")
            .add_header("authorization", encode_basic("tutorial", "password123"))
            .await;
        response.assert_status_ok();
        response.assert_json_contains(&json!({ "success": true, "username": "tutorial" }));

        let response = server.get("/api/authTest").await;
        response.assert_status(StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_api_key_endpoint() {
        let server = create_test_server().await;

        // The seeded key authenticates as tutorial
        let response = server
            .get("/api/keyTest")
            .add_header("authorization", format!("Api-Key {SEEDED_API_KEY}"))
            .await;
        response.assert_status_ok();
        let body: KeyTestResponse = response.json();
        assert!(body.success);
        assert_eq!(body.user, "tutorial");

        // Any other key is rejected
        let response = server
            .get("/api/keyTest")
            .add_header("authorization", "Api-Key 00000000-0000-0000-0000-000000000000")
            .await;
        response.assert_status(StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_cookie_session_round_trip() {
        let server = create_test_server().await;

        // Log in to obtain a session token
        let login = server
            .post("/auth")
            .json(&json!({ "username": "tutorial", "password": "password123" }))
            .await;
        login.assert_status_ok();
        let body: LoginBody = login.json();
        let token = body.token.expect("login should return a token");

        // Present it in the session cookie
        let response = server.get("/user").add_header("cookie", format!("jwt={token}")).await;
        response.assert_status_ok();

        let identity: IdentityResponse = response.json();
        assert_eq!(identity.username, "tutorial");
        assert_eq!(identity.id, 1);
        assert!(identity.administrator);
        // apiKey is re-fetched from the directory, not read from the token
        assert_eq!(identity.api_key.as_deref(), Some(SEEDED_API_KEY));

        // The same token works on the bearer strategy endpoint
        let response = server.get("/api/me").add_header("authorization", format!("Bearer {token}")).await;
        response.assert_status_ok();
    }

    #[tokio::test]
    async fn test_expired_cookie_is_denied_not_anonymous() {
        let server = create_test_server().await;
        let config = crate::test_utils::create_test_config();

        let now = Utc::now();
        let claims = crate::auth::token::SessionClaims {
            id: 1,
            administrator: true,
            iat: (now - chrono::Duration::seconds(7200)).timestamp(),
            exp: (now - chrono::Duration::seconds(3600)).timestamp(),
        };
        let key = EncodingKey::from_secret(config.secret_key.as_ref().unwrap().as_bytes());
        let expired = encode(&Header::default(), &claims, &key).unwrap();

        let response = server.get("/user").add_header("cookie", format!("jwt={expired}")).await;
        response.assert_status(StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_missing_cookie_is_denied() {
        let server = create_test_server().await;
        let response = server.get("/user").await;
        response.assert_status(StatusCode::UNAUTHORIZED);
    }
}
