//! Login and identity payloads.

use axum::{
    Json,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::directory::User;

/// Credentials posted to the login endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// The login response body.
///
/// Failed logins keep `success: false` with one fixed message; the other
/// fields are omitted. The shape never varies with the failure cause.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginBody {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

/// Login response: body plus an optional session cookie.
///
/// Always HTTP 200 - including for failed credentials, so the status code
/// leaks nothing about whether the username existed.
#[derive(Debug)]
pub struct LoginResponse {
    pub body: LoginBody,
    pub cookie: Option<String>,
}

impl LoginResponse {
    pub fn success(user: String, token: String, cookie: String) -> Self {
        Self {
            body: LoginBody {
                success: true,
                message: None,
                user: Some(user),
                token: Some(token),
            },
            cookie: Some(cookie),
        }
    }

    /// The one user-facing failure shape, shared by every credential outcome.
    pub fn failure() -> Self {
        Self {
            body: LoginBody {
                success: false,
                message: Some("Username or password was incorrect.".to_string()),
                user: None,
                token: None,
            },
            cookie: None,
        }
    }
}

impl IntoResponse for LoginResponse {
    fn into_response(self) -> Response {
        let mut response = (StatusCode::OK, Json(self.body)).into_response();
        if let Some(cookie) = self.cookie {
            match header::HeaderValue::from_str(&cookie) {
                Ok(value) => {
                    response.headers_mut().insert(header::SET_COOKIE, value);
                }
                Err(e) => {
                    tracing::error!("Failed to encode session cookie header: {e}");
                    return StatusCode::INTERNAL_SERVER_ERROR.into_response();
                }
            }
        }
        response
    }
}

/// Simple success/message payload for the open endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiMessage {
    pub success: bool,
    pub message: String,
}

/// Response for the basic-auth smoke endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuthTestResponse {
    pub success: bool,
    pub username: String,
}

/// Response for the API-key smoke endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct KeyTestResponse {
    pub success: bool,
    pub user: String,
}

/// The identity projection returned by identity-bearing endpoints.
///
/// Re-fetched from the directory per request - `apiKey` in particular is
/// never embedded in tokens, so it cannot go stale the way token claims can.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IdentityResponse {
    pub id: i64,
    pub username: String,
    pub administrator: bool,
    pub api_key: Option<String>,
}

impl From<User> for IdentityResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            administrator: user.administrator,
            api_key: user.api_key,
        }
    }
}
