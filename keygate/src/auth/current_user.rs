//! Axum extractors binding one strategy each.
//!
//! Handlers name the strategy they accept through the extractor type; the
//! orchestrator runs only that strategy. Any rejection - missing, invalid, or
//! expired credential - collapses to a generic 401 here so the response never
//! reveals which part failed.

use axum::{extract::FromRequestParts, http::request::Parts};

use super::strategy::{AuthOutcome, Strategy, authenticate};
use crate::AppState;
use crate::directory::User;
use crate::errors::{Error, Result};

macro_rules! strategy_extractor {
    ($(#[$doc:meta])* $name:ident, $strategy:expr) => {
        $(#[$doc])*
        #[derive(Debug)]
        pub struct $name(pub User);

        impl FromRequestParts<AppState> for $name {
            type Rejection = Error;

            async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
                match authenticate($strategy, parts, state).await? {
                    AuthOutcome::Authenticated(user) => Ok($name(user)),
                    AuthOutcome::Rejected(reason) => {
                        tracing::debug!("{} authentication rejected: {}", $strategy, reason.as_str());
                        Err(Error::Unauthenticated { message: None })
                    }
                }
            }
        }
    };
}

strategy_extractor!(
    /// The user authenticated via `Authorization: Basic`.
    BasicUser,
    Strategy::Basic
);

strategy_extractor!(
    /// The user authenticated via `Authorization: Bearer <token>`.
    BearerUser,
    Strategy::Bearer
);

strategy_extractor!(
    /// The user authenticated via the session cookie.
    CookieUser,
    Strategy::Cookie
);

strategy_extractor!(
    /// The user authenticated via `Authorization: Api-Key <key>`.
    ApiKeyUser,
    Strategy::ApiKey
);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{create_test_state, encode_basic};
    use axum::extract::FromRequestParts as _;
    use axum::http::StatusCode;

    fn parts_with_header(name: &str, value: &str) -> Parts {
        let request = axum::http::Request::builder()
            .uri("http://localhost/test")
            .header(name, value)
            .body(())
            .unwrap();
        let (parts, _body) = request.into_parts();
        parts
    }

    #[tokio::test]
    async fn test_basic_extractor_success() {
        let state = create_test_state().await;
        let mut parts = parts_with_header("authorization", &encode_basic("tutorial", "password123"));

        let BasicUser(user) = BasicUser::from_request_parts(&mut parts, &state).await.unwrap();
        assert_eq!(user.username, "tutorial");
    }

    #[tokio::test]
    async fn test_rejections_collapse_to_generic_401() {
        let state = create_test_state().await;

        // Missing credential
        let request = axum::http::Request::builder().uri("http://localhost/test").body(()).unwrap();
        let (mut parts, _body) = request.into_parts();
        let err = BasicUser::from_request_parts(&mut parts, &state).await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
        let missing_message = err.user_message();

        // Wrong credential: indistinguishable from missing
        let mut parts = parts_with_header("authorization", &encode_basic("tutorial", "wrong"));
        let err = BasicUser::from_request_parts(&mut parts, &state).await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(err.user_message(), missing_message);
    }
}
