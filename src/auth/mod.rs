//! User authentication for write routes.
//!
//! Clients send `<user_id>.<api_token>` in `x-api-key` or as a bearer token.
//! The token is compared in constant time to mitigate timing attacks.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};
use subtle::ConstantTimeEq;

use crate::errors::AppError;
use crate::models::User;
use crate::AppState;

/// Header name for the API key.
pub const API_KEY_HEADER: &str = "x-api-key";

/// The authenticated user making the request.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

impl<S: Send + Sync> FromRequestParts<S> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .ok_or_else(|| AppError::Unauthorized("Login required".to_string()))
    }
}

/// Resolves the credential to a user and stores it in the request extensions.
pub async fn require_user(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let Some((user_id, secret)) = credential(request.headers()) else {
        return AppError::Unauthorized("Missing or malformed API key".to_string()).into_response();
    };

    let user = match state.repo.get_user(user_id).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            return AppError::Unauthorized("Invalid API key".to_string()).into_response();
        }
        Err(e) => return e.into_response(),
    };

    // Constant-time comparison to prevent timing attacks
    if !constant_time_compare(&secret, &user.api_token) {
        return AppError::Unauthorized("Invalid API key".to_string()).into_response();
    }

    request.extensions_mut().insert(CurrentUser(user));
    next.run(request).await
}

fn credential(headers: &HeaderMap) -> Option<(i64, String)> {
    let raw = headers
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .or_else(|| {
            headers
                .get(header::AUTHORIZATION)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.strip_prefix("Bearer "))
        })?;

    parse_credential(raw)
}

fn parse_credential(raw: &str) -> Option<(i64, String)> {
    let (id, secret) = raw.trim().split_once('.')?;
    if secret.is_empty() {
        return None;
    }
    Some((id.parse().ok()?, secret.to_string()))
}

/// Perform constant-time string comparison.
fn constant_time_compare(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_constant_time_compare_equal() {
        assert!(constant_time_compare("test-key-123", "test-key-123"));
    }

    #[test]
    fn test_constant_time_compare_not_equal() {
        assert!(!constant_time_compare("test-key-123", "test-key-124"));
    }

    #[test]
    fn test_constant_time_compare_different_lengths() {
        assert!(!constant_time_compare("short", "much-longer-key"));
    }

    #[test]
    fn test_parse_credential() {
        assert_eq!(parse_credential("12.abc"), Some((12, "abc".to_string())));
        assert_eq!(parse_credential("12.a.b"), Some((12, "a.b".to_string())));
        assert_eq!(parse_credential("12."), None);
        assert_eq!(parse_credential("x.abc"), None);
        assert_eq!(parse_credential("noseparator"), None);
    }

    #[test]
    fn test_credential_header_precedence() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Bearer 2.bearer"),
        );
        assert_eq!(credential(&headers), Some((2, "bearer".to_string())));

        headers.insert(API_KEY_HEADER, HeaderValue::from_static("1.apikey"));
        assert_eq!(credential(&headers), Some((1, "apikey".to_string())));
    }
}
