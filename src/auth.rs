use axum::{
    extract::{FromRef, FromRequestParts},
    http::{HeaderMap, header, request::Parts},
};
use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{config::AppConfig, error::ApiError};

/// Custom header checked before the standard `Authorization` header.
pub const AUTH_TOKEN_HEADER: &str = "x-auth-token";

const BEARER_PREFIX: &str = "Bearer ";

/// Claims
///
/// Payload carried inside the JWT. The identity lives under `user.id`; `exp`
/// is validated when present, `iat` is informational.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub user: ClaimedUser,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
}

/// ClaimedUser
///
/// The user identity claim embedded in the token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaimedUser {
    pub id: String,
}

/// AuthError
///
/// The two ways a request can fail authentication. The display strings are
/// the exact messages returned to the client.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("No token, authorization denied")]
    MissingToken,
    #[error("Token is not valid")]
    InvalidToken,
}

/// AuthUser
///
/// The resolved identity of an authenticated request. Used as a handler
/// argument; a request that fails verification never reaches the handler body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    /// The `user.id` claim of the verified token.
    pub id: String,
}

/// extract_token
///
/// Locates the credential: a non-empty `x-auth-token` header wins, otherwise
/// the remainder of an `Authorization: Bearer <token>` header. A custom header
/// that is present but not visible ASCII is an invalid token, not a missing one.
pub fn extract_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    if let Some(value) = headers.get(AUTH_TOKEN_HEADER).filter(|value| !value.is_empty()) {
        return value.to_str().map_err(|_| AuthError::InvalidToken);
    }

    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix(BEARER_PREFIX))
        .filter(|token| !token.is_empty())
        .ok_or(AuthError::MissingToken)
}

/// verify_token
///
/// Validates the request credential against `secret` at the instant `now`
/// (unix seconds) and returns the embedded identity.
///
/// Signature checks go through `jsonwebtoken`; expiry is checked here against
/// the supplied clock so the function stays deterministic.
pub fn verify_token(headers: &HeaderMap, secret: &str, now: i64) -> Result<AuthUser, AuthError> {
    let token = extract_token(headers)?;

    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = false;
    validation.required_spec_claims.clear();

    let decoding_key = DecodingKey::from_secret(secret.as_bytes());
    let token_data = decode::<Claims>(token, &decoding_key, &validation).map_err(|e| {
        tracing::debug!(kind = ?e.kind(), "rejected token");
        AuthError::InvalidToken
    })?;

    if let Some(exp) = token_data.claims.exp {
        if now >= exp {
            tracing::debug!(exp, now, "rejected expired token");
            return Err(AuthError::InvalidToken);
        }
    }

    Ok(AuthUser {
        id: token_data.claims.user.id,
    })
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    AppConfig: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let config = AppConfig::from_ref(state);
        let user = verify_token(&parts.headers, &config.jwt_secret, Utc::now().timestamp())?;
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn custom_header_takes_precedence_over_bearer() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTH_TOKEN_HEADER, HeaderValue::from_static("custom"));
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer standard"));

        assert_eq!(extract_token(&headers), Ok("custom"));
    }

    #[test]
    fn empty_custom_header_falls_back_to_bearer() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTH_TOKEN_HEADER, HeaderValue::from_static(""));
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer standard"));

        assert_eq!(extract_token(&headers), Ok("standard"));
    }

    #[test]
    fn non_bearer_authorization_is_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic dXNlcjpwdw=="));

        assert_eq!(extract_token(&headers), Err(AuthError::MissingToken));
    }

    #[test]
    fn unreadable_custom_header_is_invalid_not_missing() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTH_TOKEN_HEADER, HeaderValue::from_bytes(b"tok\xffen").unwrap());
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer standard"));

        assert_eq!(extract_token(&headers), Err(AuthError::InvalidToken));
    }
}
