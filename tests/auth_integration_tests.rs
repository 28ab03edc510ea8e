use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, HeaderValue, Method, Request, StatusCode, header, request::Parts},
    response::IntoResponse,
};
use jsonwebtoken::{EncodingKey, Header, encode};
use std::{sync::Arc, time::SystemTime};
use website_registry::{
    ApiError, AppState, InMemoryRepository,
    auth::{AUTH_TOKEN_HEADER, AuthError, AuthUser, ClaimedUser, Claims, verify_token},
    config::AppConfig,
};

// --- Helper Functions ---

const TEST_JWT_SECRET: &str = "test-secret-value-1234567890";
const TEST_USER_ID: &str = "665f1c2e9b1e8a3d4c5b6a6f";

fn now() -> i64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap()
        .as_secs() as i64
}

fn create_token_with(secret: &str, user_id: &str, exp: Option<i64>) -> String {
    let claims = Claims {
        user: ClaimedUser {
            id: user_id.to_string(),
        },
        iat: Some(now()),
        exp,
    };

    let key = EncodingKey::from_secret(secret.as_bytes());
    encode(&Header::default(), &claims, &key).unwrap()
}

fn create_token(exp_offset: i64) -> String {
    create_token_with(TEST_JWT_SECRET, TEST_USER_ID, Some(now() + exp_offset))
}

fn headers_with(name: header::HeaderName, value: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(name, HeaderValue::from_str(value).unwrap());
    headers
}

fn create_app_state(jwt_secret: &str) -> AppState {
    let mut config = AppConfig::default();
    config.jwt_secret = jwt_secret.to_string();

    AppState {
        repo: Arc::new(InMemoryRepository::new()),
        config,
    }
}

fn get_request_parts(headers: HeaderMap) -> Parts {
    let mut request = Request::builder()
        .method(Method::GET)
        .uri("/websites")
        .body(axum::body::Body::empty())
        .unwrap();
    *request.headers_mut() = headers;
    let (parts, _) = request.into_parts();
    parts
}

// --- Pure Verifier Tests ---

#[test]
fn test_verify_accepts_custom_header_token() {
    let headers = headers_with(
        header::HeaderName::from_static(AUTH_TOKEN_HEADER),
        &create_token(3600),
    );

    let user = verify_token(&headers, TEST_JWT_SECRET, now()).unwrap();
    assert_eq!(user.id, TEST_USER_ID);
}

#[test]
fn test_verify_accepts_bearer_token() {
    let headers = headers_with(header::AUTHORIZATION, &format!("Bearer {}", create_token(3600)));

    let user = verify_token(&headers, TEST_JWT_SECRET, now()).unwrap();
    assert_eq!(user.id, TEST_USER_ID);
}

#[test]
fn test_custom_header_wins_even_when_bearer_is_valid() {
    let mut headers = headers_with(header::AUTHORIZATION, &format!("Bearer {}", create_token(3600)));
    headers.insert(AUTH_TOKEN_HEADER, HeaderValue::from_static("invalid"));

    assert_eq!(
        verify_token(&headers, TEST_JWT_SECRET, now()),
        Err(AuthError::InvalidToken)
    );
}

#[test]
fn test_missing_credential_is_reported_as_missing() {
    assert_eq!(
        verify_token(&HeaderMap::new(), TEST_JWT_SECRET, now()),
        Err(AuthError::MissingToken)
    );

    // A bare "Bearer " carries no credential either.
    let headers = headers_with(header::AUTHORIZATION, "Bearer ");
    assert_eq!(
        verify_token(&headers, TEST_JWT_SECRET, now()),
        Err(AuthError::MissingToken)
    );
}

#[test]
fn test_unreadable_custom_header_is_invalid_even_with_valid_bearer() {
    let mut headers = headers_with(header::AUTHORIZATION, &format!("Bearer {}", create_token(3600)));
    headers.insert(AUTH_TOKEN_HEADER, HeaderValue::from_bytes(b"\xfe\xff").unwrap());

    assert_eq!(
        verify_token(&headers, TEST_JWT_SECRET, now()),
        Err(AuthError::InvalidToken)
    );
}

#[test]
fn test_wrong_secret_is_invalid() {
    let token = create_token_with("some-other-secret", TEST_USER_ID, Some(now() + 3600));
    let headers = headers_with(header::HeaderName::from_static(AUTH_TOKEN_HEADER), &token);

    assert_eq!(
        verify_token(&headers, TEST_JWT_SECRET, now()),
        Err(AuthError::InvalidToken)
    );
}

#[test]
fn test_expiry_is_checked_against_the_supplied_clock() {
    let issued = now();
    let token = create_token_with(TEST_JWT_SECRET, TEST_USER_ID, Some(issued + 60));
    let headers = headers_with(header::HeaderName::from_static(AUTH_TOKEN_HEADER), &token);

    assert!(verify_token(&headers, TEST_JWT_SECRET, issued + 59).is_ok());
    assert_eq!(
        verify_token(&headers, TEST_JWT_SECRET, issued + 60),
        Err(AuthError::InvalidToken)
    );
}

#[test]
fn test_token_without_exp_is_accepted() {
    let token = create_token_with(TEST_JWT_SECRET, TEST_USER_ID, None);
    let headers = headers_with(header::HeaderName::from_static(AUTH_TOKEN_HEADER), &token);

    assert!(verify_token(&headers, TEST_JWT_SECRET, now()).is_ok());
}

// --- Extractor Tests ---

#[tokio::test]
async fn test_auth_success_with_valid_jwt() {
    let app_state = create_app_state(TEST_JWT_SECRET);
    let mut parts = get_request_parts(headers_with(
        header::AUTHORIZATION,
        &format!("Bearer {}", create_token(3600)),
    ));

    let auth_user = AuthUser::from_request_parts(&mut parts, &app_state).await;

    assert_eq!(
        auth_user.unwrap(),
        AuthUser {
            id: TEST_USER_ID.to_string()
        }
    );
}

#[tokio::test]
async fn test_auth_failure_with_missing_header() {
    let app_state = create_app_state(TEST_JWT_SECRET);
    let mut parts = get_request_parts(HeaderMap::new());

    let rejection = AuthUser::from_request_parts(&mut parts, &app_state)
        .await
        .unwrap_err();

    assert!(matches!(rejection, ApiError::Unauthorized(AuthError::MissingToken)));

    let response = rejection.into_response();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["msg"], "No token, authorization denied");
}

#[tokio::test]
async fn test_auth_failure_with_expired_jwt() {
    let app_state = create_app_state(TEST_JWT_SECRET);
    let mut parts = get_request_parts(headers_with(
        header::HeaderName::from_static(AUTH_TOKEN_HEADER),
        &create_token(-10),
    ));

    let rejection = AuthUser::from_request_parts(&mut parts, &app_state)
        .await
        .unwrap_err();

    let response = rejection.into_response();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["msg"], "Token is not valid");
}

#[tokio::test]
async fn test_extractor_uses_the_configured_secret() {
    let app_state = create_app_state("rotated-secret");
    let mut parts = get_request_parts(headers_with(
        header::HeaderName::from_static(AUTH_TOKEN_HEADER),
        &create_token(3600),
    ));

    let rejection = AuthUser::from_request_parts(&mut parts, &app_state)
        .await
        .unwrap_err();

    assert!(matches!(rejection, ApiError::Unauthorized(AuthError::InvalidToken)));
}
