/**
 * Authentication Routes
 * Registration, sign-in and sign-out over the signed `awesession` cookie,
 * plus the middleware that resolves the cookie on every request.
 */
use axum::{
    extract::{rejection::JsonRejection, FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::convert::Infallible;

use crate::db::{
    models::{User, MAX_EMAIL_LEN, MAX_NAME_LEN},
    next_id, StoreError,
};
use crate::error::{ApiError, ApiResult};
use crate::routes::within_limit;
use crate::session::{self, sha1_hex, COOKIE_NAME, SESSION_MAX_AGE_SECS};
use crate::SharedState;

// ============================================================================
// Validation
// ============================================================================

lazy_static::lazy_static! {
    static ref EMAIL_REGEX: Regex =
        Regex::new(r"^[a-z0-9.\-_]+@[a-z0-9\-_]+(\.[a-z0-9\-_]+){1,4}$").unwrap();

    /// Clients send SHA-1(email:password) as 40 lowercase hex chars.
    static ref SHA1_REGEX: Regex = Regex::new(r"^[0-9a-f]{40}$").unwrap();
}

fn is_valid_email(email: &str) -> bool {
    EMAIL_REGEX.is_match(email)
}

fn is_client_digest(passwd: &str) -> bool {
    SHA1_REGEX.is_match(passwd)
}

// ============================================================================
// Request Types
// ============================================================================

#[derive(Debug, Deserialize, Serialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub passwd: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct AuthenticateRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub passwd: String,
}

// ============================================================================
// Current user
// ============================================================================

/// The signed-in user for this request, password masked. `None` is anonymous.
#[derive(Debug, Clone, Default)]
pub struct CurrentUser(pub Option<User>);

impl<S: Send + Sync> FromRequestParts<S> for CurrentUser {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .unwrap_or_default())
    }
}

impl CurrentUser {
    /// Any signed-in user.
    pub fn require(&self) -> ApiResult<&User> {
        self.0
            .as_ref()
            .ok_or_else(|| ApiError::Permission("Please sign in first".to_string()))
    }

    /// A signed-in administrator.
    pub fn require_admin(&self) -> ApiResult<&User> {
        match &self.0 {
            Some(user) if user.admin => Ok(user),
            Some(user) => {
                tracing::warn!(user_id = %user.id, "non-admin attempted admin action");
                Err(ApiError::Permission("Admin privileges required".to_string()))
            }
            None => Err(ApiError::Permission("Please sign in first".to_string())),
        }
    }
}

/// Extract a cookie value by name from the `Cookie` header.
fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|cookies| cookies.split(';'))
        .find_map(|cookie| {
            let (key, value) = cookie.trim().split_once('=')?;
            (key.trim() == name).then(|| value.trim().to_string())
        })
}

/// Middleware: decodes the session cookie and stores a [`CurrentUser`] in
/// the request extensions. A bad or missing cookie means anonymous.
pub async fn resolve_session(
    State(state): State<SharedState>,
    mut request: Request,
    next: Next,
) -> Response {
    let user = match read_cookie(request.headers(), COOKIE_NAME) {
        Some(token) => {
            session::decode(&token, state.store.as_ref(), &state.config.session_secret).await
        }
        None => None,
    };

    if let Some(user) = &user {
        tracing::debug!(user_id = %user.id, "session resolved");
    }

    request.extensions_mut().insert(CurrentUser(user));
    next.run(request).await
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Stored password digest: SHA-1 of `{user_id}:{client_digest}`.
fn password_digest(user_id: &str, client_digest: &str) -> String {
    sha1_hex(&format!("{user_id}:{client_digest}"))
}

fn gravatar_url(email: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(email.trim().to_lowercase().as_bytes());
    format!(
        "https://www.gravatar.com/avatar/{:x}?d=mm&s=120",
        hasher.finalize()
    )
}

fn session_cookie(value: &str, max_age: i64) -> ApiResult<HeaderValue> {
    HeaderValue::from_str(&format!(
        "{COOKIE_NAME}={value}; Max-Age={max_age}; Path=/; HttpOnly"
    ))
    .map_err(|e| {
        tracing::error!("Failed to build session cookie: {}", e);
        ApiError::Internal("failed to issue session".to_string())
    })
}

/// Masked user JSON with a fresh 24h session cookie.
fn signed_in_response(user: User, secret: &str) -> ApiResult<Response> {
    let token = session::encode(&user, SESSION_MAX_AGE_SECS, secret);
    let cookie = session_cookie(&token, SESSION_MAX_AGE_SECS)?;
    Ok(([(header::SET_COOKIE, cookie)], Json(user.masked())).into_response())
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /api/register
pub async fn register(
    State(state): State<SharedState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> ApiResult<Response> {
    let Json(payload) = payload?;
    let name = payload.name.trim();
    if name.is_empty() {
        return Err(ApiError::value("name", "Name cannot be empty"));
    }
    let name = within_limit("name", name.to_string(), MAX_NAME_LEN)?;
    if !is_valid_email(&payload.email) {
        return Err(ApiError::value("email", "Invalid email"));
    }
    let email = within_limit("email", payload.email, MAX_EMAIL_LEN)?;
    if !is_client_digest(&payload.passwd) {
        return Err(ApiError::value("passwd", "Invalid password"));
    }

    if state.store.find_user_by_email(&email).await?.is_some() {
        return Err(ApiError::Conflict {
            field: "email".to_string(),
            message: "Email is already in use.".to_string(),
        });
    }

    let id = next_id();
    let user = User {
        passwd: password_digest(&id, &payload.passwd),
        admin: state.config.is_admin_email(&email),
        name,
        image: gravatar_url(&email),
        email,
        created_at: Utc::now(),
        id,
    };

    match state.store.insert_user(&user).await {
        Ok(()) => {}
        Err(StoreError::Duplicate(field)) => {
            return Err(ApiError::Conflict {
                field,
                message: "Email is already in use.".to_string(),
            });
        }
        Err(e) => return Err(e.into()),
    }

    tracing::info!(user_id = %user.id, admin = user.admin, "user registered");
    signed_in_response(user, &state.config.session_secret)
}

/// POST /api/authenticate
pub async fn authenticate(
    State(state): State<SharedState>,
    payload: Result<Json<AuthenticateRequest>, JsonRejection>,
) -> ApiResult<Response> {
    let Json(payload) = payload?;
    if payload.email.is_empty() {
        return Err(ApiError::value("email", "Invalid email"));
    }
    if payload.passwd.is_empty() {
        return Err(ApiError::value("passwd", "Invalid password"));
    }

    let user = match state.store.find_user_by_email(&payload.email).await? {
        Some(user) => user,
        None => {
            tracing::warn!("Sign-in attempt for unknown email: {}", payload.email);
            return Err(ApiError::value("email", "Email not exist"));
        }
    };

    if password_digest(&user.id, &payload.passwd) != user.passwd {
        tracing::warn!(user_id = %user.id, "Failed sign-in attempt");
        return Err(ApiError::value("passwd", "Invalid password"));
    }

    tracing::info!(user_id = %user.id, "user signed in");
    signed_in_response(user, &state.config.session_secret)
}

/// GET /signout
/// Expires the cookie and sends the browser back where it came from.
pub async fn signout(headers: HeaderMap) -> ApiResult<Response> {
    let location = headers
        .get(header::REFERER)
        .cloned()
        .unwrap_or_else(|| HeaderValue::from_static("/"));
    let cookie = session_cookie("-deleted-", 0)?;

    tracing::info!("user signed out");

    Ok((
        StatusCode::FOUND,
        [(header::LOCATION, location), (header::SET_COOKIE, cookie)],
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::MASKED_PASSWORD;
    use crate::routes::testing::{self, ADMIN_EMAIL};
    use axum::body::Body;
    use axum::http::Request;
    use serde_json::json;

    fn client_digest(email: &str, password: &str) -> String {
        sha1_hex(&format!("{email}:{password}"))
    }

    fn cookie_of(res: &Response) -> String {
        res.headers()
            .get(header::SET_COOKIE)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string()
    }

    async fn register_raw(
        state: &SharedState,
        email: &str,
        name: &str,
        passwd: &str,
    ) -> Response {
        let req = Request::post("/api/register")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(
                json!({ "email": email, "name": name, "passwd": passwd }).to_string(),
            ))
            .unwrap();
        tower::ServiceExt::oneshot(testing::app(state), req)
            .await
            .unwrap()
    }

    #[test]
    fn test_email_pattern() {
        assert!(is_valid_email("a.b-c_d@mail.example.co.uk"));
        assert!(!is_valid_email("Upper@mail.com"));
        assert!(!is_valid_email("no-at-sign"));
        assert!(!is_valid_email("a@localhost"));
        assert!(!is_valid_email("a@a.b.c.d.e.f"));
    }

    #[test]
    fn test_client_digest_pattern() {
        assert!(is_client_digest(&client_digest("a@b.com", "secret")));
        assert!(!is_client_digest("secret"));
        assert!(!is_client_digest(&"A".repeat(40)));
        assert!(!is_client_digest(&"a".repeat(41)));
    }

    #[test]
    fn test_read_cookie_finds_named_value() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; awesession=abc-1-def"),
        );
        assert_eq!(
            read_cookie(&headers, COOKIE_NAME).as_deref(),
            Some("abc-1-def")
        );
        assert_eq!(read_cookie(&headers, "missing"), None);
    }

    #[test]
    fn test_password_digest_never_equals_input() {
        let digest = client_digest("a@b.com", "pw");
        assert_ne!(password_digest("id", &digest), digest);
        assert_eq!(password_digest("id", &digest).len(), 40);
    }

    #[tokio::test]
    async fn test_register_issues_cookie_and_masks_password() {
        let state = testing::state();
        let passwd = client_digest("reader@blog.org", "pw");
        let res = register_raw(&state, "reader@blog.org", "读者", &passwd).await;
        assert_eq!(res.status(), StatusCode::OK);

        let cookie = cookie_of(&res);
        assert!(cookie.starts_with("awesession="));
        assert!(cookie.contains("Max-Age=86400"));
        assert!(cookie.contains("HttpOnly"));

        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
            .await
            .unwrap();
        let text = std::str::from_utf8(&bytes).unwrap();
        assert!(text.contains("读者"));
        let body = testing::json(&bytes);
        assert_eq!(body["passwd"], MASKED_PASSWORD);
        assert_eq!(body["admin"], false);

        let stored = state
            .store
            .find_user_by_email("reader@blog.org")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.passwd, password_digest(&stored.id, &passwd));
        assert!(stored.image.contains("gravatar.com/avatar/"));
    }

    #[tokio::test]
    async fn test_register_rejects_raw_password() {
        let state = testing::state();
        let (status, bytes) = testing::post_json(
            testing::app(&state),
            "/api/register",
            None,
            &json!({ "email": "a@blog.org", "name": "A", "passwd": "hunter2" }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(testing::json(&bytes)["data"], "passwd");
    }

    #[tokio::test]
    async fn test_register_rejects_blank_name_and_bad_email() {
        let state = testing::state();
        let passwd = client_digest("a@blog.org", "pw");

        let (status, bytes) = testing::post_json(
            testing::app(&state),
            "/api/register",
            None,
            &json!({ "email": "a@blog.org", "name": "   ", "passwd": passwd }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(testing::json(&bytes)["data"], "name");

        let (status, bytes) = testing::post_json(
            testing::app(&state),
            "/api/register",
            None,
            &json!({ "email": "not-an-email", "name": "A", "passwd": passwd }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(testing::json(&bytes)["data"], "email");
    }

    #[tokio::test]
    async fn test_register_rejects_overlong_name_and_email() {
        let state = testing::state();
        let long_email = format!("{}@blog.org", "a".repeat(MAX_EMAIL_LEN));
        assert!(is_valid_email(&long_email));
        let passwd = client_digest(&long_email, "pw");

        let (status, bytes) = testing::post_json(
            testing::app(&state),
            "/api/register",
            None,
            &json!({ "email": long_email, "name": "A", "passwd": passwd }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(testing::json(&bytes)["data"], "email");

        let (status, bytes) = testing::post_json(
            testing::app(&state),
            "/api/register",
            None,
            &json!({ "email": "a@blog.org", "name": "n".repeat(MAX_NAME_LEN + 1), "passwd": passwd }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(testing::json(&bytes)["data"], "name");
        assert_eq!(state.store.count_users().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_malformed_bodies_are_value_errors() {
        let state = testing::state();

        for uri in ["/api/register", "/api/authenticate"] {
            for (content_type, body) in [("application/json", "{"), ("text/plain", "email=a")] {
                let (status, bytes) =
                    testing::post_raw(testing::app(&state), uri, None, content_type, body).await;
                assert_eq!(status, StatusCode::BAD_REQUEST, "{uri} {body}");
                let error = testing::json(&bytes);
                assert_eq!(error["error"], "value:invalid");
                assert_eq!(error["data"], "body");
            }
        }
    }

    #[tokio::test]
    async fn test_register_duplicate_email_conflicts() {
        let state = testing::state();
        let passwd = client_digest("a@blog.org", "pw");
        let first = register_raw(&state, "a@blog.org", "A", &passwd).await;
        assert_eq!(first.status(), StatusCode::OK);

        let second = register_raw(&state, "a@blog.org", "B", &passwd).await;
        assert_eq!(second.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_designated_email_becomes_admin() {
        let state = testing::state();
        let passwd = client_digest(ADMIN_EMAIL, "pw");
        let res = register_raw(&state, ADMIN_EMAIL, "Owner", &passwd).await;
        assert_eq!(res.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(testing::json(&bytes)["admin"], true);
    }

    #[tokio::test]
    async fn test_registration_cookie_authenticates_later_requests() {
        let state = testing::state();
        let passwd = client_digest(ADMIN_EMAIL, "pw");
        let res = register_raw(&state, ADMIN_EMAIL, "Owner", &passwd).await;
        let cookie = cookie_of(&res);
        let pair = cookie.split(';').next().unwrap().to_string();

        let (status, _) = testing::post_json(
            testing::app(&state),
            "/api/blogs",
            Some(&pair),
            &json!({ "name": "Hello", "summary": "s", "content": "c" }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_authenticate_round_trip() {
        let state = testing::state();
        let passwd = client_digest("a@blog.org", "pw");
        register_raw(&state, "a@blog.org", "A", &passwd).await;

        let req = Request::post("/api/authenticate")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(
                json!({ "email": "a@blog.org", "passwd": passwd }).to_string(),
            ))
            .unwrap();
        let res = tower::ServiceExt::oneshot(testing::app(&state), req)
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert!(cookie_of(&res).contains("Max-Age=86400"));
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(testing::json(&bytes)["passwd"], MASKED_PASSWORD);
    }

    #[tokio::test]
    async fn test_authenticate_failures_are_value_errors() {
        let state = testing::state();
        let passwd = client_digest("a@blog.org", "pw");
        register_raw(&state, "a@blog.org", "A", &passwd).await;

        let cases = [
            (json!({ "email": "", "passwd": passwd }), "email"),
            (json!({ "email": "a@blog.org" }), "passwd"),
            (json!({ "email": "ghost@blog.org", "passwd": passwd }), "email"),
            (
                json!({ "email": "a@blog.org", "passwd": client_digest("a@blog.org", "bad") }),
                "passwd",
            ),
        ];
        for (payload, field) in cases {
            let (status, bytes) = testing::post_json(
                testing::app(&state),
                "/api/authenticate",
                None,
                &payload,
            )
            .await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "payload {payload}");
            assert_eq!(testing::json(&bytes)["data"], field);
        }
    }

    #[tokio::test]
    async fn test_signout_clears_cookie_and_redirects_to_referer() {
        let state = testing::state();
        let req = Request::get("/signout")
            .header(header::REFERER, "/blog/42")
            .body(Body::empty())
            .unwrap();
        let res = tower::ServiceExt::oneshot(testing::app(&state), req)
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::FOUND);
        assert_eq!(res.headers()[header::LOCATION], "/blog/42");
        let cookie = cookie_of(&res);
        assert!(cookie.starts_with("awesession=-deleted-"));
        assert!(cookie.contains("Max-Age=0"));
    }

    #[tokio::test]
    async fn test_signout_without_referer_goes_home() {
        let state = testing::state();
        let (status, _) = testing::get(testing::app(&state), "/signout", None).await;
        assert_eq!(status, StatusCode::FOUND);
    }

    #[tokio::test]
    async fn test_require_admin_distinguishes_callers() {
        let state = testing::state();
        let (reader, _) = testing::signed_in(&state, "Reader", false).await;
        let (owner, _) = testing::signed_in(&state, "Owner", true).await;

        assert!(CurrentUser(None).require_admin().is_err());
        assert!(CurrentUser(Some(reader.clone())).require_admin().is_err());
        assert!(CurrentUser(Some(reader)).require().is_ok());
        assert!(CurrentUser(Some(owner)).require_admin().is_ok());
    }
}
