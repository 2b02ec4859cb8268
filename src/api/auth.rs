//! Authentication API endpoints
//!
//! Public:
//! - POST /api/v1/auth/register
//! - POST /api/v1/auth/login
//! - POST /api/v1/auth/verify-email
//! - POST /api/v1/auth/forgot-password
//! - POST /api/v1/auth/reset-password
//! - GET  /api/v1/auth/oauth/{provider}
//! - GET  /api/v1/auth/oauth/{provider}/callback
//!
//! Protected:
//! - GET  /api/v1/auth/me
//! - POST /api/v1/auth/resend-verification
//! - PUT  /api/v1/auth/password

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Redirect},
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::net::IpAddr;

use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::models::User;
use crate::services::{AuthResponse, LoginInput, OAuthProvider, RegisterInput, ServiceError};

const OAUTH_STATE_COOKIE: &str = "oauth_state";
const OAUTH_STATE_MAX_AGE_SECS: u32 = 600;

#[derive(Debug, Deserialize)]
pub struct TokenRequest {
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub token: String,
    pub new_password: String,
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Debug, Deserialize)]
pub struct OAuthCallbackQuery {
    pub code: String,
    pub state: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    fn new(message: &str) -> Json<Self> {
        Json(Self {
            message: message.to_string(),
        })
    }
}

/// Build public auth routes (no auth required)
pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/verify-email", post(verify_email))
        .route("/forgot-password", post(forgot_password))
        .route("/reset-password", post(reset_password))
        .route("/oauth/{provider}", get(oauth_redirect))
        .route("/oauth/{provider}/callback", get(oauth_callback))
}

/// Build protected auth routes (requires auth middleware)
pub fn protected_router() -> Router<AppState> {
    Router::new()
        .route("/me", get(me))
        .route("/resend-verification", post(resend_verification))
        .route("/password", put(change_password))
}

/// POST /api/v1/auth/register
async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterInput>,
) -> Result<impl IntoResponse, ApiError> {
    let response = state.auth_service.register(body).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// POST /api/v1/auth/login
///
/// Rate limited per IP (10 per minute) and per username (5 failures per
/// 15 minutes).
async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<LoginInput>,
) -> Result<Json<AuthResponse>, ApiError> {
    if let Some(ip) = extract_ip_address(&headers) {
        if state.rate_limiter.is_ip_limited(ip).await {
            tracing::warn!(%ip, "Login rejected: IP rate limit exceeded");
            return Err(ApiError::with_details(
                "RATE_LIMIT",
                "Too many requests, please try again later",
                serde_json::json!({"retry_after": 60}),
            ));
        }
        state.rate_limiter.record_ip_request(ip).await;
    }

    let username = body.username_or_email.trim().to_string();
    if state.rate_limiter.is_username_limited(&username).await {
        tracing::warn!(username = %username, "Login rejected: too many failed attempts");
        return Err(ApiError::with_details(
            "RATE_LIMIT",
            "Too many failed login attempts, please try again in 15 minutes",
            serde_json::json!({"retry_after": 900}),
        ));
    }

    match state.auth_service.login(body).await {
        Ok(response) => {
            state.rate_limiter.clear_username_attempts(&username).await;
            Ok(Json(response))
        }
        Err(ServiceError::Unauthorized(msg)) => {
            state.rate_limiter.record_failed_attempt(&username).await;
            Err(ApiError::unauthorized(msg))
        }
        Err(e) => Err(e.into()),
    }
}

/// POST /api/v1/auth/verify-email
async fn verify_email(
    State(state): State<AppState>,
    Json(body): Json<TokenRequest>,
) -> Result<Json<User>, ApiError> {
    Ok(Json(state.auth_service.verify_email(&body.token).await?))
}

/// POST /api/v1/auth/forgot-password
///
/// Always answers the same way so the endpoint can't be used to probe emails.
async fn forgot_password(
    State(state): State<AppState>,
    Json(body): Json<ForgotPasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.auth_service.forgot_password(&body.email).await?;
    Ok(MessageResponse::new(
        "If the email is registered, a reset link has been sent",
    ))
}

/// POST /api/v1/auth/reset-password
async fn reset_password(
    State(state): State<AppState>,
    Json(body): Json<ResetPasswordRequest>,
) -> Result<StatusCode, ApiError> {
    state
        .auth_service
        .reset_password(&body.token, &body.new_password)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/auth/me
async fn me(user: AuthenticatedUser) -> Json<User> {
    Json(user.0)
}

/// POST /api/v1/auth/resend-verification
async fn resend_verification(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<MessageResponse>, ApiError> {
    state.auth_service.resend_verification(&user.0).await?;
    Ok(MessageResponse::new("Verification email sent"))
}

/// PUT /api/v1/auth/password
async fn change_password(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<ChangePasswordRequest>,
) -> Result<StatusCode, ApiError> {
    state
        .auth_service
        .change_password(&user.0, &body.current_password, &body.new_password)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/auth/oauth/{provider}
///
/// Redirects to the provider. A random state value is kept in a short-lived
/// cookie and checked on the callback.
async fn oauth_redirect(
    State(state): State<AppState>,
    Path(provider): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let csrf_state = uuid::Uuid::new_v4().simple().to_string();
    let url = state
        .auth_service
        .oauth_authorize_url(&provider, &csrf_state)?;

    let cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        OAUTH_STATE_COOKIE, csrf_state, OAUTH_STATE_MAX_AGE_SECS
    );
    let mut headers = HeaderMap::new();
    headers.insert(
        header::SET_COOKIE,
        HeaderValue::from_str(&cookie)
            .map_err(|_| ApiError::internal_error("Failed to build state cookie"))?,
    );

    Ok((headers, Redirect::temporary(&url)))
}

/// GET /api/v1/auth/oauth/{provider}/callback?code=&state=
async fn oauth_callback(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    Query(query): Query<OAuthCallbackQuery>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    if provider.parse::<OAuthProvider>().is_err() {
        return Err(ApiError::not_found(format!(
            "Unknown OAuth provider '{}'",
            provider
        )));
    }

    let expected = read_cookie(&headers, OAUTH_STATE_COOKIE);
    match (expected.as_deref(), query.state.as_deref()) {
        (Some(expected), Some(actual)) if expected == actual => {}
        _ => return Err(ApiError::validation_error("Invalid OAuth state")),
    }

    let response = state.auth_service.oauth_login(&provider, &query.code).await?;

    let mut response_headers = HeaderMap::new();
    response_headers.insert(
        header::SET_COOKIE,
        HeaderValue::from_static("oauth_state=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0"),
    );
    Ok((response_headers, Json(response)))
}

/// Client IP as reported by a reverse proxy
fn extract_ip_address(headers: &HeaderMap) -> Option<IpAddr> {
    if let Some(forwarded) = headers.get("x-forwarded-for") {
        if let Ok(forwarded_str) = forwarded.to_str() {
            if let Some(ip) = forwarded_str.split(',').next() {
                return ip.trim().parse().ok();
            }
        }
    }

    headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
}

fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    let raw = headers.get(header::COOKIE)?.to_str().ok()?;
    raw.split(';').find_map(|cookie| {
        let (key, value) = cookie.trim().split_once('=')?;
        (key == name).then(|| value.to_string())
    })
}
