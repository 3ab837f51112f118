//! Registration, login, token lifecycle, and the OAuth/SAML second-phase
//! callbacks. Thin: every handler's job is extract request -> call
//! `UserService` -> map the result (or `AuthError`) to JSON.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{ConnectInfo, Path, Query, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use auth_core::models::token::TokenPair;
use auth_core::models::user::User;
use auth_core::services::strategies::{AuthRequest, AuthResult, CallbackRequest, StrategyKind};

use crate::error::ApiError;
use crate::middleware::auth::AuthenticatedUser;
use crate::AppUserService;

fn client_ip(headers: &HeaderMap, addr: SocketAddr) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.split(',').next())
        .map(|s| s.trim().to_string())
        .unwrap_or_else(|| addr.ip().to_string())
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub given_name: Option<String>,
    pub family_name: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub new_password: String,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct AuthResponse {
    pub user: User,
    pub tokens: TokenPair,
}

#[derive(Debug, Serialize)]
pub struct RedirectResponse {
    pub authorization_url: String,
    pub state: String,
}

#[derive(Debug, Serialize)]
pub struct SamlChallengeResponse {
    pub saml_request: String,
    pub sso_url: String,
}

#[derive(Debug, Deserialize)]
pub struct OAuthCallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SamlCallbackRequest {
    #[serde(rename = "SAMLResponse")]
    pub saml_response: String,
}

#[derive(Debug, Deserialize)]
pub struct SamlStartQuery {
    pub organization: Option<String>,
}

/// Register a new local-password account.
#[utoipa::path(
    post,
    path = "/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 200, description = "Registration successful", body = AuthResponse),
        (status = 409, description = "Email already registered"),
        (status = 400, description = "Validation error"),
        (status = 429, description = "Rate limit exceeded"),
    ),
    tag = "Authentication"
)]
pub async fn register(
    State(users): State<Arc<AppUserService>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(payload): Json<RegisterRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let ip = client_ip(&headers, addr);
    let (user, tokens) = users
        .register(
            &ip,
            &payload.email,
            &payload.password,
            payload.given_name,
            payload.family_name,
            payload.phone,
        )
        .await?;
    info!(user_id = %user.id, "registration succeeded");
    Ok(Json(AuthResponse { user, tokens }))
}

/// Authenticate with email and password.
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 401, description = "Invalid credentials"),
        (status = 429, description = "Rate limit exceeded"),
    ),
    tag = "Authentication"
)]
pub async fn login(
    State(users): State<Arc<AppUserService>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let ip = client_ip(&headers, addr);
    let (user, tokens) = users.login(&ip, &payload.email, &payload.password).await?;
    Ok(Json(AuthResponse { user, tokens }))
}

/// Exchange a refresh token for a new access/refresh pair.
#[utoipa::path(
    post,
    path = "/auth/refresh",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "Refreshed", body = TokenPair),
        (status = 401, description = "Refresh token expired or revoked"),
    ),
    tag = "Authentication"
)]
pub async fn refresh(
    State(users): State<Arc<AppUserService>>,
    Json(payload): Json<RefreshRequest>,
) -> Result<Json<TokenPair>, ApiError> {
    let tokens = users.refresh(&payload.refresh_token).await?;
    Ok(Json(tokens))
}

/// Revoke the bearer token used to authenticate this request. Always
/// returns success: logout never reveals whether the token was already
/// invalid.
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses((status = 204, description = "Logged out")),
    tag = "Authentication",
    security(("bearer_auth" = []))
)]
pub async fn logout(State(users): State<Arc<AppUserService>>, headers: HeaderMap) -> axum::http::StatusCode {
    if let Some(token) = bearer_token(&headers) {
        users.logout(token).await;
    }
    axum::http::StatusCode::NO_CONTENT
}

/// Change the authenticated user's password, revoking every other session.
#[utoipa::path(
    post,
    path = "/auth/change-password",
    request_body = ChangePasswordRequest,
    responses(
        (status = 204, description = "Password changed"),
        (status = 401, description = "Old password incorrect"),
    ),
    tag = "Authentication",
    security(("bearer_auth" = []))
)]
pub async fn change_password(
    State(users): State<Arc<AppUserService>>,
    actor: axum::Extension<AuthenticatedUser>,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<axum::http::StatusCode, ApiError> {
    users
        .change_password(actor.0.id, &payload.old_password, &payload.new_password)
        .await?;
    Ok(axum::http::StatusCode::NO_CONTENT)
}

/// Begin an OAuth authorization-code flow for the named provider.
pub async fn oauth_start(
    State(users): State<Arc<AppUserService>>,
    Path(provider): Path<String>,
) -> Result<Json<RedirectResponse>, ApiError> {
    let result = users
        .login_with(
            StrategyKind::OAuth,
            AuthRequest {
                provider: Some(provider),
                ..Default::default()
            },
        )
        .await?;
    match result {
        AuthResult::Redirect { authorization_url, state } => {
            Ok(Json(RedirectResponse { authorization_url, state }))
        }
        _ => Err(ApiError::new(auth_core::error::AuthError::Internal)),
    }
}

/// Complete an OAuth authorization-code flow.
pub async fn oauth_callback(
    State(users): State<Arc<AppUserService>>,
    Query(params): Query<OAuthCallbackParams>,
) -> Result<Json<AuthResponse>, ApiError> {
    let result = users
        .callback(
            StrategyKind::OAuth,
            CallbackRequest {
                code: params.code,
                state: params.state,
                saml_response: None,
            },
        )
        .await;
    match &result {
        Ok(AuthResult::Complete { user, .. }) => info!(user_id = %user.id, "oauth callback succeeded"),
        Err(e) => warn!(error = ?e, "oauth callback failed"),
        _ => {}
    }
    match result? {
        AuthResult::Complete { user, tokens } => Ok(Json(AuthResponse { user, tokens })),
        _ => Err(ApiError::new(auth_core::error::AuthError::Internal)),
    }
}

/// Issue a SAML `AuthnRequest` for the browser to POST to the IdP.
pub async fn saml_start(
    State(users): State<Arc<AppUserService>>,
    Path(provider): Path<String>,
    Query(query): Query<SamlStartQuery>,
) -> Result<Json<SamlChallengeResponse>, ApiError> {
    let result = users
        .login_with(
            StrategyKind::SAML,
            AuthRequest {
                organization: query.organization.or(Some(provider)),
                ..Default::default()
            },
        )
        .await?;
    match result {
        AuthResult::SamlChallenge { saml_request, sso_url } => {
            Ok(Json(SamlChallengeResponse { saml_request, sso_url }))
        }
        _ => Err(ApiError::new(auth_core::error::AuthError::Internal)),
    }
}

/// Assertion Consumer Service endpoint: accepts the IdP's SAML response.
pub async fn saml_callback(
    State(users): State<Arc<AppUserService>>,
    Json(payload): Json<SamlCallbackRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let result = users
        .callback(
            StrategyKind::SAML,
            CallbackRequest {
                code: None,
                state: None,
                saml_response: Some(payload.saml_response),
            },
        )
        .await?;
    match result {
        AuthResult::Complete { user, tokens } => Ok(Json(AuthResponse { user, tokens })),
        _ => Err(ApiError::new(auth_core::error::AuthError::Internal)),
    }
}
