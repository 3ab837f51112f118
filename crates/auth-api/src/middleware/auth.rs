//! JWT authentication middleware. Validates the access token against
//! `UserService::validate` (signature, expiry, and blacklist) and inserts
//! the caller's identity into request extensions for handlers to pull out.

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::error::ApiError;
use crate::AppState;
use auth_core::error::AuthError;

#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub id: Uuid,
    pub roles: Vec<String>,
}

fn bearer_token(req: &Request) -> Option<&str> {
    req.headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
}

pub async fn jwt_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(&req).ok_or(AuthError::InvalidCredentials)?;
    let (user_id, roles) = state.users.validate(token).await?;
    let authenticated = AuthenticatedUser { id: user_id, roles };
    req.extensions_mut().insert(authenticated.clone());

    let mut response = next.run(req).await;
    // Re-attached to the response so outer layers (the audit middleware)
    // can read it without taking ownership of the request.
    response.extensions_mut().insert(authenticated);
    Ok(response)
}
