//! Maps `auth_core::AuthError` onto HTTP responses. One JSON shape for every
//! failure so clients parse errors uniformly regardless of which layer
//! produced them.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use auth_core::error::AuthError;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    /// Error code for programmatic handling.
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<FieldError>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    /// Machine-readable active strategy kind, set only for
    /// `WRONG_AUTH_TYPE` (spec §7: "409 with machine-readable active_kind").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_kind: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

pub struct ApiError {
    pub inner: AuthError,
    pub request_id: Option<Uuid>,
}

impl ApiError {
    pub fn new(error: AuthError) -> Self {
        Self {
            inner: error,
            request_id: None,
        }
    }

    pub fn with_request_id(mut self, request_id: Uuid) -> Self {
        self.request_id = Some(request_id);
        self
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        // Every branch folds to the same message the core already produces
        // for credential failures, so the transport edge adds no new way to
        // distinguish "wrong password" from "no such user" (spec §4.4.1).
        let (status, code, message) = match &self.inner {
            AuthError::InvalidInput { message } => {
                (StatusCode::BAD_REQUEST, "INVALID_INPUT", message.clone())
            }
            AuthError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                "INVALID_CREDENTIALS",
                "the provided credentials are invalid".to_string(),
            ),
            AuthError::UserInactive => (
                StatusCode::FORBIDDEN,
                "USER_INACTIVE",
                "this account is inactive".to_string(),
            ),
            AuthError::AlreadyExists { message } => {
                (StatusCode::CONFLICT, "ALREADY_EXISTS", message.clone())
            }
            AuthError::NotFound => (
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                "resource not found".to_string(),
            ),
            AuthError::Expired => (
                StatusCode::UNAUTHORIZED,
                "EXPIRED",
                "token has expired".to_string(),
            ),
            AuthError::Revoked => (
                StatusCode::UNAUTHORIZED,
                "REVOKED",
                "token has been revoked".to_string(),
            ),
            AuthError::RateLimited { retry_after_secs } => (
                StatusCode::TOO_MANY_REQUESTS,
                "RATE_LIMITED",
                format!("rate limited, retry after {retry_after_secs}s"),
            ),
            AuthError::InvalidState => (
                StatusCode::BAD_REQUEST,
                "INVALID_STATE",
                "invalid or expired authentication state".to_string(),
            ),
            AuthError::Federation { provider } => (
                StatusCode::BAD_GATEWAY,
                "FEDERATION_ERROR",
                format!("identity provider '{provider}' request failed"),
            ),
            AuthError::WrongAuthType { active_kind } => (
                StatusCode::CONFLICT,
                "WRONG_AUTH_TYPE",
                format!("this instance is configured for '{active_kind}' authentication"),
            ),
            AuthError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "an internal error occurred".to_string(),
            ),
        };

        let active_kind = match &self.inner {
            AuthError::WrongAuthType { active_kind } => Some(active_kind.clone()),
            _ => None,
        };

        let body = ErrorResponse {
            code: code.to_string(),
            message,
            fields: None,
            request_id: self.request_id.map(|id| id.to_string()),
            active_kind,
        };

        (status, Json(body)).into_response()
    }
}

impl From<AuthError> for ApiError {
    fn from(inner: AuthError) -> Self {
        ApiError::new(inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[tokio::test]
    async fn rate_limited_maps_to_429_with_retry_after_message() {
        let err = ApiError::new(AuthError::RateLimited { retry_after_secs: 42 });
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let parsed: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(parsed.code, "RATE_LIMITED");
        assert!(parsed.message.contains("42"));
    }

    #[test]
    fn invalid_credentials_maps_to_401() {
        let err = ApiError::new(AuthError::InvalidCredentials);
        assert_eq!(err.into_response().status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn wrong_auth_type_maps_to_409_with_active_kind() {
        let err = ApiError::new(AuthError::WrongAuthType {
            active_kind: "saml".to_string(),
        });
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let parsed: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(parsed.code, "WRONG_AUTH_TYPE");
        assert_eq!(parsed.active_kind.as_deref(), Some("saml"));
    }
}
