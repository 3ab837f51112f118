//! The closed set of error kinds the authentication core can surface.
//!
//! Errors are wrapped, not replaced, as they cross layers: callers that need
//! the cause chain for logging should hold onto the original error before
//! converting it into one of these kinds.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("invalid input: {message}")]
    InvalidInput { message: String },

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("user is inactive")]
    UserInactive,

    #[error("already exists: {message}")]
    AlreadyExists { message: String },

    #[error("not found")]
    NotFound,

    #[error("expired")]
    Expired,

    #[error("revoked")]
    Revoked,

    #[error("rate limited, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("invalid state")]
    InvalidState,

    #[error("federation error with provider {provider}")]
    Federation { provider: String },

    #[error("wrong auth type, active kind is {active_kind}")]
    WrongAuthType { active_kind: String },

    #[error("internal error")]
    Internal,
}

impl AuthError {
    /// Retryable per the propagation policy: federation and internal errors
    /// may be retried once by the transport edge, nothing else.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AuthError::Federation { .. } | AuthError::Internal)
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            AuthError::InvalidInput { .. } => "invalid_input",
            AuthError::InvalidCredentials => "invalid_credentials",
            AuthError::UserInactive => "user_inactive",
            AuthError::AlreadyExists { .. } => "already_exists",
            AuthError::NotFound => "not_found",
            AuthError::Expired => "expired",
            AuthError::Revoked => "revoked",
            AuthError::RateLimited { .. } => "rate_limited",
            AuthError::InvalidState => "invalid_state",
            AuthError::Federation { .. } => "federation",
            AuthError::WrongAuthType { .. } => "wrong_auth_type",
            AuthError::Internal => "internal",
        }
    }
}

impl From<sqlx::Error> for AuthError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => AuthError::NotFound,
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                AuthError::AlreadyExists {
                    message: "duplicate entry".to_string(),
                }
            }
            _ => AuthError::Internal,
        }
    }
}

impl From<validator::ValidationErrors> for AuthError {
    fn from(err: validator::ValidationErrors) -> Self {
        AuthError::InvalidInput {
            message: err.to_string(),
        }
    }
}
