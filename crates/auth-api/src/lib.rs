//! HTTP transport layer: binds `auth_core::services::UserService` to axum
//! routes, maps `AuthError` to HTTP responses, and wraps the router in the
//! request-id / security-header / audit middleware stack.

use std::sync::Arc;

use auth_cache::MultiLevelCache;
use auth_core::services::UserService;
use auth_db::{MySqlGroupRepository, MySqlRoleRepository, MySqlUserRepository};
use axum::extract::FromRef;
use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod router;

/// The concrete `UserService` instantiation this binary wires up. Every
/// handler in this crate is generic over nothing: it takes this one type.
pub type AppUserService =
    UserService<MySqlUserRepository, MySqlRoleRepository, MultiLevelCache>;

#[derive(Clone)]
pub struct AppState {
    pub users: Arc<AppUserService>,
    pub audit: Arc<dyn auth_core::audit::AuditLogger>,
}

impl FromRef<AppState> for Arc<AppUserService> {
    fn from_ref(state: &AppState) -> Self {
        state.users.clone()
    }
}

impl FromRef<AppState> for Arc<dyn auth_core::audit::AuditLogger> {
    fn from_ref(state: &AppState) -> Self {
        state.audit.clone()
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::auth::register,
        handlers::auth::login,
        handlers::auth::refresh,
        handlers::auth::logout,
        handlers::auth::change_password,
        handlers::users::me,
        handlers::users::update_me,
        handlers::users::list_users,
        handlers::users::get_user,
        handlers::users::update_user,
        handlers::users::delete_user,
        handlers::users::assign_role,
        handlers::users::remove_role,
        handlers::health::health_check,
    ),
    components(schemas(
        auth_core::models::user::User,
        auth_core::models::user::UpdateUserRequest,
        auth_core::models::user::UpdateProfileRequest,
        auth_core::models::user::UserListPage,
        crate::error::ErrorResponse,
        crate::error::FieldError,
    )),
    tags(
        (name = "Authentication", description = "Registration, login, session lifecycle"),
        (name = "User Management", description = "Profile and admin user operations"),
        (name = "Health", description = "Service health check"),
    ),
    info(
        title = "Auth Identity Service API",
        version = "0.1.0",
        description = "Authentication core: strategy engine, token issuance, rate limiting",
    )
)]
pub struct ApiDoc;

pub fn app(state: AppState) -> Router {
    router::api_router()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .with_state(state)
}
