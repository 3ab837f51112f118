//! Profile self-service and the administrative user/role CRUD surface
//! (spec §4.5). Every route here sits behind `jwt_auth`; authorization
//! between "my own profile" and "any user" is left to the caller's roles,
//! enforced upstream by whichever reverse proxy or gateway owns RBAC.

use std::sync::Arc;

use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use auth_core::models::user::{UpdateProfileRequest, UpdateUserRequest, User, UserListFilters, UserListPage};

use crate::error::ApiError;
use crate::middleware::auth::AuthenticatedUser;
use crate::AppUserService;

#[derive(Debug, Deserialize)]
pub struct ListUsersQuery {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_size")]
    pub size: u32,
    pub search: Option<String>,
    pub role: Option<String>,
    pub active: Option<bool>,
}

fn default_page() -> u32 {
    1
}

fn default_size() -> u32 {
    20
}

/// Fetch the caller's own profile.
#[utoipa::path(
    get,
    path = "/users/me",
    responses((status = 200, description = "Current user", body = User)),
    tag = "User Management",
    security(("bearer_auth" = []))
)]
pub async fn me(
    State(users): State<Arc<AppUserService>>,
    Extension(actor): Extension<AuthenticatedUser>,
) -> Result<Json<User>, ApiError> {
    let user = users.get_user(actor.id).await?;
    Ok(Json(user))
}

/// Update the caller's own profile fields. Cannot touch `organization` or
/// role membership, unlike the admin `update_user` route.
#[utoipa::path(
    patch,
    path = "/users/me",
    request_body = UpdateProfileRequest,
    responses((status = 200, description = "Updated", body = User)),
    tag = "User Management",
    security(("bearer_auth" = []))
)]
pub async fn update_me(
    State(users): State<Arc<AppUserService>>,
    Extension(actor): Extension<AuthenticatedUser>,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<Json<User>, ApiError> {
    let user = users.update_profile(actor.id, payload).await?;
    Ok(Json(user))
}

/// List users with optional search/role/active filters, paginated.
#[utoipa::path(
    get,
    path = "/users",
    responses((status = 200, description = "Page of users", body = UserListPage)),
    tag = "User Management",
    security(("bearer_auth" = []))
)]
pub async fn list_users(
    State(users): State<Arc<AppUserService>>,
    Query(query): Query<ListUsersQuery>,
) -> Result<Json<UserListPage>, ApiError> {
    let page = users
        .list_users(
            query.page,
            query.size,
            UserListFilters {
                search: query.search,
                role: query.role,
                active: query.active,
            },
        )
        .await?;
    Ok(Json(page))
}

/// Fetch any user by id.
#[utoipa::path(
    get,
    path = "/users/{id}",
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "User", body = User),
        (status = 404, description = "Not found"),
    ),
    tag = "User Management",
    security(("bearer_auth" = []))
)]
pub async fn get_user(
    State(users): State<Arc<AppUserService>>,
    Path(id): Path<Uuid>,
) -> Result<Json<User>, ApiError> {
    let user = users.get_user(id).await?;
    Ok(Json(user))
}

/// Update any user's fields, including `organization`.
#[utoipa::path(
    patch,
    path = "/users/{id}",
    params(("id" = Uuid, Path, description = "User ID")),
    request_body = UpdateUserRequest,
    responses((status = 200, description = "Updated", body = User)),
    tag = "User Management",
    security(("bearer_auth" = []))
)]
pub async fn update_user(
    State(users): State<Arc<AppUserService>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateUserRequest>,
) -> Result<Json<User>, ApiError> {
    let user = users.update_user(id, payload).await?;
    Ok(Json(user))
}

/// Soft-delete (deactivate) a user.
#[utoipa::path(
    delete,
    path = "/users/{id}",
    params(("id" = Uuid, Path, description = "User ID")),
    responses((status = 204, description = "Deleted")),
    tag = "User Management",
    security(("bearer_auth" = []))
)]
pub async fn delete_user(
    State(users): State<Arc<AppUserService>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    users.delete_user(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Grant a role to a user by name.
#[utoipa::path(
    post,
    path = "/users/{id}/roles/{role}",
    params(
        ("id" = Uuid, Path, description = "User ID"),
        ("role" = String, Path, description = "Role name"),
    ),
    responses((status = 204, description = "Role assigned")),
    tag = "User Management",
    security(("bearer_auth" = []))
)]
pub async fn assign_role(
    State(users): State<Arc<AppUserService>>,
    Path((id, role)): Path<(Uuid, String)>,
) -> Result<StatusCode, ApiError> {
    users.assign_role(id, &role).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Revoke a role from a user by name.
#[utoipa::path(
    delete,
    path = "/users/{id}/roles/{role}",
    params(
        ("id" = Uuid, Path, description = "User ID"),
        ("role" = String, Path, description = "Role name"),
    ),
    responses((status = 204, description = "Role removed")),
    tag = "User Management",
    security(("bearer_auth" = []))
)]
pub async fn remove_role(
    State(users): State<Arc<AppUserService>>,
    Path((id, role)): Path<(Uuid, String)>,
) -> Result<StatusCode, ApiError> {
    users.remove_role(id, &role).await?;
    Ok(StatusCode::NO_CONTENT)
}
