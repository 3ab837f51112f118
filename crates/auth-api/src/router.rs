use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::handlers::{auth, health, users};
use crate::middleware::{
    audit_middleware, jwt_auth, request_id_middleware, security_headers_middleware,
};
use crate::AppState;

pub fn api_router() -> Router<AppState> {
    let public = Router::new()
        .route("/health", get(health::health_check))
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/refresh", post(auth::refresh))
        .route("/auth/oauth/:provider", get(auth::oauth_start))
        .route("/auth/oauth/callback", get(auth::oauth_callback))
        .route("/auth/saml/:provider", get(auth::saml_start))
        .route("/auth/saml/callback", post(auth::saml_callback));

    let protected = Router::new()
        .route("/auth/logout", post(auth::logout))
        .route("/auth/change-password", post(auth::change_password))
        .route("/users/me", get(users::me).patch(users::update_me))
        .route("/users", get(users::list_users))
        .route(
            "/users/:id",
            get(users::get_user)
                .patch(users::update_user)
                .delete(users::delete_user),
        )
        .route("/users/:id/roles/:role", post(users::assign_role).delete(users::remove_role))
        .route_layer(middleware::from_fn(jwt_auth));

    public
        .merge(protected)
        .layer(middleware::from_fn(audit_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(security_headers_middleware))
        .layer(middleware::from_fn(request_id_middleware))
}
