use axum::{response::IntoResponse, Json};
use serde_json::json;

/// Liveness/readiness probe. Never touches the database or cache, so it
/// stays responsive even if dependencies are degraded.
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy")
    ),
    tag = "Health"
)]
pub async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "message": "auth-identity-service is healthy",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
