//! Emits one audit event per HTTP request, independent of whatever
//! application-level events a handler logs itself. Covers the outer HTTP
//! outcome (status code, latency) that no single service call sees.

use std::time::Instant;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use auth_core::audit::{AuditCategory, AuditEvent, AuditOutcome, AuditSeverity};
use crate::middleware::auth::AuthenticatedUser;
use crate::AppState;

fn client_ip(req: &Request) -> Option<String> {
    req.headers()
        .get("x-forwarded-for")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.split(',').next())
        .map(|s| s.trim().to_string())
}

pub async fn audit_middleware(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let query = req.uri().query().map(|s| s.to_string());
    let user_agent = req
        .headers()
        .get("user-agent")
        .and_then(|h| h.to_str().ok())
        .map(|s| s.to_string());
    let ip_address = client_ip(&req);

    let response = next.run(req).await;

    let actor = response
        .extensions()
        .get::<AuthenticatedUser>()
        .map(|u| u.id);
    let status = response.status();
    let duration = start.elapsed();

    let (severity, outcome) = if status.is_server_error() {
        (AuditSeverity::Critical, AuditOutcome::Failure { reason: status.to_string() })
    } else if status.is_client_error() {
        (AuditSeverity::Warning, AuditOutcome::Failure { reason: status.to_string() })
    } else {
        (AuditSeverity::Info, AuditOutcome::Success)
    };

    let mut event = AuditEvent::new(AuditCategory::System, format!("HTTP {method} {path}"), severity)
        .with_context(ip_address, user_agent)
        .with_metadata(serde_json::json!({
            "method": method.to_string(),
            "path": path,
            "query": query,
            "status": status.as_u16(),
            "duration_ms": duration.as_millis(),
        }));
    if let Some(actor) = actor {
        event = event.with_actor(actor);
    }
    event = match outcome {
        AuditOutcome::Success => event,
        AuditOutcome::Failure { reason } => event.failure(reason),
    };

    let audit = state.audit.clone();
    tokio::spawn(async move {
        audit.log(event).await;
    });

    response
}
