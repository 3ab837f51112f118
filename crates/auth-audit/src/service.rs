//! Tamper-evident audit trail: each row's hash covers the previous row's
//! hash plus its own content, so altering or deleting a row breaks the
//! chain for everything after it. Persists the same events `UserService`
//! and the transport middleware emit through `auth_core::audit::AuditLogger`.

use async_trait::async_trait;
use auth_core::audit::{AuditEvent, AuditLogger};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use sqlx::{FromRow, MySqlPool};
use tracing::warn;
use uuid::Uuid;

const GENESIS_HASH: &str = "0000000000000000000000000000000000000000000000000000000000000000";

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AuditLog {
    pub id: String,
    pub action: String,
    pub actor_id: String,
    pub resource: String,
    pub metadata: Option<Value>,
    pub timestamp: DateTime<Utc>,
    pub hash: String,
    pub prev_hash: String,
}

#[derive(Debug, Clone)]
pub struct AuditService {
    pool: MySqlPool,
}

impl AuditService {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    pub fn export_cef(&self, log: &AuditLog) -> String {
        format!(
            "CEF:0|AuthPlatform|auth-identity-service|1.0|{}|{}|5|act={} msg={}",
            log.action, log.action, log.actor_id, log.resource
        )
    }

    fn compute_hash(prev_hash: &str, id: Uuid, action: &str, actor_id: Uuid, resource: &str, timestamp: DateTime<Utc>) -> String {
        let content = format!("{prev_hash}{id}{action}{actor_id}{resource}{}", timestamp.to_rfc3339());
        let mut hasher = Sha256::new();
        hasher.update(content.as_bytes());
        hex_encode(&hasher.finalize())
    }

    pub async fn record(
        &self,
        action: &str,
        actor_id: Uuid,
        resource: &str,
        metadata: Option<Value>,
    ) -> Result<AuditLog, sqlx::Error> {
        let prev_log =
            sqlx::query_as::<_, AuditLog>("SELECT * FROM audit_logs ORDER BY timestamp DESC LIMIT 1")
                .fetch_optional(&self.pool)
                .await?;

        let prev_hash = prev_log.map(|l| l.hash).unwrap_or_else(|| GENESIS_HASH.to_string());

        let id = Uuid::new_v4();
        let timestamp = Utc::now();
        let hash = Self::compute_hash(&prev_hash, id, action, actor_id, resource, timestamp);

        let audit_log = AuditLog {
            id: id.to_string(),
            action: action.to_string(),
            actor_id: actor_id.to_string(),
            resource: resource.to_string(),
            metadata,
            timestamp,
            hash,
            prev_hash,
        };

        sqlx::query(
            r#"
            INSERT INTO audit_logs (id, action, actor_id, resource, metadata, timestamp, hash, prev_hash)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&audit_log.id)
        .bind(&audit_log.action)
        .bind(&audit_log.actor_id)
        .bind(&audit_log.resource)
        .bind(&audit_log.metadata)
        .bind(audit_log.timestamp)
        .bind(&audit_log.hash)
        .bind(&audit_log.prev_hash)
        .execute(&self.pool)
        .await?;

        Ok(audit_log)
    }

    /// Walks the full table in timestamp order, recomputing each row's
    /// hash from its content and the previous row's stored hash. Returns
    /// `false` at the first mismatch.
    pub async fn verify_chain(&self) -> Result<bool, sqlx::Error> {
        let rows = sqlx::query_as::<_, AuditLog>("SELECT * FROM audit_logs ORDER BY timestamp ASC")
            .fetch_all(&self.pool)
            .await?;

        let mut expected_prev = GENESIS_HASH.to_string();
        for row in &rows {
            if row.prev_hash != expected_prev {
                return Ok(false);
            }
            let id = Uuid::parse_str(&row.id).unwrap_or_default();
            let actor_id = Uuid::parse_str(&row.actor_id).unwrap_or_default();
            let recomputed = Self::compute_hash(&row.prev_hash, id, &row.action, actor_id, &row.resource, row.timestamp);
            if recomputed != row.hash {
                return Ok(false);
            }
            expected_prev = row.hash.clone();
        }
        Ok(true)
    }
}

#[async_trait]
impl AuditLogger for AuditService {
    async fn log(&self, event: AuditEvent) {
        let actor_id = event.actor_id.unwrap_or_default();
        let resource = event.resource_id.clone().unwrap_or_else(|| event.action.clone());
        if let Err(err) = self.record(&event.action, actor_id, &resource, Some(event.metadata.clone())).await {
            warn!(error = ?err, action = %event.action, "failed to persist audit log entry");
        }
    }
}

fn hex_encode(bytes: &[u8]) -> String {
    use std::fmt::Write;
    let mut s = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        write!(s, "{b:02x}").unwrap();
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn genesis_hash_is_sha256_hex_length() {
        assert_eq!(GENESIS_HASH.len(), 64);
    }

    #[test]
    fn hash_chain_changes_with_prev_hash() {
        let id = Uuid::new_v4();
        let actor = Uuid::new_v4();
        let timestamp = Utc::now();
        let a = AuditService::compute_hash(GENESIS_HASH, id, "login", actor, "user", timestamp);
        let b = AuditService::compute_hash("different-prev", id, "login", actor, "user", timestamp);
        assert_ne!(a, b);
    }

    #[test]
    fn hash_is_deterministic_for_same_inputs() {
        let id = Uuid::new_v4();
        let actor = Uuid::new_v4();
        let timestamp = Utc::now();
        let a = AuditService::compute_hash(GENESIS_HASH, id, "login", actor, "user", timestamp);
        let b = AuditService::compute_hash(GENESIS_HASH, id, "login", actor, "user", timestamp);
        assert_eq!(a, b);
    }
}
