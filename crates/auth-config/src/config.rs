//! Core configuration structures

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use validator::Validate;

#[cfg(test)]
use proptest_derive::Arbitrary;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub security: SecurityConfig,
    pub features: FeatureConfig,
    pub logging: LoggingConfig,
    pub external_services: ExternalServicesConfig,
    #[validate]
    pub auth: AuthConfig,
    pub ratelimit: RateLimitSettings,
    pub oauth: OAuthConfig,
    pub saml: SamlConfig,
    pub environment: Environment,
}

/// §6.2's `auth.*` knobs: active strategy kind and the Token Engine's
/// lifetimes/signing key.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AuthConfig {
    pub auth_type: AuthType,
    #[validate(range(min = 1))]
    pub access_lifetime_seconds: u64,
    #[validate(range(min = 1))]
    pub refresh_lifetime_seconds: u64,
    #[serde(skip_serializing)]
    pub signing_key: secrecy::Secret<String>,
    pub revoke_refresh_on_rotation: bool,
    pub password_hash_cost: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthType {
    Normal,
    OAuth,
    Saml,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitSettings {
    pub enabled: bool,
    pub login: RateLimitRule,
    pub register: RateLimitRule,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitRule {
    pub max: u64,
    pub window_seconds: u64,
}

/// §6.2's `oauth.providers[name]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthConfig {
    pub providers: HashMap<String, OAuthProviderConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthProviderConfig {
    pub provider_type: String,
    pub client_id: String,
    #[serde(skip_serializing)]
    pub client_secret: secrecy::Secret<String>,
    pub redirect_uri: String,
    pub scopes: Vec<String>,
    pub auth_url: Option<String>,
    pub token_url: Option<String>,
    pub userinfo_url: Option<String>,
}

/// §6.2's `saml.*` knobs: the local service provider's identity plus the
/// configured IdPs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SamlConfig {
    pub service_provider_entity_id: String,
    pub assertion_consumer_service_url: String,
    pub certificate_path: Option<String>,
    pub private_key_path: Option<String>,
    pub providers: HashMap<String, SamlProviderConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SamlProviderConfig {
    pub provider_type: String,
    pub entity_id: String,
    pub sso_url: String,
    pub slo_url: Option<String>,
    pub certificate: String,
    pub attribute_mapping: Option<HashMap<String, String>>,
    pub group_attribute: Option<String>,
    pub group_sync: bool,
    pub jit_provisioning: bool,
    pub metadata_url: Option<String>,
}

/// Gates mock providers: only `Development`/`Test` may use the mock SAML
/// adapter (spec §4.4.3's "Production must not use the mock").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Production,
    Development,
    Test,
}

impl Environment {
    pub fn allows_mock_providers(&self) -> bool {
        !matches!(self, Environment::Production)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ServerConfig {
    #[validate(range(min = 1, max = 65535))]
    pub port: u16,
    pub host: String,
    pub workers: Option<usize>,
    pub max_connections: Option<u32>,
    pub timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct DatabaseConfig {
    #[serde(skip_serializing)]
    pub mysql_url: secrecy::Secret<String>,
    pub sqlite_url: Option<String>,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connection_timeout: u64,
    pub idle_timeout: u64,
    pub max_lifetime: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SecurityConfig {
    #[serde(skip_serializing)]
    pub jwt_secret: secrecy::Secret<String>,
    pub jwt_expiry_minutes: u32,
    pub refresh_token_expiry_days: u32,
    pub password_min_length: u8,
    pub max_login_attempts: u32,
    pub lockout_duration_minutes: u32,
    pub require_mfa: bool,
    pub allowed_origins: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureConfig {
    pub enabled_features: HashMap<String, bool>,
    pub feature_limits: HashMap<String, u64>,
    pub tenant_overrides: HashMap<String, HashMap<String, serde_json::Value>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(test, derive(Arbitrary))]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
    pub output: String,
    pub structured: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExternalServicesConfig {
    pub smtp: Option<SmtpConfig>,
    pub sms: Option<SmsConfig>,
    pub redis: Option<RedisConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    #[serde(skip_serializing)]
    pub password: secrecy::Secret<String>,
    pub from_address: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmsConfig {
    pub provider: String,
    #[serde(skip_serializing)]
    pub api_key: secrecy::Secret<String>,
    pub from_number: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(test, derive(Arbitrary))]
pub struct RedisConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_seconds: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                port: 8081,
                host: "0.0.0.0".to_string(),
                workers: None,
                max_connections: Some(1000),
                timeout_seconds: Some(30),
            },
            database: DatabaseConfig {
                mysql_url: secrecy::Secret::new("mysql://localhost/auth".to_string()),
                sqlite_url: Some(":memory:".to_string()),
                max_connections: 10,
                min_connections: 1,
                connection_timeout: 30,
                idle_timeout: 600,
                max_lifetime: 3600,
            },
            security: SecurityConfig {
                jwt_secret: secrecy::Secret::new("change-me-in-production".to_string()),
                jwt_expiry_minutes: 15,
                refresh_token_expiry_days: 30,
                password_min_length: 8,
                max_login_attempts: 5,
                lockout_duration_minutes: 15,
                require_mfa: false,
                allowed_origins: vec!["http://localhost:3000".to_string()],
            },
            features: FeatureConfig {
                enabled_features: HashMap::new(),
                feature_limits: HashMap::new(),
                tenant_overrides: HashMap::new(),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                format: "json".to_string(),
                output: "stdout".to_string(),
                structured: true,
            },
            external_services: ExternalServicesConfig {
                smtp: None,
                sms: None,
                redis: None,
            },
            auth: AuthConfig {
                auth_type: AuthType::Normal,
                access_lifetime_seconds: 900,
                refresh_lifetime_seconds: 604_800,
                signing_key: secrecy::Secret::new("change-me-in-production".to_string()),
                revoke_refresh_on_rotation: true,
                password_hash_cost: 10,
            },
            ratelimit: RateLimitSettings {
                enabled: true,
                login: RateLimitRule {
                    max: 5,
                    window_seconds: 15 * 60,
                },
                register: RateLimitRule {
                    max: 3,
                    window_seconds: 60 * 60,
                },
            },
            oauth: OAuthConfig {
                providers: HashMap::new(),
            },
            saml: SamlConfig {
                service_provider_entity_id: "urn:auth-identity-service:sp".to_string(),
                assertion_consumer_service_url: "http://localhost:8081/auth/saml/callback".to_string(),
                certificate_path: None,
                private_key_path: None,
                providers: HashMap::new(),
            },
            environment: Environment::Development,
        }
    }
}