//! SAML 2.0 web-browser SSO strategy. `SamlProviderClient` is a port: this
//! module owns orchestration (provider resolution, `Conditions` window
//! check, attribute mapping, JIT, group sync, session persistence);
//! `auth-protocols` supplies the `quick-xml`-backed adapter that builds
//! `AuthnRequest`s and parses/verifies `Response`s (spec §4.4.3).

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use auth_cache::Cache;
use auth_crypto::PasswordHasher;
use base64::Engine;
use chrono::{DateTime, Utc};

use crate::error::AuthError;
use crate::models::saml::SamlSession;
use crate::repositories::group_repo::GroupRepo;
use crate::repositories::role_repo::RoleRepo;
use crate::repositories::saml_repo::SamlRepo;
use crate::repositories::user_repo::UserRepo;
use crate::services::strategies::jit;
use crate::services::strategies::{AuthRequest, AuthResult, AuthStrategy, CallbackRequest, StrategyKind};
use crate::services::token_service::TokenEngine;

const SESSION_LIFETIME_HOURS: i64 = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamlProviderType {
    Okta,
    Auth0,
    Adfs,
    Shibboleth,
    Custom,
}

#[derive(Debug, Clone)]
pub struct SamlProviderSpec {
    pub name: String,
    pub provider_type: SamlProviderType,
    pub entity_id: String,
    pub sso_url: String,
    pub group_attribute: Option<String>,
    pub group_sync: bool,
    pub jit_provisioning: bool,
}

#[derive(Debug, Clone)]
pub struct ParsedSamlResponse {
    pub issuer: String,
    pub not_before: DateTime<Utc>,
    pub not_on_or_after: DateTime<Utc>,
    pub name_id: String,
    pub session_index: Option<String>,
    pub attributes: HashMap<String, Vec<String>>,
    pub signature_valid: bool,
}

/// One instance per configured provider. The mock adapter substituted in
/// `development`/`test` environments skips signature verification and the
/// IdP round-trip, issuing well-formed synthetic assertions (spec §4.4.3).
#[async_trait]
pub trait SamlProviderClient: Send + Sync {
    fn spec(&self) -> &SamlProviderSpec;
    fn build_authn_request(&self) -> Result<String, AuthError>;
    fn parse_response(&self, decoded_xml: &str) -> Result<ParsedSamlResponse, AuthError>;
}

fn mapped_field(attrs: &HashMap<String, Vec<String>>, provider_type: SamlProviderType, field: &str) -> Option<String> {
    let candidates: &[&str] = match (provider_type, field) {
        (SamlProviderType::Okta, "email") => &["email", "Email", "user.email"],
        (SamlProviderType::Okta, "first_name") => &["firstName", "first_name"],
        (SamlProviderType::Okta, "last_name") => &["lastName", "last_name"],
        (SamlProviderType::Auth0, "email") => &["email"],
        (SamlProviderType::Auth0, "first_name") => &["given_name"],
        (SamlProviderType::Auth0, "last_name") => &["family_name"],
        (SamlProviderType::Adfs, "email") => &["http://schemas.xmlsoap.org/ws/2005/05/identity/claims/emailaddress", "email"],
        (SamlProviderType::Adfs, "first_name") => &["http://schemas.xmlsoap.org/ws/2005/05/identity/claims/givenname", "given_name"],
        (SamlProviderType::Adfs, "last_name") => &["http://schemas.xmlsoap.org/ws/2005/05/identity/claims/surname", "family_name"],
        (SamlProviderType::Shibboleth, "email") => &["urn:oid:0.9.2342.19200300.100.1.3", "mail", "email"],
        (SamlProviderType::Shibboleth, "first_name") => &["urn:oid:2.5.4.42", "givenName"],
        (SamlProviderType::Shibboleth, "last_name") => &["urn:oid:2.5.4.4", "sn"],
        (_, "email") => &["email", "mail"],
        (_, "first_name") => &["given_name", "firstName", "givenName"],
        (_, "last_name") => &["family_name", "lastName", "sn"],
        _ => &[],
    };
    candidates
        .iter()
        .find_map(|key| attrs.get(*key).and_then(|v| v.first()).cloned())
}

pub struct SamlStrategy<U: UserRepo, R: RoleRepo, S: SamlRepo, G: GroupRepo, C: Cache> {
    providers: Vec<Arc<dyn SamlProviderClient>>,
    users: Arc<U>,
    roles: Arc<R>,
    sessions: Arc<S>,
    groups: Arc<G>,
    hasher: PasswordHasher,
    tokens: Arc<TokenEngine<C>>,
}

impl<U: UserRepo, R: RoleRepo, S: SamlRepo, G: GroupRepo, C: Cache> SamlStrategy<U, R, S, G, C> {
    pub fn new(
        providers: Vec<Arc<dyn SamlProviderClient>>,
        users: Arc<U>,
        roles: Arc<R>,
        sessions: Arc<S>,
        groups: Arc<G>,
        hasher: PasswordHasher,
        tokens: Arc<TokenEngine<C>>,
    ) -> Self {
        Self {
            providers,
            users,
            roles,
            sessions,
            groups,
            hasher,
            tokens,
        }
    }

    fn resolve_provider(&self, name: Option<&str>) -> Option<&Arc<dyn SamlProviderClient>> {
        match name {
            Some(name) => self.providers.iter().find(|p| p.spec().name == name),
            None => self.providers.first(),
        }
    }

    fn resolve_provider_by_issuer(&self, issuer: &str) -> Option<&Arc<dyn SamlProviderClient>> {
        self.providers.iter().find(|p| p.spec().entity_id == issuer)
    }

    /// Background sweep for expired SAML sessions (spec §5's cooperative
    /// sweeps).
    pub async fn run_sweeper(self: Arc<Self>) {
        let mut ticker = tokio::time::interval(std::time::Duration::from_secs(600));
        loop {
            ticker.tick().await;
            let _ = self.sessions.delete_expired_sessions().await;
        }
    }
}

#[async_trait]
impl<U: UserRepo, R: RoleRepo, S: SamlRepo, G: GroupRepo, C: Cache> AuthStrategy for SamlStrategy<U, R, S, G, C> {
    fn kind(&self) -> StrategyKind {
        StrategyKind::SAML
    }

    fn validate_config(&self) -> Result<(), AuthError> {
        if self.providers.is_empty() {
            return Err(AuthError::InvalidInput {
                message: "no SAML providers configured".to_string(),
            });
        }
        Ok(())
    }

    async fn authenticate(&self, request: AuthRequest) -> Result<AuthResult, AuthError> {
        let provider = self
            .resolve_provider(request.organization.as_deref())
            .ok_or_else(|| AuthError::InvalidInput {
                message: "no matching SAML provider".to_string(),
            })?;

        let authn_request = provider.build_authn_request()?;
        let saml_request = base64::engine::general_purpose::STANDARD.encode(authn_request);
        Ok(AuthResult::SamlChallenge {
            saml_request,
            sso_url: provider.spec().sso_url.clone(),
        })
    }

    async fn handle_callback(&self, request: CallbackRequest) -> Result<AuthResult, AuthError> {
        let encoded = request.saml_response.ok_or_else(|| AuthError::InvalidInput {
            message: "missing SAML response".to_string(),
        })?;
        let decoded_bytes = base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .map_err(|_| AuthError::InvalidInput {
                message: "malformed SAML response encoding".to_string(),
            })?;
        let decoded_xml = String::from_utf8(decoded_bytes).map_err(|_| AuthError::InvalidInput {
            message: "malformed SAML response encoding".to_string(),
        })?;

        // Parsing happens against whichever provider's parser is cheapest
        // to try; we only need the issuer out of the first successful
        // parse, then resolve the authoritative provider by entity ID.
        let mut parsed: Option<ParsedSamlResponse> = None;
        for provider in &self.providers {
            if let Ok(p) = provider.parse_response(&decoded_xml) {
                parsed = Some(p);
                break;
            }
        }
        let parsed = parsed.ok_or_else(|| AuthError::InvalidInput {
            message: "unparseable SAML response".to_string(),
        })?;

        let provider = self
            .resolve_provider_by_issuer(&parsed.issuer)
            .ok_or_else(|| AuthError::InvalidInput {
                message: "no provider matches issuer".to_string(),
            })?;

        let now = Utc::now();
        if now < parsed.not_before || now >= parsed.not_on_or_after {
            return Err(AuthError::InvalidInput {
                message: "assertion outside validity window".to_string(),
            });
        }

        if !parsed.signature_valid {
            return Err(AuthError::InvalidInput {
                message: "assertion signature invalid".to_string(),
            });
        }

        let spec = provider.spec();
        let email = mapped_field(&parsed.attributes, spec.provider_type, "email")
            .unwrap_or_else(|| parsed.name_id.clone());
        let first_name = mapped_field(&parsed.attributes, spec.provider_type, "first_name");
        let last_name = mapped_field(&parsed.attributes, spec.provider_type, "last_name");
        let groups = spec
            .group_attribute
            .as_ref()
            .and_then(|attr| parsed.attributes.get(attr))
            .cloned();

        let mut user = match self.users.get_by_email(&email).await? {
            Some(user) => user,
            None => {
                if !spec.jit_provisioning {
                    return Err(AuthError::InvalidInput {
                        message: "JIT provisioning disabled for this provider".to_string(),
                    });
                }
                jit::provision(
                    &self.users,
                    &self.roles,
                    &self.hasher,
                    &email,
                    first_name,
                    last_name,
                    &format!("saml:{}", spec.name),
                )
                .await?
            }
        };

        if spec.group_sync {
            if let Some(groups) = groups {
                self.groups.set_user_groups(user.id, groups.clone()).await?;
                let current_roles = self.roles.get_user_roles(user.id).await?;
                for role in &groups {
                    if !current_roles.contains(role) {
                        self.roles.assign_by_name(user.id, role).await?;
                    }
                }
                for role in &current_roles {
                    if !groups.contains(role) {
                        self.roles.remove_by_name(user.id, role).await?;
                    }
                }
                user.roles = self.roles.get_user_roles(user.id).await?;
            }
        }

        if !user.can_authenticate() {
            return Err(AuthError::UserInactive);
        }

        let session = SamlSession {
            id: uuid::Uuid::new_v4(),
            user_id: user.id,
            config_key: spec.name.clone(),
            idp_session_index: parsed.session_index.clone(),
            name_id: parsed.name_id.clone(),
            attributes: sqlx::types::Json(serde_json::to_value(&parsed.attributes).unwrap_or_default()),
            expires_at: now + chrono::Duration::hours(SESSION_LIFETIME_HOURS),
            created_at: now,
        };
        self.sessions.create_session(session).await?;

        let tokens = self.tokens.mint_pair(user.id, &user.email, &user.roles)?;
        Ok(AuthResult::Complete { user, tokens })
    }
}
