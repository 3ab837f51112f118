//! The Strategy Engine: one uniform two-phase contract over three
//! authentication protocols. At most one strategy per kind is registered;
//! the registry is built once at startup and read-only thereafter.

pub mod jit;
pub mod oauth;
pub mod password;
pub mod saml;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::AuthError;
use crate::models::token::TokenPair;
use crate::models::user::User;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    Password,
    OAuth,
    SAML,
}

impl std::fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StrategyKind::Password => write!(f, "normal"),
            StrategyKind::OAuth => write!(f, "oauth"),
            StrategyKind::SAML => write!(f, "saml"),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct AuthRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    pub provider: Option<String>,
    pub organization: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct CallbackRequest {
    pub code: Option<String>,
    pub state: Option<String>,
    pub saml_response: Option<String>,
}

#[derive(Debug, Clone)]
pub enum AuthResult {
    Complete { user: User, tokens: TokenPair },
    Redirect { authorization_url: String, state: String },
    SamlChallenge { saml_request: String, sso_url: String },
}

/// The uniform contract every protocol adapter implements.
#[async_trait]
pub trait AuthStrategy: Send + Sync {
    fn kind(&self) -> StrategyKind;

    /// Called once at registration; a failing strategy is rejected.
    fn validate_config(&self) -> Result<(), AuthError>;

    async fn authenticate(&self, request: AuthRequest) -> Result<AuthResult, AuthError>;

    /// Second phase, required for OAuth/SAML. Password must fail this.
    async fn handle_callback(&self, request: CallbackRequest) -> Result<AuthResult, AuthError>;
}

/// Lets a strategy be registered by `Arc` instead of by value, so the same
/// instance can be shared with a background sweeper task (spec §5) while
/// still being boxed into the registry's trait-object table.
#[async_trait]
impl<T: AuthStrategy + ?Sized> AuthStrategy for Arc<T> {
    fn kind(&self) -> StrategyKind {
        (**self).kind()
    }

    fn validate_config(&self) -> Result<(), AuthError> {
        (**self).validate_config()
    }

    async fn authenticate(&self, request: AuthRequest) -> Result<AuthResult, AuthError> {
        (**self).authenticate(request).await
    }

    async fn handle_callback(&self, request: CallbackRequest) -> Result<AuthResult, AuthError> {
        (**self).handle_callback(request).await
    }
}

/// Built once at startup from configuration; read-only thereafter.
pub struct StrategyRegistry {
    strategies: HashMap<StrategyKind, Box<dyn AuthStrategy>>,
    active: StrategyKind,
}

impl StrategyRegistry {
    pub fn new(active: StrategyKind) -> Self {
        Self {
            strategies: HashMap::new(),
            active,
        }
    }

    /// Registers a strategy after running its `validate_config`. A failing
    /// strategy is rejected and never reaches the table.
    pub fn register(&mut self, strategy: Box<dyn AuthStrategy>) -> Result<(), AuthError> {
        strategy.validate_config()?;
        self.strategies.insert(strategy.kind(), strategy);
        Ok(())
    }

    pub fn active_kind(&self) -> StrategyKind {
        self.active
    }

    pub fn get(&self, kind: StrategyKind) -> Option<&dyn AuthStrategy> {
        self.strategies.get(&kind).map(|b| b.as_ref())
    }

    pub fn active(&self) -> Option<&dyn AuthStrategy> {
        self.get(self.active)
    }
}
