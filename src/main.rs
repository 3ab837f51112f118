//! Process entry point: loads configuration, wires the Token Engine,
//! Blacklist, Rate Limiter, and Strategy Engine against their MySQL/cache
//! backends, and serves the HTTP edge.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use auth_api::{app, AppState};
use auth_cache::MultiLevelCache;
use auth_config::{AuthType, ConfigLoader, ConfigManager};
use auth_core::services::rate_limiter::{RateLimitConfig, RateLimiter};
use auth_core::services::strategies::oauth::{OAuthProviderClient, OAuthStrategy};
use auth_core::services::strategies::password::PasswordStrategy;
use auth_core::services::strategies::saml::{SamlProviderClient, SamlStrategy};
use auth_core::services::strategies::{StrategyKind, StrategyRegistry};
use auth_core::services::token_service::{TokenEngine, TokenEngineConfig};
use auth_core::services::{Blacklist, UserService};
use auth_core::{Clock, SystemClock};
use auth_crypto::{JwtService, PasswordHasher, SigningKey, TokenEncryptor};
use auth_db::{
    create_mysql_pool, MySqlGroupRepository, MySqlOAuthLinkRepository, MySqlRoleRepository,
    MySqlSamlRepository, MySqlUserRepository,
};
use auth_protocols::{HttpOAuthClient, MockSamlAdapter, OAuthProviderSettings, SamlAdapter};
use secrecy::ExposeSecret;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    auth_telemetry::init_telemetry()?;

    let environment = std::env::var("AUTH__ENVIRONMENT").unwrap_or_else(|_| "development".to_string());
    let config_manager = ConfigManager::new(ConfigLoader::new("config", &environment))?;
    let config = config_manager.get_config();
    info!(environment = %environment, "configuration loaded");

    let pool = create_mysql_pool(&config.database).await?;
    info!("database connection established");

    sqlx::migrate!("./migrations").run(&pool).await?;
    info!("migrations applied");

    let user_repo = Arc::new(MySqlUserRepository::new(pool.clone()));
    let role_repo = Arc::new(MySqlRoleRepository::new(pool.clone()));
    let oauth_link_repo = Arc::new(MySqlOAuthLinkRepository::new(pool.clone()));
    let saml_repo = Arc::new(MySqlSamlRepository::new(pool.clone()));
    let group_repo = Arc::new(MySqlGroupRepository::new(pool.clone()));

    role_repo.ensure_default_roles().await?;
    info!("default roles seeded");

    let redis_url = config.external_services.redis.as_ref().map(|r| r.url.clone());
    if redis_url.is_none() && matches!(config.environment, auth_config::Environment::Production) {
        warn!("production environment has no Redis configured; falling back to the in-process cache tier only");
    }
    let cache = Arc::new(MultiLevelCache::new(redis_url.as_deref())?);

    let hasher = PasswordHasher::with_cost(config.auth.password_hash_cost);
    let signing_key = SigningKey::new(config.auth.signing_key.expose_secret().clone())?;
    let jwt = JwtService::new(signing_key);
    let token_config = TokenEngineConfig {
        access_lifetime: Duration::from_secs(config.auth.access_lifetime_seconds),
        refresh_lifetime: Duration::from_secs(config.auth.refresh_lifetime_seconds),
        revoke_refresh_on_rotation: config.auth.revoke_refresh_on_rotation,
    };
    let blacklist = Arc::new(Blacklist::new(cache.clone()));
    let tokens: Arc<TokenEngine<MultiLevelCache>> = Arc::new(TokenEngine::new(jwt, blacklist, token_config));

    let rate_limiter: Arc<RateLimiter<MultiLevelCache>> = Arc::new(RateLimiter::new(
        cache.clone(),
        RateLimitConfig {
            limit: config.ratelimit.login.max,
            window: Duration::from_secs(config.ratelimit.login.window_seconds),
        },
        RateLimitConfig {
            limit: config.ratelimit.register.max,
            window: Duration::from_secs(config.ratelimit.register.window_seconds),
        },
    ));
    tokio::spawn(Arc::clone(&rate_limiter).run_sweeper());

    let active_kind = match config.auth.auth_type {
        AuthType::Normal => StrategyKind::Password,
        AuthType::OAuth => StrategyKind::OAuth,
        AuthType::Saml => StrategyKind::SAML,
    };
    let mut strategies = StrategyRegistry::new(active_kind);

    strategies.register(Box::new(PasswordStrategy::new(
        user_repo.clone(),
        role_repo.clone(),
        hasher.clone(),
        tokens.clone(),
    )))?;

    if !config.oauth.providers.is_empty() {
        let token_encryptor = TokenEncryptor::new(&config.auth.signing_key);
        let mut clients: HashMap<String, Arc<dyn OAuthProviderClient>> = HashMap::new();
        for (name, provider_cfg) in &config.oauth.providers {
            let settings = OAuthProviderSettings::from(provider_cfg);
            let client = HttpOAuthClient::new(settings, token_encryptor.clone());
            clients.insert(name.clone(), Arc::new(client) as Arc<dyn OAuthProviderClient>);
        }
        let oauth_strategy = Arc::new(OAuthStrategy::new(
            clients,
            Arc::new(SystemClock) as Arc<dyn Clock>,
            user_repo.clone(),
            role_repo.clone(),
            oauth_link_repo.clone(),
            hasher.clone(),
            tokens.clone(),
        ));
        tokio::spawn(Arc::clone(&oauth_strategy).run_sweeper());
        strategies.register(Box::new(oauth_strategy))?;
        info!(count = config.oauth.providers.len(), "OAuth strategy registered");
    }

    if !config.saml.providers.is_empty() {
        let allow_mock = config.environment.allows_mock_providers();
        let mut adapters: Vec<Arc<dyn SamlProviderClient>> = Vec::new();
        for (name, provider_cfg) in &config.saml.providers {
            if allow_mock && provider_cfg.provider_type == "mock" {
                adapters.push(Arc::new(MockSamlAdapter::new(name, provider_cfg)));
            } else {
                adapters.push(Arc::new(SamlAdapter::new(
                    name,
                    provider_cfg,
                    config.saml.service_provider_entity_id.clone(),
                    config.saml.assertion_consumer_service_url.clone(),
                )));
            }
        }
        let saml_strategy = Arc::new(SamlStrategy::new(
            adapters,
            user_repo.clone(),
            role_repo.clone(),
            saml_repo.clone(),
            group_repo.clone(),
            hasher.clone(),
            tokens.clone(),
        ));
        tokio::spawn(Arc::clone(&saml_strategy).run_sweeper());
        strategies.register(Box::new(saml_strategy))?;
        info!(count = config.saml.providers.len(), "SAML strategy registered");
    }

    let audit: Arc<dyn auth_core::audit::AuditLogger> = Arc::new(auth_audit::AuditService::new(pool.clone()));

    let user_service = UserService::new(
        user_repo,
        role_repo,
        tokens,
        rate_limiter,
        Arc::new(strategies),
        hasher,
        audit.clone(),
    );

    let app_state = AppState {
        users: Arc::new(user_service),
        audit,
    };

    let router = app(app_state);
    let listener = tokio::net::TcpListener::bind((config.server.host.as_str(), config.server.port)).await?;
    let bound = listener.local_addr()?;
    info!(address = %bound, "listening");

    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .with_graceful_shutdown(auth_platform::shutdown_signal())
    .await?;

    info!("shutdown complete");
    Ok(())
}
