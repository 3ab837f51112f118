//! `reqwest`-backed `OAuthProviderClient` adapter (spec §4.4.2). One
//! instance per configured provider; `auth-core`'s `OAuthStrategy` only ever
//! sees the port, never this HTTP plumbing.

use std::time::Duration;

use async_trait::async_trait;
use auth_config::config::OAuthProviderConfig;
use auth_core::error::AuthError;
use auth_core::services::strategies::oauth::{OAuthProviderClient, ProviderTokens, ProviderUserInfo};
use auth_crypto::TokenEncryptor;
use chrono::Utc;
use secrecy::ExposeSecret;
use serde::Deserialize;
use url::Url;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Well-known defaults for the provider types the spec names (`google`,
/// `microsoft`); `custom` carries no defaults, every URL must come from
/// config.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OAuthProviderType {
    Google,
    Microsoft,
    Custom,
}

impl OAuthProviderType {
    pub fn from_config_str(s: &str) -> Self {
        match s {
            "google" => Self::Google,
            "microsoft" => Self::Microsoft,
            _ => Self::Custom,
        }
    }

    fn default_auth_url(self) -> Option<&'static str> {
        match self {
            Self::Google => Some("https://accounts.google.com/o/oauth2/v2/auth"),
            Self::Microsoft => Some("https://login.microsoftonline.com/common/oauth2/v2.0/authorize"),
            Self::Custom => None,
        }
    }

    fn default_token_url(self) -> Option<&'static str> {
        match self {
            Self::Google => Some("https://oauth2.googleapis.com/token"),
            Self::Microsoft => Some("https://login.microsoftonline.com/common/oauth2/v2.0/token"),
            Self::Custom => None,
        }
    }

    fn default_userinfo_url(self) -> Option<&'static str> {
        match self {
            Self::Google => Some("https://openidconnect.googleapis.com/v1/userinfo"),
            Self::Microsoft => Some("https://graph.microsoft.com/oidc/userinfo"),
            Self::Custom => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct OAuthProviderSettings {
    pub provider_type: OAuthProviderType,
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub scopes: Vec<String>,
    pub auth_url: Option<String>,
    pub token_url: Option<String>,
    pub userinfo_url: Option<String>,
}

impl From<&OAuthProviderConfig> for OAuthProviderSettings {
    fn from(cfg: &OAuthProviderConfig) -> Self {
        Self {
            provider_type: OAuthProviderType::from_config_str(&cfg.provider_type),
            client_id: cfg.client_id.clone(),
            client_secret: cfg.client_secret.expose_secret().clone(),
            redirect_uri: cfg.redirect_uri.clone(),
            scopes: cfg.scopes.clone(),
            auth_url: cfg.auth_url.clone(),
            token_url: cfg.token_url.clone(),
            userinfo_url: cfg.userinfo_url.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenExchangeResponse {
    access_token: String,
    refresh_token: Option<String>,
    expires_in: Option<i64>,
}

/// Userinfo payload shape shared (loosely) by OIDC-compliant providers:
/// Google and Microsoft both return `sub`/`email`/`given_name`/`family_name`/
/// `picture` under those names.
#[derive(Debug, Deserialize)]
struct UserInfoResponse {
    sub: String,
    email: String,
    given_name: Option<String>,
    family_name: Option<String>,
    picture: Option<String>,
}

/// Real adapter used outside `development`/`test` (spec §4.4.3's mock gate
/// applies to SAML explicitly; OAuth has no mock variant since provider
/// round-trips are easy to fake at the `OAuthProviderClient` trait boundary
/// in tests without a parallel adapter).
pub struct HttpOAuthClient {
    settings: OAuthProviderSettings,
    http: reqwest::Client,
    encryptor: TokenEncryptor,
}

impl HttpOAuthClient {
    pub fn new(settings: OAuthProviderSettings, encryptor: TokenEncryptor) -> Self {
        let http = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self { settings, http, encryptor }
    }

    fn auth_url(&self) -> Result<&str, AuthError> {
        self.settings
            .auth_url
            .as_deref()
            .or_else(|| self.settings.provider_type.default_auth_url())
            .ok_or_else(|| AuthError::InvalidInput {
                message: "OAuth provider has no authorization URL configured".to_string(),
            })
    }

    fn token_url(&self) -> Result<&str, AuthError> {
        self.settings
            .token_url
            .as_deref()
            .or_else(|| self.settings.provider_type.default_token_url())
            .ok_or_else(|| AuthError::InvalidInput {
                message: "OAuth provider has no token URL configured".to_string(),
            })
    }

    fn userinfo_url(&self) -> Result<&str, AuthError> {
        self.settings
            .userinfo_url
            .as_deref()
            .or_else(|| self.settings.provider_type.default_userinfo_url())
            .ok_or_else(|| AuthError::InvalidInput {
                message: "OAuth provider has no userinfo URL configured".to_string(),
            })
    }
}

#[async_trait]
impl OAuthProviderClient for HttpOAuthClient {
    fn authorize_url(&self, state: &str) -> String {
        let base = match self.auth_url() {
            Ok(url) => url,
            Err(_) => return String::new(),
        };
        let mut url = match Url::parse(base) {
            Ok(url) => url,
            Err(_) => return String::new(),
        };
        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", &self.settings.client_id)
            .append_pair("redirect_uri", &self.settings.redirect_uri)
            .append_pair("state", state)
            .append_pair("scope", &self.settings.scopes.join(" "));
        url.to_string()
    }

    async fn exchange_code(&self, code: &str) -> Result<ProviderTokens, AuthError> {
        let token_url = self.token_url()?.to_string();
        let response = self
            .http
            .post(&token_url)
            .form(&[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", &self.settings.redirect_uri),
                ("client_id", &self.settings.client_id),
                ("client_secret", &self.settings.client_secret),
            ])
            .send()
            .await
            .map_err(|_| AuthError::Internal)?;

        if !response.status().is_success() {
            return Err(AuthError::Internal);
        }

        let parsed: TokenExchangeResponse = response.json().await.map_err(|_| AuthError::Internal)?;
        let expires_at = parsed
            .expires_in
            .map(|secs| Utc::now() + chrono::Duration::seconds(secs));

        Ok(ProviderTokens {
            access_token: parsed.access_token,
            refresh_token: parsed.refresh_token,
            expires_at,
        })
    }

    async fn fetch_userinfo(&self, access_token: &str) -> Result<ProviderUserInfo, AuthError> {
        let userinfo_url = self.userinfo_url()?.to_string();
        let response = self
            .http
            .get(&userinfo_url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|_| AuthError::Internal)?;

        if !response.status().is_success() {
            return Err(AuthError::Internal);
        }

        let parsed: UserInfoResponse = response.json().await.map_err(|_| AuthError::Internal)?;
        Ok(ProviderUserInfo {
            provider_user_id: parsed.sub,
            email: parsed.email,
            given_name: parsed.given_name,
            family_name: parsed.family_name,
            avatar: parsed.picture,
        })
    }

    fn encrypt_token(&self, plaintext: &str) -> Result<String, AuthError> {
        self.encryptor.encrypt(plaintext).map_err(|_| AuthError::Internal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::Secret;

    fn encryptor() -> TokenEncryptor {
        TokenEncryptor::new(&Secret::new("oauth-test-secret".to_string()))
    }

    fn client(provider_type: OAuthProviderType) -> HttpOAuthClient {
        HttpOAuthClient::new(
            OAuthProviderSettings {
                provider_type,
                client_id: "client-123".to_string(),
                client_secret: "secret".to_string(),
                redirect_uri: "https://app.example.com/auth/oauth/callback".to_string(),
                scopes: vec!["openid".to_string(), "email".to_string()],
                auth_url: None,
                token_url: None,
                userinfo_url: None,
            },
            encryptor(),
        )
    }

    #[test]
    fn authorize_url_uses_google_defaults() {
        let client = client(OAuthProviderType::Google);
        let url = client.authorize_url("state-abc");
        assert!(url.starts_with("https://accounts.google.com/o/oauth2/v2/auth?"));
        assert!(url.contains("client_id=client-123"));
        assert!(url.contains("state=state-abc"));
        assert!(url.contains("scope=openid+email") || url.contains("scope=openid%20email"));
    }

    #[test]
    fn authorize_url_empty_when_custom_has_no_url_configured() {
        let client = client(OAuthProviderType::Custom);
        assert_eq!(client.authorize_url("state-abc"), "");
    }

    #[test]
    fn encrypt_token_round_trips_through_encryptor() {
        let client = client(OAuthProviderType::Google);
        let ciphertext = client.encrypt_token("provider-access-token").unwrap();
        assert_ne!(ciphertext, "provider-access-token");
    }
}
