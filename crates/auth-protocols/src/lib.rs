pub mod oauth;
pub mod saml;

pub use oauth::{HttpOAuthClient, OAuthProviderSettings, OAuthProviderType};
pub use saml::{provider_type_from_config_str, MockSamlAdapter, SamlAdapter};
