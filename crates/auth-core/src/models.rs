//! Core data models

pub mod oauth;
pub mod role;
pub mod saml;
pub mod token;
pub mod user;

pub use oauth::*;
pub use role::*;
pub use saml::*;
pub use token::*;
pub use user::*;
