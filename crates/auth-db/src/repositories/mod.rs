//! MySQL-backed implementations of the `auth-core` repository contracts.

pub mod group_repository;
pub mod oauth_link_repository;
pub mod role_repository;
pub mod saml_repository;
pub mod user_repository;

pub use group_repository::MySqlGroupRepository;
pub use oauth_link_repository::MySqlOAuthLinkRepository;
pub use role_repository::MySqlRoleRepository;
pub use saml_repository::MySqlSamlRepository;
pub use user_repository::MySqlUserRepository;
