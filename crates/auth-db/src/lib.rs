//! MySQL-backed implementations of the `auth-core` repository contracts.

pub mod connection;
pub mod repositories;

pub use connection::*;
pub use repositories::*;
