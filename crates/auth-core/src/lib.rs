//! Core authentication and authorization logic
//!
//! This crate contains the pure business logic for the identity platform,
//! independent of HTTP or database concerns.

pub mod audit;
pub mod clock;
pub mod error;
pub mod models;
pub mod repositories;
pub mod resilience;
pub mod services;

pub use clock::{Clock, SystemClock};
pub use error::AuthError;

/// Re-export of the types most call sites need, so downstream crates can
/// write `use auth_core::prelude::*;` instead of chasing submodule paths.
pub mod prelude {
    pub use crate::audit::{AuditCategory, AuditEvent, AuditLogger, AuditOutcome, AuditSeverity};
    pub use crate::clock::{Clock, SystemClock};
    pub use crate::error::AuthError;
    pub use crate::models::*;
    pub use crate::repositories::*;
}
