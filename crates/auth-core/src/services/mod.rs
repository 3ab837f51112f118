pub mod blacklist;
pub mod rate_limiter;
pub mod strategies;
pub mod token_service;
pub mod user_service;

pub use blacklist::Blacklist;
pub use rate_limiter::{RateLimitConfig, RateLimitDecision, RateLimiter};
pub use strategies::{AuthRequest, AuthResult, AuthStrategy, CallbackRequest, StrategyKind, StrategyRegistry};
pub use token_service::{TokenEngine, TokenEngineConfig};
pub use user_service::UserService;
