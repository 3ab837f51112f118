//! Retry and backoff helpers for suspension points that talk to external
//! services (federation IdPs, the shared rate-limit/cache backend).

pub mod retry;

pub use retry::{retry, RetryConfig};
