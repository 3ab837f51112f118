//! Platform-level infrastructure for the authentication service
//!
//! Cross-cutting runtime concerns that live outside the authentication core
//! itself: graceful shutdown with a bounded connection-drain window.

pub mod shutdown;

pub use shutdown::{shutdown_signal, GracefulShutdown};

/// Platform-level errors
#[derive(Debug, thiserror::Error)]
pub enum PlatformError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Shutdown error: {0}")]
    Shutdown(String),
}

pub type Result<T> = std::result::Result<T, PlatformError>;
