//! Docchat Core Library
//!
//! This crate provides the foundational utilities shared by every docchat crate:
//! - Error handling (`AppError`, `AppResult`)
//! - Logging infrastructure
//! - Layered configuration (defaults, YAML, environment, CLI flags)

pub mod config;
pub mod error;
pub mod logging;

// Re-export commonly used types
pub use config::{AppConfig, RetrievalConfig, SessionConfig};
pub use error::{AppError, AppResult};
