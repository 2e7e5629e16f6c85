//! Layered configuration resolution for an authentication service.

pub mod config;
pub mod observability;

pub use config::{resolve, AuthConfig, ConfigError, ResolvedConfig, SecretSource};
