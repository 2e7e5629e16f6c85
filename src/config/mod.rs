//! Configuration resolution subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse, decode with defaults; decode.rs does the coercion)
//!     → secrets.rs (overlay secrets from a trusted source)
//!     → validation.rs (conditional-requirement checks)
//!     → ResolvedConfig (validated, immutable)
//! ```
//!
//! # Design Decisions
//! - Config is immutable once resolved; changes require a fresh load
//! - All fields have defaults to allow minimal configs
//! - Every stage reports all of its failures, not just the first
//! - Secret fields never appear in the default serialization

pub mod decode;
pub mod duration;
pub mod loader;
pub mod resolved;
pub mod schema;
pub mod secrets;
pub mod validation;

pub use decode::DecodeError;
pub use loader::{load_config, ConfigError};
pub use resolved::{overlay_and_validate, resolve, ResolvedConfig};
pub use schema::AuthConfig;
pub use secrets::SecretSource;
pub use validation::{validate_config, Violation};
