//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! config pipeline stages produce:
//!     → logging.rs (structured log events)
//!
//! Consumers:
//!     → stderr, filtered by RUST_LOG or --log-level
//! ```
//!
//! # Design Decisions
//! - Structured fields for paths and counts
//! - Secret values are never passed to a log macro; only their key names

pub mod logging;
