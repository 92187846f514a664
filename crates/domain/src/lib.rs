//! # Marginalia Domain
//!
//! Data types shared by the client resilience layer.
//!
//! This crate contains:
//! - Request descriptions, trace contexts and response/error envelopes
//! - Offline mutation records and flush reports
//! - Configuration structures and reserved constants
//! - The crate-wide error type and Result alias
//!
//! ## Architecture
//! - No dependencies on other Marginalia crates
//! - Only external dependencies allowed
//! - Pure data, no I/O

pub mod config;
pub mod constants;
pub mod errors;
pub mod macros;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
