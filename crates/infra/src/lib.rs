//! # Marginalia Infrastructure
//!
//! Infrastructure implementations of core ports.
//!
//! This crate contains:
//! - The `reqwest` HTTP transport
//! - The JSON file storage backend
//! - Configuration loading (`.env`, environment, TOML/JSON files)
//! - Tracing subscriber setup
//! - The [`ClientContext`] wiring everything together
//!
//! ## Architecture
//! - Implements traits defined in `marginalia-core` and `marginalia-common`
//! - Contains all "impure" code (network, filesystem, process environment)

pub mod config;
pub mod context;
pub mod http;
pub mod observability;
pub mod storage;

// Re-export commonly used items
pub use context::{ClientContext, ClientPorts};
pub use http::{ReqwestTransport, ReqwestTransportBuilder};
pub use observability::{init_logging, LogFormat};
pub use storage::FileBackend;
