//! Offline mutation queue and replay

pub mod dispatcher;
pub mod engine;
pub mod errors;
pub mod ports;
pub mod routes;

pub use dispatcher::PipelineDispatcher;
pub use engine::{SyncEngine, WriteOutcome};
pub use errors::{SyncError, SyncErrorCategory};
pub use ports::{AlwaysOnline, Connectivity, Delivery, MutationDispatcher};
pub use routes::{route, Route};
