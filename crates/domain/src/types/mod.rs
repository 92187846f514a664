//! Domain data types

pub mod envelope;
pub mod mutation;
pub mod request;
pub mod trace;

pub use envelope::{ErrorEnvelope, ErrorKind, ResponseEnvelope};
pub use mutation::{FlushReport, MutationAction, MutationDomain, QueuedMutation};
pub use request::{CachePolicy, HttpMethod, RequestConfig};
pub use trace::{TraceContext, TraceContextError};
