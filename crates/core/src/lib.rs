//! # Marginalia Core
//!
//! Client resilience logic - no infrastructure dependencies.
//!
//! This crate contains:
//! - The business error classifier
//! - The request pipeline and its port traits
//! - The offline mutation queue
//!
//! ## Architecture Principles
//! - Only depends on `marginalia-common` and `marginalia-domain`
//! - No HTTP client, filesystem or platform code
//! - Transport, loading indicator, presenter and redirect injected via traits
//! - Time injected via [`marginalia_common::Clock`]

pub mod classifier;
pub mod pipeline;
pub mod sync;

pub use classifier::{
    Classification, ClassifierPolicy, ErrorClassifier, Handling, Outcome, Verdict,
};
pub use pipeline::{
    AuthRedirect, AuthSessionPolicy, ErrorInterceptor, ErrorPresenter, LoadingIndicator,
    LoadingTracker, RequestInterceptor, RequestPipeline, RequestPipelineBuilder,
    ResponseInterceptor, Transport, TransportFailure, TransportRequest, TransportResponse,
};
pub use sync::{
    Connectivity, Delivery, MutationDispatcher, PipelineDispatcher, SyncEngine, SyncError,
    WriteOutcome,
};
