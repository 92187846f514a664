//! Request pipeline: interceptors, loading indicator, session policy

pub mod interceptors;
pub mod loading;
pub mod ports;
pub mod service;
pub mod session;
pub mod trace;

pub use interceptors::{
    ErrorInterceptor, RequestInterceptor, ResponseInterceptor, SessionHeadersInterceptor,
};
pub use loading::{LoadingGuard, LoadingTracker};
pub use ports::{
    AuthRedirect, ErrorPresenter, LoadingIndicator, NoopLoadingIndicator, TracingAuthRedirect,
    TracingPresenter, Transport, TransportFailure, TransportRequest, TransportResponse,
};
pub use service::{RequestPipeline, RequestPipelineBuilder, DEFAULT_TIMEOUT};
pub use session::{AuthSessionPolicy, DEFAULT_REDIRECT_WINDOW};
pub use trace::{hash_user_id, TraceContextFactory};
