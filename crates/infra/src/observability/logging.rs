//! Tracing subscriber setup
//!
//! `RUST_LOG` selects what is recorded; without it the Marginalia crates log
//! at `info` and everything else at `warn`.

use std::str::FromStr;

use marginalia_domain::MarginaliaError;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Filter applied when `RUST_LOG` is unset or invalid
pub const DEFAULT_FILTER: &str = "warn,marginalia=info";

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable output for terminals
    #[default]
    Pretty,
    /// One JSON object per event, with span fields (`trace_id`) attached
    Json,
}

impl FromStr for LogFormat {
    type Err = MarginaliaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(MarginaliaError::Config(format!("Unknown log format: {other}"))),
        }
    }
}

/// Build the filter from `RUST_LOG`, falling back to [`DEFAULT_FILTER`]
pub fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Install the global subscriber
///
/// # Errors
/// Returns `MarginaliaError::Config` when a global subscriber is already
/// installed.
pub fn init_logging(format: LogFormat) -> Result<(), MarginaliaError> {
    let registry = tracing_subscriber::registry().with(env_filter());
    let result = match format {
        LogFormat::Pretty => registry.with(fmt::layer().with_target(true)).try_init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().with_current_span(true).with_span_list(false))
            .try_init(),
    };
    result.map_err(|err| MarginaliaError::Config(format!("logging already initialised: {err}")))
}
