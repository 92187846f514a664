//! Client configuration
//!
//! Durations are stored as millisecond integers so TOML/JSON files and
//! environment variables can set them directly.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_PLATFORM, DEFAULT_STORAGE_NAMESPACE};
use crate::impl_wire_str_conversions;

/// Deployment environment selecting the default API host
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl_wire_str_conversions!(Environment {
    Development => "development",
    Staging => "staging",
    Production => "production",
});

impl Environment {
    /// API host used when no explicit base URL is configured
    #[must_use]
    pub const fn default_base_url(self) -> &'static str {
        match self {
            Self::Development => "http://localhost:3000",
            Self::Staging => "https://staging-api.marginalia.app",
            Self::Production => "https://api.marginalia.app",
        }
    }
}

/// Complete client configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub storage: StorageConfig,
    pub sync: SyncConfig,
    pub auth: AuthConfig,
    pub classifier: ClassifierConfig,
}

/// Request pipeline settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub environment: Environment,
    /// Explicit host overriding the environment default
    pub base_url: Option<String>,
    pub timeout_ms: u64,
    /// Total attempts per call, including the first
    pub max_attempts: u32,
    pub retry_backoff_ms: u64,
    /// Allow retrying POST; off because a create may have landed
    pub retry_non_idempotent: bool,
    /// Platform tag recorded in trace contexts
    pub platform: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            environment: Environment::default(),
            base_url: None,
            timeout_ms: 10_000,
            max_attempts: 1,
            retry_backoff_ms: 300,
            retry_non_idempotent: false,
            platform: DEFAULT_PLATFORM.to_string(),
        }
    }
}

impl ApiConfig {
    /// Base URL without a trailing slash
    #[must_use]
    pub fn resolved_base_url(&self) -> String {
        self.base_url
            .as_deref()
            .filter(|url| !url.trim().is_empty())
            .unwrap_or_else(|| self.environment.default_base_url())
            .trim()
            .trim_end_matches('/')
            .to_string()
    }

    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    #[must_use]
    pub const fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}

/// Keyed store settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub namespace: String,
    /// JSON file backing the store; in-memory when unset
    pub path: Option<PathBuf>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self { namespace: DEFAULT_STORAGE_NAMESPACE.to_string(), path: None }
    }
}

/// Offline queue settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Send the mutation id as `Idempotency-Key` on replay
    pub attach_idempotency_key: bool,
}

/// Session policy settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Auth failures inside this window share one redirect
    pub redirect_window_ms: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self { redirect_window_ms: 1_500 }
    }
}

impl AuthConfig {
    #[must_use]
    pub const fn redirect_window(&self) -> Duration {
        Duration::from_millis(self.redirect_window_ms)
    }
}

/// Business code ranges used by the error classifier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    pub quota_code_min: i64,
    pub quota_code_max: i64,
    /// Business codes worth retrying
    pub transient_codes: Vec<i64>,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self { quota_code_min: 4290, quota_code_max: 4299, transient_codes: vec![5030, 5040] }
    }
}
