//! Configuration loader
//!
//! Loads client configuration from a file and environment variables.
//!
//! ## Loading Strategy
//! 1. Loads a `.env` file into the process environment when one exists
//! 2. Probes multiple paths for a config file; defaults when none is found
//! 3. Applies environment variable overrides on top
//! 4. Validates the result (base URL, attempts, namespace)
//!
//! ## Environment Variables
//! - `MARGINALIA_ENV`: `development`, `staging` or `production`
//! - `MARGINALIA_API_BASE_URL`: Explicit API host
//! - `MARGINALIA_API_TIMEOUT_MS`: Per-attempt timeout in milliseconds
//! - `MARGINALIA_API_MAX_ATTEMPTS`: Attempts per idempotent call
//! - `MARGINALIA_STORAGE_PATH`: JSON file backing the keyed store
//! - `MARGINALIA_STORAGE_NAMESPACE`: Key prefix owned by this client
//! - `MARGINALIA_SYNC_IDEMPOTENCY_KEY`: Send `Idempotency-Key` on replays
//! - `MARGINALIA_AUTH_REDIRECT_WINDOW_MS`: Login redirect throttle window
//!
//! ## File Locations
//! The loader probes the following paths (in order):
//! 1. `./marginalia.toml` or `./marginalia.json` (current working directory)
//! 2. `./config.toml` or `./config.json` (current working directory)
//! 3. The same names next to the executable

use std::path::{Path, PathBuf};
use std::str::FromStr;

use marginalia_domain::{Config, Environment, MarginaliaError, Result};
use url::Url;

const ENV_ENVIRONMENT: &str = "MARGINALIA_ENV";
const ENV_BASE_URL: &str = "MARGINALIA_API_BASE_URL";
const ENV_TIMEOUT_MS: &str = "MARGINALIA_API_TIMEOUT_MS";
const ENV_MAX_ATTEMPTS: &str = "MARGINALIA_API_MAX_ATTEMPTS";
const ENV_STORAGE_PATH: &str = "MARGINALIA_STORAGE_PATH";
const ENV_STORAGE_NAMESPACE: &str = "MARGINALIA_STORAGE_NAMESPACE";
const ENV_IDEMPOTENCY_KEY: &str = "MARGINALIA_SYNC_IDEMPOTENCY_KEY";
const ENV_REDIRECT_WINDOW_MS: &str = "MARGINALIA_AUTH_REDIRECT_WINDOW_MS";

const CONFIG_FILE_NAMES: [&str; 4] =
    ["marginalia.toml", "marginalia.json", "config.toml", "config.json"];

/// Load configuration with the full layering strategy
///
/// # Errors
/// Returns `MarginaliaError::Config` if a config file is invalid, an
/// environment variable cannot be parsed, or validation fails.
pub fn load() -> Result<Config> {
    match dotenvy::dotenv() {
        Ok(path) => tracing::debug!(path = %path.display(), "Loaded .env file"),
        Err(err) if err.not_found() => {}
        Err(err) => tracing::warn!(error = %err, "Ignoring unreadable .env file"),
    }

    let mut config = match probe_config_paths() {
        Some(path) => load_from_file(Some(path))?,
        None => {
            tracing::debug!("No config file found, using defaults");
            Config::default()
        }
    };
    apply_env_overrides(&mut config)?;
    validate(&config)?;

    tracing::info!(
        environment = %config.api.environment,
        base_url = %config.api.resolved_base_url(),
        persistent = config.storage.path.is_some(),
        "Configuration loaded"
    );
    Ok(config)
}

/// Load configuration from defaults plus environment variables only
///
/// # Errors
/// Returns `MarginaliaError::Config` if a variable has an invalid value.
pub fn load_from_env() -> Result<Config> {
    let mut config = Config::default();
    apply_env_overrides(&mut config)?;
    validate(&config)?;
    Ok(config)
}

/// Load configuration from a file
///
/// If `path` is `None`, probes the standard locations. Supports JSON and
/// TOML (detected by file extension). Missing sections take their defaults.
///
/// # Errors
/// Returns `MarginaliaError::Config` if:
/// - File not found (when path is specified)
/// - No config file found (when path is `None`)
/// - File format is invalid
pub fn load_from_file(path: Option<PathBuf>) -> Result<Config> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(MarginaliaError::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            MarginaliaError::Config(
                "No config file found in any of the standard locations".to_string(),
            )
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| MarginaliaError::Config(format!("Failed to read config file: {e}")))?;

    parse_config(&contents, &config_path)
}

/// Parse configuration from string content
///
/// Format is detected by file extension (`.json` or `.toml`).
fn parse_config(contents: &str, path: &Path) -> Result<Config> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| MarginaliaError::Config(format!("Invalid TOML format: {e}"))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| MarginaliaError::Config(format!("Invalid JSON format: {e}"))),
        _ => Err(MarginaliaError::Config(format!("Unsupported config format: {extension}"))),
    }
}

/// Probe the standard locations for a configuration file
///
/// # Returns
/// The first config file found, or `None` if no file exists.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut dirs = Vec::new();
    if let Ok(cwd) = std::env::current_dir() {
        dirs.push(cwd);
    }
    if let Some(exe_dir) =
        std::env::current_exe().ok().and_then(|exe| exe.parent().map(Path::to_path_buf))
    {
        dirs.push(exe_dir);
    }

    dirs.iter()
        .flat_map(|dir| CONFIG_FILE_NAMES.iter().map(move |name| dir.join(name)))
        .find(|path| path.is_file())
}

/// Overlay `MARGINALIA_*` variables onto `config`
///
/// # Errors
/// Returns `MarginaliaError::Config` naming the first variable that fails to
/// parse.
pub fn apply_env_overrides(config: &mut Config) -> Result<()> {
    if let Some(environment) = env_parse::<Environment>(ENV_ENVIRONMENT)? {
        config.api.environment = environment;
    }
    if let Some(base_url) = env_var(ENV_BASE_URL) {
        config.api.base_url = Some(base_url);
    }
    if let Some(timeout_ms) = env_parse(ENV_TIMEOUT_MS)? {
        config.api.timeout_ms = timeout_ms;
    }
    if let Some(max_attempts) = env_parse(ENV_MAX_ATTEMPTS)? {
        config.api.max_attempts = max_attempts;
    }
    if let Some(path) = env_var(ENV_STORAGE_PATH) {
        config.storage.path = Some(PathBuf::from(path));
    }
    if let Some(namespace) = env_var(ENV_STORAGE_NAMESPACE) {
        config.storage.namespace = namespace;
    }
    config.sync.attach_idempotency_key =
        env_bool(ENV_IDEMPOTENCY_KEY, config.sync.attach_idempotency_key);
    if let Some(window_ms) = env_parse(ENV_REDIRECT_WINDOW_MS)? {
        config.auth.redirect_window_ms = window_ms;
    }
    Ok(())
}

/// Reject configurations the client cannot run with
///
/// # Errors
/// Returns `MarginaliaError::Config` describing the first problem found.
pub fn validate(config: &Config) -> Result<()> {
    let base_url = config.api.resolved_base_url();
    let parsed = Url::parse(&base_url)
        .map_err(|e| MarginaliaError::Config(format!("Invalid API base URL '{base_url}': {e}")))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(MarginaliaError::Config(format!(
            "API base URL must use http or https: {base_url}"
        )));
    }
    if config.api.timeout_ms == 0 {
        return Err(MarginaliaError::Config("API timeout must be positive".into()));
    }
    if config.api.max_attempts == 0 {
        return Err(MarginaliaError::Config("API max attempts must be at least 1".into()));
    }
    if config.storage.namespace.trim().is_empty() {
        return Err(MarginaliaError::Config("Storage namespace must not be empty".into()));
    }
    if config.classifier.quota_code_min > config.classifier.quota_code_max {
        return Err(MarginaliaError::Config("Quota code range is empty".into()));
    }
    Ok(())
}

/// Read an optional environment variable, treating blank values as unset
fn env_var(key: &str) -> Option<String> {
    std::env::var(key).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Parse an optional environment variable
///
/// # Errors
/// Returns `MarginaliaError::Config` if the variable is set but invalid.
fn env_parse<T>(key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    env_var(key)
        .map(|raw| {
            raw.parse::<T>()
                .map_err(|e| MarginaliaError::Config(format!("Invalid value for {key}: {e}")))
        })
        .transpose()
}

/// Parse boolean from environment variable
///
/// Accepts: `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off` (case-insensitive)
fn env_bool(key: &str, default: bool) -> bool {
    env_var(key)
        .map(|s| matches!(s.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}
