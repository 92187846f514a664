//! Reserved keys, headers and path fragments shared by every layer

/// Namespace prepended to every key the client persists
pub const DEFAULT_STORAGE_NAMESPACE: &str = "marginalia:";

/// Keyed store slot holding the bearer token
pub const TOKEN_KEY: &str = "token";

/// Keyed store slot holding the signed-in user id
pub const USER_ID_KEY: &str = "user_id";

/// Keys cleared when the session is rejected by the server
pub const SESSION_KEYS: [&str; 2] = [TOKEN_KEY, USER_ID_KEY];

/// Keyed store slot holding the offline mutation queue
pub const SYNC_QUEUE_KEY: &str = "sync_queue";

/// Prefix under which response caches live (`cache:{resource}...`)
pub const CACHE_KEY_PREFIX: &str = "cache:";

/// Versioned API path segment appended to the base URL
pub const API_PATH_PREFIX: &str = "api/v1";

/// Header carrying the per-request trace id
pub const TRACE_ID_HEADER: &str = "X-Trace-Id";

/// Header carrying the replay idempotency key
pub const IDEMPOTENCY_KEY_HEADER: &str = "Idempotency-Key";

/// Business code signalling success in the response envelope
pub const SUCCESS_CODE: i64 = 0;

/// Error code for transport-level network failures
pub const NETWORK_ERROR_CODE: i64 = -1;

/// Error code for transport-level timeouts
pub const TIMEOUT_ERROR_CODE: i64 = -2;

/// Error code for responses that do not carry a usable envelope
pub const MALFORMED_RESPONSE_CODE: i64 = -3;

/// Error code for failures raised on the client before or after transport
pub const CLIENT_ERROR_CODE: i64 = -4;

/// Platform tag attached to trace contexts when none is configured
pub const DEFAULT_PLATFORM: &str = "rust";
