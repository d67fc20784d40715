//! Centralized default constants for netscope.
//!
//! Both crates reference these constants instead of defining their own
//! magic numbers.

// =============================================================================
// LOG STORE
// =============================================================================

/// Maximum number of entries the log store keeps (newest first).
pub const LOG_CAPACITY: usize = 100;

/// Buffer size of the store's broadcast channel for async consumers.
pub const EVENT_BUFFER: usize = 256;

// =============================================================================
// INTERCEPTORS
// =============================================================================

/// Error description recorded when an XHR-style request reports `error`.
pub const NETWORK_ERROR_MSG: &str = "Network error";

/// Error description recorded when an XHR-style request reports `timeout`.
pub const TIMEOUT_ERROR_MSG: &str = "Request timeout";

/// Default request timeout applied by the reqwest transports (seconds).
pub const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Default `User-Agent` sent by the reqwest transports.
pub const USER_AGENT: &str = concat!("netscope/", env!("CARGO_PKG_VERSION"));

// =============================================================================
// ENVIRONMENT
// =============================================================================

/// Overrides [`LOG_CAPACITY`].
pub const ENV_LOG_CAPACITY: &str = "NETSCOPE_LOG_CAPACITY";

/// Starts the store paused when set to `1`/`true`.
pub const ENV_START_PAUSED: &str = "NETSCOPE_START_PAUSED";

/// Overrides [`REQUEST_TIMEOUT_SECS`].
pub const ENV_TIMEOUT_SECS: &str = "NETSCOPE_TIMEOUT_SECS";

/// Overrides [`USER_AGENT`].
pub const ENV_USER_AGENT: &str = "NETSCOPE_USER_AGENT";
