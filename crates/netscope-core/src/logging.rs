//! Structured logging field name constants for netscope.
//!
//! Both crates use these constants for consistent `tracing` fields so a
//! log pipeline can query interceptor activity by stable names.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | WARN  | Recoverable issue, fallback applied (bad config value) |
//! | INFO  | Installation, store clear, pause toggles |
//! | DEBUG | Request start/completion, dropped entries, degraded snapshots |
//! | TRACE | Subscriber notification fan-out |

// ─── Identity fields ───────────────────────────────────────────────────────

/// Subsystem originating the log event.
/// Values: "store", "intercept", "cli"
pub const SUBSYSTEM: &str = "subsystem";

/// Component within a subsystem.
/// Examples: "fetch", "xhr", "log_store"
pub const COMPONENT: &str = "component";

/// Log entry UUID (UUIDv7).
pub const ENTRY_ID: &str = "entry_id";

// ─── Request fields ────────────────────────────────────────────────────────

/// HTTP method of the observed call.
pub const METHOD: &str = "method";

/// URL of the observed call.
pub const URL: &str = "url";

/// HTTP status code.
pub const STATUS: &str = "status";

/// Lifecycle state of the entry ("pending", "success", "error").
pub const STATE: &str = "state";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Number of entries currently held by the store.
pub const ENTRY_COUNT: &str = "entry_count";

/// Number of registered subscriber callbacks.
pub const SUBSCRIBER_COUNT: &str = "subscriber_count";

// ─── Outcome fields ────────────────────────────────────────────────────────

/// Error message when an operation fails.
pub const ERROR_MSG: &str = "error";
