//! # netscope-core
//!
//! Data model and in-memory log store for the netscope request console.
//!
//! This crate provides:
//! - [`LogEntry`] records tracking one network call from `pending` to a
//!   terminal `success`/`error` state
//! - [`LogStore`], a bounded, newest-first, subscribable collection with a
//!   pause switch and copy-on-write snapshots
//! - Header and body normalization used by the interceptors
//! - Filtering, counters, and display formatting for console front-ends
//!
//! It performs no I/O; the interceptors live in `netscope-intercept`.
//!
//! # Example
//!
//! ```rust
//! use netscope_core::{LogEntry, LogEntryPatch, LogStore, Method, RequestKind};
//!
//! let store = LogStore::new(100);
//! let _sub = store.subscribe(|| println!("store changed"));
//!
//! let entry = LogEntry::pending(RequestKind::Fetch, Method::Get, "/api/x");
//! let id = entry.id;
//! store.append(entry);
//! store.update(id, LogEntryPatch::transport_failure(12.0, "connection refused"));
//!
//! assert_eq!(store.snapshot().len(), 1);
//! ```

pub mod defaults;
pub mod error;
pub mod headers;
pub mod logging;
pub mod models;
pub mod payload;
pub mod store;
pub mod view;

// Re-export commonly used types at crate root
pub use error::{Error, Result};
pub use headers::{
    find_header, normalize_headers, parse_raw_headers, snapshot_header_map, HeaderInput,
    HeaderSnapshot,
};
pub use models::{EntryState, LogEntry, LogEntryPatch, Method, RequestKind};
pub use payload::{parse_response_body, snapshot_request_body, Payload, RequestBody};
pub use store::{LogStore, Snapshot, StoreEvent, Subscription};
pub use view::{format_duration, format_time, format_url, LogFilter, LogSummary, StatusBadge};
