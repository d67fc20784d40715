//! Read-side helpers for console front-ends.
//!
//! Filtering, counters, and display formatting over a store snapshot. These
//! never touch the store; they operate on whatever slice they are given.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::models::{EntryState, LogEntry, Method, RequestKind};

/// Origin used to resolve relative URLs for display.
const DISPLAY_BASE: &str = "http://localhost/";

/// Filter over log entries. `None` fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LogFilter {
    pub kind: Option<RequestKind>,
    pub method: Option<Method>,
    /// Case-insensitive substring matched against the URL.
    pub text: Option<String>,
}

impl LogFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_kind(mut self, kind: RequestKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn with_method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        let text = text.into();
        self.text = if text.trim().is_empty() {
            None
        } else {
            Some(text)
        };
        self
    }

    pub fn matches(&self, entry: &LogEntry) -> bool {
        if self.kind.is_some_and(|kind| kind != entry.kind) {
            return false;
        }
        if self.method.as_ref().is_some_and(|m| *m != entry.method) {
            return false;
        }
        if let Some(ref text) = self.text {
            if !entry.url.to_lowercase().contains(&text.to_lowercase()) {
                return false;
            }
        }
        true
    }

    /// Entries matching the filter, in their original order.
    pub fn apply<'a>(&self, entries: &'a [LogEntry]) -> Vec<&'a LogEntry> {
        entries.iter().filter(|e| self.matches(e)).collect()
    }
}

/// Per-state counters over a set of entries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LogSummary {
    pub total: usize,
    pub pending: usize,
    pub success: usize,
    pub error: usize,
}

impl LogSummary {
    pub fn from_entries<'a>(entries: impl IntoIterator<Item = &'a LogEntry>) -> Self {
        let mut summary = Self::default();
        for entry in entries {
            summary.total += 1;
            match entry.state {
                EntryState::Pending => summary.pending += 1,
                EntryState::Success => summary.success += 1,
                EntryState::Error => summary.error += 1,
            }
        }
        summary
    }

    /// Number shown on a console badge: errors take precedence over pending.
    pub fn badge_count(&self) -> usize {
        if self.error > 0 {
            self.error
        } else {
            self.pending
        }
    }
}

/// Display class of an entry's status, as a console badge shows it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusBadge {
    Pending,
    /// Terminal without an HTTP status (transport failure).
    Failed,
    Success(u16),
    Redirect(u16),
    ClientError(u16),
    ServerError(u16),
}

impl StatusBadge {
    pub fn for_entry(entry: &LogEntry) -> Self {
        if entry.state == EntryState::Pending {
            return Self::Pending;
        }
        match entry.status {
            None | Some(0) => Self::Failed,
            Some(code @ 200..=299) => Self::Success(code),
            Some(code @ 300..=399) => Self::Redirect(code),
            Some(code @ 400..=499) => Self::ClientError(code),
            Some(code) => Self::ServerError(code),
        }
    }

    pub fn label(&self) -> String {
        match self {
            Self::Pending => "Pending".to_string(),
            Self::Failed => "Error".to_string(),
            Self::Success(code)
            | Self::Redirect(code)
            | Self::ClientError(code)
            | Self::ServerError(code) => code.to_string(),
        }
    }
}

/// `-` for absent or zero, whole milliseconds below a second, else seconds.
pub fn format_duration(duration_ms: Option<f64>) -> String {
    match duration_ms {
        None => "-".to_string(),
        Some(ms) if ms == 0.0 || ms.is_nan() => "-".to_string(),
        Some(ms) if ms < 1000.0 => format!("{}ms", ms.round() as u64),
        Some(ms) => format!("{:.2}s", ms / 1000.0),
    }
}

/// Path and query of `url`; relative URLs are resolved first.
pub fn format_url(url: &str) -> String {
    let parsed = Url::parse(url).or_else(|_| Url::parse(DISPLAY_BASE).and_then(|b| b.join(url)));
    match parsed {
        Ok(parsed) => match parsed.query() {
            Some(query) => format!("{}?{}", parsed.path(), query),
            None => parsed.path().to_string(),
        },
        Err(_) => url.to_string(),
    }
}

/// 24-hour wall-clock time of `timestamp`.
pub fn format_time(timestamp: DateTime<Utc>) -> String {
    timestamp.format("%H:%M:%S").to_string()
}
