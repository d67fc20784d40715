//! Log entry data model.
//!
//! One [`LogEntry`] exists per observed network call. It is created in the
//! `pending` state when the call starts and receives exactly one terminal
//! update through a [`LogEntryPatch`] when the call completes.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use uuid::Uuid;

use crate::headers::HeaderSnapshot;
use crate::payload::Payload;

// =============================================================================
// METHOD
// =============================================================================

/// HTTP method of an observed call.
///
/// Non-standard verbs are kept verbatim (uppercased) in [`Method::Other`] so
/// the call is still recorded.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum Method {
    #[default]
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Options,
    Head,
    Other(String),
}

impl Method {
    /// Parse a method name, normalizing to uppercase. Empty input is GET.
    pub fn parse(raw: &str) -> Self {
        let upper = raw.trim().to_ascii_uppercase();
        match upper.as_str() {
            "" | "GET" => Self::Get,
            "POST" => Self::Post,
            "PUT" => Self::Put,
            "DELETE" => Self::Delete,
            "PATCH" => Self::Patch,
            "OPTIONS" => Self::Options,
            "HEAD" => Self::Head,
            _ => Self::Other(upper),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
            Self::Patch => "PATCH",
            Self::Options => "OPTIONS",
            Self::Head => "HEAD",
            Self::Other(verb) => verb,
        }
    }
}

impl FromStr for Method {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Method {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Method {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::parse(&raw))
    }
}

// =============================================================================
// KIND / STATE
// =============================================================================

/// Which interceptor observed the call. Informational only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestKind {
    Fetch,
    Xhr,
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fetch => write!(f, "fetch"),
            Self::Xhr => write!(f, "xhr"),
        }
    }
}

impl FromStr for RequestKind {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "fetch" => Ok(Self::Fetch),
            "xhr" => Ok(Self::Xhr),
            other => Err(crate::Error::InvalidInput(format!("unknown request kind: {other}"))),
        }
    }
}

/// Lifecycle state of a log entry.
///
/// `Pending` is the only non-terminal state; `Success` and `Error` accept no
/// further transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryState {
    #[default]
    Pending,
    Success,
    Error,
}

impl EntryState {
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// Whether moving from `self` to `next` is a legal transition.
    pub fn can_transition_to(self, next: EntryState) -> bool {
        self == Self::Pending && next.is_terminal()
    }
}

impl fmt::Display for EntryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Success => write!(f, "success"),
            Self::Error => write!(f, "error"),
        }
    }
}

// =============================================================================
// LOG ENTRY
// =============================================================================

/// One record per observed network call. Serialize-only, like [`Payload`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    /// Generated at call start; never changes.
    pub id: Uuid,
    /// Call start time.
    pub timestamp: DateTime<Utc>,
    pub method: Method,
    /// Request URL as provided by the caller.
    pub url: String,
    #[serde(rename = "type")]
    pub kind: RequestKind,
    pub state: EntryState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_text: Option<String>,
    /// Milliseconds between call start and the terminal update.
    #[serde(rename = "duration", skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<f64>,
    pub request_headers: HeaderSnapshot,
    pub response_headers: HeaderSnapshot,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_body: Option<Payload>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_body: Option<Payload>,
    /// Transport-level failure description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl LogEntry {
    /// Create a pending entry with a fresh UUIDv7 stamped now.
    pub fn pending(kind: RequestKind, method: Method, url: impl Into<String>) -> Self {
        Self::pending_with_id(Uuid::now_v7(), kind, method, url)
    }

    /// Create a pending entry for an id the caller already allocated.
    pub fn pending_with_id(
        id: Uuid,
        kind: RequestKind,
        method: Method,
        url: impl Into<String>,
    ) -> Self {
        Self {
            id,
            timestamp: Utc::now(),
            method,
            url: url.into(),
            kind,
            state: EntryState::Pending,
            status: None,
            status_text: None,
            duration_ms: None,
            request_headers: HeaderSnapshot::new(),
            response_headers: HeaderSnapshot::new(),
            request_body: None,
            response_body: None,
            error: None,
        }
    }

    pub fn with_request_headers(mut self, headers: HeaderSnapshot) -> Self {
        self.request_headers = headers;
        self
    }

    pub fn with_request_body(mut self, body: Option<Payload>) -> Self {
        self.request_body = body;
        self
    }

    /// Merge the `Some` fields of `patch` into this entry.
    ///
    /// Returns `false` without touching anything when the entry is already
    /// terminal or the patch carries an illegal state.
    pub fn apply(&mut self, patch: &LogEntryPatch) -> bool {
        if self.state.is_terminal() {
            return false;
        }
        if let Some(next) = patch.state {
            if !self.state.can_transition_to(next) {
                return false;
            }
            self.state = next;
        }
        if let Some(status) = patch.status {
            self.status = Some(status);
        }
        if let Some(ref text) = patch.status_text {
            self.status_text = Some(text.clone());
        }
        if let Some(ms) = patch.duration_ms {
            self.duration_ms = Some(ms);
        }
        if let Some(ref headers) = patch.response_headers {
            self.response_headers = headers.clone();
        }
        if let Some(ref body) = patch.response_body {
            self.response_body = Some(body.clone());
        }
        if let Some(ref error) = patch.error {
            self.error = Some(error.clone());
        }
        true
    }
}

// =============================================================================
// PATCH
// =============================================================================

/// Partial update applied to an entry at call completion.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LogEntryPatch {
    pub state: Option<EntryState>,
    pub status: Option<u16>,
    pub status_text: Option<String>,
    pub duration_ms: Option<f64>,
    pub response_headers: Option<HeaderSnapshot>,
    pub response_body: Option<Payload>,
    pub error: Option<String>,
}

impl LogEntryPatch {
    /// Completion with an HTTP response; `ok` decides success vs. HTTP error.
    pub fn response(
        status: u16,
        status_text: impl Into<String>,
        duration_ms: f64,
        headers: HeaderSnapshot,
        body: Option<Payload>,
        ok: bool,
    ) -> Self {
        Self {
            state: Some(if ok {
                EntryState::Success
            } else {
                EntryState::Error
            }),
            status: Some(status),
            status_text: Some(status_text.into()),
            duration_ms: Some(duration_ms),
            response_headers: Some(headers),
            response_body: body,
            error: None,
        }
    }

    /// Completion without any HTTP response (network failure, abort, timeout).
    pub fn transport_failure(duration_ms: f64, error: impl Into<String>) -> Self {
        Self {
            state: Some(EntryState::Error),
            duration_ms: Some(duration_ms),
            error: Some(error.into()),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_parse_normalizes_case() {
        assert_eq!(Method::parse("post"), Method::Post);
        assert_eq!(Method::parse(" Delete "), Method::Delete);
        assert_eq!(Method::parse(""), Method::Get);
        assert_eq!(Method::parse("propfind"), Method::Other("PROPFIND".to_string()));
    }

    #[test]
    fn test_request_kind_from_str() {
        assert_eq!("XHR".parse::<RequestKind>().unwrap(), RequestKind::Xhr);
        assert_eq!("fetch".parse::<RequestKind>().unwrap(), RequestKind::Fetch);
        assert!(matches!(
            "websocket".parse::<RequestKind>(),
            Err(crate::Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_method_serializes_as_verb() {
        let json = serde_json::to_string(&Method::Patch).unwrap();
        assert_eq!(json, "\"PATCH\"");
        let back: Method = serde_json::from_str("\"options\"").unwrap();
        assert_eq!(back, Method::Options);
    }

    #[test]
    fn test_state_transitions() {
        assert!(EntryState::Pending.can_transition_to(EntryState::Success));
        assert!(EntryState::Pending.can_transition_to(EntryState::Error));
        assert!(!EntryState::Pending.can_transition_to(EntryState::Pending));
        assert!(!EntryState::Success.can_transition_to(EntryState::Error));
        assert!(!EntryState::Error.can_transition_to(EntryState::Success));
    }

    #[test]
    fn test_pending_entry_has_no_completion_fields() {
        let entry = LogEntry::pending(RequestKind::Fetch, Method::Get, "/api/x");
        assert_eq!(entry.state, EntryState::Pending);
        assert!(entry.status.is_none());
        assert!(entry.duration_ms.is_none());
        assert!(entry.error.is_none());
    }

    #[test]
    fn test_apply_response_patch() {
        let mut entry = LogEntry::pending(RequestKind::Fetch, Method::Get, "/api/x");
        let id = entry.id;
        let patch = LogEntryPatch::response(404, "Not Found", 12.5, HeaderSnapshot::new(), None, false);

        assert!(entry.apply(&patch));
        assert_eq!(entry.id, id);
        assert_eq!(entry.state, EntryState::Error);
        assert_eq!(entry.status, Some(404));
        assert_eq!(entry.status_text.as_deref(), Some("Not Found"));
        assert!(entry.error.is_none());
    }

    #[test]
    fn test_apply_refuses_terminal_entry() {
        let mut entry = LogEntry::pending(RequestKind::Xhr, Method::Get, "/a");
        assert!(entry.apply(&LogEntryPatch::transport_failure(3.0, "Network error")));

        let late = LogEntryPatch::response(200, "OK", 5.0, HeaderSnapshot::new(), None, true);
        assert!(!entry.apply(&late));
        assert_eq!(entry.state, EntryState::Error);
        assert!(entry.status.is_none());
        assert_eq!(entry.duration_ms, Some(3.0));
    }

    #[test]
    fn test_entry_serializes_with_wire_names() {
        let entry = LogEntry::pending(RequestKind::Xhr, Method::Put, "/b");
        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["type"], "xhr");
        assert_eq!(value["state"], "pending");
        assert_eq!(value["method"], "PUT");
        assert!(value.get("duration").is_none());
        assert!(value.get("requestHeaders").is_some());
    }

    #[test]
    fn test_text_request_body_serializes_verbatim() {
        let entry = LogEntry::pending(RequestKind::Fetch, Method::Post, "/form")
            .with_request_body(Some(Payload::Text("name=joe".into())));
        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["requestBody"], "name=joe");
        assert!(value.get("responseBody").is_none());
    }
}
