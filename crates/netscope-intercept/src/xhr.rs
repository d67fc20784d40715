//! XHR-style interceptor.
//!
//! The XHR primitive is stateful: `open`, any number of
//! `set_request_header` calls, then `send`, which settles with exactly one
//! of the `load`, `error`, or `timeout` events. [`InterceptedXhr`] shadows
//! each step to build the log entry, lets the wrapped [`XhrTransport`] do
//! the real work, and returns its event unchanged.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::Client;
use tracing::debug;
use uuid::Uuid;

use netscope_core::defaults::{NETWORK_ERROR_MSG, TIMEOUT_ERROR_MSG};
use netscope_core::{
    find_header, parse_raw_headers, parse_response_body, snapshot_request_body, HeaderInput,
    HeaderSnapshot, LogEntry, LogEntryPatch, LogStore, Method, RequestBody, RequestKind,
};

use crate::fetch::elapsed_ms;
use crate::transport::{to_header_map, to_reqwest_method, TransportError};

// =============================================================================
// EVENTS
// =============================================================================

/// Response state readable after a `load` event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XhrResponse {
    pub status: u16,
    pub status_text: String,
    /// CRLF-separated `name: value` lines.
    pub raw_headers: String,
    pub response_text: String,
}

impl XhrResponse {
    pub fn all_response_headers(&self) -> &str {
        &self.raw_headers
    }

    /// Case-insensitive single header lookup.
    pub fn response_header(&self, name: &str) -> Option<String> {
        find_header(&parse_raw_headers(&self.raw_headers), name).map(str::to_string)
    }
}

/// Terminal event of a sent request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XhrEvent {
    Load(XhrResponse),
    Error,
    Timeout,
}

impl XhrEvent {
    pub fn kind(&self) -> XhrEventKind {
        match self {
            Self::Load(_) => XhrEventKind::Load,
            Self::Error => XhrEventKind::Error,
            Self::Timeout => XhrEventKind::Timeout,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum XhrEventKind {
    Load,
    Error,
    Timeout,
}

// =============================================================================
// TRANSPORT
// =============================================================================

/// An XHR-like networking primitive.
#[async_trait]
pub trait XhrTransport: Send {
    fn open(&mut self, method: &str, url: &str) -> Result<(), TransportError>;

    fn set_request_header(&mut self, name: &str, value: &str) -> Result<(), TransportError>;

    /// Send the opened request and wait for its terminal event.
    async fn send(&mut self, body: Option<RequestBody>) -> Result<XhrEvent, TransportError>;
}

struct OpenedRequest {
    method: reqwest::Method,
    url: String,
    headers: Vec<(String, String)>,
}

/// Real XHR transport backed by a `reqwest::Client`.
pub struct ReqwestXhr {
    client: Client,
    timeout: Option<Duration>,
    opened: Option<OpenedRequest>,
}

impl ReqwestXhr {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            timeout: None,
            opened: None,
        }
    }

    /// Per-request timeout, reported as [`XhrEvent::Timeout`] when hit.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    fn render_headers(headers: &HeaderMap) -> String {
        headers
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| format!("{}: {}\r\n", name, value))
            })
            .collect()
    }
}

#[async_trait]
impl XhrTransport for ReqwestXhr {
    fn open(&mut self, method: &str, url: &str) -> Result<(), TransportError> {
        self.opened = Some(OpenedRequest {
            method: to_reqwest_method(method)?,
            url: url.to_string(),
            headers: Vec::new(),
        });
        Ok(())
    }

    fn set_request_header(&mut self, name: &str, value: &str) -> Result<(), TransportError> {
        let opened = self
            .opened
            .as_mut()
            .ok_or_else(|| TransportError::InvalidState("setRequestHeader before open".into()))?;
        opened.headers.push((name.to_string(), value.to_string()));
        Ok(())
    }

    async fn send(&mut self, body: Option<RequestBody>) -> Result<XhrEvent, TransportError> {
        let opened = self
            .opened
            .take()
            .ok_or_else(|| TransportError::InvalidState("send before open".into()))?;

        let headers = to_header_map(&HeaderInput::Pairs(opened.headers))?;
        let mut builder = self
            .client
            .request(opened.method, &opened.url)
            .headers(headers);
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(body) = body {
            builder = match body {
                RequestBody::Text(text) => builder.body(text),
                RequestBody::Bytes(bytes) => builder.body(bytes),
            };
        }

        let response = match builder.send().await {
            Ok(response) => response,
            Err(e) if e.is_timeout() => return Ok(XhrEvent::Timeout),
            Err(e) if e.is_builder() => return Err(TransportError::from(e)),
            Err(_) => return Ok(XhrEvent::Error),
        };

        let status = response.status();
        let raw_headers = Self::render_headers(response.headers());
        let response_text = match response.text().await {
            Ok(text) => text,
            Err(e) if e.is_timeout() => return Ok(XhrEvent::Timeout),
            Err(_) => return Ok(XhrEvent::Error),
        };

        Ok(XhrEvent::Load(XhrResponse {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            raw_headers,
            response_text,
        }))
    }
}

// =============================================================================
// INTERCEPTOR
// =============================================================================

type Listener = Box<dyn FnMut(&XhrEvent) + Send>;

struct PendingCall {
    id: Uuid,
    method: Method,
    url: String,
    headers: HeaderSnapshot,
}

/// Logging wrapper around an XHR transport.
pub struct InterceptedXhr<T> {
    inner: T,
    store: LogStore,
    call: Option<PendingCall>,
    listeners: Vec<(XhrEventKind, Listener)>,
}

impl<T: XhrTransport> InterceptedXhr<T> {
    pub fn new(inner: T, store: LogStore) -> Self {
        Self {
            inner,
            store,
            call: None,
            listeners: Vec::new(),
        }
    }

    pub fn store(&self) -> &LogStore {
        &self.store
    }

    /// Id the opened, not yet sent, call will record under.
    pub fn entry_id(&self) -> Option<Uuid> {
        self.call.as_ref().map(|call| call.id)
    }

    /// Register a caller listener for one event kind.
    ///
    /// Listeners run in registration order when `send` settles, before the
    /// log entry receives its terminal update.
    pub fn add_event_listener<F>(&mut self, kind: XhrEventKind, listener: F)
    where
        F: FnMut(&XhrEvent) + Send + 'static,
    {
        self.listeners.push((kind, Box::new(listener)));
    }

    /// Start a new call. Re-opening discards previously set headers.
    pub fn open(&mut self, method: &str, url: &str) -> Result<(), TransportError> {
        self.call = None;
        self.inner.open(method, url)?;
        self.call = Some(PendingCall {
            id: Uuid::now_v7(),
            method: Method::parse(method),
            url: url.to_string(),
            headers: HeaderSnapshot::new(),
        });
        Ok(())
    }

    /// Headers the wrapped transport rejects are not recorded.
    pub fn set_request_header(&mut self, name: &str, value: &str) -> Result<(), TransportError> {
        self.inner.set_request_header(name, value)?;
        if let Some(ref mut call) = self.call {
            call.headers.insert(name.to_string(), value.to_string());
        }
        Ok(())
    }

    /// Send the request, record it, and return the transport's event.
    ///
    /// Each `open` allows one `send`. Without it this fails with
    /// [`TransportError::InvalidState`] and records nothing.
    pub async fn send(&mut self, body: Option<RequestBody>) -> Result<XhrEvent, TransportError> {
        let Some(call) = self.call.take() else {
            return Err(TransportError::InvalidState("send before open".into()));
        };
        let id = call.id;
        let start = Instant::now();

        debug!(
            subsystem = "intercept",
            component = "xhr",
            entry_id = %id,
            method = %call.method,
            url = %call.url,
            "Request started"
        );

        let request_body = body
            .as_ref()
            .filter(|body| !body.is_empty())
            .map(snapshot_request_body);
        let entry = LogEntry::pending_with_id(id, RequestKind::Xhr, call.method, call.url)
            .with_request_headers(call.headers)
            .with_request_body(request_body);
        self.store.append(entry);

        let event = match self.inner.send(body).await {
            Ok(event) => event,
            Err(err) => {
                self.store.update(
                    id,
                    LogEntryPatch::transport_failure(elapsed_ms(start), err.to_string()),
                );
                return Err(err);
            }
        };
        let duration_ms = elapsed_ms(start);

        for (kind, listener) in self.listeners.iter_mut() {
            if *kind == event.kind() {
                listener(&event);
            }
        }

        self.record_event(id, duration_ms, &event);
        Ok(event)
    }

    fn record_event(&self, id: Uuid, duration_ms: f64, event: &XhrEvent) {
        let patch = match event {
            XhrEvent::Load(response) => {
                let headers = parse_raw_headers(&response.raw_headers);
                let content_type = find_header(&headers, "content-type");
                let body = parse_response_body(content_type, response.response_text.as_bytes());
                let ok = (200..400).contains(&response.status);
                LogEntryPatch::response(
                    response.status,
                    response.status_text.clone(),
                    duration_ms,
                    headers,
                    body,
                    ok,
                )
            }
            XhrEvent::Error => LogEntryPatch::transport_failure(duration_ms, NETWORK_ERROR_MSG),
            XhrEvent::Timeout => LogEntryPatch::transport_failure(duration_ms, TIMEOUT_ERROR_MSG),
        };

        debug!(
            subsystem = "intercept",
            component = "xhr",
            entry_id = %id,
            event = ?event.kind(),
            duration_ms,
            "Request settled"
        );
        self.store.update(id, patch);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use netscope_core::{EntryState, Payload};
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    /// Transport settling with a canned event.
    #[derive(Default)]
    struct ScriptedXhr {
        event: Option<XhrEvent>,
        log: Arc<Mutex<Vec<String>>>,
        /// Header name `set_request_header` refuses.
        reject_header: Option<String>,
    }

    #[async_trait]
    impl XhrTransport for ScriptedXhr {
        fn open(&mut self, method: &str, url: &str) -> Result<(), TransportError> {
            self.log.lock().unwrap().push(format!("open {method} {url}"));
            Ok(())
        }

        fn set_request_header(&mut self, name: &str, value: &str) -> Result<(), TransportError> {
            if self.reject_header.as_deref() == Some(name) {
                return Err(TransportError::InvalidRequest(format!("header {name}")));
            }
            self.log.lock().unwrap().push(format!("header {name}={value}"));
            Ok(())
        }

        async fn send(&mut self, body: Option<RequestBody>) -> Result<XhrEvent, TransportError> {
            self.log.lock().unwrap().push(format!("send {:?}", body));
            Ok(self.event.clone().unwrap_or(XhrEvent::Error))
        }
    }

    fn load(status: u16, content_type: &str, text: &str) -> XhrEvent {
        XhrEvent::Load(XhrResponse {
            status,
            status_text: "Status".into(),
            raw_headers: format!("content-type: {content_type}\r\nx-req: 9\r\n"),
            response_text: text.into(),
        })
    }

    fn xhr(event: XhrEvent, store: &LogStore) -> InterceptedXhr<ScriptedXhr> {
        InterceptedXhr::new(
            ScriptedXhr {
                event: Some(event),
                ..Default::default()
            },
            store.clone(),
        )
    }

    #[tokio::test]
    async fn test_load_records_success() {
        let store = LogStore::new(10);
        let mut req = xhr(load(200, "application/json", r#"{"ok":true}"#), &store);

        req.open("get", "/api/x").unwrap();
        req.set_request_header("Accept", "application/json").unwrap();
        let event = req.send(None).await.unwrap();

        assert!(matches!(event, XhrEvent::Load(_)));
        let entry = &store.snapshot()[0];
        assert_eq!(entry.kind, RequestKind::Xhr);
        assert_eq!(entry.method, Method::Get);
        assert_eq!(entry.state, EntryState::Success);
        assert_eq!(entry.status, Some(200));
        assert_eq!(entry.response_body, Some(Payload::Json(json!({"ok": true}))));
        assert_eq!(entry.response_headers.get("x-req").map(String::as_str), Some("9"));
        assert_eq!(entry.request_headers.get("Accept").map(String::as_str), Some("application/json"));
        assert!(entry.duration_ms.is_some());
    }

    #[tokio::test]
    async fn test_redirect_status_counts_as_success() {
        let store = LogStore::new(10);
        let mut req = xhr(load(304, "text/plain", ""), &store);
        req.open("GET", "/cached").unwrap();
        req.send(None).await.unwrap();
        assert_eq!(store.snapshot()[0].state, EntryState::Success);
    }

    #[tokio::test]
    async fn test_http_error_status() {
        let store = LogStore::new(10);
        let mut req = xhr(load(500, "text/plain", "boom"), &store);
        req.open("POST", "/fail").unwrap();
        req.send(Some(RequestBody::from("a=1"))).await.unwrap();

        let entry = &store.snapshot()[0];
        assert_eq!(entry.state, EntryState::Error);
        assert_eq!(entry.status, Some(500));
        assert!(entry.error.is_none());
        assert_eq!(entry.request_body, Some(Payload::Text("a=1".into())));
        assert_eq!(entry.response_body, Some(Payload::Text("boom".into())));
    }

    #[tokio::test]
    async fn test_malformed_json_falls_back_to_text() {
        let store = LogStore::new(10);
        let mut req = xhr(load(200, "application/json", "{oops"), &store);
        req.open("GET", "/bad").unwrap();
        req.send(None).await.unwrap();
        assert_eq!(
            store.snapshot()[0].response_body,
            Some(Payload::Text("{oops".into()))
        );
    }

    #[tokio::test]
    async fn test_error_and_timeout_events() {
        let store = LogStore::new(10);

        let mut failing = xhr(XhrEvent::Error, &store);
        failing.open("GET", "/down").unwrap();
        assert_eq!(failing.send(None).await.unwrap(), XhrEvent::Error);

        let mut slow = xhr(XhrEvent::Timeout, &store);
        slow.open("GET", "/slow").unwrap();
        assert_eq!(slow.send(None).await.unwrap(), XhrEvent::Timeout);

        let snap = store.snapshot();
        assert_eq!(snap[0].error.as_deref(), Some(TIMEOUT_ERROR_MSG));
        assert_eq!(snap[1].error.as_deref(), Some(NETWORK_ERROR_MSG));
        assert!(snap.iter().all(|e| e.state == EntryState::Error && e.status.is_none()));
    }

    #[tokio::test]
    async fn test_send_before_open_records_nothing() {
        let store = LogStore::new(10);
        let mut req = xhr(XhrEvent::Error, &store);
        let result = req.send(None).await;
        assert!(matches!(result, Err(TransportError::InvalidState(_))));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_calls_are_delegated_in_order() {
        let store = LogStore::new(10);
        let transport = ScriptedXhr {
            event: Some(load(200, "text/plain", "ok")),
            ..Default::default()
        };
        let log = Arc::clone(&transport.log);
        let mut req = InterceptedXhr::new(transport, store);

        req.open("post", "/echo").unwrap();
        req.set_request_header("X-A", "1").unwrap();
        req.send(Some(RequestBody::from("{\"a\":1}"))).await.unwrap();

        let log = log.lock().unwrap();
        assert_eq!(log[0], "open post /echo");
        assert_eq!(log[1], "header X-A=1");
        assert!(log[2].starts_with("send Some(Text("));
    }

    #[tokio::test]
    async fn test_caller_listeners_fire_for_matching_kind() {
        let store = LogStore::new(10);
        let mut req = xhr(load(200, "text/plain", "ok"), &store);
        let fired = Arc::new(Mutex::new(Vec::new()));

        let on_load = Arc::clone(&fired);
        req.add_event_listener(XhrEventKind::Load, move |_| {
            on_load.lock().unwrap().push("load")
        });
        let on_error = Arc::clone(&fired);
        req.add_event_listener(XhrEventKind::Error, move |_| {
            on_error.lock().unwrap().push("error")
        });

        req.open("GET", "/x").unwrap();
        req.send(None).await.unwrap();
        assert_eq!(*fired.lock().unwrap(), vec!["load"]);
    }

    #[tokio::test]
    async fn test_reopen_starts_fresh_entry() {
        let store = LogStore::new(10);
        let mut req = xhr(load(200, "text/plain", "ok"), &store);

        req.open("GET", "/one").unwrap();
        req.set_request_header("X-Old", "1").unwrap();
        let first = req.entry_id();
        req.open("GET", "/two").unwrap();
        assert_ne!(req.entry_id(), first);

        req.send(None).await.unwrap();
        let entry = &store.snapshot()[0];
        assert_eq!(entry.url, "/two");
        assert!(entry.request_headers.is_empty());
    }

    #[tokio::test]
    async fn test_rejected_header_is_not_recorded() {
        let store = LogStore::new(10);
        let transport = ScriptedXhr {
            event: Some(load(200, "text/plain", "ok")),
            reject_header: Some("Bad Name".into()),
            ..Default::default()
        };
        let mut req = InterceptedXhr::new(transport, store.clone());

        req.open("GET", "/h").unwrap();
        req.set_request_header("X-Good", "1").unwrap();
        assert!(matches!(
            req.set_request_header("Bad Name", "2"),
            Err(TransportError::InvalidRequest(_))
        ));
        req.send(None).await.unwrap();

        let entry = &store.snapshot()[0];
        assert_eq!(entry.request_headers.len(), 1);
        assert_eq!(entry.request_headers.get("X-Good").map(String::as_str), Some("1"));
        assert!(!entry.request_headers.contains_key("Bad Name"));
    }

    #[test]
    fn test_response_header_lookup() {
        let response = XhrResponse {
            raw_headers: "Content-Type: text/html\r\n".into(),
            ..Default::default()
        };
        assert_eq!(response.response_header("content-type").as_deref(), Some("text/html"));
        assert_eq!(response.all_response_headers(), "Content-Type: text/html\r\n");
    }
}
