//! Fetch-style interceptor.
//!
//! [`InterceptedFetch`] wraps any [`FetchTransport`] and records every call in
//! a [`LogStore`] without changing what the caller gets back: the wrapped
//! transport's response or error is returned as-is.

use std::time::Instant;

use async_trait::async_trait;
use tracing::debug;
use uuid::Uuid;

use netscope_core::{
    normalize_headers, parse_response_body, snapshot_header_map, snapshot_request_body, LogEntry,
    LogEntryPatch, LogStore, Method, RequestKind,
};

use crate::transport::{FetchResponse, FetchTransport, RequestInit, RequestTarget, TransportError};

/// Milliseconds elapsed since `start`.
pub(crate) fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}

/// Logging wrapper around a fetch transport.
#[derive(Debug, Clone)]
pub struct InterceptedFetch<T> {
    inner: T,
    store: LogStore,
}

impl<T: FetchTransport> InterceptedFetch<T> {
    pub fn new(inner: T, store: LogStore) -> Self {
        Self { inner, store }
    }

    pub fn store(&self) -> &LogStore {
        &self.store
    }

    /// The wrapped, uninstrumented transport.
    pub fn inner(&self) -> &T {
        &self.inner
    }

    /// Issue a request, recording it in the store.
    pub async fn fetch(
        &self,
        target: impl Into<RequestTarget>,
        init: Option<RequestInit>,
    ) -> Result<FetchResponse, TransportError> {
        let target = target.into();
        let id = Uuid::now_v7();
        let start = Instant::now();

        self.record_start(id, &target, init.as_ref());

        match self.inner.fetch(target, init).await {
            Ok(response) => {
                self.record_response(id, elapsed_ms(start), &response);
                Ok(response)
            }
            Err(err) => {
                let duration_ms = elapsed_ms(start);
                debug!(
                    subsystem = "intercept",
                    component = "fetch",
                    entry_id = %id,
                    duration_ms,
                    error = %err,
                    "Request failed"
                );
                self.store
                    .update(id, LogEntryPatch::transport_failure(duration_ms, err.to_string()));
                Err(err)
            }
        }
    }

    fn record_start(&self, id: Uuid, target: &RequestTarget, init: Option<&RequestInit>) {
        let settings = target.effective_init(init);
        let method = Method::parse(settings.method.as_deref().unwrap_or_default());
        let headers = settings
            .headers
            .as_ref()
            .map(normalize_headers)
            .unwrap_or_default();
        let body = settings
            .body
            .as_ref()
            .filter(|body| !body.is_empty())
            .map(snapshot_request_body);

        debug!(
            subsystem = "intercept",
            component = "fetch",
            entry_id = %id,
            method = %method,
            url = %target.url(),
            "Request started"
        );

        let entry = LogEntry::pending_with_id(id, RequestKind::Fetch, method, target.url())
            .with_request_headers(headers)
            .with_request_body(body);
        self.store.append(entry);
    }

    fn record_response(&self, id: Uuid, duration_ms: f64, response: &FetchResponse) {
        let headers = snapshot_header_map(&response.headers);
        let body = parse_response_body(response.content_type(), &response.body);
        let ok = response.ok();

        debug!(
            subsystem = "intercept",
            component = "fetch",
            entry_id = %id,
            status = response.status,
            duration_ms,
            "Request completed"
        );

        self.store.update(
            id,
            LogEntryPatch::response(
                response.status,
                response.status_text.clone(),
                duration_ms,
                headers,
                body,
                ok,
            ),
        );
    }
}

#[async_trait]
impl<T: FetchTransport> FetchTransport for InterceptedFetch<T> {
    async fn fetch(
        &self,
        target: RequestTarget,
        init: Option<RequestInit>,
    ) -> Result<FetchResponse, TransportError> {
        InterceptedFetch::fetch(self, target, init).await
    }
}
