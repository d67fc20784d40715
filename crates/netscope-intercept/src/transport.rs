//! Fetch-style transport seam.
//!
//! [`FetchTransport`] is the single-call networking primitive the fetch
//! interceptor wraps. [`ReqwestTransport`] is the real implementation; tests
//! substitute scripted ones.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::Client;
use serde::de::DeserializeOwned;
use thiserror::Error;

use netscope_core::{HeaderInput, RequestBody};

// =============================================================================
// ERRORS
// =============================================================================

/// Failure of the underlying networking primitive.
///
/// These are the caller-visible outcomes; the interceptors pass them through
/// unchanged.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// No response was obtained (DNS, connection refused, reset, abort).
    #[error("Network error: {0}")]
    Network(String),

    /// The request did not complete within its timeout.
    #[error("Request timeout: {0}")]
    Timeout(String),

    /// The request could not be built (bad URL, method, or header).
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The primitive was used out of order (e.g. send before open).
    #[error("Invalid state: {0}")]
    InvalidState(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TransportError::Timeout(e.to_string())
        } else if e.is_builder() {
            TransportError::InvalidRequest(e.to_string())
        } else {
            TransportError::Network(e.to_string())
        }
    }
}

// =============================================================================
// REQUEST
// =============================================================================

/// Optional request settings, mirroring the second argument of `fetch`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestInit {
    pub method: Option<String>,
    pub headers: Option<HeaderInput>,
    pub body: Option<RequestBody>,
}

impl RequestInit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    pub fn headers(mut self, headers: impl Into<HeaderInput>) -> Self {
        self.headers = Some(headers.into());
        self
    }

    pub fn body(mut self, body: impl Into<RequestBody>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Fields of `self` win over those of `base`.
    pub fn merged_over(&self, base: &RequestInit) -> RequestInit {
        RequestInit {
            method: self.method.clone().or_else(|| base.method.clone()),
            headers: self.headers.clone().or_else(|| base.headers.clone()),
            body: self.body.clone().or_else(|| base.body.clone()),
        }
    }
}

/// A structured request object carrying its own settings.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchRequest {
    pub url: String,
    pub init: RequestInit,
}

impl FetchRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            init: RequestInit::default(),
        }
    }

    pub fn with_init(mut self, init: RequestInit) -> Self {
        self.init = init;
        self
    }
}

/// First argument of `fetch`: a URL or a request object.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestTarget {
    Url(String),
    Request(FetchRequest),
}

impl RequestTarget {
    pub fn url(&self) -> &str {
        match self {
            Self::Url(url) => url,
            Self::Request(request) => &request.url,
        }
    }

    /// Settings in effect once `init` is layered over the request object's.
    pub fn effective_init(&self, init: Option<&RequestInit>) -> RequestInit {
        match (self, init) {
            (Self::Url(_), Some(init)) => init.clone(),
            (Self::Url(_), None) => RequestInit::default(),
            (Self::Request(request), Some(init)) => init.merged_over(&request.init),
            (Self::Request(request), None) => request.init.clone(),
        }
    }
}

impl From<&str> for RequestTarget {
    fn from(url: &str) -> Self {
        Self::Url(url.to_string())
    }
}

impl From<String> for RequestTarget {
    fn from(url: String) -> Self {
        Self::Url(url)
    }
}

impl From<url::Url> for RequestTarget {
    fn from(url: url::Url) -> Self {
        Self::Url(url.into())
    }
}

impl From<&url::Url> for RequestTarget {
    fn from(url: &url::Url) -> Self {
        Self::Url(url.as_str().to_string())
    }
}

impl From<FetchRequest> for RequestTarget {
    fn from(request: FetchRequest) -> Self {
        Self::Request(request)
    }
}

// =============================================================================
// RESPONSE
// =============================================================================

/// A completed HTTP response with its body buffered.
///
/// The body is shared `Bytes`, so the interceptor can inspect it and still
/// hand the caller an untouched response.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchResponse {
    pub url: String,
    pub status: u16,
    pub status_text: String,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl FetchResponse {
    /// Whether the status is in the 2xx range.
    pub fn ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }
}

// =============================================================================
// TRANSPORT
// =============================================================================

/// A fetch-like networking primitive.
#[async_trait]
pub trait FetchTransport: Send + Sync {
    async fn fetch(
        &self,
        target: RequestTarget,
        init: Option<RequestInit>,
    ) -> Result<FetchResponse, TransportError>;
}

/// Build a reqwest header map, rejecting names or values HTTP cannot carry.
pub(crate) fn to_header_map(input: &HeaderInput) -> Result<HeaderMap, TransportError> {
    if let HeaderInput::Map(map) = input {
        return Ok(map.clone());
    }
    let mut map = HeaderMap::new();
    for (name, value) in input.iter() {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| TransportError::InvalidRequest(format!("header name {name:?}: {e}")))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| TransportError::InvalidRequest(format!("header {name}: {e}")))?;
        map.append(name, value);
    }
    Ok(map)
}

pub(crate) fn to_reqwest_method(method: &str) -> Result<reqwest::Method, TransportError> {
    let method = if method.trim().is_empty() {
        "GET".to_string()
    } else {
        method.trim().to_ascii_uppercase()
    };
    reqwest::Method::from_bytes(method.as_bytes())
        .map_err(|e| TransportError::InvalidRequest(format!("method {method:?}: {e}")))
}

/// Real fetch transport backed by a `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }
}

#[async_trait]
impl FetchTransport for ReqwestTransport {
    async fn fetch(
        &self,
        target: RequestTarget,
        init: Option<RequestInit>,
    ) -> Result<FetchResponse, TransportError> {
        let settings = target.effective_init(init.as_ref());
        let method = to_reqwest_method(settings.method.as_deref().unwrap_or("GET"))?;

        let mut builder = self.client.request(method, target.url());
        if let Some(ref headers) = settings.headers {
            builder = builder.headers(to_header_map(headers)?);
        }
        if let Some(body) = settings.body {
            builder = match body {
                RequestBody::Text(text) => builder.body(text),
                RequestBody::Bytes(bytes) => builder.body(bytes),
            };
        }

        let response = builder.send().await?;
        let status = response.status();
        let url = response.url().to_string();
        let headers = response.headers().clone();
        let body = response.bytes().await?;

        Ok(FetchResponse {
            url,
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_from_url_types() {
        assert_eq!(RequestTarget::from("/a").url(), "/a");
        let parsed = url::Url::parse("https://api.test/b?c=1").unwrap();
        assert_eq!(RequestTarget::from(&parsed).url(), "https://api.test/b?c=1");
        assert_eq!(
            RequestTarget::from(FetchRequest::new("/d")).url(),
            "/d"
        );
    }

    #[test]
    fn test_effective_init_prefers_explicit_init() {
        let request = FetchRequest::new("/x").with_init(
            RequestInit::new()
                .method("PUT")
                .body("from-request"),
        );
        let target = RequestTarget::from(request);

        let merged = target.effective_init(Some(&RequestInit::new().method("post")));
        assert_eq!(merged.method.as_deref(), Some("post"));
        assert_eq!(merged.body, Some(RequestBody::from("from-request")));

        let inherited = target.effective_init(None);
        assert_eq!(inherited.method.as_deref(), Some("PUT"));
    }

    #[test]
    fn test_response_ok_range() {
        let mut response = FetchResponse {
            url: "/".into(),
            status: 204,
            status_text: "No Content".into(),
            headers: HeaderMap::new(),
            body: Bytes::new(),
        };
        assert!(response.ok());
        response.status = 302;
        assert!(!response.ok());
        response.status = 404;
        assert!(!response.ok());
    }

    #[test]
    fn test_to_header_map_rejects_bad_names() {
        let input = HeaderInput::from(vec![("bad header", "x")]);
        assert!(matches!(
            to_header_map(&input),
            Err(TransportError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_to_header_map_keeps_repeated_names() {
        let input = HeaderInput::from(vec![("X-A", "1"), ("X-A", "2"), ("X-B", "3")]);
        let map = to_header_map(&input).unwrap();
        let values: Vec<_> = map
            .get_all("x-a")
            .iter()
            .map(|v| v.to_str().unwrap())
            .collect();
        assert_eq!(values, vec!["1", "2"]);
        assert_eq!(map.len(), 3);
    }

    #[test]
    fn test_to_reqwest_method() {
        assert_eq!(to_reqwest_method("patch").unwrap(), reqwest::Method::PATCH);
        assert_eq!(to_reqwest_method("").unwrap(), reqwest::Method::GET);
        assert!(to_reqwest_method("BAD VERB").is_err());
    }

    #[test]
    fn test_transport_error_display() {
        let err = TransportError::Timeout("30s elapsed".into());
        assert_eq!(err.to_string(), "Request timeout: 30s elapsed");
    }
}
