//! Request and response body snapshots.
//!
//! Parsing is best-effort: a body that does not parse is stored raw, never
//! reported as an error.

use serde::Serialize;
use serde_json::Value as JsonValue;

/// A body as stored in a [`LogEntry`](crate::LogEntry).
///
/// Serialized untagged: JSON as the value itself, text as a string, binary
/// as a byte array. That shape cannot tell the variants apart again, so
/// there is no `Deserialize`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Payload {
    Json(JsonValue),
    Text(String),
    Binary(Vec<u8>),
}

impl Payload {
    pub fn as_json(&self) -> Option<&JsonValue> {
        match self {
            Self::Json(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Human-readable rendering (pretty JSON, text verbatim, byte count).
    pub fn display(&self) -> String {
        match self {
            Self::Json(value) => {
                serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
            }
            Self::Text(text) => text.clone(),
            Self::Binary(bytes) => format!("<{} bytes>", bytes.len()),
        }
    }
}

/// A request body as handed to a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestBody {
    Text(String),
    Bytes(Vec<u8>),
}

impl RequestBody {
    /// Serialize `value` into a JSON text body.
    pub fn json<T: Serialize + ?Sized>(value: &T) -> crate::Result<Self> {
        Ok(Self::Text(serde_json::to_string(value)?))
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Text(text) => text.as_bytes(),
            Self::Bytes(bytes) => bytes,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.as_bytes().is_empty()
    }
}

impl From<&str> for RequestBody {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for RequestBody {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<Vec<u8>> for RequestBody {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(bytes)
    }
}

/// Snapshot a request body: JSON text is parsed, anything else kept as-is.
pub fn snapshot_request_body(body: &RequestBody) -> Payload {
    match body {
        RequestBody::Text(text) => match serde_json::from_str::<JsonValue>(text) {
            Ok(value) => Payload::Json(value),
            Err(_) => Payload::Text(text.clone()),
        },
        RequestBody::Bytes(bytes) => Payload::Binary(bytes.clone()),
    }
}

pub fn is_json_content_type(content_type: &str) -> bool {
    content_type.contains("application/json")
}

pub fn is_text_content_type(content_type: &str) -> bool {
    content_type.contains("text/")
}

/// Snapshot a response body according to its content type.
///
/// JSON that fails to parse falls back to the raw text. Bodies with a
/// content type that is neither JSON nor text, or with none at all, are not
/// recorded.
pub fn parse_response_body(content_type: Option<&str>, body: &[u8]) -> Option<Payload> {
    let content_type = content_type?;
    if is_json_content_type(content_type) {
        Some(match serde_json::from_slice::<JsonValue>(body) {
            Ok(value) => Payload::Json(value),
            Err(_) => Payload::Text(String::from_utf8_lossy(body).into_owned()),
        })
    } else if is_text_content_type(content_type) {
        Some(Payload::Text(String::from_utf8_lossy(body).into_owned()))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json_request_body_is_parsed() {
        let body = RequestBody::from(r#"{"a":1}"#);
        assert_eq!(snapshot_request_body(&body), Payload::Json(json!({"a": 1})));
    }

    #[test]
    fn test_non_json_request_body_is_kept_verbatim() {
        let body = RequestBody::from("name=joe&x=1");
        assert_eq!(
            snapshot_request_body(&body),
            Payload::Text("name=joe&x=1".to_string())
        );
    }

    #[test]
    fn test_binary_request_body() {
        let body = RequestBody::from(vec![0u8, 159, 146, 150]);
        assert_eq!(
            snapshot_request_body(&body),
            Payload::Binary(vec![0u8, 159, 146, 150])
        );
    }

    #[test]
    fn test_request_body_json_helper() {
        let body = RequestBody::json(&json!({"ok": true})).unwrap();
        assert_eq!(body, RequestBody::Text(r#"{"ok":true}"#.to_string()));
    }

    #[test]
    fn test_response_json_body() {
        let payload = parse_response_body(Some("application/json; charset=utf-8"), br#"{"ok":true}"#);
        assert_eq!(payload, Some(Payload::Json(json!({"ok": true}))));
    }

    #[test]
    fn test_response_malformed_json_falls_back_to_text() {
        let payload = parse_response_body(Some("application/json"), b"{not json");
        assert_eq!(payload, Some(Payload::Text("{not json".to_string())));
    }

    #[test]
    fn test_response_text_body() {
        let payload = parse_response_body(Some("text/html"), b"<p>hi</p>");
        assert_eq!(payload.as_ref().and_then(Payload::as_text), Some("<p>hi</p>"));
    }

    #[test]
    fn test_response_other_content_type_is_unset() {
        assert_eq!(parse_response_body(Some("image/png"), &[1, 2, 3]), None);
        assert_eq!(parse_response_body(None, b"plain"), None);
    }

    #[test]
    fn test_payload_display() {
        assert_eq!(Payload::Binary(vec![1, 2]).display(), "<2 bytes>");
        assert_eq!(Payload::Text("x".into()).display(), "x");
        assert!(Payload::Json(json!({"a": 1})).display().contains("\"a\": 1"));
    }

    #[test]
    fn test_payload_serializes_untagged() {
        assert_eq!(
            serde_json::to_value(Payload::Text("name=joe".into())).unwrap(),
            json!("name=joe")
        );
        assert_eq!(
            serde_json::to_value(Payload::Json(json!({"a": 1}))).unwrap(),
            json!({"a": 1})
        );
        assert_eq!(
            serde_json::to_value(Payload::Binary(vec![1, 2])).unwrap(),
            json!([1, 2])
        );
    }
}
