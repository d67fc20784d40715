//! Header normalization.
//!
//! Callers hand request headers over in one of three shapes; the log only
//! ever stores the flat [`HeaderSnapshot`] form. Every function here is
//! infallible: a header that cannot be represented is skipped.

use std::collections::BTreeMap;

use reqwest::header::HeaderMap;
use tracing::debug;

/// Flat header name to value mapping. Last write wins for duplicates.
pub type HeaderSnapshot = BTreeMap<String, String>;

/// The header shapes accepted from callers.
#[derive(Debug, Clone, PartialEq)]
pub enum HeaderInput {
    /// A typed header collection. Names come out lowercased.
    Map(HeaderMap),
    /// Ordered name/value pairs, names kept as given.
    Pairs(Vec<(String, String)>),
    /// A plain name to value object, names kept as given.
    Object(BTreeMap<String, String>),
}

impl HeaderInput {
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Map(map) => map.is_empty(),
            Self::Pairs(pairs) => pairs.is_empty(),
            Self::Object(object) => object.is_empty(),
        }
    }

    /// Iterate the headers as string pairs in input order.
    ///
    /// Values of a [`HeaderInput::Map`] that are not valid UTF-8 are skipped.
    pub fn iter(&self) -> Box<dyn Iterator<Item = (&str, &str)> + '_> {
        match self {
            Self::Map(map) => Box::new(map.iter().filter_map(|(name, value)| {
                match value.to_str() {
                    Ok(value) => Some((name.as_str(), value)),
                    Err(_) => {
                        debug!(
                            subsystem = "intercept",
                            component = "headers",
                            header = %name,
                            "Skipping non UTF-8 header value"
                        );
                        None
                    }
                }
            })),
            Self::Pairs(pairs) => Box::new(pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))),
            Self::Object(object) => {
                Box::new(object.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            }
        }
    }
}

impl From<HeaderMap> for HeaderInput {
    fn from(map: HeaderMap) -> Self {
        Self::Map(map)
    }
}

impl From<Vec<(String, String)>> for HeaderInput {
    fn from(pairs: Vec<(String, String)>) -> Self {
        Self::Pairs(pairs)
    }
}

impl From<Vec<(&str, &str)>> for HeaderInput {
    fn from(pairs: Vec<(&str, &str)>) -> Self {
        Self::Pairs(
            pairs
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }
}

impl From<BTreeMap<String, String>> for HeaderInput {
    fn from(object: BTreeMap<String, String>) -> Self {
        Self::Object(object)
    }
}

/// Unify any accepted header shape into a snapshot.
pub fn normalize_headers(input: &HeaderInput) -> HeaderSnapshot {
    let mut snapshot = HeaderSnapshot::new();
    for (name, value) in input.iter() {
        snapshot.insert(name.to_string(), value.to_string());
    }
    snapshot
}

/// Snapshot a response header map.
pub fn snapshot_header_map(map: &HeaderMap) -> HeaderSnapshot {
    normalize_headers(&HeaderInput::Map(map.clone()))
}

/// Parse a raw `getAllResponseHeaders()`-style blob.
///
/// Lines are split on runs of CR/LF and each line at its first `": "`. A
/// line without the separator becomes a key with an empty value.
pub fn parse_raw_headers(raw: &str) -> HeaderSnapshot {
    let mut snapshot = HeaderSnapshot::new();
    for line in raw.trim().split(['\r', '\n']).filter(|l| !l.is_empty()) {
        let (key, value) = line.split_once(": ").unwrap_or((line, ""));
        if !key.is_empty() {
            snapshot.insert(key.to_string(), value.to_string());
        }
    }
    snapshot
}

/// Case-insensitive lookup in a snapshot.
pub fn find_header<'a>(headers: &'a HeaderSnapshot, name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::{HeaderValue, CONTENT_TYPE};

    #[test]
    fn test_normalize_header_map_lowercases_names() {
        let mut map = HeaderMap::new();
        map.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        map.insert("x-trace", HeaderValue::from_static("abc"));

        let snapshot = normalize_headers(&HeaderInput::Map(map));
        assert_eq!(snapshot.get("content-type").map(String::as_str), Some("application/json"));
        assert_eq!(snapshot.get("x-trace").map(String::as_str), Some("abc"));
    }

    #[test]
    fn test_normalize_header_map_skips_opaque_values() {
        let mut map = HeaderMap::new();
        map.insert("x-bin", HeaderValue::from_bytes(&[0xfa, 0xfb]).unwrap());
        map.insert("x-ok", HeaderValue::from_static("1"));

        let snapshot = normalize_headers(&HeaderInput::Map(map));
        assert_eq!(snapshot.len(), 1);
        assert!(snapshot.contains_key("x-ok"));
    }

    #[test]
    fn test_normalize_pairs_last_write_wins() {
        let input = HeaderInput::from(vec![("X-A", "1"), ("X-A", "2"), ("x-a", "3")]);
        let snapshot = normalize_headers(&input);
        assert_eq!(snapshot.get("X-A").map(String::as_str), Some("2"));
        assert_eq!(snapshot.get("x-a").map(String::as_str), Some("3"));
    }

    #[test]
    fn test_normalize_object_keeps_case() {
        let mut object = BTreeMap::new();
        object.insert("Authorization".to_string(), "Bearer t".to_string());
        let snapshot = normalize_headers(&HeaderInput::Object(object));
        assert_eq!(snapshot.get("Authorization").map(String::as_str), Some("Bearer t"));
    }

    #[test]
    fn test_parse_raw_headers() {
        let raw = "content-type: application/json\r\nx-multi: a: b\r\n\r\nbare\r\n";
        let snapshot = parse_raw_headers(raw);
        assert_eq!(snapshot.get("content-type").map(String::as_str), Some("application/json"));
        assert_eq!(snapshot.get("x-multi").map(String::as_str), Some("a: b"));
        assert_eq!(snapshot.get("bare").map(String::as_str), Some(""));
        assert_eq!(snapshot.len(), 3);
    }

    #[test]
    fn test_parse_raw_headers_empty_blob() {
        assert!(parse_raw_headers("").is_empty());
        assert!(parse_raw_headers("\r\n").is_empty());
    }

    #[test]
    fn test_find_header_ignores_case() {
        let snapshot = parse_raw_headers("Content-Type: text/plain");
        assert_eq!(find_header(&snapshot, "content-type"), Some("text/plain"));
        assert_eq!(find_header(&snapshot, "x-missing"), None);
    }
}
