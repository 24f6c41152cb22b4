use std::collections::HashMap;
use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use serde_json::Value;

/// Status code carried by the locally generated transport-failure sentinel.
/// No real server can produce it.
pub const CLIENT_ERROR_STATUS: u16 = 0;

/// A normalized backend reply: status, headers, raw body, and lazy
/// structured-field access over the JSON body.
///
/// Push frames from the socket are wrapped in the same type so handlers
/// share one set of accessors with request callers.
#[derive(Debug, Clone)]
pub struct Response {
    status: u16,
    headers: HashMap<String, String>,
    body: Vec<u8>,
    parsed: OnceLock<Option<Value>>,
}

impl Response {
    pub fn new(status: u16, headers: HashMap<String, String>, body: Vec<u8>) -> Self {
        Self {
            status,
            headers,
            body,
            parsed: OnceLock::new(),
        }
    }

    /// The sentinel marking a local/transport failure, distinct from any
    /// server-returned error status.
    pub fn client_error() -> Self {
        Self::new(CLIENT_ERROR_STATUS, HashMap::new(), Vec::new())
    }

    /// Wraps an inbound push frame for handler consumption.
    pub fn from_frame(frame: &str) -> Self {
        Self::new(200, HashMap::new(), frame.as_bytes().to_vec())
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }

    pub fn raw_body(&self) -> &[u8] {
        &self.body
    }

    /// The parsed JSON body, `None` when the body is not valid JSON.
    pub fn body_json(&self) -> Option<&Value> {
        self.parsed
            .get_or_init(|| serde_json::from_slice(&self.body).ok())
            .as_ref()
    }

    /// Looks up a dotted field path (`"user.status.online"`) in the JSON
    /// body. Numeric components index into arrays.
    pub fn body_field(&self, path: &str) -> Option<&Value> {
        let mut value = self.body_json()?;
        for key in path.split('.') {
            value = match value {
                Value::Object(map) => map.get(key)?,
                Value::Array(list) => list.get(key.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(value)
    }

    pub fn body_str(&self, path: &str) -> Option<&str> {
        self.body_field(path)?.as_str()
    }

    /// Field access with a caller-supplied transform. The transform must be
    /// pure; it runs once per call on the already-parsed value.
    pub fn body_with<T>(&self, path: &str, transform: impl FnOnce(&Value) -> Option<T>) -> Option<T> {
        transform(self.body_field(path)?)
    }

    /// Timestamp field, accepting RFC 3339 strings or epoch seconds.
    pub fn body_timestamp(&self, path: &str) -> Option<DateTime<Utc>> {
        self.body_with(path, parse_timestamp)
    }

    pub fn is_client_error(&self) -> bool {
        self.status == CLIENT_ERROR_STATUS
    }

    pub fn is_error(&self) -> bool {
        self.is_client_error() || self.status >= 400
    }

    /// Human-readable error message: the server-supplied description when
    /// there is one, a generic string otherwise.
    pub fn error_description(&self) -> String {
        if self.is_client_error() {
            return "transport failure, request was not delivered".to_string();
        }
        self.body_str("description")
            .or_else(|| self.body_str("message"))
            .map(str::to_string)
            .unwrap_or_else(|| format!("request failed (status {})", self.status))
    }
}

pub(crate) fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(text) => DateTime::parse_from_rfc3339(text)
            .ok()
            .map(|t| t.with_timezone(&Utc)),
        Value::Number(number) => number
            .as_i64()
            .and_then(|secs| DateTime::from_timestamp(secs, 0)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn json_response(body: &str) -> Response {
        Response::new(200, HashMap::new(), body.as_bytes().to_vec())
    }

    #[test]
    fn dotted_path_walks_objects_and_arrays() {
        let response = json_response(r#"{"user":{"names":["first","second"],"online":true}}"#);
        assert_eq!(response.body_str("user.names.1"), Some("second"));
        assert_eq!(
            response.body_field("user.online").and_then(Value::as_bool),
            Some(true)
        );
    }

    #[test]
    fn absent_field_is_none() {
        let response = json_response(r#"{"user":{}}"#);
        assert_eq!(response.body_str("user.name"), None);
        assert_eq!(response.body_str("nope"), None);
    }

    #[test]
    fn transform_applies_to_present_fields_only() {
        let response = json_response(r#"{"count":"42"}"#);
        let count = response.body_with("count", |v| v.as_str()?.parse::<u32>().ok());
        assert_eq!(count, Some(42));
        assert_eq!(
            response.body_with("missing", |v| v.as_str().map(str::to_string)),
            None
        );
    }

    #[test]
    fn timestamps_parse_from_rfc3339_and_epoch() {
        let response = json_response(r#"{"a":"2024-05-01T12:30:00Z","b":1714566600}"#);
        let a = response.body_timestamp("a").unwrap();
        let b = response.body_timestamp("b").unwrap();
        assert_eq!(a.timestamp(), 1714566600);
        assert_eq!(a, b);
    }

    #[test]
    fn client_error_sentinel_is_an_error_but_no_status_is() {
        let sentinel = Response::client_error();
        assert!(sentinel.is_client_error());
        assert!(sentinel.is_error());
        assert!(!json_response("{}").is_error());
        assert!(Response::new(404, HashMap::new(), Vec::new()).is_error());
    }

    #[test]
    fn error_description_prefers_the_body() {
        let response = Response::new(
            400,
            HashMap::new(),
            br#"{"description":"no such channel"}"#.to_vec(),
        );
        assert_eq!(response.error_description(), "no such channel");
        assert_eq!(
            Response::new(500, HashMap::new(), Vec::new()).error_description(),
            "request failed (status 500)"
        );
        assert_eq!(
            Response::client_error().error_description(),
            "transport failure, request was not delivered"
        );
    }

    #[test]
    fn non_json_body_yields_no_fields() {
        let response = json_response("not json");
        assert!(response.body_json().is_none());
        assert!(response.body_field("anything").is_none());
    }
}
