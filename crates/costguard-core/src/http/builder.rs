//! Request descriptors and their builder
//!
//! A [`Request`] describes one exchange independently of any HTTP library: method,
//! path, ordered query parameters, headers, body and an optional deadline override.
//! It is immutable once built; [`RequestBuilder`] is the only way to make one.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Method;
use serde::Serialize;
use serde_json::Value;

use crate::error::{Error, Result};

/// One field of a multipart body
#[derive(Debug, Clone, PartialEq)]
pub struct Part {
    pub name: String,
    pub content: PartContent,
}

/// Content of a multipart field
#[derive(Debug, Clone, PartialEq)]
pub enum PartContent {
    Text(String),
    File {
        file_name: String,
        content_type: String,
        bytes: Arc<[u8]>,
    },
}

impl Part {
    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: PartContent::Text(value.into()),
        }
    }

    pub fn file(
        name: impl Into<String>,
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        bytes: Arc<[u8]>,
    ) -> Self {
        Self {
            name: name.into(),
            content: PartContent::File {
                file_name: file_name.into(),
                content_type: content_type.into(),
                bytes,
            },
        }
    }
}

/// Request body variants
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Body {
    #[default]
    None,
    Json(Value),
    Multipart(Vec<Part>),
}

/// Immutable description of one HTTP exchange
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    headers: Vec<(String, String)>,
    body: Body,
    timeout: Option<Duration>,
}

impl Request {
    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Query parameters in insertion order; keys are unique
    pub fn query(&self) -> &[(String, String)] {
        &self.query
    }

    /// Value of a query parameter
    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    pub fn body(&self) -> &Body {
        &self.body
    }

    /// Deadline override for this request
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Key used to match requests in logs and mocks, e.g. `GET /health`
    pub fn route_key(&self) -> String {
        format!("{} {}", self.method, self.path)
    }
}

/// Builder for [`Request`] descriptors
#[derive(Debug, Clone)]
pub struct RequestBuilder {
    request: Request,
}

impl RequestBuilder {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            request: Request {
                method,
                path: path.into(),
                query: Vec::new(),
                headers: Vec::new(),
                body: Body::None,
                timeout: None,
            },
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    /// Set a query parameter. An existing key keeps its position and takes the new value.
    pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        let key = key.into();
        let value = value.to_string();
        match self.request.query.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.request.query.push((key, value)),
        }
        self
    }

    /// Set a query parameter only when a value is present
    pub fn query_opt<V: ToString>(self, key: impl Into<String>, value: Option<V>) -> Self {
        match value {
            Some(value) => self.query(key, value),
            None => self,
        }
    }

    /// Add a header; a header with the same name (case-insensitive) is replaced
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        self.request
            .headers
            .retain(|(existing, _)| !existing.eq_ignore_ascii_case(&name));
        self.request.headers.push((name, value.into()));
        self
    }

    /// Serialize `payload` as the JSON body
    pub fn json<T: Serialize>(mut self, payload: &T) -> Result<Self> {
        let value = serde_json::to_value(payload)
            .map_err(|e| Error::invalid_request(format!("Failed to serialize request body: {}", e)))?;
        self.request.body = Body::Json(value);
        Ok(self)
    }

    pub fn multipart(mut self, parts: Vec<Part>) -> Self {
        self.request.body = Body::Multipart(parts);
        self
    }

    /// Override the transport deadline for this request
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.request.timeout = Some(timeout);
        self
    }

    pub fn build(self) -> Request {
        self.request
    }
}

/// Percent-encode a caller-supplied value for use as one path segment
pub fn encode_path_segment(segment: &str) -> String {
    urlencoding::encode(segment).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_query_keys_are_unique_and_ordered() {
        let request = RequestBuilder::get("/api/invoices/flagged")
            .query("user_id", "u-1")
            .query("status", "VALID")
            .query("user_id", "u-2")
            .build();

        assert_eq!(
            request.query(),
            &[
                ("user_id".to_string(), "u-2".to_string()),
                ("status".to_string(), "VALID".to_string()),
            ]
        );
        assert_eq!(request.query_value("status"), Some("VALID"));
        assert_eq!(request.query_value("limit"), None);
    }

    #[test]
    fn test_optional_query() {
        let request = RequestBuilder::get("/x")
            .query_opt("limit", Some(5))
            .query_opt::<u32>("offset", None)
            .build();
        assert_eq!(request.query().len(), 1);
        assert_eq!(request.query_value("limit"), Some("5"));
    }

    #[test]
    fn test_headers_replace_case_insensitively() {
        let request = RequestBuilder::get("/x")
            .header("Accept", "text/plain")
            .header("accept", "application/json")
            .build();
        assert_eq!(request.headers(), &[("accept".to_string(), "application/json".to_string())]);
    }

    #[test]
    fn test_json_body_and_timeout() {
        let request = RequestBuilder::patch("/api/invoices/anomalies/a-1")
            .json(&json!({"status": "VALID"}))
            .unwrap()
            .timeout(Duration::from_secs(5))
            .build();

        assert_eq!(request.method(), &Method::PATCH);
        assert_eq!(request.body(), &Body::Json(json!({"status": "VALID"})));
        assert_eq!(request.timeout(), Some(Duration::from_secs(5)));
        assert_eq!(request.route_key(), "PATCH /api/invoices/anomalies/a-1");
    }

    #[test]
    fn test_defaults() {
        let request = RequestBuilder::get("/health").build();
        assert_eq!(request.body(), &Body::None);
        assert!(request.timeout().is_none());
        assert!(request.headers().is_empty());
    }

    #[test]
    fn test_path_segment_encoding() {
        assert_eq!(encode_path_segment("inv-123_a.b~c"), "inv-123_a.b~c");
        assert_eq!(encode_path_segment("a/b c"), "a%2Fb%20c");
        assert_eq!(encode_path_segment("é"), "%C3%A9");
    }
}
