//! Incoming HTTP request type.

use std::collections::HashMap;

use bytes::Bytes;
use http::HeaderMap;

use crate::correlation::CorrelationId;
use crate::method::Method;
use crate::problem::Fault;

/// An incoming HTTP request, with its body already collected.
///
/// Carries the per-request [`CorrelationId`] as an explicit value — handlers
/// that call downstream services forward it from here rather than from any
/// ambient state.
pub struct Request {
    method: Method,
    path: String,
    headers: HeaderMap,
    body: Bytes,
    params: HashMap<String, String>,
    correlation_id: CorrelationId,
}

impl Request {
    pub(crate) fn new(
        method: Method,
        path: String,
        headers: HeaderMap,
        body: Bytes,
        params: HashMap<String, String>,
        correlation_id: CorrelationId,
    ) -> Self {
        Self { method, path, headers, body, params, correlation_id }
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// The correlation id resolved for this request.
    pub fn correlation_id(&self) -> &CorrelationId {
        &self.correlation_id
    }

    /// Case-insensitive header lookup. Non-UTF-8 values read as absent.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Returns a named path parameter.
    ///
    /// For a route `/users/{id}`, `req.param("id")` on `/users/42` returns `Some("42")`.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// Deserializes the body as JSON.
    ///
    /// # Errors
    ///
    /// A validation fault (HTTP 400) describing the parse failure. The
    /// fault's detail is safe to show clients — it names positions, not
    /// payload content.
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T, Fault> {
        serde_json::from_slice(&self.body)
            .map_err(|e| Fault::validation(format!("malformed JSON body: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::correlation;

    fn request(body: &[u8]) -> Request {
        Request::new(
            Method::Post,
            "/users".to_owned(),
            HeaderMap::new(),
            Bytes::copy_from_slice(body),
            HashMap::new(),
            correlation::resolve(&HeaderMap::new()),
        )
    }

    #[test]
    fn json_parses_a_well_formed_body() {
        #[derive(serde::Deserialize)]
        struct CreateUser {
            display_name: String,
        }
        let req = request(br#"{"display_name":"Ada Lovelace"}"#);
        let input: CreateUser = req.json().unwrap();
        assert_eq!(input.display_name, "Ada Lovelace");
    }

    #[test]
    fn malformed_json_is_a_validation_fault() {
        let req = request(b"{not json");
        let err = req.json::<serde_json::Value>().unwrap_err();
        assert_eq!(err.kind(), crate::FaultKind::Validation);
    }
}
