//! Per-request correlation identifiers.
//!
//! Every request that passes through lintel carries exactly one correlation
//! id for its whole lifetime. A client that already participates in a trace
//! sends `x-correlation-id` and gets the same value echoed back; everyone
//! else gets a server-generated UUID. Either way the id lands on the
//! response headers and on the request's tracing span, so one id is enough
//! to stitch a failure report to the server-side logs.

use std::fmt;

use http::HeaderMap;
use uuid::Uuid;

/// Request and response header carrying the correlation id.
pub const CORRELATION_HEADER: &str = "x-correlation-id";

/// An opaque per-request trace token.
///
/// Client-supplied values are reused verbatim — lintel does not validate or
/// normalise them. Generated values are random UUIDs; collisions are not a
/// practical concern.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CorrelationId(String);

impl CorrelationId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Resolves the correlation id for one request.
///
/// A non-empty `x-correlation-id` header wins; otherwise a fresh id is
/// generated. Total — there is no failure path here.
pub fn resolve(headers: &HeaderMap) -> CorrelationId {
    headers
        .get(CORRELATION_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(|v| CorrelationId(v.to_owned()))
        .unwrap_or_else(CorrelationId::generate)
}
