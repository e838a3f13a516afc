//! Tagged faults and their RFC 7807 wire form.
//!
//! Handlers and components below the HTTP boundary never pick status codes.
//! They raise a [`Fault`] with one of a closed set of kinds, and the gateway
//! renders it — once, at the boundary — as an `application/problem+json`
//! body. The mapping is fixed:
//!
//! | Kind | Status | Type URI |
//! |---|---|---|
//! | validation | 400 | `/problems/validation` |
//! | unauthenticated | 401 | `/problems/unauthenticated` |
//! | forbidden | 403 | `/problems/forbidden` |
//! | not-found | 404 | `/problems/not-found` |
//! | conflict | 409 | `/problems/conflict` |
//! | precondition-failed | 412 | `/problems/precondition-failed` |
//! | unsupported-media | 415 | `/problems/unsupported-media` |
//! | rate-limited | 429 | `/problems/rate-limited` |
//! | internal | 500 | `/problems/internal` |
//! | unavailable | 503 | `/problems/unavailable` |
//!
//! Every rendered body carries the request path and the correlation id, so
//! an operator can go from a pasted error body straight to the logs.

use serde::Serialize;
use thiserror::Error;

use crate::correlation::CorrelationId;
use crate::response::Response;
use crate::status::Status;

// ── Fault ────────────────────────────────────────────────────────────────────

/// The closed failure taxonomy.
///
/// Anything a handler can get wrong fits one of these. There is no
/// catch-all variant on purpose: an error that fits nothing is an
/// [`internal`](Fault::internal) fault, and renders as 500.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum FaultKind {
    Validation,
    Unauthenticated,
    Forbidden,
    NotFound,
    Conflict,
    PreconditionFailed,
    UnsupportedMedia,
    RateLimited,
    Internal,
    Unavailable,
}

impl FaultKind {
    /// Stable slug, used for both the wire `type` URI and log fields.
    pub fn slug(self) -> &'static str {
        match self {
            Self::Validation         => "validation",
            Self::Unauthenticated    => "unauthenticated",
            Self::Forbidden          => "forbidden",
            Self::NotFound           => "not-found",
            Self::Conflict           => "conflict",
            Self::PreconditionFailed => "precondition-failed",
            Self::UnsupportedMedia   => "unsupported-media",
            Self::RateLimited        => "rate-limited",
            Self::Internal           => "internal",
            Self::Unavailable        => "unavailable",
        }
    }

    fn status(self) -> Status {
        match self {
            Self::Validation         => Status::BadRequest,
            Self::Unauthenticated    => Status::Unauthorized,
            Self::Forbidden          => Status::Forbidden,
            Self::NotFound           => Status::NotFound,
            Self::Conflict           => Status::Conflict,
            Self::PreconditionFailed => Status::PreconditionFailed,
            Self::UnsupportedMedia   => Status::UnsupportedMediaType,
            Self::RateLimited        => Status::TooManyRequests,
            Self::Internal           => Status::InternalServerError,
            Self::Unavailable        => Status::ServiceUnavailable,
        }
    }
}

impl std::fmt::Display for FaultKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.slug())
    }
}

/// A tagged, wire-agnostic error raised below the HTTP boundary.
///
/// Construct with the kind-named constructors and return it from handlers:
///
/// ```rust
/// use lintel::{Fault, Request, Response};
///
/// async fn get_user(req: Request) -> Result<Response, Fault> {
///     let id = req.param("id").ok_or_else(|| Fault::not_found("no such user"))?;
///     if id.is_empty() {
///         return Err(Fault::validation("id must not be empty")
///             .with_field("id", "must not be empty"));
///     }
///     Ok(Response::json(format!(r#"{{"id":"{id}"}}"#).into_bytes()))
/// }
/// ```
#[derive(Clone, Debug, Error)]
#[error("{kind}: {detail}")]
pub struct Fault {
    kind: FaultKind,
    detail: String,
    errors: Vec<FieldError>,
}

impl Fault {
    fn new(kind: FaultKind, detail: impl Into<String>) -> Self {
        Self { kind, detail: detail.into(), errors: Vec::new() }
    }

    pub fn validation(detail: impl Into<String>) -> Self {
        Self::new(FaultKind::Validation, detail)
    }

    pub fn unauthenticated(detail: impl Into<String>) -> Self {
        Self::new(FaultKind::Unauthenticated, detail)
    }

    pub fn forbidden(detail: impl Into<String>) -> Self {
        Self::new(FaultKind::Forbidden, detail)
    }

    pub fn not_found(detail: impl Into<String>) -> Self {
        Self::new(FaultKind::NotFound, detail)
    }

    pub fn conflict(detail: impl Into<String>) -> Self {
        Self::new(FaultKind::Conflict, detail)
    }

    pub fn precondition_failed(detail: impl Into<String>) -> Self {
        Self::new(FaultKind::PreconditionFailed, detail)
    }

    pub fn unsupported_media(detail: impl Into<String>) -> Self {
        Self::new(FaultKind::UnsupportedMedia, detail)
    }

    pub fn rate_limited(detail: impl Into<String>) -> Self {
        Self::new(FaultKind::RateLimited, detail)
    }

    pub fn internal(detail: impl Into<String>) -> Self {
        Self::new(FaultKind::Internal, detail)
    }

    pub fn unavailable(detail: impl Into<String>) -> Self {
        Self::new(FaultKind::Unavailable, detail)
    }

    /// Appends a field-level sub-error. Order is preserved on the wire.
    pub fn with_field(mut self, field: impl Into<String>, message: impl Into<String>) -> Self {
        self.errors.push(FieldError { field: field.into(), message: message.into() });
        self
    }

    pub fn kind(&self) -> FaultKind {
        self.kind
    }

    pub fn detail(&self) -> &str {
        &self.detail
    }
}

/// Serialization failures are nobody's fault but ours.
impl From<serde_json::Error> for Fault {
    fn from(e: serde_json::Error) -> Self {
        Fault::internal(format!("serialization failed: {e}"))
    }
}

// ── Problem ──────────────────────────────────────────────────────────────────

/// One field-level sub-error inside a validation problem body.
#[derive(Clone, Debug, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// An RFC 7807 problem-details body, ready to serialize.
///
/// Built by [`render`] and never persisted. The `errors` array only appears
/// for faults that carry field-level sub-errors.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Problem {
    #[serde(rename = "type")]
    pub type_uri: String,
    pub title: String,
    pub status: u16,
    pub detail: String,
    pub instance: String,
    pub correlation_id: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<FieldError>,
}

/// Renders a fault as a problem body for one request.
///
/// Total: every kind maps to exactly one status and type URI, and the
/// closed taxonomy means nothing can arrive unmapped — the compiler, not a
/// default arm, enforces the table above.
pub fn render(fault: &Fault, instance: &str, correlation_id: &CorrelationId) -> Problem {
    let status = fault.kind.status();
    Problem {
        type_uri: format!("/problems/{}", fault.kind.slug()),
        title: status.reason().to_owned(),
        status: status.code(),
        detail: fault.detail.clone(),
        instance: instance.to_owned(),
        correlation_id: correlation_id.as_str().to_owned(),
        errors: fault.errors.clone(),
    }
}

impl Problem {
    /// Converts into an `application/problem+json` response.
    ///
    /// Also total. A `Problem` is strings and integers all the way down, so
    /// serialization cannot realistically fail; if it somehow does, a
    /// hand-built 500 body goes out instead of a panic.
    pub fn into_response(self) -> Response {
        let status = self.status;
        let body = serde_json::to_vec(&self).unwrap_or_else(|_| {
            br#"{"title":"Internal Server Error","status":500}"#.to_vec()
        });
        Response::problem(status, body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::correlation;

    fn cid() -> CorrelationId {
        correlation::resolve(&http::HeaderMap::new())
    }

    #[test]
    fn every_kind_maps_to_its_fixed_status() {
        let table = [
            (Fault::validation(""), 400),
            (Fault::unauthenticated(""), 401),
            (Fault::forbidden(""), 403),
            (Fault::not_found(""), 404),
            (Fault::conflict(""), 409),
            (Fault::precondition_failed(""), 412),
            (Fault::unsupported_media(""), 415),
            (Fault::rate_limited(""), 429),
            (Fault::internal(""), 500),
            (Fault::unavailable(""), 503),
        ];
        for (fault, code) in table {
            assert_eq!(render(&fault, "/x", &cid()).status, code, "{}", fault.kind());
        }
    }

    #[test]
    fn body_carries_instance_and_correlation_id() {
        let fault = Fault::not_found("no such order");
        let id = cid();
        let problem = render(&fault, "/orders/7", &id);
        assert_eq!(problem.type_uri, "/problems/not-found");
        assert_eq!(problem.title, "Not Found");
        assert_eq!(problem.instance, "/orders/7");
        assert_eq!(problem.correlation_id, id.as_str());
    }

    #[test]
    fn field_errors_pass_through_in_order() {
        let fault = Fault::validation("bad payload")
            .with_field("displayName", "must not be empty")
            .with_field("email", "not an email address");
        let problem = render(&fault, "/users", &cid());
        let json = serde_json::to_value(&problem).unwrap();
        assert_eq!(json["errors"][0]["field"], "displayName");
        assert_eq!(json["errors"][1]["field"], "email");
    }

    #[test]
    fn errors_array_is_omitted_when_empty() {
        let problem = render(&Fault::conflict("taken"), "/users", &cid());
        let json = serde_json::to_value(&problem).unwrap();
        assert!(json.get("errors").is_none());
    }
}
