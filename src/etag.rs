//! Entity tags and the `If-Match` comparison hook.
//!
//! lintel does not own entity storage, so it cannot know what version an
//! entity is at — the caller does. What lives here is the part every update
//! endpoint repeats: parse the client's `If-Match`, compare it against the
//! current version stamp, and fail with a precondition fault on a lost race.
//!
//! ```rust
//! use lintel::{etag, EntityTag, Fault, Request, Response};
//!
//! async fn update_user(req: Request) -> Result<Response, Fault> {
//!     let current = EntityTag::strong("v3"); // from your repository
//!     etag::require_match(req.header("if-match"), &current)?;
//!     // ...apply the update, bump the version...
//!     Ok(Response::builder().etag(&EntityTag::strong("v4")).json(b"{}".to_vec()))
//! }
//! ```

use std::fmt;

use crate::problem::Fault;

/// An opaque version stamp, strong (`"v3"`) or weak (`W/"v3"`).
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct EntityTag {
    weak: bool,
    value: String,
}

impl EntityTag {
    pub fn strong(value: impl Into<String>) -> Self {
        Self { weak: false, value: value.into() }
    }

    pub fn weak(value: impl Into<String>) -> Self {
        Self { weak: true, value: value.into() }
    }

    /// Parses one wire-format entity tag. Returns `None` for anything that
    /// is not a (possibly `W/`-prefixed) quoted string.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        let (weak, rest) = match s.strip_prefix("W/") {
            Some(rest) => (true, rest),
            None => (false, s),
        };
        let value = rest.strip_prefix('"')?.strip_suffix('"')?;
        Some(Self { weak, value: value.to_owned() })
    }

    /// RFC 9110 strong comparison: equal values, and neither tag weak.
    pub fn strong_eq(&self, other: &Self) -> bool {
        !self.weak && !other.weak && self.value == other.value
    }
}

impl fmt::Display for EntityTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.weak {
            write!(f, "W/\"{}\"", self.value)
        } else {
            write!(f, "\"{}\"", self.value)
        }
    }
}

/// Enforces `If-Match` against the entity's current tag.
///
/// A missing header fails: an update endpoint guarded by this hook requires
/// the client to say which version it read. `*` matches any current version.
/// Comparison is strong — a weak tag never authorises an update.
///
/// # Errors
///
/// A precondition-failed fault (HTTP 412) when the header is absent or no
/// listed tag strongly matches `current`.
pub fn require_match(if_match: Option<&str>, current: &EntityTag) -> Result<(), Fault> {
    let Some(header) = if_match.map(str::trim).filter(|h| !h.is_empty()) else {
        return Err(Fault::precondition_failed(
            "this endpoint requires an If-Match header carrying the version you read",
        ));
    };

    if header == "*" {
        return Ok(());
    }

    let matched = header
        .split(',')
        .filter_map(EntityTag::parse)
        .any(|tag| tag.strong_eq(current));
    if matched {
        Ok(())
    } else {
        Err(Fault::precondition_failed(
            "the entity changed since you read it; fetch the current version and retry",
        ))
    }
}
