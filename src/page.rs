//! The pagination envelope for list endpoints.
//!
//! Every list endpoint responds with the same shape — `items`, a `page`
//! block, and an optional `continuationToken` — so clients page through any
//! collection the same way. lintel only owns the shape; how the caller
//! slices its data is its own business.

use serde::Serialize;

use crate::problem::Fault;
use crate::response::Response;

/// A page of results plus the paging metadata clients navigate by.
#[derive(Debug, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: PageInfo,
    #[serde(rename = "continuationToken", skip_serializing_if = "Option::is_none")]
    pub continuation_token: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PageInfo {
    pub limit: u32,
    pub offset: u64,
    pub total: u64,
}

impl<T: Serialize> Page<T> {
    pub fn new(items: Vec<T>, limit: u32, offset: u64, total: u64) -> Self {
        Self {
            items,
            page: PageInfo { limit, offset, total },
            continuation_token: None,
        }
    }

    /// Attaches an opaque token for cursor-style continuation.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.continuation_token = Some(token.into());
        self
    }

    /// Serializes into a `200 OK` JSON response.
    ///
    /// # Errors
    ///
    /// An internal fault if the items fail to serialize.
    pub fn into_response(self) -> Result<Response, Fault> {
        Ok(Response::json(serde_json::to_vec(&self)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct User {
        id: u32,
    }

    #[test]
    fn envelope_has_the_documented_shape() {
        let page = Page::new(vec![User { id: 1 }, User { id: 2 }], 2, 0, 7)
            .with_token("eyJvZmZzZXQiOjJ9");
        let json = serde_json::to_value(&page).unwrap();
        assert_eq!(json["items"][1]["id"], 2);
        assert_eq!(json["page"]["limit"], 2);
        assert_eq!(json["page"]["offset"], 0);
        assert_eq!(json["page"]["total"], 7);
        assert_eq!(json["continuationToken"], "eyJvZmZzZXQiOjJ9");
    }

    #[test]
    fn token_is_omitted_when_absent() {
        let page = Page::new(vec![User { id: 1 }], 10, 0, 1);
        let json = serde_json::to_value(&page).unwrap();
        assert!(json.get("continuationToken").is_none());
    }
}
