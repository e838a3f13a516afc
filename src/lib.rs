//! # lintel
//!
//! A minimal HTTP shim for Rust services deployed behind an API gateway.
//! It enforces the REST conventions that change between teams but should
//! not: correlation ids, idempotent creation, uniform error bodies.
//!
//! ## The contract
//!
//! The API-management gateway in front of you handles TLS, authentication
//! providers, rate-limit enforcement, and body-size limits. lintel does not
//! — by design. What's left is the part the gateway cannot do for you,
//! because it lives inside your request handling:
//!
//! - **Correlation ids** — `x-correlation-id` in, same value out, on every
//!   response and every log line ([`correlation`])
//! - **Idempotent creation** — `Idempotency-Key` deduplicates retried
//!   POSTs, exactly-once under concurrency ([`IdempotencyStore`])
//! - **Problem bodies** — a closed fault taxonomy rendered once, at the
//!   boundary, as `application/problem+json` ([`Fault`], [`problem`])
//! - **Optimistic concurrency** — the `If-Match` comparison hook for your
//!   version stamps ([`etag`])
//! - **Health probes** — `/health/live` and `/health/ready` with named
//!   checks ([`HealthRegistry`])
//! - **Pagination envelope** — one list shape for every collection
//!   ([`Page`])
//!
//! Plus the plumbing underneath: radix-tree routing via [`matchit`], async
//! I/O on tokio + hyper, graceful shutdown draining in-flight requests.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use lintel::{Fault, Gateway, Request, Response, Router, Server, Status};
//!
//! #[tokio::main]
//! async fn main() {
//!     let app = Gateway::new(
//!         Router::new()
//!             .get("/users/{id}", get_user)
//!             .post("/users",     create_user),
//!     );
//!
//!     Server::bind("0.0.0.0:3000").serve(app).await.unwrap();
//! }
//!
//! async fn get_user(req: Request) -> Result<Response, Fault> {
//!     let id = req.param("id").ok_or_else(|| Fault::not_found("no such user"))?;
//!     Ok(Response::json(format!(r#"{{"id":"{id}"}}"#).into_bytes()))
//! }
//!
//! async fn create_user(req: Request) -> Result<Response, Fault> {
//!     if req.body().is_empty() {
//!         return Err(Fault::validation("body must not be empty"));
//!     }
//!     # let bytes: Vec<u8> = vec![];
//!     Ok(Response::builder()
//!         .status(Status::Created)
//!         .header("location", "/users/99")
//!         .json(bytes))
//! }
//! ```

mod error;
mod gateway;
mod handler;
mod health;
mod idempotency;
mod method;
mod request;
mod response;
mod router;
mod server;
mod status;

pub mod correlation;
pub mod etag;
pub mod page;
pub mod problem;

pub use correlation::{CORRELATION_HEADER, CorrelationId};
pub use error::Error;
pub use etag::EntityTag;
pub use gateway::{Gateway, REPLAYED_HEADER};
pub use handler::Handler;
pub use health::HealthRegistry;
pub use idempotency::{Admitted, IDEMPOTENCY_HEADER, IdempotencyStore};
pub use method::Method;
pub use page::{Page, PageInfo};
pub use problem::{Fault, FaultKind, FieldError, Problem};
pub use request::Request;
pub use response::{ContentType, IntoResponse, Response};
pub use router::Router;
pub use server::Server;
pub use status::Status;
