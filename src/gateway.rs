//! The request pipeline: correlation → admission → handler → problem body.
//!
//! [`Gateway`] wraps a [`Router`] with the conventions every request goes
//! through, in a fixed order:
//!
//! 1. Resolve the correlation id and open the request's tracing span.
//! 2. Route. `/health/live` and `/health/ready` are wired automatically;
//!    unrouted paths raise a not-found fault; non-REST methods get `405`.
//! 3. For a POST carrying `Idempotency-Key`, admit through the
//!    [`IdempotencyStore`] — a retry replays the first attempt's status and
//!    body instead of running the handler again.
//! 4. Any fault raised anywhere above becomes an
//!    `application/problem+json` body, rendered exactly once, here.
//! 5. Stamp `x-correlation-id` on the response — success or failure, the
//!    header is always there.
//!
//! Admission captures status + JSON body. That is the whole record: per the
//! conventions this crate enforces, a creation endpoint answers with a JSON
//! representation of what it created, and that is what a replay returns.

use bytes::Bytes;
use http::HeaderMap;
use tracing::Instrument;

use crate::correlation::{self, CORRELATION_HEADER, CorrelationId};
use crate::health::HealthRegistry;
use crate::idempotency::{IDEMPOTENCY_HEADER, IdempotencyStore};
use crate::method::Method;
use crate::problem::{self, Fault};
use crate::request::Request;
use crate::response::Response;
use crate::router::Router;
use crate::status::Status;

/// Header stamped on responses served from an idempotency record.
pub const REPLAYED_HEADER: &str = "idempotency-replayed";

/// A router wrapped in the conventions pipeline.
///
/// ```rust,no_run
/// use std::time::Duration;
/// use lintel::{Gateway, HealthRegistry, IdempotencyStore, Router, Server};
///
/// # async fn create_user(_: lintel::Request) -> lintel::Response { lintel::Response::text("") }
/// #[tokio::main]
/// async fn main() {
///     let app = Gateway::new(Router::new().post("/users", create_user))
///         .idempotency(IdempotencyStore::with_policy(
///             Duration::from_secs(24 * 60 * 60),
///             Duration::from_secs(2),
///         ))
///         .health(HealthRegistry::new().check("database", || async { true }));
///
///     Server::bind("0.0.0.0:3000").serve(app).await.unwrap();
/// }
/// ```
pub struct Gateway {
    router: Router,
    store: IdempotencyStore,
    health: HealthRegistry,
}

impl Gateway {
    /// Wraps `router` with a default-policy store and no readiness checks.
    pub fn new(router: Router) -> Self {
        Self {
            router,
            store: IdempotencyStore::new(),
            health: HealthRegistry::new(),
        }
    }

    /// Replaces the idempotency store (e.g. to tune the retention window).
    pub fn idempotency(mut self, store: IdempotencyStore) -> Self {
        self.store = store;
        self
    }

    /// Installs the readiness checks served at `/health/ready`.
    pub fn health(mut self, health: HealthRegistry) -> Self {
        self.health = health;
        self
    }

    pub(crate) fn store(&self) -> &IdempotencyStore {
        &self.store
    }

    /// Runs one request through the full pipeline.
    pub(crate) async fn handle(
        &self,
        method: http::Method,
        path: &str,
        headers: HeaderMap,
        body: Bytes,
    ) -> Response {
        let correlation_id = correlation::resolve(&headers);
        let span = tracing::info_span!(
            "request",
            method = %method,
            path,
            correlation_id = %correlation_id,
        );
        let response = self
            .route(method, path, headers, body, &correlation_id)
            .instrument(span)
            .await;
        self.finish(response, path, &correlation_id)
    }

    /// Renders a fault for a request that never reached routing (e.g. the
    /// body could not be read off the wire).
    pub(crate) fn reject(&self, fault: Fault, path: &str, headers: &HeaderMap) -> Response {
        let correlation_id = correlation::resolve(headers);
        self.finish(Response::from_fault(fault), path, &correlation_id)
    }

    /// The single point where faults become wire-visible problem bodies.
    fn finish(
        &self,
        mut response: Response,
        path: &str,
        correlation_id: &CorrelationId,
    ) -> Response {
        if let Some(fault) = response.fault.take() {
            tracing::warn!(
                kind = %fault.kind(),
                correlation_id = %correlation_id,
                "request failed: {fault}"
            );
            response = problem::render(&fault, path, correlation_id).into_response();
        }
        response
            .headers
            .push((CORRELATION_HEADER.to_owned(), correlation_id.as_str().to_owned()));
        response
    }

    async fn route(
        &self,
        method: http::Method,
        path: &str,
        headers: HeaderMap,
        body: Bytes,
        correlation_id: &CorrelationId,
    ) -> Response {
        if method == http::Method::GET {
            if path == "/health/live" {
                return self.health.live();
            }
            if path == "/health/ready" {
                return self.health.ready().await;
            }
        }

        let Ok(method) = method.as_str().parse::<Method>() else {
            return Response::status(Status::MethodNotAllowed);
        };
        let Some((handler, params)) = self.router.lookup(method, path) else {
            return Response::from_fault(Fault::not_found(format!("no resource at {path}")));
        };

        let key = headers
            .get(IDEMPOTENCY_HEADER)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .map(str::to_owned);
        let req = Request::new(
            method,
            path.to_owned(),
            headers,
            body.clone(),
            params,
            correlation_id.clone(),
        );

        // Only creation requests go through the store; everything else is
        // expected to be idempotent by construction.
        if method == Method::Post && key.is_some() {
            let payload_hash = IdempotencyStore::payload_hash(&body);
            let outcome = self
                .store
                .admit(key.as_deref(), &payload_hash, move || async move {
                    let response = handler.call(req).await;
                    if let Some(fault) = response.fault {
                        return Err(fault);
                    }
                    Ok((response.status, response.body))
                })
                .await;
            match outcome {
                Ok(admitted) => {
                    let mut response = Response::stored(admitted.status, admitted.body);
                    if admitted.replayed {
                        response
                            .headers
                            .push((REPLAYED_HEADER.to_owned(), "true".to_owned()));
                    }
                    response
                }
                Err(fault) => Response::from_fault(fault),
            }
        } else {
            handler.call(req).await
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    use super::*;

    fn headers(pairs: &[(&'static str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, value.parse().unwrap());
        }
        map
    }

    /// A creation handler whose generated ids are observable: each fresh
    /// invocation mints the next integer.
    fn counting_gateway() -> (Gateway, Arc<AtomicU32>) {
        let minted = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&minted);
        let router = Router::new().post("/users", move |req: Request| {
            let counter = Arc::clone(&counter);
            async move {
                if req.body().is_empty() {
                    return Err(Fault::validation("body must not be empty")
                        .with_field("displayName", "required"));
                }
                let id = counter.fetch_add(1, Ordering::SeqCst) + 1;
                Ok(Response::builder()
                    .status(Status::Created)
                    .json(format!(r#"{{"id":{id}}}"#).into_bytes()))
            }
        });
        (Gateway::new(router), minted)
    }

    async fn call(
        gateway: &Gateway,
        method: http::Method,
        path: &str,
        headers: HeaderMap,
        body: &[u8],
    ) -> Response {
        gateway
            .handle(method, path, headers, Bytes::copy_from_slice(body))
            .await
    }

    #[tokio::test]
    async fn supplied_correlation_id_is_echoed() {
        let (gateway, _) = counting_gateway();
        let response = call(
            &gateway,
            http::Method::POST,
            "/users",
            headers(&[("x-correlation-id", "trace-7")]),
            b"{}",
        )
        .await;
        assert_eq!(response.header("x-correlation-id"), Some("trace-7"));
    }

    #[tokio::test]
    async fn generated_correlation_ids_differ_per_request() {
        let (gateway, _) = counting_gateway();
        let a = call(&gateway, http::Method::POST, "/users", HeaderMap::new(), b"{}").await;
        let b = call(&gateway, http::Method::POST, "/users", HeaderMap::new(), b"{}").await;
        let (a, b) = (a.header("x-correlation-id"), b.header("x-correlation-id"));
        assert!(a.is_some());
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn creation_replay_returns_the_first_response() {
        let (gateway, minted) = counting_gateway();
        let key = headers(&[("idempotency-key", "7f41dba9-0001")]);
        let body = br#"{"displayName":"Ada Lovelace"}"#;

        let first = call(&gateway, http::Method::POST, "/users", key.clone(), body).await;
        assert_eq!(first.status_code(), 201);
        assert_eq!(first.body_bytes(), br#"{"id":1}"#);

        let second = call(&gateway, http::Method::POST, "/users", key, body).await;
        assert_eq!(second.status_code(), 201);
        assert_eq!(second.body_bytes(), br#"{"id":1}"#);
        assert_eq!(second.header(REPLAYED_HEADER), Some("true"));
        assert_eq!(minted.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn key_reuse_with_different_body_is_a_conflict_problem() {
        let (gateway, minted) = counting_gateway();
        let key = headers(&[("idempotency-key", "7f41dba9-0002")]);

        call(&gateway, http::Method::POST, "/users", key.clone(), br#"{"displayName":"Ada Lovelace"}"#).await;
        let response = call(&gateway, http::Method::POST, "/users", key, br#"{"displayName":"Grace Hopper"}"#).await;

        assert_eq!(response.status_code(), 409);
        assert_eq!(response.header("content-type"), Some("application/problem+json"));
        let json: serde_json::Value = serde_json::from_slice(response.body_bytes()).unwrap();
        assert_eq!(json["type"], "/problems/conflict");
        assert_eq!(json["instance"], "/users");
        assert!(json["correlationId"].is_string());
        assert_eq!(minted.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn handler_faults_render_as_problem_bodies_with_fields() {
        let (gateway, _) = counting_gateway();
        let response = call(&gateway, http::Method::POST, "/users", HeaderMap::new(), b"").await;
        assert_eq!(response.status_code(), 400);
        let json: serde_json::Value = serde_json::from_slice(response.body_bytes()).unwrap();
        assert_eq!(json["type"], "/problems/validation");
        assert_eq!(json["errors"][0]["field"], "displayName");
    }

    #[tokio::test]
    async fn failed_creations_are_not_recorded() {
        let (gateway, minted) = counting_gateway();
        let key = headers(&[("idempotency-key", "7f41dba9-0003")]);

        let first = call(&gateway, http::Method::POST, "/users", key.clone(), b"").await;
        assert_eq!(first.status_code(), 400);

        let second = call(&gateway, http::Method::POST, "/users", key, b"{}").await;
        assert_eq!(second.status_code(), 201);
        assert_eq!(minted.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unrouted_paths_are_not_found_problems() {
        let (gateway, _) = counting_gateway();
        let response = call(&gateway, http::Method::GET, "/nope", HeaderMap::new(), b"").await;
        assert_eq!(response.status_code(), 404);
        let json: serde_json::Value = serde_json::from_slice(response.body_bytes()).unwrap();
        assert_eq!(json["type"], "/problems/not-found");
        assert!(response.header("x-correlation-id").is_some());
    }

    #[tokio::test]
    async fn non_rest_methods_get_405() {
        let (gateway, _) = counting_gateway();
        let method = http::Method::from_bytes(b"PROPFIND").unwrap();
        let response = call(&gateway, method, "/users", HeaderMap::new(), b"").await;
        assert_eq!(response.status_code(), 405);
    }

    #[tokio::test]
    async fn health_routes_are_wired_automatically() {
        let (gateway, _) = counting_gateway();
        let gateway = gateway.health(HealthRegistry::new().check("db", || async { true }));
        let live = call(&gateway, http::Method::GET, "/health/live", HeaderMap::new(), b"").await;
        let ready = call(&gateway, http::Method::GET, "/health/ready", HeaderMap::new(), b"").await;
        assert_eq!(live.status_code(), 200);
        assert_eq!(ready.status_code(), 200);
    }

    #[tokio::test]
    async fn rejected_requests_still_carry_the_correlation_id() {
        let (gateway, _) = counting_gateway();
        let incoming = headers(&[("x-correlation-id", "trace-9")]);
        let response = gateway.reject(
            Fault::validation("failed to read request body"),
            "/users",
            &incoming,
        );
        assert_eq!(response.status_code(), 400);
        assert_eq!(response.header("x-correlation-id"), Some("trace-9"));
    }

    #[tokio::test]
    async fn parallel_duplicate_creations_mint_one_id() {
        let (gateway, minted) = counting_gateway();
        let gateway = Arc::new(gateway);

        let mut tasks = Vec::new();
        for _ in 0..8 {
            let gateway = Arc::clone(&gateway);
            tasks.push(tokio::spawn(async move {
                gateway
                    .handle(
                        http::Method::POST,
                        "/users",
                        headers(&[("idempotency-key", "7f41dba9-0004")]),
                        Bytes::from_static(br#"{"displayName":"Ada Lovelace"}"#),
                    )
                    .await
            }));
        }

        let mut bodies = Vec::new();
        for task in tasks {
            let response = task.await.unwrap();
            assert_eq!(response.status_code(), 201);
            bodies.push(response.body_bytes().to_vec());
        }
        assert_eq!(minted.load(Ordering::SeqCst), 1);
        assert!(bodies.iter().all(|b| b == &bodies[0]));
    }

    #[tokio::test]
    async fn unknown_fault_free_paths_pass_handler_responses_through() {
        let router = Router::new().get("/ping", |_req: Request| async { "pong" });
        let gateway = Gateway::new(router);
        let response = call(&gateway, http::Method::GET, "/ping", HeaderMap::new(), b"").await;
        assert_eq!(response.status_code(), 200);
        assert_eq!(response.body_bytes(), b"pong");
    }
}
