//! Liveness and readiness endpoints with caller-registered checks.
//!
//! Kubernetes (or whatever supervises the pod) asks two questions, and the
//! gateway wires both routes automatically:
//!
//! | Probe | Path | Question |
//! |---|---|---|
//! | **Liveness** | `/health/live` | Is the process alive? Failure → restart. |
//! | **Readiness** | `/health/ready` | Can it serve traffic? Failure → pulled from rotation. |
//!
//! Liveness never consults anything: if the process can answer HTTP, it is
//! alive. Readiness runs every check the caller registered — one per
//! dependency worth gating traffic on:
//!
//! ```rust,no_run
//! use lintel::HealthRegistry;
//!
//! let health = HealthRegistry::new()
//!     .check("database", || async { /* ping the pool */ true })
//!     .check("payments-api", || async { true });
//! ```

use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::Serialize;

use crate::response::Response;
use crate::status::Status;

type CheckFuture = Pin<Box<dyn Future<Output = bool> + Send>>;
type Check = Arc<dyn Fn() -> CheckFuture + Send + Sync>;

/// Named readiness checks, run on every `/health/ready` request.
#[derive(Default)]
pub struct HealthRegistry {
    checks: Vec<(String, Check)>,
}

#[derive(Serialize)]
struct Report {
    status: &'static str,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    checks: BTreeMap<String, &'static str>,
}

impl HealthRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a named check. Returns `self` for chaining.
    ///
    /// A check answers one question — is this dependency usable right now —
    /// and should do so quickly; probes have timeouts of their own.
    pub fn check<F, Fut>(mut self, name: &str, check: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = bool> + Send + 'static,
    {
        self.checks
            .push((name.to_owned(), Arc::new(move || Box::pin(check()))));
        self
    }

    /// `/health/live` — `200 OK`, unconditionally.
    pub(crate) fn live(&self) -> Response {
        Report { status: "pass", checks: BTreeMap::new() }.into_response(true)
    }

    /// `/health/ready` — `200 OK` when every check passes, else `503`.
    pub(crate) async fn ready(&self) -> Response {
        let mut checks = BTreeMap::new();
        let mut healthy = true;
        for (name, check) in &self.checks {
            let pass = check().await;
            healthy &= pass;
            checks.insert(name.clone(), if pass { "pass" } else { "fail" });
        }
        Report { status: if healthy { "pass" } else { "fail" }, checks }
            .into_response(healthy)
    }
}

impl Report {
    fn into_response(self, healthy: bool) -> Response {
        let body = serde_json::to_vec(&self).unwrap_or_else(|_| b"{}".to_vec());
        let status = if healthy { Status::Ok } else { Status::ServiceUnavailable };
        Response::builder().status(status).json(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn liveness_is_unconditional() {
        let health = HealthRegistry::new().check("db", || async { false });
        assert_eq!(health.live().status_code(), 200);
    }

    #[tokio::test]
    async fn readiness_passes_when_all_checks_pass() {
        let health = HealthRegistry::new()
            .check("db", || async { true })
            .check("queue", || async { true });
        let response = health.ready().await;
        assert_eq!(response.status_code(), 200);
        let json: serde_json::Value = serde_json::from_slice(response.body_bytes()).unwrap();
        assert_eq!(json["status"], "pass");
        assert_eq!(json["checks"]["queue"], "pass");
    }

    #[tokio::test]
    async fn one_failing_check_flips_readiness_to_503() {
        let health = HealthRegistry::new()
            .check("db", || async { true })
            .check("queue", || async { false });
        let response = health.ready().await;
        assert_eq!(response.status_code(), 503);
        let json: serde_json::Value = serde_json::from_slice(response.body_bytes()).unwrap();
        assert_eq!(json["status"], "fail");
        assert_eq!(json["checks"]["queue"], "fail");
    }
}
