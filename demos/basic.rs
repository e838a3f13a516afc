//! Minimal lintel example — an idempotent creation endpoint, an ETag-guarded
//! update, a paged list, and health checks.
//!
//! Run with:
//!   RUST_LOG=info cargo run --example basic
//!
//! Try:
//!   curl http://localhost:3000/users
//!   curl -X POST http://localhost:3000/users \
//!        -H 'content-type: application/json' \
//!        -H 'idempotency-key: 7f41dba9-5c1e-4f1c-9f57-1b4ae1a2c9d0' \
//!        -d '{"displayName":"Ada Lovelace"}'
//!   # run the POST again: same 201 body, idempotency-replayed: true
//!   curl -X PUT http://localhost:3000/users/42 \
//!        -H 'if-match: "v3"' -d '{"displayName":"Ada King"}'
//!   curl http://localhost:3000/health/ready

use lintel::{
    EntityTag, Fault, Gateway, HealthRegistry, Page, Request, Response, Router, Server, Status,
    etag,
};
use serde::{Deserialize, Serialize};

#[derive(Deserialize)]
struct UserInput {
    #[serde(rename = "displayName")]
    display_name: String,
}

#[derive(Serialize)]
struct User {
    id: String,
    #[serde(rename = "displayName")]
    display_name: String,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let app = Gateway::new(
        Router::new()
            .get("/users",      list_users)
            .post("/users",     create_user)
            .put("/users/{id}", update_user),
    )
    .health(HealthRegistry::new().check("database", || async { true }));

    Server::bind("0.0.0.0:3000")
        .serve(app)
        .await
        .expect("server error");
}

// GET /users — the pagination envelope every list endpoint shares.
async fn list_users(_req: Request) -> Result<Response, Fault> {
    let users = vec![
        User { id: "1".into(), display_name: "Ada Lovelace".into() },
        User { id: "2".into(), display_name: "Grace Hopper".into() },
    ];
    Page::new(users, 20, 0, 2).into_response()
}

// POST /users — send an idempotency-key header and retries are safe: the
// gateway replays the first 201 instead of calling this again.
async fn create_user(req: Request) -> Result<Response, Fault> {
    let input: UserInput = req.json()?;
    if input.display_name.trim().is_empty() {
        return Err(Fault::validation("invalid user payload")
            .with_field("displayName", "must not be empty"));
    }

    let user = User { id: uuid::Uuid::new_v4().to_string(), display_name: input.display_name };
    Ok(Response::builder()
        .status(Status::Created)
        .header("location", &format!("/users/{}", user.id))
        .json(serde_json::to_vec(&user)?))
}

// PUT /users/{id} — optimistic concurrency: the client proves which version
// it read, or gets a 412 problem body.
async fn update_user(req: Request) -> Result<Response, Fault> {
    let current = EntityTag::strong("v3"); // a real app reads this from storage
    etag::require_match(req.header("if-match"), &current)?;

    let input: UserInput = req.json()?;
    let id = req.param("id").ok_or_else(|| Fault::not_found("no such user"))?;
    let user = User { id: id.to_owned(), display_name: input.display_name };
    Ok(Response::builder()
        .etag(&EntityTag::strong("v4"))
        .json(serde_json::to_vec(&user)?))
}
