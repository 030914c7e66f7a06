//! # flowline-admin — the admin HTTP surface
//!
//! CRUD for Flows and Paths plus `triggers` chaining, served next to the
//! routing loop but entirely separate from it: the admin writes the graph
//! the router reads.
//!
//! | Route | Effect |
//! |-------|--------|
//! | `POST /flows` | create a Flow (upserts its Path), returns `{"uuid"}` |
//! | `GET /flows/{uuid}` | load a Flow |
//! | `POST /paths` | idempotent Path upsert, returns `{"uuid"}` |
//! | `GET /paths/{uuid}` | load a Path |
//! | `GET /paths/{uuid}/flows` | Flows the Path triggers, `{"flows":[…]}` |
//! | `POST /paths/{uuid}/flows/{uuid}` | chain an existing Flow to a Path |
//!
//! Validation failures name the missing field in a 400; unknown keys are
//! 404; storage failures are 500. All error bodies are
//! `{ "error": message }`.

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;

use flowline_graph::GraphStore;

mod error;
mod routes;

pub use error::AdminError;

/// Build the admin router over a shared graph store handle.
pub fn router(graph: Arc<dyn GraphStore>) -> Router {
    Router::new()
        .route("/flows", post(routes::create_flow))
        .route("/flows/{uuid}", get(routes::get_flow))
        .route("/paths", post(routes::create_path))
        .route("/paths/{uuid}", get(routes::get_path))
        .route("/paths/{uuid}/flows", get(routes::get_path_flows))
        .route(
            "/paths/{uuid}/flows/{flow_uuid}",
            post(routes::chain_flow_to_path),
        )
        .with_state(graph)
}
