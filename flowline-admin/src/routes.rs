use std::sync::Arc;

use axum::extract::{Path as UrlPath, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::debug;

use flowline_core::{Flow, Key, Path};
use flowline_graph::GraphStore;

use crate::error::AdminError;

type Graph = Arc<dyn GraphStore>;

/// Incoming Flow body. Fields are optional so a missing one can be named
/// in the 400 response instead of failing deserialization wholesale.
#[derive(Deserialize)]
pub(crate) struct FlowRequest {
    name: Option<String>,
    description: Option<String>,
    path: Option<PathRequest>,
}

#[derive(Deserialize)]
pub(crate) struct PathRequest {
    route: Option<String>,
    #[serde(rename = "type")]
    path_type: Option<String>,
}

impl FlowRequest {
    fn validate(self) -> Result<Flow, AdminError> {
        let name = non_empty(self.name, "flow is missing field: name")?;
        let description = non_empty(self.description, "flow is missing field: description")?;
        let path = self
            .path
            .ok_or_else(|| AdminError::BadRequest("flow is missing field: path".to_string()))?
            .validate()?;
        Ok(Flow {
            name,
            description,
            path,
        })
    }
}

impl PathRequest {
    fn validate(self) -> Result<Path, AdminError> {
        let route = non_empty(self.route, "path is missing field: route")?;
        let path_type = non_empty(self.path_type, "path is missing field: type")?;
        Ok(Path::new(route, path_type))
    }
}

fn non_empty(field: Option<String>, missing: &str) -> Result<String, AdminError> {
    match field {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(AdminError::BadRequest(missing.to_string())),
    }
}

#[derive(Serialize)]
pub(crate) struct KeyResponse {
    uuid: Key,
}

#[derive(Serialize)]
pub(crate) struct FlowResponse {
    uuid: Key,
    name: String,
    description: String,
    path: Path,
}

impl FlowResponse {
    fn new(key: Key, flow: Flow) -> Self {
        FlowResponse {
            uuid: key,
            name: flow.name,
            description: flow.description,
            path: flow.path,
        }
    }
}

#[derive(Serialize)]
pub(crate) struct FlowsResponse {
    flows: Vec<FlowResponse>,
}

fn parse_key(raw: &str) -> Result<Key, AdminError> {
    Key::parse(raw).map_err(|_| AdminError::BadRequest(format!("malformed key '{raw}'")))
}

pub(crate) async fn create_flow(
    State(graph): State<Graph>,
    Json(body): Json<FlowRequest>,
) -> Result<(StatusCode, Json<KeyResponse>), AdminError> {
    let flow = body.validate()?;
    let key = graph.save_flow(&flow).await?;
    debug!(%key, name = %flow.name, "flow created");
    Ok((StatusCode::CREATED, Json(KeyResponse { uuid: key })))
}

pub(crate) async fn get_flow(
    State(graph): State<Graph>,
    UrlPath(raw_key): UrlPath<String>,
) -> Result<Json<FlowResponse>, AdminError> {
    let key = parse_key(&raw_key)?;
    let flow = graph.flow_by_key(key).await?;
    Ok(Json(FlowResponse::new(key, flow)))
}

pub(crate) async fn create_path(
    State(graph): State<Graph>,
    Json(body): Json<PathRequest>,
) -> Result<(StatusCode, Json<KeyResponse>), AdminError> {
    let path = body.validate()?;
    let key = graph.save_path(&path).await?;
    debug!(%key, route = %path.route, "path upserted");
    Ok((StatusCode::CREATED, Json(KeyResponse { uuid: key })))
}

pub(crate) async fn get_path(
    State(graph): State<Graph>,
    UrlPath(raw_key): UrlPath<String>,
) -> Result<Json<Path>, AdminError> {
    let key = parse_key(&raw_key)?;
    Ok(Json(graph.path_by_key(key).await?))
}

pub(crate) async fn get_path_flows(
    State(graph): State<Graph>,
    UrlPath(raw_key): UrlPath<String>,
) -> Result<Json<FlowsResponse>, AdminError> {
    let key = parse_key(&raw_key)?;
    let flows = graph
        .next_flows(key)
        .await?
        .into_iter()
        .map(|(flow_key, flow)| FlowResponse::new(flow_key, flow))
        .collect();
    Ok(Json(FlowsResponse { flows }))
}

pub(crate) async fn chain_flow_to_path(
    State(graph): State<Graph>,
    UrlPath((raw_path_key, raw_flow_key)): UrlPath<(String, String)>,
) -> Result<StatusCode, AdminError> {
    let path_key = parse_key(&raw_path_key)?;
    let flow_key = parse_key(&raw_flow_key)?;
    graph.chain_next_flow_to_path(flow_key, path_key).await?;
    debug!(%path_key, %flow_key, "flow chained to path");
    Ok(StatusCode::NO_CONTENT)
}
