//! The quad schema vocabulary shared by both backends.

use flowline_core::{Flow, Path};

use crate::error::GraphError;

// Predicates. `name`/`description`/`path` hang off Flow nodes,
// `route`/`type` off Path nodes, `triggers` is the Path→Flow edge.
pub(crate) const PRED_NAME: &str = "name";
pub(crate) const PRED_DESCRIPTION: &str = "description";
pub(crate) const PRED_PATH: &str = "path";
pub(crate) const PRED_ROUTE: &str = "route";
pub(crate) const PRED_TYPE: &str = "type";
pub(crate) const PRED_TRIGGERS: &str = "triggers";

pub(crate) const CREATE_QUADS: &str = "CREATE TABLE IF NOT EXISTS quads (\
     subject   TEXT NOT NULL, \
     predicate TEXT NOT NULL, \
     object    TEXT NOT NULL)";

pub(crate) const CREATE_SUBJECT_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS quads_subject_predicate ON quads (subject, predicate)";

pub(crate) const CREATE_OBJECT_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS quads_predicate_object ON quads (predicate, object)";

pub(crate) const INSERT_QUAD: &str =
    "INSERT INTO quads (subject, predicate, object) VALUES ($1, $2, $3)";

pub(crate) const SELECT_OBJECTS: &str =
    "SELECT object FROM quads WHERE subject = $1 AND predicate = $2";

pub(crate) const SELECT_DISTINCT_OBJECTS: &str =
    "SELECT DISTINCT object FROM quads WHERE subject = $1 AND predicate = $2";

/// Subjects that carry `route = $1` and `type = $2`. The uniqueness
/// invariant says this yields at most one row; more than one is fatal.
pub(crate) const FIND_PATH_NODES: &str = "SELECT DISTINCT r.subject \
     FROM quads r JOIN quads t ON t.subject = r.subject \
     WHERE r.predicate = 'route' AND r.object = $1 \
       AND t.predicate = 'type'  AND t.object = $2";

pub(crate) const COUNT_EDGES: &str = "SELECT COUNT(*) FROM quads \
     WHERE subject = $1 AND predicate = 'triggers' AND object = $2";

pub(crate) fn validate_path(path: &Path) -> Result<(), GraphError> {
    if path.route.is_empty() {
        return Err(GraphError::InvalidPath("route"));
    }
    if path.r#type.is_empty() {
        return Err(GraphError::InvalidPath("type"));
    }
    Ok(())
}

pub(crate) fn validate_flow(flow: &Flow) -> Result<(), GraphError> {
    if flow.name.is_empty() {
        return Err(GraphError::InvalidFlow("name"));
    }
    if flow.description.is_empty() {
        return Err(GraphError::InvalidFlow("description"));
    }
    validate_path(&flow.path)
}
