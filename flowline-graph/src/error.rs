use flowline_core::Key;

/// Errors raised by the graph store.
#[derive(Debug)]
pub enum GraphError {
    /// No Flow record exists under the given Key.
    FlowNotFound(Key),
    /// No Path matches the given Key or `(route, type)` pair.
    PathNotFound,
    /// More than one node matches a `(route, type)` pair. This violates
    /// the Path uniqueness invariant and indicates a corrupted store.
    PathNotUnique,
    /// A Flow field required to be non-empty was empty.
    InvalidFlow(&'static str),
    /// A Path field required to be non-empty was empty.
    InvalidPath(&'static str),
    /// A stored node reference did not parse back into a [`Key`].
    Corrupt(String),
    /// The underlying database failed.
    Database(sqlx::Error),
}

impl std::fmt::Display for GraphError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GraphError::FlowNotFound(key) => write!(f, "no flow exists for key {key}"),
            GraphError::PathNotFound => write!(f, "path not found"),
            GraphError::PathNotUnique => {
                write!(f, "more than one path node shares a (route, type) pair")
            }
            GraphError::InvalidFlow(field) => write!(f, "flow is missing field: {field}"),
            GraphError::InvalidPath(field) => write!(f, "path is missing field: {field}"),
            GraphError::Corrupt(detail) => write!(f, "corrupt graph record: {detail}"),
            GraphError::Database(err) => write!(f, "database error: {err}"),
        }
    }
}

impl std::error::Error for GraphError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GraphError::Database(err) => Some(err),
            _ => None,
        }
    }
}

impl From<sqlx::Error> for GraphError {
    fn from(err: sqlx::Error) -> Self {
        GraphError::Database(err)
    }
}
