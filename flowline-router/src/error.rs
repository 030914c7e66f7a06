use flowline_broker::BrokerError;

/// Why a forwarding pass stopped early.
#[derive(Debug)]
pub enum RouterError {
    /// The destination Path's type has no outbound topic configured.
    UnknownPathType(String),
    /// The broker did not confirm the forwarded publish.
    Forward(BrokerError),
}

impl std::fmt::Display for RouterError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RouterError::UnknownPathType(path_type) => {
                write!(f, "path type '{path_type}' has no outbound topic")
            }
            RouterError::Forward(err) => write!(f, "forward failed: {err}"),
        }
    }
}

impl std::error::Error for RouterError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RouterError::Forward(err) => Some(err),
            RouterError::UnknownPathType(_) => None,
        }
    }
}
