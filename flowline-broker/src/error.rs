use flowline_core::CodecError;

type Source = Box<dyn std::error::Error + Send + Sync>;

/// Errors raised by a broker adapter.
///
/// Client errors are boxed so the [`Broker`](crate::Broker) trait stays
/// independent of any particular broker library.
#[derive(Debug)]
pub enum BrokerError {
    /// The client could not be built or an internal operation failed.
    Client(Source),
    /// A publish was not confirmed after the client exhausted its retries.
    SendFailed(Source),
    /// An acknowledgement carried missing or unparseable broker
    /// coordinates; the offset was not committed.
    MalformedAck(CodecError),
}

impl BrokerError {
    pub fn client(err: impl Into<Source>) -> Self {
        BrokerError::Client(err.into())
    }

    pub fn send_failed(err: impl Into<Source>) -> Self {
        BrokerError::SendFailed(err.into())
    }
}

impl std::fmt::Display for BrokerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BrokerError::Client(err) => write!(f, "broker client error: {err}"),
            BrokerError::SendFailed(err) => write!(f, "publish failed: {err}"),
            BrokerError::MalformedAck(err) => write!(f, "cannot acknowledge: {err}"),
        }
    }
}

impl std::error::Error for BrokerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BrokerError::Client(err) | BrokerError::SendFailed(err) => Some(err.as_ref()),
            BrokerError::MalformedAck(err) => Some(err),
        }
    }
}

impl From<rdkafka::error::KafkaError> for BrokerError {
    fn from(err: rdkafka::error::KafkaError) -> Self {
        BrokerError::Client(Box::new(err))
    }
}
