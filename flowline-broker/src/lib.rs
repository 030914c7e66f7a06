//! # flowline-broker — the broker adapter
//!
//! Uniform send/receive/acknowledge against a partitioned, offset-committing
//! log. The routing loop depends only on the [`Broker`] trait; [`KafkaBroker`]
//! is the production implementation.
//!
//! Delivery contract: at-least-once. An inbound offset is committed in
//! exactly two situations — the application acknowledges the message, or the
//! adapter drops a record that failed to decode (malformed input must not
//! block the partition). Anything consumed but not committed is redelivered
//! to the next consumer of the same group.

use async_trait::async_trait;

use flowline_core::Message;

mod error;
mod kafka;

pub use error::BrokerError;
pub use kafka::{BrokerState, KafkaBroker, KafkaBrokerConfig};

/// Send/receive/ack surface of the underlying log.
#[async_trait]
pub trait Broker: Send + Sync {
    /// Publish a message on a topic, waiting for the broker to confirm the
    /// write to all in-sync replicas.
    async fn send(&self, topic: &str, message: &Message) -> Result<(), BrokerError>;

    /// Next message from the inbound stream. Lazy, infinite, single
    /// consumer; returns `None` only once the adapter has been closed.
    async fn recv(&self) -> Option<Message>;

    /// Commit the broker coordinates carried in the message's metadata.
    /// Does not block the inbound stream.
    async fn acknowledge(&self, message: &Message) -> Result<(), BrokerError>;

    /// Stop the consumer, drain in-flight producer acks, release the
    /// clients. Idempotent.
    async fn close(&self) -> Result<(), BrokerError>;
}

/// Re-exports of the most commonly used types.
pub mod prelude {
    pub use crate::{Broker, BrokerError, KafkaBroker, KafkaBrokerConfig};
}
