use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use prost::Message as _;
use rdkafka::consumer::{CommitMode, Consumer, StreamConsumer};
use rdkafka::message::Message as KafkaMessage;
use rdkafka::producer::{FutureProducer, FutureRecord, Producer};
use rdkafka::util::Timeout;
use rdkafka::{ClientConfig, Offset, TopicPartitionList};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use flowline_core::Message;

use crate::error::BrokerError;
use crate::Broker;

/// How long `close` waits for outstanding producer acks.
const FLUSH_GRACE: Duration = Duration::from_secs(1);

/// Lifecycle of a [`KafkaBroker`]. Transitions are monotonic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum BrokerState {
    Created = 0,
    Running = 1,
    Closing = 2,
    Closed = 3,
}

impl BrokerState {
    fn from_raw(raw: u8) -> BrokerState {
        match raw {
            0 => BrokerState::Created,
            1 => BrokerState::Running,
            2 => BrokerState::Closing,
            _ => BrokerState::Closed,
        }
    }
}

pub struct KafkaBrokerConfig {
    /// Consumer group used for offset commits.
    pub consumer_group: String,
    /// Inbound topics to subscribe.
    pub topics: Vec<String>,
}

/// Kafka implementation of [`Broker`].
///
/// One dedicated task drains the consumer into a bounded channel; the
/// producer publishes synchronously with all-replica acks. Records that do
/// not decode as [`Message`] are dropped, committed and counted — they
/// never reach `recv`.
pub struct KafkaBroker {
    producer: FutureProducer,
    consumer: Arc<StreamConsumer>,
    messages: Mutex<mpsc::Receiver<Message>>,
    consumer_task: Mutex<Option<JoinHandle<()>>>,
    shutdown: CancellationToken,
    state: Arc<AtomicU8>,
}

impl KafkaBroker {
    /// Build the producer and the consumer-group client against `brokers`
    /// and start the consumer task. Must be called within a Tokio runtime.
    pub fn connect(brokers: &str, config: KafkaBrokerConfig) -> Result<Self, BrokerError> {
        let consumer: StreamConsumer = ClientConfig::new()
            .set("bootstrap.servers", brokers)
            .set("group.id", &config.consumer_group)
            .set("enable.auto.commit", "false")
            .set("auto.offset.reset", "earliest")
            .create()?;
        let topics: Vec<&str> = config.topics.iter().map(String::as_str).collect();
        consumer.subscribe(&topics)?;

        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", brokers)
            .set("acks", "all")
            .set("message.send.max.retries", "2")
            .create()?;

        let consumer = Arc::new(consumer);
        let state = Arc::new(AtomicU8::new(BrokerState::Created as u8));
        let shutdown = CancellationToken::new();
        let (tx, rx) = mpsc::channel(1);

        let task = tokio::spawn(run_consumer(
            consumer.clone(),
            tx,
            shutdown.clone(),
            state.clone(),
        ));

        Ok(KafkaBroker {
            producer,
            consumer,
            messages: Mutex::new(rx),
            consumer_task: Mutex::new(Some(task)),
            shutdown,
            state,
        })
    }

    /// Current lifecycle state.
    pub fn state(&self) -> BrokerState {
        BrokerState::from_raw(self.state.load(Ordering::SeqCst))
    }

    fn advance(&self, next: BrokerState) {
        self.state.fetch_max(next as u8, Ordering::SeqCst);
    }
}

#[async_trait]
impl Broker for KafkaBroker {
    async fn send(&self, topic: &str, message: &Message) -> Result<(), BrokerError> {
        let payload = message.encode_to_vec();
        let record = FutureRecord::<(), _>::to(topic).payload(&payload);
        self.producer
            .send(record, Timeout::Never)
            .await
            .map(|_| ())
            .map_err(|(err, _)| BrokerError::send_failed(err))
    }

    async fn recv(&self) -> Option<Message> {
        self.messages.lock().await.recv().await
    }

    async fn acknowledge(&self, message: &Message) -> Result<(), BrokerError> {
        let coords = message.coordinates().map_err(BrokerError::MalformedAck)?;
        let mut offsets = TopicPartitionList::new();
        // the committed offset names the next record to consume
        offsets.add_partition_offset(
            &coords.topic,
            coords.partition,
            Offset::Offset(coords.offset + 1),
        )?;
        self.consumer.commit(&offsets, CommitMode::Async)?;
        Ok(())
    }

    async fn close(&self) -> Result<(), BrokerError> {
        let before = self
            .state
            .fetch_max(BrokerState::Closing as u8, Ordering::SeqCst);
        if before >= BrokerState::Closing as u8 {
            return Ok(());
        }

        self.shutdown.cancel();
        if let Some(task) = self.consumer_task.lock().await.take() {
            let _ = task.await;
        }
        let flushed = self.producer.flush(FLUSH_GRACE);
        self.advance(BrokerState::Closed);
        flushed.map_err(BrokerError::from)
    }
}

impl Drop for KafkaBroker {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// The single task that owns the inbound record stream.
async fn run_consumer(
    consumer: Arc<StreamConsumer>,
    tx: mpsc::Sender<Message>,
    shutdown: CancellationToken,
    state: Arc<AtomicU8>,
) {
    state.fetch_max(BrokerState::Running as u8, Ordering::SeqCst);
    loop {
        let record = tokio::select! {
            _ = shutdown.cancelled() => break,
            record = consumer.recv() => record,
        };
        match record {
            Ok(record) => {
                let payload = record.payload().unwrap_or_default();
                match Message::decode(payload) {
                    Ok(mut message) => {
                        message.stamp_coordinates(
                            record.topic(),
                            record.partition(),
                            record.offset(),
                        );
                        tokio::select! {
                            _ = shutdown.cancelled() => break,
                            sent = tx.send(message) => {
                                if sent.is_err() {
                                    break;
                                }
                            }
                        }
                    }
                    Err(err) => {
                        // commit so one bad record cannot block its partition
                        debug!(
                            topic = record.topic(),
                            partition = record.partition(),
                            offset = record.offset(),
                            "dropping record that does not decode: {err}"
                        );
                        metrics::counter!("flowline_broker_malformed_dropped_total")
                            .increment(1);
                        if let Err(err) = consumer.commit_message(&record, CommitMode::Async) {
                            error!("failed to commit malformed record: {err}");
                        }
                    }
                }
            }
            Err(err) => error!("consumer error: {err}"),
        }
    }
}
