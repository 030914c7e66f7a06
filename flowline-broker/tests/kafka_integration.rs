//! Exercises the adapter against a live Kafka. Run with
//! `cargo test -p flowline-broker --features integration` and a reachable
//! broker; the address is taken from `KAFKA_URL` (default `localhost:9092`).
//!
//! Each test uses a fresh topic and consumer group so runs do not interfere.
#![cfg(feature = "integration")]

use std::time::Duration;

use rdkafka::producer::{FutureProducer, FutureRecord};
use rdkafka::util::Timeout;
use rdkafka::ClientConfig;

use flowline_broker::{Broker, KafkaBroker, KafkaBrokerConfig};
use flowline_core::{Message, Path};

fn kafka_url() -> String {
    std::env::var("KAFKA_URL").unwrap_or_else(|_| "localhost:9092".to_string())
}

fn fresh(prefix: &str) -> String {
    format!("{prefix}-{}", uuid::Uuid::new_v4())
}

fn connect(topic: &str, group: &str) -> KafkaBroker {
    KafkaBroker::connect(
        &kafka_url(),
        KafkaBrokerConfig {
            consumer_group: group.to_string(),
            topics: vec![topic.to_string()],
        },
    )
    .expect("connect kafka broker")
}

async fn recv_within(broker: &KafkaBroker, timeout: Duration) -> Option<Message> {
    tokio::time::timeout(timeout, broker.recv()).await.ok()?
}

#[tokio::test]
async fn send_receive_preserves_the_message() {
    let topic = fresh("flowline-rt");
    let group = fresh("group");
    let broker = connect(&topic, &group);

    let mut sent = Message::from_origin(vec![0xde, 0xad], Path::new("/in", "MQTT"));
    sent.metadata.insert("traceId".into(), b"t-1".to_vec());
    broker.send(&topic, &sent).await.unwrap();

    let received = recv_within(&broker, Duration::from_secs(30))
        .await
        .expect("message delivered");
    assert_eq!(received.payload, sent.payload);
    assert_eq!(received.origin, sent.origin);
    assert_eq!(received.metadata.get("traceId").unwrap(), b"t-1");

    let coords = received.coordinates().expect("coordinates stamped");
    assert_eq!(coords.topic, topic);

    broker.acknowledge(&received).await.unwrap();
    broker.close().await.unwrap();
}

#[tokio::test]
async fn unacknowledged_messages_are_redelivered() {
    let topic = fresh("flowline-redeliver");
    let group = fresh("group");

    let first = connect(&topic, &group);
    first
        .send(&topic, &Message::from_origin(vec![1], Path::new("/a", "X")))
        .await
        .unwrap();
    let received = recv_within(&first, Duration::from_secs(30))
        .await
        .expect("first delivery");
    // crash without acknowledging
    first.close().await.unwrap();

    let second = connect(&topic, &group);
    let redelivered = recv_within(&second, Duration::from_secs(30))
        .await
        .expect("redelivery after reconnect");
    assert_eq!(redelivered.payload, received.payload);

    second.acknowledge(&redelivered).await.unwrap();
    second.close().await.unwrap();
}

#[tokio::test]
async fn acknowledged_messages_are_not_redelivered() {
    let topic = fresh("flowline-acked");
    let group = fresh("group");

    let first = connect(&topic, &group);
    first
        .send(&topic, &Message::from_origin(vec![7], Path::new("/a", "X")))
        .await
        .unwrap();
    let received = recv_within(&first, Duration::from_secs(30))
        .await
        .expect("first delivery");
    first.acknowledge(&received).await.unwrap();
    // async commit: give the client a moment before tearing down
    tokio::time::sleep(Duration::from_secs(1)).await;
    first.close().await.unwrap();

    let second = connect(&topic, &group);
    assert!(
        recv_within(&second, Duration::from_secs(10)).await.is_none(),
        "acknowledged message must not come back"
    );
    second.close().await.unwrap();
}

#[tokio::test]
async fn malformed_records_are_dropped_and_committed() {
    let topic = fresh("flowline-malformed");
    let group = fresh("group");

    // raw record that is not a valid Message encoding
    let raw: FutureProducer = ClientConfig::new()
        .set("bootstrap.servers", kafka_url())
        .create()
        .unwrap();
    raw.send(
        FutureRecord::<(), _>::to(&topic).payload(&vec![0x0a, 0xff, 0x01]),
        Timeout::Never,
    )
    .await
    .map_err(|(err, _)| err)
    .unwrap();

    let broker = connect(&topic, &group);
    let valid = Message::from_origin(vec![9], Path::new("/ok", "X"));
    broker.send(&topic, &valid).await.unwrap();

    // only the valid message surfaces
    let received = recv_within(&broker, Duration::from_secs(30))
        .await
        .expect("valid message delivered");
    assert_eq!(received.payload, valid.payload);
    broker.acknowledge(&received).await.unwrap();
    tokio::time::sleep(Duration::from_secs(1)).await;
    broker.close().await.unwrap();

    // the malformed record's offset was committed: nothing is redelivered
    let second = connect(&topic, &group);
    assert!(recv_within(&second, Duration::from_secs(10)).await.is_none());
    second.close().await.unwrap();
}
