//! # flowline-router — the routing loop
//!
//! One supervised worker pulls messages from the broker adapter, asks the
//! graph store which Flows run next, forwards one copy per next Flow onto
//! the topic mapped from the destination Path's type, and acknowledges the
//! input.
//!
//! The loop never propagates errors upward: every failure is logged and the
//! input is still acknowledged, trading redelivery for liveness. A forward
//! that fails therefore loses the forwarded copy (the broker only redelivers
//! uncommitted input), which is the accepted design trade-off — retrying
//! instead would duplicate the forwards that already succeeded.
//!
//! [`Router::start`] and [`Router::stop`] flip a single watch flag; calls
//! coalesce and the last call wins. While stopped the worker parks on the
//! flag; in-flight processing always completes first.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, error, warn};

use flowline_broker::Broker;
use flowline_core::{Flow, Key, Message, Path};
use flowline_graph::{GraphError, GraphStore};

mod error;

pub use error::RouterError;

/// Maps a Path type to the outbound topic its messages are forwarded on.
pub type TopicNames = HashMap<String, String>;

pub struct RouterConfig {
    pub topic_names: TopicNames,
}

/// Handle to the routing worker. The worker task is spawned gated (idle)
/// at construction; dropping the handle retires it.
pub struct Router {
    running: watch::Sender<bool>,
}

impl Router {
    /// Spawn the routing worker in the idle state. Must be called within a
    /// Tokio runtime.
    pub fn new(
        broker: Arc<dyn Broker>,
        graph: Arc<dyn GraphStore>,
        config: RouterConfig,
    ) -> Router {
        let (running, gate) = watch::channel(false);
        let worker = Worker {
            broker,
            graph,
            topic_names: config.topic_names,
            gate,
        };
        tokio::spawn(worker.run());
        Router { running }
    }

    /// Begin (or resume) consuming. Coalesces with pending calls.
    pub fn start(&self) {
        let _ = self.running.send(true);
    }

    /// Park the worker after its current message. Safe from any context.
    pub fn stop(&self) {
        let _ = self.running.send(false);
    }

    pub fn is_running(&self) -> bool {
        *self.running.borrow()
    }
}

struct Worker {
    broker: Arc<dyn Broker>,
    graph: Arc<dyn GraphStore>,
    topic_names: TopicNames,
    gate: watch::Receiver<bool>,
}

impl Worker {
    async fn run(mut self) {
        loop {
            // park here while stopped
            while !*self.gate.borrow_and_update() {
                if self.gate.changed().await.is_err() {
                    return;
                }
            }
            tokio::select! {
                changed = self.gate.changed() => {
                    if changed.is_err() {
                        return;
                    }
                }
                message = self.broker.recv() => {
                    match message {
                        Some(message) => self.process(message).await,
                        // broker closed, nothing more will arrive
                        None => return,
                    }
                }
            }
        }
    }

    /// Handle one input message. The input is acknowledged exactly once,
    /// whether or not routing succeeded.
    async fn process(&self, message: Message) {
        self.route(&message).await;
        if let Err(err) = self.broker.acknowledge(&message).await {
            // not retried: the broker redelivers if the offset never advances
            warn!("failed to acknowledge input: {err}");
        }
    }

    async fn route(&self, message: &Message) {
        let Some(origin) = &message.origin else {
            debug!("message has no origin, nothing to route");
            return;
        };

        let path_key = match self.graph.key_of_path(origin).await {
            Ok(key) => key,
            Err(GraphError::PathNotFound) => {
                debug!(route = %origin.route, "origin path is not registered");
                return;
            }
            Err(err @ GraphError::PathNotUnique) => {
                error!(route = %origin.route, "skipping message: {err}");
                return;
            }
            Err(err) => {
                error!("origin lookup failed: {err}");
                return;
            }
        };

        let next_flows = match self.graph.next_flows(path_key).await {
            Ok(flows) => flows,
            Err(err) => {
                error!("next-flow lookup failed: {err}");
                return;
            }
        };
        if next_flows.is_empty() {
            debug!(route = %origin.route, "no next flow for path");
            return;
        }

        self.forward_to_flows(message, next_flows).await;
    }

    /// One forwarded copy per next Flow. The first failure aborts the
    /// remaining forwards; the input is acknowledged regardless.
    async fn forward_to_flows(&self, message: &Message, next_flows: Vec<(Key, Flow)>) {
        for (_, flow) in next_flows {
            if let Err(err) = self.forward(message, flow.path).await {
                error!("dropping remaining forwards: {err}");
                metrics::counter!("flowline_router_forward_failures_total").increment(1);
                return;
            }
        }
    }

    async fn forward(&self, message: &Message, destination: Path) -> Result<(), RouterError> {
        let topic = self
            .topic_names
            .get(&destination.r#type)
            .ok_or_else(|| RouterError::UnknownPathType(destination.r#type.clone()))?;

        let mut outbound = message.clone();
        // the forward gets its own coordinates when it is consumed
        outbound.strip_coordinates();
        outbound.destination = Some(destination);
        self.broker
            .send(topic, &outbound)
            .await
            .map_err(RouterError::Forward)
    }
}
