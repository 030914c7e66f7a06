//! Flowline service entry point: load config, wire the graph store, the
//! broker adapter, the routing loop and the admin surface, then run until
//! a shutdown signal arrives.

use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use flowline_broker::{Broker, KafkaBroker, KafkaBrokerConfig};
use flowline_graph::{GraphStore, PostgresGraphStore, SqliteGraphStore};
use flowline_router::{Router, RouterConfig};

mod config;

use config::{Config, GraphConfig};

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".parse().expect("valid filter")),
        )
        .init();
}

#[tokio::main]
async fn main() {
    init_tracing();

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "flowline.yaml".to_string());
    let config = match Config::load(&config_path) {
        Ok(config) => config,
        Err(err) => {
            error!("{err}");
            std::process::exit(1);
        }
    };

    if let Err(err) = run(config).await {
        error!("{err}");
        std::process::exit(1);
    }
}

async fn run(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let graph: Arc<dyn GraphStore> = match &config.graph {
        GraphConfig::File { path } => {
            info!(path = %path.display(), "opening embedded graph store");
            Arc::new(SqliteGraphStore::connect(path).await?)
        }
        GraphConfig::Sql { url } => {
            info!("connecting to remote graph store");
            Arc::new(PostgresGraphStore::connect(url).await?)
        }
    };

    let broker: Arc<dyn Broker> = Arc::new(KafkaBroker::connect(
        &config.kafka.brokers,
        KafkaBrokerConfig {
            consumer_group: config.kafka.consumer_group.clone(),
            topics: config.kafka.topics.clone(),
        },
    )?);
    info!(
        brokers = %config.kafka.brokers,
        group = %config.kafka.consumer_group,
        "broker adapter connected"
    );

    let router = Router::new(
        broker.clone(),
        graph.clone(),
        RouterConfig {
            topic_names: config.topic_names.clone(),
        },
    );
    router.start();
    info!("routing started");

    let admin = flowline_admin::router(graph.clone());
    let listener = tokio::net::TcpListener::bind(&config.admin.listen).await?;
    info!(listen = %config.admin.listen, "admin surface up");

    axum::serve(listener, admin)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("shutting down");
    router.stop();
    graph.close().await;
    broker.close().await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("install ctrl-c handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
