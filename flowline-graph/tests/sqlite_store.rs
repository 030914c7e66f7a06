use flowline_core::{Flow, Key, Path};
use flowline_graph::{GraphError, GraphStore, SqliteGraphStore};
use tempfile::TempDir;

async fn open_store(dir: &TempDir) -> SqliteGraphStore {
    SqliteGraphStore::connect(dir.path().join("graph.db"))
        .await
        .expect("open sqlite store")
}

fn sample_flow() -> Flow {
    Flow::new("turn on light", "living room lamp", Path::new("/light", "REST"))
}

#[tokio::test]
async fn save_flow_then_read_it_back() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir).await;

    let flow = sample_flow();
    let key = store.save_flow(&flow).await.unwrap();
    let loaded = store.flow_by_key(key).await.unwrap();
    assert_eq!(loaded, flow);
}

#[tokio::test]
async fn flows_are_not_deduplicated() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir).await;

    let flow = sample_flow();
    let first = store.save_flow(&flow).await.unwrap();
    let second = store.save_flow(&flow).await.unwrap();
    assert_ne!(first, second);
    assert_eq!(store.flow_by_key(first).await.unwrap(), flow);
    assert_eq!(store.flow_by_key(second).await.unwrap(), flow);
}

#[tokio::test]
async fn unknown_flow_key_is_not_found() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir).await;

    let missing = Key::random();
    match store.flow_by_key(missing).await {
        Err(GraphError::FlowNotFound(key)) => assert_eq!(key, missing),
        other => panic!("expected FlowNotFound, got {other:?}"),
    }
}

#[tokio::test]
async fn repeat_path_saves_return_the_same_key() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir).await;

    let path = Path::new("/sensor", "MQTT");
    let first = store.save_path(&path).await.unwrap();
    let second = store.save_path(&path).await.unwrap();
    assert_eq!(first, second);

    // exactly one (route, type) node may exist
    let url = format!("sqlite://{}", dir.path().join("graph.db").display());
    let pool = sqlx::SqlitePool::connect(&url).await.unwrap();
    let routes: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM quads WHERE predicate = 'route' AND object = $1")
            .bind("/sensor")
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(routes, 1);
}

#[tokio::test]
async fn save_flow_reuses_an_existing_path_node() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir).await;

    let path = Path::new("/light", "REST");
    let path_key = store.save_path(&path).await.unwrap();

    store.save_flow(&sample_flow()).await.unwrap();
    assert_eq!(store.key_of_path(&path).await.unwrap(), path_key);
}

#[tokio::test]
async fn key_of_path_matches_save_path_and_never_inserts() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir).await;

    let path = Path::new("/a", "REST");
    match store.key_of_path(&path).await {
        Err(GraphError::PathNotFound) => {}
        other => panic!("expected PathNotFound, got {other:?}"),
    }
    // the lookup must not have created the node
    match store.key_of_path(&path).await {
        Err(GraphError::PathNotFound) => {}
        other => panic!("expected PathNotFound, got {other:?}"),
    }

    let key = store.save_path(&path).await.unwrap();
    assert_eq!(store.key_of_path(&path).await.unwrap(), key);
}

#[tokio::test]
async fn path_by_key_round_trip() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir).await;

    let path = Path::new("/sensor/temp", "MQTT");
    let key = store.save_path(&path).await.unwrap();
    assert_eq!(store.path_by_key(key).await.unwrap(), path);

    match store.path_by_key(Key::random()).await {
        Err(GraphError::PathNotFound) => {}
        other => panic!("expected PathNotFound, got {other:?}"),
    }
}

#[tokio::test]
async fn chain_then_next_flows() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir).await;

    let origin = Path::new("/in", "MQTT");
    let origin_key = store.save_path(&origin).await.unwrap();
    let flow = sample_flow();
    let flow_key = store.save_flow(&flow).await.unwrap();

    store
        .chain_next_flow_to_path(flow_key, origin_key)
        .await
        .unwrap();

    let next = store.next_flows(origin_key).await.unwrap();
    assert_eq!(next, vec![(flow_key, flow)]);
}

#[tokio::test]
async fn next_flows_is_empty_without_edges() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir).await;

    let key = store.save_path(&Path::new("/in", "MQTT")).await.unwrap();
    assert!(store.next_flows(key).await.unwrap().is_empty());
}

#[tokio::test]
async fn next_flows_requires_a_known_path() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir).await;

    match store.next_flows(Key::random()).await {
        Err(GraphError::PathNotFound) => {}
        other => panic!("expected PathNotFound, got {other:?}"),
    }
}

#[tokio::test]
async fn chain_verifies_both_ends() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir).await;

    let path_key = store.save_path(&Path::new("/in", "MQTT")).await.unwrap();
    let flow_key = store.save_flow(&sample_flow()).await.unwrap();

    match store
        .chain_next_flow_to_path(Key::random(), path_key)
        .await
    {
        Err(GraphError::FlowNotFound(_)) => {}
        other => panic!("expected FlowNotFound, got {other:?}"),
    }
    match store
        .chain_next_flow_to_path(flow_key, Key::random())
        .await
    {
        Err(GraphError::PathNotFound) => {}
        other => panic!("expected PathNotFound, got {other:?}"),
    }
}

#[tokio::test]
async fn duplicate_edges_read_as_one() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir).await;

    let origin_key = store.save_path(&Path::new("/in", "MQTT")).await.unwrap();
    let flow_key = store.save_flow(&sample_flow()).await.unwrap();

    store
        .chain_next_flow_to_path(flow_key, origin_key)
        .await
        .unwrap();
    store
        .chain_next_flow_to_path(flow_key, origin_key)
        .await
        .unwrap();

    assert_eq!(store.next_flows(origin_key).await.unwrap().len(), 1);
}

#[tokio::test]
async fn two_flows_on_one_path() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir).await;

    let origin_key = store.save_path(&Path::new("/in", "X")).await.unwrap();
    let first = Flow::new("f", "first", Path::new("/out", "Y"));
    let second = Flow::new("g", "second", Path::new("/out2", "Z"));
    let first_key = store.save_flow(&first).await.unwrap();
    let second_key = store.save_flow(&second).await.unwrap();
    store
        .chain_next_flow_to_path(first_key, origin_key)
        .await
        .unwrap();
    store
        .chain_next_flow_to_path(second_key, origin_key)
        .await
        .unwrap();

    let mut next = store.next_flows(origin_key).await.unwrap();
    next.sort_by(|(_, a), (_, b)| a.name.cmp(&b.name));
    assert_eq!(next, vec![(first_key, first), (second_key, second)]);
}

#[tokio::test]
async fn invalid_records_are_rejected() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir).await;

    assert!(matches!(
        store.save_path(&Path::new("", "REST")).await,
        Err(GraphError::InvalidPath("route"))
    ));
    assert!(matches!(
        store
            .save_flow(&Flow::new("", "d", Path::new("/r", "T")))
            .await,
        Err(GraphError::InvalidFlow("name"))
    ));
    assert!(matches!(
        store
            .save_flow(&Flow::new("n", "d", Path::new("/r", "")))
            .await,
        Err(GraphError::InvalidPath("type"))
    ));
}

#[tokio::test]
async fn state_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let path = Path::new("/persist", "REST");

    let key = {
        let store = open_store(&dir).await;
        let key = store.save_path(&path).await.unwrap();
        store.close().await;
        key
    };

    let store = open_store(&dir).await;
    assert_eq!(store.key_of_path(&path).await.unwrap(), key);
}
