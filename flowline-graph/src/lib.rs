//! # flowline-graph — the metadata graph store
//!
//! Persists [`Flow`]s, [`Path`]s and the `triggers` edges between them, and
//! answers the routing lookup: "a message arrived on this Path — which
//! Flows run next?".
//!
//! The store is exposed as the [`GraphStore`] trait; the router and the
//! admin surface depend only on the trait. The implementation,
//! [`SqlGraphStore`], is generic over the SQL driver and is instantiated
//! for two backends:
//!
//! | Backend | Storage |
//! |---------|---------|
//! | [`SqliteGraphStore`] | embedded single-file engine |
//! | [`PostgresGraphStore`] | remote SQL server |
//!
//! Both persist the same relational quad schema, one row per
//! `(subject, predicate, object)` statement:
//!
//! ```text
//! <flowKey> name        "turn on light"
//! <flowKey> description "living room lamp"
//! <flowKey> path        <pathKey>
//! <pathKey> route       "/light"
//! <pathKey> type        "REST"
//! <pathKey> triggers    <flowKey>      (zero or more)
//! ```
//!
//! Node references are stored in IRI form (`<uuid>`); literals are stored
//! raw. The invariant the store enforces: at most one Path node exists per
//! `(route, type)` pair — `save_path` is an idempotent upsert and Path
//! upserts are serialized through a store-level critical section.

use async_trait::async_trait;

use flowline_core::{Flow, Key, Path};

mod error;
mod iri;
mod sql;
mod store;

pub use error::GraphError;
pub use store::{PostgresGraphStore, SqlGraphStore, SqliteGraphStore};

/// The metadata graph behind the routing loop and the admin surface.
///
/// Implementations own all Flow/Path/edge records. Reads may run
/// concurrently with each other and with writes; write serialization is
/// the implementation's concern.
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Persist a Flow under a fresh [`Key`], upserting its embedded Path.
    ///
    /// Flows are never deduplicated; every call mints a new Key. Fails
    /// with [`GraphError::InvalidFlow`] when a required field is empty.
    async fn save_flow(&self, flow: &Flow) -> Result<Key, GraphError>;

    /// Load a Flow, resolving its Path reference.
    async fn flow_by_key(&self, key: Key) -> Result<Flow, GraphError>;

    /// Idempotent upsert: return the existing Path's Key when one matches
    /// `(route, type)`, otherwise insert and return a fresh Key.
    async fn save_path(&self, path: &Path) -> Result<Key, GraphError>;

    /// Load a Path by Key.
    async fn path_by_key(&self, key: Key) -> Result<Path, GraphError>;

    /// The read-only half of [`save_path`](GraphStore::save_path): look up
    /// the Key for `(route, type)` without ever inserting.
    async fn key_of_path(&self, path: &Path) -> Result<Key, GraphError>;

    /// Write a `pathKey —triggers→ flowKey` edge. Both ends must resolve.
    /// Writing the same edge twice is idempotent.
    async fn chain_next_flow_to_path(
        &self,
        flow_key: Key,
        path_key: Key,
    ) -> Result<(), GraphError>;

    /// All Flows triggered by the given Path, deduplicated by Flow Key.
    /// Empty when the Path exists but has no outgoing edges; fails with
    /// [`GraphError::PathNotFound`] when the Path itself is unknown.
    async fn next_flows(&self, path_key: Key) -> Result<Vec<(Key, Flow)>, GraphError>;

    /// Release the underlying connections. Further calls will fail.
    async fn close(&self);
}

/// Re-exports of the most commonly used types.
pub mod prelude {
    pub use crate::{
        GraphError, GraphStore, PostgresGraphStore, SqlGraphStore, SqliteGraphStore,
    };
}
