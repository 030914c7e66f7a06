use std::path::Path as FilePath;

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{
    Database, Encode, Executor, FromRow, IntoArguments, Pool, Postgres, Sqlite, Transaction, Type,
};
use tokio::sync::Mutex;

use flowline_core::{Flow, Key, Path};

use crate::error::GraphError;
use crate::iri::{from_iri, to_iri};
use crate::sql;
use crate::GraphStore;

/// Relational quad store, generic over the SQL driver.
///
/// Reads go straight to the pool and may run concurrently. Every mutation
/// runs inside a driver transaction and holds the store-level write lock
/// across its lookup-then-insert critical section, so admin writes are
/// serialized within this process; Path upserts in particular cannot
/// interleave. Concurrent upserts from separate processes against the same
/// server remain the documented permitted divergence, surfaced later as
/// [`GraphError::PathNotUnique`].
pub struct SqlGraphStore<DB: Database> {
    pool: Pool<DB>,
    write_lock: Mutex<()>,
}

/// Embedded single-file backend. The pool is capped at one connection.
pub type SqliteGraphStore = SqlGraphStore<Sqlite>;

/// Remote SQL backend.
pub type PostgresGraphStore = SqlGraphStore<Postgres>;

impl SqlGraphStore<Sqlite> {
    /// Open (creating if missing) the database file and prepare the schema.
    pub async fn connect(file: impl AsRef<FilePath>) -> Result<Self, GraphError> {
        let options = SqliteConnectOptions::new()
            .filename(file)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;
        Self::prepare(pool).await
    }
}

impl SqlGraphStore<Postgres> {
    /// Connect to the server named by `url` and prepare the schema.
    pub async fn connect(url: &str) -> Result<Self, GraphError> {
        let pool = PgPoolOptions::new().connect(url).await?;
        Self::prepare(pool).await
    }
}

impl<DB> SqlGraphStore<DB>
where
    DB: Database,
    for<'c> &'c mut DB::Connection: Executor<'c, Database = DB>,
    for<'q> DB::Arguments<'q>: IntoArguments<'q, DB>,
    for<'q> &'q str: Encode<'q, DB> + Type<DB>,
    for<'r> (String,): FromRow<'r, DB::Row>,
    for<'r> (i64,): FromRow<'r, DB::Row>,
{
    async fn prepare(pool: Pool<DB>) -> Result<Self, GraphError> {
        sqlx::query(sql::CREATE_QUADS).execute(&pool).await?;
        sqlx::query(sql::CREATE_SUBJECT_INDEX).execute(&pool).await?;
        sqlx::query(sql::CREATE_OBJECT_INDEX).execute(&pool).await?;

        Ok(SqlGraphStore {
            pool,
            write_lock: Mutex::new(()),
        })
    }

    async fn objects(&self, subject: &str, predicate: &str) -> Result<Vec<String>, GraphError> {
        let rows: Vec<(String,)> = sqlx::query_as(sql::SELECT_OBJECTS)
            .bind(subject)
            .bind(predicate)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(|(object,)| object).collect())
    }

    async fn first_object(
        &self,
        subject: &str,
        predicate: &str,
    ) -> Result<Option<String>, GraphError> {
        Ok(self.objects(subject, predicate).await?.into_iter().next())
    }

    /// All Path node Keys matching `(route, type)`. The uniqueness
    /// invariant bounds this at one; callers decide how to treat excess.
    async fn path_nodes(&self, path: &Path) -> Result<Vec<Key>, GraphError> {
        let rows: Vec<(String,)> = sqlx::query_as(sql::FIND_PATH_NODES)
            .bind(path.route.as_str())
            .bind(path.r#type.as_str())
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(|(subject,)| from_iri(subject)).collect()
    }

    async fn load_path(&self, key: Key) -> Result<Path, GraphError> {
        let subject = to_iri(key);
        let route = self
            .first_object(&subject, sql::PRED_ROUTE)
            .await?
            .ok_or(GraphError::PathNotFound)?;
        let r#type = self
            .first_object(&subject, sql::PRED_TYPE)
            .await?
            .ok_or_else(|| GraphError::Corrupt(format!("path {key} has no type")))?;
        Ok(Path { route, r#type })
    }

    async fn load_flow(&self, key: Key) -> Result<Flow, GraphError> {
        let subject = to_iri(key);
        let name = self
            .first_object(&subject, sql::PRED_NAME)
            .await?
            .ok_or(GraphError::FlowNotFound(key))?;
        let description = self
            .first_object(&subject, sql::PRED_DESCRIPTION)
            .await?
            .ok_or_else(|| GraphError::Corrupt(format!("flow {key} has no description")))?;
        let path_ref = self
            .first_object(&subject, sql::PRED_PATH)
            .await?
            .ok_or_else(|| GraphError::Corrupt(format!("flow {key} has no path")))?;
        let path = self.load_path(from_iri(&path_ref)?).await?;
        Ok(Flow {
            name,
            description,
            path,
        })
    }

    async fn insert_quad(
        tx: &mut Transaction<'_, DB>,
        subject: &str,
        predicate: &str,
        object: &str,
    ) -> Result<(), GraphError> {
        sqlx::query(sql::INSERT_QUAD)
            .bind(subject)
            .bind(predicate)
            .bind(object)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    /// Upsert a Path inside an open transaction. Caller holds the write
    /// lock, so the lookup-then-insert sequence cannot interleave.
    async fn upsert_path_tx(
        &self,
        tx: &mut Transaction<'_, DB>,
        path: &Path,
    ) -> Result<Key, GraphError> {
        let rows: Vec<(String,)> = sqlx::query_as(sql::FIND_PATH_NODES)
            .bind(path.route.as_str())
            .bind(path.r#type.as_str())
            .fetch_all(&mut **tx)
            .await?;
        match rows.as_slice() {
            [] => {
                let key = Key::random();
                let subject = to_iri(key);
                Self::insert_quad(tx, &subject, sql::PRED_ROUTE, &path.route).await?;
                Self::insert_quad(tx, &subject, sql::PRED_TYPE, &path.r#type).await?;
                Ok(key)
            }
            [(subject,)] => from_iri(subject),
            _ => Err(GraphError::PathNotUnique),
        }
    }
}

#[async_trait]
impl<DB> GraphStore for SqlGraphStore<DB>
where
    DB: Database,
    for<'c> &'c mut DB::Connection: Executor<'c, Database = DB>,
    for<'q> DB::Arguments<'q>: IntoArguments<'q, DB>,
    for<'q> &'q str: Encode<'q, DB> + Type<DB>,
    for<'r> (String,): FromRow<'r, DB::Row>,
    for<'r> (i64,): FromRow<'r, DB::Row>,
{
    async fn save_flow(&self, flow: &Flow) -> Result<Key, GraphError> {
        sql::validate_flow(flow)?;

        let _guard = self.write_lock.lock().await;
        let mut tx = self.pool.begin().await?;
        let path_key = self.upsert_path_tx(&mut tx, &flow.path).await?;

        let flow_key = Key::random();
        let subject = to_iri(flow_key);
        let path_ref = to_iri(path_key);
        Self::insert_quad(&mut tx, &subject, sql::PRED_NAME, &flow.name).await?;
        Self::insert_quad(&mut tx, &subject, sql::PRED_DESCRIPTION, &flow.description).await?;
        Self::insert_quad(&mut tx, &subject, sql::PRED_PATH, &path_ref).await?;
        tx.commit().await?;
        Ok(flow_key)
    }

    async fn flow_by_key(&self, key: Key) -> Result<Flow, GraphError> {
        self.load_flow(key).await
    }

    async fn save_path(&self, path: &Path) -> Result<Key, GraphError> {
        sql::validate_path(path)?;

        let _guard = self.write_lock.lock().await;
        let mut tx = self.pool.begin().await?;
        let key = self.upsert_path_tx(&mut tx, path).await?;
        tx.commit().await?;
        Ok(key)
    }

    async fn path_by_key(&self, key: Key) -> Result<Path, GraphError> {
        self.load_path(key).await
    }

    async fn key_of_path(&self, path: &Path) -> Result<Key, GraphError> {
        sql::validate_path(path)?;
        match self.path_nodes(path).await?.as_slice() {
            [] => Err(GraphError::PathNotFound),
            [key] => Ok(*key),
            _ => Err(GraphError::PathNotUnique),
        }
    }

    async fn chain_next_flow_to_path(
        &self,
        flow_key: Key,
        path_key: Key,
    ) -> Result<(), GraphError> {
        let flow_subject = to_iri(flow_key);
        let path_subject = to_iri(path_key);
        self.first_object(&flow_subject, sql::PRED_NAME)
            .await?
            .ok_or(GraphError::FlowNotFound(flow_key))?;
        self.first_object(&path_subject, sql::PRED_ROUTE)
            .await?
            .ok_or(GraphError::PathNotFound)?;

        let _guard = self.write_lock.lock().await;
        let mut tx = self.pool.begin().await?;
        let existing: i64 = sqlx::query_scalar(sql::COUNT_EDGES)
            .bind(path_subject.as_str())
            .bind(flow_subject.as_str())
            .fetch_one(&mut *tx)
            .await?;
        if existing == 0 {
            Self::insert_quad(&mut tx, &path_subject, sql::PRED_TRIGGERS, &flow_subject).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn next_flows(&self, path_key: Key) -> Result<Vec<(Key, Flow)>, GraphError> {
        let subject = to_iri(path_key);
        self.first_object(&subject, sql::PRED_ROUTE)
            .await?
            .ok_or(GraphError::PathNotFound)?;

        let rows: Vec<(String,)> = sqlx::query_as(sql::SELECT_DISTINCT_OBJECTS)
            .bind(subject.as_str())
            .bind(sql::PRED_TRIGGERS)
            .fetch_all(&self.pool)
            .await?;

        let mut flows = Vec::with_capacity(rows.len());
        for (object,) in &rows {
            let flow_key = from_iri(object)?;
            flows.push((flow_key, self.load_flow(flow_key).await?));
        }
        Ok(flows)
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}
