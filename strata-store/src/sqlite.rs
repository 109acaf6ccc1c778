//! Disk tier backed by SQLite.
//!
//! Entities are stored as JSON rows keyed by their canonical identifier key.
//! Searches load the type's rows in insertion order and evaluate the query in
//! memory; this tier favours durability over query speed.

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::marker::PhantomData;
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};
use strata_query::{Query, QueryResult, ResultScope};
use strata_types::{Entity, Identifier};
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::store::{Store, StoreContext, StoreLevel};

/// Persistent store for one entity type, backed by SQLite.
pub struct SqliteStore<E> {
    conn: Arc<Mutex<Connection>>,
    _entity: PhantomData<fn() -> E>,
}

impl<E> SqliteStore<E>
where
    E: Entity + Serialize + DeserializeOwned,
{
    /// Opens (or creates) a store at the given path.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let conn = Connection::open(path.as_ref()).map_err(|e| {
            StoreError::Persistence(format!(
                "failed to open {}: {e}",
                path.as_ref().display()
            ))
        })?;
        Self::with_connection(conn)
    }

    /// Opens an in-memory store (for testing).
    pub fn open_in_memory() -> StoreResult<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> StoreResult<Self> {
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS records (
                entity_type TEXT NOT NULL,
                record_key TEXT NOT NULL,
                local_alias TEXT,
                body TEXT NOT NULL,
                UNIQUE(entity_type, record_key)
            );

            CREATE INDEX IF NOT EXISTS records_local_alias
                ON records(entity_type, local_alias);
            ",
        )?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            _entity: PhantomData,
        })
    }

    async fn run<T, F>(&self, f: F) -> StoreResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> StoreResult<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().unwrap_or_else(PoisonError::into_inner);
            f(&conn)
        })
        .await
        .map_err(|e| StoreError::Persistence(format!("disk task failed: {e}")))?
    }
}

// ── Row helpers ──────────────────────────────────────────────────

fn key_exists(conn: &Connection, entity_type: &str, key: &str) -> StoreResult<bool> {
    let found: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM records WHERE entity_type = ?1 AND record_key = ?2",
            params![entity_type, key],
            |row| row.get(0),
        )
        .optional()?;
    Ok(found.is_some())
}

fn aliased_key(conn: &Connection, entity_type: &str, alias: &str) -> StoreResult<Option<String>> {
    Ok(conn
        .query_row(
            "SELECT record_key FROM records WHERE entity_type = ?1 AND local_alias = ?2",
            params![entity_type, alias],
            |row| row.get(0),
        )
        .optional()?)
}

fn resolve_key(
    conn: &Connection,
    entity_type: &str,
    identifier: &Identifier,
) -> StoreResult<Option<String>> {
    let key = identifier.key().to_string();
    if key_exists(conn, entity_type, &key)? {
        return Ok(Some(key));
    }
    match identifier.local_id() {
        Some(local) => aliased_key(conn, entity_type, &local.to_string()),
        None => Ok(None),
    }
}

fn load_all<E: DeserializeOwned>(conn: &Connection, entity_type: &str) -> StoreResult<Vec<E>> {
    let mut stmt =
        conn.prepare("SELECT body FROM records WHERE entity_type = ?1 ORDER BY rowid")?;
    let bodies = stmt
        .query_map(params![entity_type], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    bodies
        .iter()
        .map(|body| serde_json::from_str(body).map_err(StoreError::from))
        .collect()
}

fn write_one<E: Entity + Serialize>(conn: &Connection, entity: &E) -> StoreResult<()> {
    let entity_type = E::entity_type();
    let identifier = entity.identifier();
    let alias = identifier.local_id().map(|l| l.to_string());
    let aliased = match &alias {
        Some(alias) => aliased_key(conn, entity_type, alias)?,
        None => None,
    };
    let key = match aliased.clone() {
        Some(existing) if identifier.is_local_only() => existing,
        _ => identifier.key().to_string(),
    };

    if let Some(previous) = aliased.filter(|p| *p != key) {
        if key_exists(conn, entity_type, &key)? {
            conn.execute(
                "DELETE FROM records WHERE entity_type = ?1 AND record_key = ?2",
                params![entity_type, previous],
            )?;
        } else {
            conn.execute(
                "UPDATE records SET record_key = ?3 WHERE entity_type = ?1 AND record_key = ?2",
                params![entity_type, previous, key],
            )?;
        }
    }

    let body = serde_json::to_string(entity)
        .map_err(|e| StoreError::Persistence(format!("failed to encode entity: {e}")))?;
    conn.execute(
        "INSERT INTO records (entity_type, record_key, local_alias, body)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(entity_type, record_key) DO UPDATE SET
            local_alias = COALESCE(excluded.local_alias, records.local_alias),
            body = excluded.body",
        params![entity_type, key, alias, body],
    )?;
    Ok(())
}

fn delete_key(conn: &Connection, entity_type: &str, key: &str) -> StoreResult<bool> {
    let changed = conn.execute(
        "DELETE FROM records WHERE entity_type = ?1 AND record_key = ?2",
        params![entity_type, key],
    )?;
    Ok(changed > 0)
}

// ── Store impl ───────────────────────────────────────────────────

#[async_trait]
impl<E> Store<E> for SqliteStore<E>
where
    E: Entity + Serialize + DeserializeOwned,
{
    fn level(&self) -> StoreLevel {
        StoreLevel::Disk
    }

    async fn get(&self, identifier: &Identifier, _context: &StoreContext) -> StoreResult<Option<E>> {
        let identifier = identifier.clone();
        self.run(move |conn| {
            let entity_type = E::entity_type();
            let Some(key) = resolve_key(conn, entity_type, &identifier)? else {
                return Ok(None);
            };
            let body: Option<String> = conn
                .query_row(
                    "SELECT body FROM records WHERE entity_type = ?1 AND record_key = ?2",
                    params![entity_type, key],
                    |row| row.get(0),
                )
                .optional()?;
            body.map(|b| serde_json::from_str(&b).map_err(StoreError::from))
                .transpose()
        })
        .await
    }

    async fn search(&self, query: &Query, _context: &StoreContext) -> StoreResult<QueryResult<E>> {
        let query = query.clone();
        self.run(move |conn| {
            let all: Vec<E> = load_all(conn, E::entity_type())?;
            let scope = if query.is_paginated() {
                ResultScope::Paginated
            } else {
                ResultScope::Complete
            };
            Ok(QueryResult::new(query.apply(all), scope))
        })
        .await
    }

    async fn set(&self, entities: Vec<E>, _context: &StoreContext) -> StoreResult<Vec<E>> {
        self.run(move |conn| {
            let tx = conn.unchecked_transaction()?;
            for entity in &entities {
                write_one(&tx, entity)?;
            }
            tx.commit()?;
            debug!("disk tier stored {} {} record(s)", entities.len(), E::entity_type());
            Ok(entities)
        })
        .await
    }

    async fn remove(&self, identifiers: &[Identifier], _context: &StoreContext) -> StoreResult<()> {
        let identifiers = identifiers.to_vec();
        self.run(move |conn| {
            let entity_type = E::entity_type();
            let tx = conn.unchecked_transaction()?;
            for identifier in &identifiers {
                if let Some(key) = resolve_key(&tx, entity_type, identifier)? {
                    delete_key(&tx, entity_type, &key)?;
                }
            }
            tx.commit()?;
            Ok(())
        })
        .await
    }

    async fn remove_all(
        &self,
        query: &Query,
        _context: &StoreContext,
    ) -> StoreResult<Vec<Identifier>> {
        let query = query.clone();
        self.run(move |conn| {
            let entity_type = E::entity_type();
            let tx = conn.unchecked_transaction()?;
            let doomed: Vec<E> = query.apply(load_all(&tx, entity_type)?);
            let mut removed = Vec::with_capacity(doomed.len());
            for entity in doomed {
                if let Some(key) = resolve_key(&tx, entity_type, entity.identifier())? {
                    if delete_key(&tx, entity_type, &key)? {
                        removed.push(entity.identifier().clone());
                    }
                }
            }
            tx.commit()?;
            Ok(removed)
        })
        .await
    }
}
