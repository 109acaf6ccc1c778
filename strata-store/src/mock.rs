//! Scripted stores and a sample entity for tests.
//!
//! [`MockStore`] wraps a [`MemoryStore`] and can be told to fail, to pause
//! until released, to rewrite what `set` returns (like a server assigning
//! fields) and to report a chosen result scope. It counts every call.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use strata_query::{Query, QueryResult, ResultScope};
use strata_types::{Entity, Identifier, IndexValue, Lazy, RemoteSyncState};
use tokio::sync::Semaphore;

use crate::error::{StoreError, StoreResult};
use crate::memory::MemoryStore;
use crate::store::{Store, StoreContext, StoreLevel};

/// Store operations, for failure scripting and call counting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Get,
    Search,
    Set,
    Remove,
    RemoveAll,
}

type SetTransform<E> = Box<dyn Fn(E) -> E + Send + Sync>;

/// A scripted, call-counting store.
pub struct MockStore<E: Entity> {
    level: StoreLevel,
    data: MemoryStore<E>,
    failures: Mutex<HashMap<Operation, StoreError>>,
    calls: Mutex<HashMap<Operation, usize>>,
    scope: Mutex<Option<ResultScope>>,
    gate: Mutex<Option<Arc<Semaphore>>>,
    set_transform: Mutex<Option<SetTransform<E>>>,
}

impl<E: Entity> MockStore<E> {
    pub fn new(level: StoreLevel) -> Self {
        Self {
            level,
            data: MemoryStore::new(),
            failures: Mutex::new(HashMap::new()),
            calls: Mutex::new(HashMap::new()),
            scope: Mutex::new(None),
            gate: Mutex::new(None),
            set_transform: Mutex::new(None),
        }
    }

    /// A remote-level mock holding `entities`.
    pub fn remote(entities: impl IntoIterator<Item = E>) -> Self {
        let store = Self::new(StoreLevel::Remote);
        store.seed(entities);
        store
    }

    /// Puts records in place without counting a call.
    pub fn seed(&self, entities: impl IntoIterator<Item = E>) {
        self.data.extend(entities);
    }

    /// Every record currently held.
    pub fn snapshot(&self) -> Vec<E> {
        self.data.snapshot()
    }

    /// Makes every later `op` fail with `error` until [`Self::succeed`].
    pub fn fail(&self, op: Operation, error: StoreError) {
        lock(&self.failures).insert(op, error);
    }

    pub fn succeed(&self, op: Operation) {
        lock(&self.failures).remove(&op);
    }

    /// Number of times `op` was called.
    pub fn calls(&self, op: Operation) -> usize {
        lock(&self.calls).get(&op).copied().unwrap_or(0)
    }

    /// Forces the scope reported by `search`.
    pub fn report_scope(&self, scope: ResultScope) {
        *lock(&self.scope) = Some(scope);
    }

    /// Makes `set` return `transform(entity)` for each entity it stores,
    /// like a server filling in fields.
    pub fn transform_set(&self, transform: impl Fn(E) -> E + Send + Sync + 'static) {
        *lock(&self.set_transform) = Some(Box::new(transform));
    }

    /// Holds every later call until [`Self::release`] lets it through.
    pub fn hold(&self) {
        *lock(&self.gate) = Some(Arc::new(Semaphore::new(0)));
    }

    /// Lets `n` held calls complete.
    pub fn release(&self, n: usize) {
        if let Some(gate) = lock(&self.gate).as_ref() {
            gate.add_permits(n);
        }
    }

    async fn enter(&self, op: Operation) -> StoreResult<()> {
        *lock(&self.calls).entry(op).or_insert(0) += 1;
        let gate = lock(&self.gate).clone();
        if let Some(gate) = gate {
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
        }
        match lock(&self.failures).get(&op) {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[async_trait]
impl<E: Entity> Store<E> for MockStore<E> {
    fn level(&self) -> StoreLevel {
        self.level
    }

    async fn get(&self, identifier: &Identifier, context: &StoreContext) -> StoreResult<Option<E>> {
        self.enter(Operation::Get).await?;
        self.data.get(identifier, context).await
    }

    async fn search(&self, query: &Query, context: &StoreContext) -> StoreResult<QueryResult<E>> {
        self.enter(Operation::Search).await?;
        let result = self.data.search(query, context).await?;
        Ok(match *lock(&self.scope) {
            Some(scope) => result.with_scope(scope),
            None => result,
        })
    }

    async fn set(&self, entities: Vec<E>, context: &StoreContext) -> StoreResult<Vec<E>> {
        self.enter(Operation::Set).await?;
        let entities = match lock(&self.set_transform).as_ref() {
            Some(transform) => entities.into_iter().map(transform).collect(),
            None => entities,
        };
        self.data.set(entities, context).await
    }

    async fn remove(&self, identifiers: &[Identifier], context: &StoreContext) -> StoreResult<()> {
        self.enter(Operation::Remove).await?;
        self.data.remove(identifiers, context).await
    }

    async fn remove_all(
        &self,
        query: &Query,
        context: &StoreContext,
    ) -> StoreResult<Vec<Identifier>> {
        self.enter(Operation::RemoveAll).await?;
        self.data.remove_all(query, context).await
    }
}

// ── Sample entity ────────────────────────────────────────────────

/// A music track, used throughout the test suites.
///
/// Indexes: `title` (text), `genre` (text, optional), `plays` (int).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub id: Identifier,
    pub title: String,
    pub genre: Option<String>,
    pub plays: i64,
    pub artwork: Lazy<String>,
    pub sync: Option<RemoteSyncState>,
}

impl Track {
    pub fn new(id: i64, title: &str) -> Self {
        Self::with_identifier(Identifier::from_remote(id), title)
    }

    pub fn with_identifier(id: Identifier, title: &str) -> Self {
        Self {
            id,
            title: title.to_string(),
            genre: None,
            plays: 0,
            artwork: Lazy::Unrequested,
            sync: Some(RemoteSyncState::Synced),
        }
    }

    #[must_use]
    pub fn genre(mut self, genre: &str) -> Self {
        self.genre = Some(genre.to_string());
        self
    }

    #[must_use]
    pub fn plays(mut self, plays: i64) -> Self {
        self.plays = plays;
        self
    }

    #[must_use]
    pub fn artwork(mut self, artwork: Lazy<String>) -> Self {
        self.artwork = artwork;
        self
    }

    #[must_use]
    pub fn out_of_sync(mut self) -> Self {
        self.sync = Some(RemoteSyncState::OutOfSync);
        self
    }
}

impl Entity for Track {
    fn entity_type() -> &'static str {
        "track"
    }

    fn identifier(&self) -> &Identifier {
        &self.id
    }

    fn index_value(&self, index: &str) -> Option<IndexValue> {
        match index {
            "title" => Some(self.title.as_str().into()),
            "genre" => self.genre.as_deref().map(Into::into),
            "plays" => Some(self.plays.into()),
            _ => None,
        }
    }

    fn remote_sync_state(&self) -> Option<RemoteSyncState> {
        self.sync
    }

    fn merge(&self, updated: &Self) -> Self {
        Self {
            id: updated.id.clone(),
            title: updated.title.clone(),
            genre: updated.genre.clone(),
            plays: updated.plays,
            artwork: self.artwork.merge(&updated.artwork),
            sync: updated.sync,
        }
    }
}
