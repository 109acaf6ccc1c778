//! The capability interface every tier implements.

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use strata_query::{Query, QueryResult};
use strata_types::{Entity, Identifier};

use crate::error::StoreResult;

/// Where a store sits. Diagnostic only: routing is decided by [`Tier`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreLevel {
    Memory,
    Disk,
    Remote,
}

impl fmt::Display for StoreLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Memory => f.write_str("memory"),
            Self::Disk => f.write_str("disk"),
            Self::Remote => f.write_str("remote"),
        }
    }
}

/// Which remote request serves a read.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum Endpoint {
    /// The remote store derives the request from the query.
    #[default]
    Derived,
    /// A caller-chosen request. It may filter beyond what the query says,
    /// so its results are never treated as complete.
    Request(String),
}

/// Per-call information handed to a store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct StoreContext {
    pub endpoint: Endpoint,
}

impl StoreContext {
    pub fn with_endpoint(endpoint: Endpoint) -> Self {
        Self { endpoint }
    }
}

/// A storage tier holding entities of type `E`.
///
/// Every operation completes asynchronously and may fail with a
/// [`crate::StoreError`].
#[async_trait]
pub trait Store<E: Entity>: Send + Sync {
    /// The tier this store belongs to.
    fn level(&self) -> StoreLevel;

    /// Looks up one record. `Ok(None)` when absent.
    async fn get(&self, identifier: &Identifier, context: &StoreContext) -> StoreResult<Option<E>>;

    /// Evaluates a query.
    async fn search(&self, query: &Query, context: &StoreContext) -> StoreResult<QueryResult<E>>;

    /// Writes records, returning what the store now holds for them.
    async fn set(&self, entities: Vec<E>, context: &StoreContext) -> StoreResult<Vec<E>>;

    /// Deletes records. Unknown identifiers are ignored.
    async fn remove(&self, identifiers: &[Identifier], context: &StoreContext) -> StoreResult<()>;

    /// Deletes every record matching `query`, returning their identifiers.
    async fn remove_all(&self, query: &Query, context: &StoreContext)
    -> StoreResult<Vec<Identifier>>;
}

/// A store tagged with the tier kind the stack routes it as.
pub enum Tier<E: Entity> {
    Memory(Arc<dyn Store<E>>),
    Disk(Arc<dyn Store<E>>),
    Remote(Arc<dyn Store<E>>),
}

impl<E: Entity> Tier<E> {
    pub fn memory(store: impl Store<E> + 'static) -> Self {
        Self::Memory(Arc::new(store))
    }

    pub fn disk(store: impl Store<E> + 'static) -> Self {
        Self::Disk(Arc::new(store))
    }

    pub fn remote(store: impl Store<E> + 'static) -> Self {
        Self::Remote(Arc::new(store))
    }

    pub fn level(&self) -> StoreLevel {
        match self {
            Self::Memory(_) => StoreLevel::Memory,
            Self::Disk(_) => StoreLevel::Disk,
            Self::Remote(_) => StoreLevel::Remote,
        }
    }

    /// Whether the tier answers without the network.
    pub fn is_local(&self) -> bool {
        !matches!(self, Self::Remote(_))
    }

    pub fn store(&self) -> &Arc<dyn Store<E>> {
        match self {
            Self::Memory(s) | Self::Disk(s) | Self::Remote(s) => s,
        }
    }
}

impl<E: Entity> Clone for Tier<E> {
    fn clone(&self) -> Self {
        match self {
            Self::Memory(s) => Self::Memory(Arc::clone(s)),
            Self::Disk(s) => Self::Disk(Arc::clone(s)),
            Self::Remote(s) => Self::Remote(Arc::clone(s)),
        }
    }
}

impl<E: Entity> fmt::Debug for Tier<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tier({})", self.level())
    }
}
