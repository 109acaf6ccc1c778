//! Tiered caching and observation core for strata.
//!
//! A [`CacheManager`] mediates reads and writes of one entity type across a
//! [`StoreStack`] of tiers (memory, disk, remote), and keeps every observer
//! of a query up to date as writes commit.
//!
//! # Components
//!
//! - **Stack**: routes a read by its [`DataSource`] and a write by its
//!   [`DataTarget`]; persists fetched remote data and discards stale local
//!   records after complete listings
//! - **Registry**: live queries and their subscribers; applies each
//!   committed mutation in commit order and skips no-op deliveries
//! - **Access gate**: an optional [`AccessValidator`] consulted before and
//!   after every operation
//! - **Coalescer**: one in-flight remote fetch per request and endpoint
//!
//! # Example
//!
//! ```no_run
//! use strata_query::Query;
//! use strata_store::mock::Track;
//! use strata_store::{MemoryStore, Tier};
//! use strata_sync::{CacheManager, ManagerConfig, ReadContext, StoreStack, WriteContext};
//!
//! # async fn demo() -> strata_sync::ManagerResult<()> {
//! let stack = StoreStack::new([Tier::memory(MemoryStore::<Track>::new())]);
//! let manager = CacheManager::new(stack, ManagerConfig::default());
//!
//! let mut search = manager.search(Query::all(), ReadContext::local()).await?;
//! manager.set_one(Track::new(1, "So What"), WriteContext::local()).await?;
//!
//! while let Some(result) = search.continuous.next().await {
//!     println!("{} track(s)", result.len());
//! }
//! # Ok(())
//! # }
//! ```

mod access;
mod coalesce;
mod config;
mod context;
mod error;
mod manager;
mod registry;
mod stack;
mod subscription;

pub use access::{AccessLevel, AccessValidator};
pub use config::{ManagerConfig, WriteMode};
pub use context::{
    DataSource, DataTarget, LocalDataPolicy, PersistenceStrategy, ReadContext, RemoteRead,
    WriteContext,
};
pub use error::{ManagerError, ManagerResult};
pub use manager::CacheManager;
pub use stack::StoreStack;
pub use subscription::{OnceResult, Search, Subscription};
