//! Store abstraction and local tiers for strata.
//!
//! Every tier (memory, disk, remote) implements the same [`Store`]
//! capability interface: `get`, `search`, `set`, `remove`, `remove_all`.
//! A store reports a [`StoreLevel`] for diagnostics; which tiers are
//! consulted, and in what order, is decided by the store stack in
//! `strata-sync` from the [`Tier`] tag each store is registered with.
//!
//! # Tiers provided here
//!
//! - [`MemoryStore`]: in-process hash map with local-ID aliasing
//! - [`SqliteStore`]: durable disk tier storing JSON rows
//! - [`mock::MockStore`]: scripted store for tests (any level)
//!
//! Remote tiers live with the transport that feeds them; they only need to
//! implement [`Store`] and return errors from the [`StoreError`] taxonomy.

mod error;
mod memory;
pub mod mock;
mod sqlite;
mod store;

pub use error::{StoreError, StoreResult};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use store::{Endpoint, Store, StoreContext, StoreLevel, Tier};
