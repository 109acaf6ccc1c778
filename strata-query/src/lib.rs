//! Declarative queries over strata entities.
//!
//! A [`Query`] is an immutable (filter, ordering, pagination) triple over one
//! entity type. Two queries are "the same" when they are structurally equal,
//! which is what the observer registry uses to group subscribers.
//!
//! Evaluating a query yields a [`QueryResult`], tagged with a [`ResultScope`]
//! saying whether the absence of a record from it means anything.

mod filter;
mod order;
mod query;
mod result;

pub use filter::{Filter, Pattern};
pub use order::{Direction, Order, OrderKey};
pub use query::{Page, Query};
pub use result::{QueryResult, ResultScope};
