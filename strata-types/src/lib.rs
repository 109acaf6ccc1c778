//! Core type definitions for strata.
//!
//! This crate defines the value types every storage tier agrees on:
//! - Local and remote identifiers, and the [`Identifier`] that joins them
//! - The [`Entity`] trait implemented by cached record types
//! - [`Lazy`] fields fetched only on demand
//! - [`IndexValue`], the typed projection used by filters and orderings
//!
//! Entities are immutable values. Every change produces a new value that
//! replaces the old one in whichever store holds it.

mod entity;
mod ids;
mod lazy;

pub use entity::{Entity, IndexValue, RemoteSyncState};
pub use ids::{Identifier, IdentifierKey, LocalId, RemoteId};
pub use lazy::Lazy;

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in type operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid UUID: {0}")]
    InvalidUuid(#[from] uuid::Error),

    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),
}
