use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::Identifier;

/// Whether a locally held record matches what the server last reported.
///
/// An `OutOfSync` record carries local edits the server has not seen, so it is
/// never deleted just because a remote listing no longer contains it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemoteSyncState {
    Synced,
    OutOfSync,
}

/// A typed record the cache can hold.
///
/// Implementations are plain immutable values. Relationships to other
/// records are expressed as [`Identifier`] fields and resolved through the
/// store stack, never as embedded owning pointers.
pub trait Entity: Clone + PartialEq + fmt::Debug + Send + Sync + 'static {
    /// Name of the entity type, used in logs and disk-tier tables.
    fn entity_type() -> &'static str;

    /// The record's identifier.
    fn identifier(&self) -> &Identifier;

    /// Value of an indexed property, for filters and orderings.
    /// Unknown indexes return `None`.
    fn index_value(&self, index: &str) -> Option<IndexValue> {
        let _ = index;
        None
    }

    /// Synchronization tag. `None` means the type does not track it.
    fn remote_sync_state(&self) -> Option<RemoteSyncState> {
        None
    }

    /// Combines this previously held value with a freshly fetched one.
    ///
    /// The default takes `updated` wholesale. Types with [`crate::Lazy`]
    /// fields should merge those with [`crate::Lazy::merge`] so an
    /// unrequested incoming value never erases a requested one.
    /// Merging a value with itself must return an equal value.
    fn merge(&self, updated: &Self) -> Self {
        updated.clone()
    }
}

/// A typed projection of an entity property.
///
/// Ordering is total: values of different kinds order by kind
/// (bool, int, float, text, identifier), floats use IEEE total order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Identifier(Identifier),
}

impl IndexValue {
    fn rank(&self) -> u8 {
        match self {
            Self::Bool(_) => 0,
            Self::Int(_) => 1,
            Self::Float(_) => 2,
            Self::Text(_) => 3,
            Self::Identifier(_) => 4,
        }
    }

    /// Returns the text payload, if this is a text value.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(v) => Some(v),
            _ => None,
        }
    }

    /// Returns the integer payload, if this is an integer value.
    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }
}

impl Ord for IndexValue {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Bool(a), Self::Bool(b)) => a.cmp(b),
            (Self::Int(a), Self::Int(b)) => a.cmp(b),
            (Self::Float(a), Self::Float(b)) => a.total_cmp(b),
            (Self::Text(a), Self::Text(b)) => a.cmp(b),
            (Self::Identifier(a), Self::Identifier(b)) => a.order_cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl PartialOrd for IndexValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for IndexValue {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for IndexValue {}

impl Hash for IndexValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.rank().hash(state);
        match self {
            Self::Bool(v) => v.hash(state),
            Self::Int(v) => v.hash(state),
            Self::Float(v) => v.to_bits().hash(state),
            Self::Text(v) => v.hash(state),
            Self::Identifier(v) => v.hash(state),
        }
    }
}

impl From<bool> for IndexValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for IndexValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for IndexValue {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<u32> for IndexValue {
    fn from(value: u32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<f64> for IndexValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for IndexValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for IndexValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<Identifier> for IndexValue {
    fn from(value: Identifier) -> Self {
        Self::Identifier(value)
    }
}
