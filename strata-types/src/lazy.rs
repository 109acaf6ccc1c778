//! On-demand entity properties.

use serde::{Deserialize, Serialize};

/// A property that is only fetched when explicitly asked for.
///
/// Once a value has been requested, a later fetch that did not ask for it
/// (and therefore carries `Unrequested`) must not throw it away.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "state", content = "value", rename_all = "snake_case")]
pub enum Lazy<T> {
    Unrequested,
    Requested(T),
}

impl<T> Default for Lazy<T> {
    fn default() -> Self {
        Self::Unrequested
    }
}

impl<T> Lazy<T> {
    /// Whether a value has been fetched.
    #[must_use]
    pub fn is_requested(&self) -> bool {
        matches!(self, Self::Requested(_))
    }

    /// Returns the fetched value, if any.
    #[must_use]
    pub fn value(&self) -> Option<&T> {
        match self {
            Self::Unrequested => None,
            Self::Requested(v) => Some(v),
        }
    }

    /// Consumes the field, returning the fetched value, if any.
    pub fn into_value(self) -> Option<T> {
        match self {
            Self::Unrequested => None,
            Self::Requested(v) => Some(v),
        }
    }
}

impl<T: Clone> Lazy<T> {
    /// Merges an incoming value over this one.
    ///
    /// `Unrequested` never downgrades a requested value; a requested
    /// incoming value always wins.
    #[must_use]
    pub fn merge(&self, incoming: &Lazy<T>) -> Lazy<T> {
        match incoming {
            Self::Unrequested => self.clone(),
            Self::Requested(v) => Self::Requested(v.clone()),
        }
    }
}

impl<T> From<Option<T>> for Lazy<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => Self::Requested(v),
            None => Self::Unrequested,
        }
    }
}
