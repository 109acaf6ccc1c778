//! Identifier types shared by every storage tier.
//!
//! A record created on this device starts with a [`LocalId`]. Once a server
//! accepts it, it also carries a [`RemoteId`]. Callers may keep holding the
//! transient local form, so lookups must treat both forms as the same record
//! (see [`Identifier::matches`]).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::Error;

/// Client-generated identifier for a record that has no server key yet.
///
/// Backed by a UUID v7, so ids minted on one device sort by creation time.
/// Stays attached to the record as an alias after the server confirms it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocalId(Uuid);

impl LocalId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    #[must_use]
    pub fn uuid(&self) -> Uuid {
        self.0
    }

    pub fn parse(s: &str) -> Result<Self, Error> {
        s.parse()
    }
}

impl Default for LocalId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for LocalId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl fmt::Display for LocalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0.hyphenated(), f)
    }
}

impl FromStr for LocalId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::try_parse(s).map(Self).map_err(Error::from)
    }
}

/// Server-assigned key. Integer keys order before text keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RemoteId {
    Int(i64),
    Text(String),
}

impl From<i64> for RemoteId {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<&str> for RemoteId {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for RemoteId {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl fmt::Display for RemoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Text(v) => f.write_str(v),
        }
    }
}

/// Identifies one logical record across all tiers.
///
/// `PartialEq`/`Hash` are structural, which is what query fingerprints and
/// result deduplication need. Tier lookups go through [`Identifier::key`]
/// and [`Identifier::matches`] instead.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Identifier {
    /// Not yet known to the server.
    Local(LocalId),
    /// Server-assigned key, optionally remembering the local ID it replaced.
    Remote {
        id: RemoteId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        local: Option<LocalId>,
    },
}

impl Identifier {
    /// Creates a fresh local-only identifier.
    #[must_use]
    pub fn new_local() -> Self {
        Self::Local(LocalId::new())
    }

    /// Creates a remote identifier without a local alias.
    pub fn from_remote(id: impl Into<RemoteId>) -> Self {
        Self::Remote {
            id: id.into(),
            local: None,
        }
    }

    /// Creates a remote identifier for a record that was created locally.
    pub fn confirmed(id: impl Into<RemoteId>, local: LocalId) -> Self {
        Self::Remote {
            id: id.into(),
            local: Some(local),
        }
    }

    /// Returns the local ID, if this identifier has one.
    #[must_use]
    pub fn local_id(&self) -> Option<LocalId> {
        match self {
            Self::Local(local) => Some(*local),
            Self::Remote { local, .. } => *local,
        }
    }

    /// Returns the server key, if assigned.
    #[must_use]
    pub fn remote_id(&self) -> Option<&RemoteId> {
        match self {
            Self::Local(_) => None,
            Self::Remote { id, .. } => Some(id),
        }
    }

    /// Whether the server has not confirmed this record yet.
    #[must_use]
    pub fn is_local_only(&self) -> bool {
        matches!(self, Self::Local(_))
    }

    /// Canonical storage key: the remote key when known, else the local one.
    #[must_use]
    pub fn key(&self) -> IdentifierKey {
        match self {
            Self::Local(local) => IdentifierKey::Local(*local),
            Self::Remote { id, .. } => IdentifierKey::Remote(id.clone()),
        }
    }

    /// Tier-independent equivalence.
    ///
    /// Two identifiers name the same record when both carry a remote key and
    /// the keys are equal, or when at least one side lacks a remote key and
    /// their local IDs are equal.
    #[must_use]
    pub fn matches(&self, other: &Identifier) -> bool {
        match (self.remote_id(), other.remote_id()) {
            (Some(a), Some(b)) => a == b,
            _ => match (self.local_id(), other.local_id()) {
                (Some(a), Some(b)) => a == b,
                _ => false,
            },
        }
    }

    /// Total order used by "order by identifier": by key, then by alias.
    #[must_use]
    pub fn order_cmp(&self, other: &Identifier) -> std::cmp::Ordering {
        self.key()
            .cmp(&other.key())
            .then_with(|| self.local_id().cmp(&other.local_id()))
    }
}

impl From<LocalId> for Identifier {
    fn from(value: LocalId) -> Self {
        Self::Local(value)
    }
}

impl From<RemoteId> for Identifier {
    fn from(value: RemoteId) -> Self {
        Self::from_remote(value)
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local(local) => write!(f, "local:{local}"),
            Self::Remote { id, local: None } => write!(f, "remote:{id}"),
            Self::Remote {
                id,
                local: Some(local),
            } => write!(f, "remote:{id}+{local}"),
        }
    }
}

impl FromStr for Identifier {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(rest) = s.strip_prefix("local:") {
            return Ok(Self::Local(LocalId::parse(rest)?));
        }
        let Some(rest) = s.strip_prefix("remote:") else {
            return Err(Error::InvalidIdentifier(s.to_string()));
        };
        if rest.is_empty() {
            return Err(Error::InvalidIdentifier(s.to_string()));
        }
        let (raw, local) = match rest.rsplit_once('+') {
            Some((raw, alias)) => match LocalId::parse(alias) {
                Ok(local) => (raw, Some(local)),
                Err(_) => (rest, None),
            },
            None => (rest, None),
        };
        let id = raw
            .parse::<i64>()
            .map(RemoteId::Int)
            .unwrap_or_else(|_| RemoteId::Text(raw.to_string()));
        Ok(Self::Remote { id, local })
    }
}

/// Canonical key under which a store files a record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum IdentifierKey {
    Remote(RemoteId),
    Local(LocalId),
}

impl fmt::Display for IdentifierKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Remote(RemoteId::Int(v)) => write!(f, "r:i:{v}"),
            Self::Remote(RemoteId::Text(v)) => write!(f, "r:s:{v}"),
            Self::Local(local) => write!(f, "l:{local}"),
        }
    }
}
