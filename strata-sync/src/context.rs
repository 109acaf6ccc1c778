//! Per-request read and write contexts.

use std::fmt;
use std::sync::Arc;
use strata_store::Endpoint;

use crate::access::AccessValidator;

/// What happens to local records a complete remote listing no longer has.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum LocalDataPolicy {
    /// Keep them.
    #[default]
    RetainExtra,
    /// Remove them, unless they are out of sync with the remote.
    DiscardExtra,
}

/// Whether fetched remote data is written back into the local tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PersistenceStrategy {
    Persist(LocalDataPolicy),
    DoNotPersist,
}

impl Default for PersistenceStrategy {
    fn default() -> Self {
        Self::Persist(LocalDataPolicy::RetainExtra)
    }
}

/// The remote half of a read: which request, and what to do with its data.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct RemoteRead {
    pub endpoint: Endpoint,
    pub persistence: PersistenceStrategy,
}

impl RemoteRead {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn endpoint(mut self, endpoint: Endpoint) -> Self {
        self.endpoint = endpoint;
        self
    }

    #[must_use]
    pub fn persistence(mut self, persistence: PersistenceStrategy) -> Self {
        self.persistence = persistence;
        self
    }

    /// Persist, discarding local records the remote no longer lists.
    pub fn discarding() -> Self {
        Self::new().persistence(PersistenceStrategy::Persist(LocalDataPolicy::DiscardExtra))
    }

    pub fn transient() -> Self {
        Self::new().persistence(PersistenceStrategy::DoNotPersist)
    }
}

/// Where a read gets its data.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum DataSource {
    /// Local tiers only.
    #[default]
    Local,
    /// Remote only. Connectivity and empty-response failures read as empty.
    Remote(RemoteRead),
    /// Remote, falling back to local on any remote failure.
    RemoteOrLocal(RemoteRead),
    /// Local right away, then a remote refresh delivered to observers.
    LocalThen(RemoteRead),
    /// Local if it has data, otherwise remote.
    LocalOr(RemoteRead),
}

impl DataSource {
    pub fn touches_remote(&self) -> bool {
        !matches!(self, Self::Local)
    }

    /// The remote read this source may perform.
    pub(crate) fn remote(&self) -> Option<&RemoteRead> {
        match self {
            Self::Local => None,
            Self::Remote(remote)
            | Self::RemoteOrLocal(remote)
            | Self::LocalThen(remote)
            | Self::LocalOr(remote) => Some(remote),
        }
    }

    /// The remote refresh that follows the local answer, if any.
    pub(crate) fn refresh(&self) -> Option<&RemoteRead> {
        match self {
            Self::LocalThen(remote) => Some(remote),
            _ => None,
        }
    }
}

/// Which tiers a write lands in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum DataTarget {
    #[default]
    Local,
    Remote,
    LocalAndRemote,
}

impl DataTarget {
    pub fn includes_local(&self) -> bool {
        matches!(self, Self::Local | Self::LocalAndRemote)
    }

    pub fn includes_remote(&self) -> bool {
        matches!(self, Self::Remote | Self::LocalAndRemote)
    }
}

/// Read options for one request.
#[derive(Clone, Default)]
pub struct ReadContext {
    pub source: DataSource,
    pub validator: Option<Arc<dyn AccessValidator>>,
}

impl ReadContext {
    pub fn new(source: DataSource) -> Self {
        Self {
            source,
            validator: None,
        }
    }

    pub fn local() -> Self {
        Self::new(DataSource::Local)
    }

    pub fn remote(remote: RemoteRead) -> Self {
        Self::new(DataSource::Remote(remote))
    }

    pub fn remote_or_local(remote: RemoteRead) -> Self {
        Self::new(DataSource::RemoteOrLocal(remote))
    }

    pub fn local_then(remote: RemoteRead) -> Self {
        Self::new(DataSource::LocalThen(remote))
    }

    pub fn local_or(remote: RemoteRead) -> Self {
        Self::new(DataSource::LocalOr(remote))
    }

    #[must_use]
    pub fn with_validator(mut self, validator: Arc<dyn AccessValidator>) -> Self {
        self.validator = Some(validator);
        self
    }
}

impl fmt::Debug for ReadContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReadContext")
            .field("source", &self.source)
            .field("validated", &self.validator.is_some())
            .finish()
    }
}

/// Write options for one request.
#[derive(Clone, Default)]
pub struct WriteContext {
    pub target: DataTarget,
    pub validator: Option<Arc<dyn AccessValidator>>,
}

impl WriteContext {
    pub fn new(target: DataTarget) -> Self {
        Self {
            target,
            validator: None,
        }
    }

    pub fn local() -> Self {
        Self::new(DataTarget::Local)
    }

    pub fn remote() -> Self {
        Self::new(DataTarget::Remote)
    }

    pub fn local_and_remote() -> Self {
        Self::new(DataTarget::LocalAndRemote)
    }

    #[must_use]
    pub fn with_validator(mut self, validator: Arc<dyn AccessValidator>) -> Self {
        self.validator = Some(validator);
        self
    }
}

impl fmt::Debug for WriteContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WriteContext")
            .field("target", &self.target)
            .field("validated", &self.validator.is_some())
            .finish()
    }
}
