//! Access validation.
//!
//! A validator reports the caller's current [`AccessLevel`]. The manager
//! asks before dispatching an operation and again once the stores have
//! answered; a different answer the second time invalidates the operation.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::context::{DataSource, DataTarget};
use crate::error::{ManagerError, ManagerResult};

/// What the current user may touch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessLevel {
    /// Local and remote tiers.
    RemoteAccess,
    /// Local tiers only. Remote-touching operations are narrowed.
    LocalAccess,
    /// Nothing. Operations fail without touching any store.
    NoAccess,
}

/// Source of the current access level (session state, license, ...).
#[async_trait]
pub trait AccessValidator: Send + Sync {
    async fn current_access_level(&self) -> AccessLevel;
}

/// A fixed level validates as itself.
#[async_trait]
impl AccessValidator for AccessLevel {
    async fn current_access_level(&self) -> AccessLevel {
        *self
    }
}

/// The access check bracketing one operation.
#[derive(Clone)]
pub(crate) struct AccessGate {
    validator: Option<Arc<dyn AccessValidator>>,
    level: AccessLevel,
}

impl AccessGate {
    /// Consults the validator before dispatch. Fails on `NoAccess`.
    pub(crate) async fn enter(validator: Option<Arc<dyn AccessValidator>>) -> ManagerResult<Self> {
        let level = match &validator {
            Some(v) => v.current_access_level().await,
            None => AccessLevel::RemoteAccess,
        };
        if level == AccessLevel::NoAccess {
            debug!("operation rejected: no access");
            return Err(ManagerError::UserAccessInvalid);
        }
        Ok(Self { validator, level })
    }

    pub(crate) fn narrow_source(&self, source: DataSource) -> DataSource {
        if self.level == AccessLevel::LocalAccess && source.touches_remote() {
            debug!("local access only: reading from local tiers");
            return DataSource::Local;
        }
        source
    }

    pub(crate) fn narrow_target(&self, target: DataTarget) -> DataTarget {
        if self.level == AccessLevel::LocalAccess && target.includes_remote() {
            debug!("local access only: writing to local tiers");
            return DataTarget::Local;
        }
        target
    }

    /// Re-consults the validator after the stores answered.
    pub(crate) async fn confirm(&self) -> ManagerResult<()> {
        let Some(validator) = &self.validator else {
            return Ok(());
        };
        let now = validator.current_access_level().await;
        if now != self.level {
            warn!("access changed from {:?} to {:?} during operation", self.level, now);
            return Err(ManagerError::UserAccessInvalid);
        }
        Ok(())
    }
}
