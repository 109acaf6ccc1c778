//! The caller-facing cache manager.
//!
//! Every request passes the access gate, is routed through the store stack
//! according to its context, and, if it committed anything, is broadcast to
//! the observer registry. Local commits and their broadcast happen under one
//! commit lock, so observers see changes in the order they were committed.

use futures::future::FutureExt;
use std::sync::Arc;
use strata_query::{Query, QueryResult};
use strata_store::{Endpoint, StoreError, StoreResult};
use strata_types::{Entity, Identifier};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::access::AccessGate;
use crate::coalesce::Coalescer;
use crate::config::ManagerConfig;
use crate::context::{DataSource, PersistenceStrategy, ReadContext, RemoteRead, WriteContext};
use crate::error::{ManagerError, ManagerResult};
use crate::registry::{Mutation, ObserverRegistry, SubscriberId};
use crate::stack::{Request, StoreStack, empty_result, fetch_remote, union_identifiers};
use crate::subscription::{OnceResult, Search, Subscription};

struct Inner<E: Entity> {
    stack: StoreStack<E>,
    registry: Arc<ObserverRegistry<E>>,
    coalescer: Coalescer<E>,
    config: ManagerConfig,
    /// Held from the first local write of an operation until its broadcast.
    commit: Mutex<()>,
}

/// Mediates reads and writes of `E` across a store stack and keeps every
/// observer of a query up to date.
///
/// Cheap to clone; clones share the stack, the registry and in-flight
/// fetches.
pub struct CacheManager<E: Entity> {
    inner: Arc<Inner<E>>,
}

impl<E: Entity> Clone for CacheManager<E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<E: Entity> CacheManager<E> {
    pub fn new(stack: StoreStack<E>, config: ManagerConfig) -> Self {
        info!(
            "cache manager for {} over {} tier(s), {:?} writes",
            E::entity_type(),
            stack.tiers().len(),
            config.write_mode
        );
        Self {
            inner: Arc::new(Inner {
                stack,
                registry: Arc::new(ObserverRegistry::new()),
                coalescer: Coalescer::new(),
                config,
                commit: Mutex::new(()),
            }),
        }
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.inner.config
    }

    pub fn stack(&self) -> &StoreStack<E> {
        &self.inner.stack
    }

    /// Number of distinct queries with at least one live subscriber.
    pub fn observed_query_count(&self) -> usize {
        self.inner.registry.query_count()
    }

    /// Number of live subscribers across all queries.
    pub fn subscriber_count(&self) -> usize {
        self.inner.registry.subscriber_count()
    }

    // ── Reads ────────────────────────────────────────────────────

    /// Reads one record.
    ///
    /// The result reflects every write committed while the read was in
    /// flight. With [`DataSource::LocalThen`] the local answer is returned
    /// and the remote refresh continues in the background.
    pub async fn get(
        &self,
        identifier: &Identifier,
        context: ReadContext,
    ) -> ManagerResult<QueryResult<E>> {
        let gate = AccessGate::enter(context.validator).await?;
        let source = gate.narrow_source(context.source);
        let request = Request::Get(identifier.clone());

        let registry = &self.inner.registry;
        let (id, receiver) = registry.register_once(request.query());
        let once = OnceResult::new(id, receiver, Arc::clone(registry));

        let refused = match self.read(&request, &source, &gate).await {
            Ok(result) => {
                registry.update(id, result);
                false
            }
            Err(error) => {
                let refused = error == ManagerError::UserAccessInvalid;
                registry.fail(id, error, QueryResult::empty());
                refused
            }
        };
        if let Some(remote) = source.refresh().filter(|_| !refused) {
            let manager = self.clone();
            let remote = remote.clone();
            tokio::spawn(async move {
                manager.refresh(&request, &remote, &gate, None).await;
            });
        }
        once.await
    }

    /// Observes one record: a terminal answer plus a continuous stream.
    pub async fn observe(
        &self,
        identifier: Identifier,
        context: ReadContext,
    ) -> ManagerResult<Search<E>> {
        self.start(Request::Get(identifier), context).await
    }

    /// Evaluates a query: a terminal answer plus a continuous stream.
    ///
    /// Fails right away only if access is denied; store failures reach the
    /// terminal answer.
    pub async fn search(&self, query: Query, context: ReadContext) -> ManagerResult<Search<E>> {
        self.start(Request::Search(query), context).await
    }

    async fn start(&self, request: Request, context: ReadContext) -> ManagerResult<Search<E>> {
        let gate = AccessGate::enter(context.validator).await?;
        let source = gate.narrow_source(context.source);

        let registry = &self.inner.registry;
        let query = request.query();
        let (once_id, once_rx) = registry.register_once(query.clone());
        let (continuous_id, continuous_rx) = registry.register_continuous(query);
        let search = Search {
            once: OnceResult::new(once_id, once_rx, Arc::clone(registry)),
            continuous: Subscription::new(continuous_id, continuous_rx, Arc::clone(registry)),
        };

        let manager = self.clone();
        tokio::spawn(async move {
            let registry = &manager.inner.registry;
            match manager.read(&request, &source, &gate).await {
                Ok(result) => {
                    registry.update(once_id, result.clone());
                    registry.update(continuous_id, result);
                }
                Err(ManagerError::UserAccessInvalid) => {
                    registry.cancel(continuous_id);
                    registry.fail(once_id, ManagerError::UserAccessInvalid, QueryResult::empty());
                    return;
                }
                Err(error) => {
                    let endpoint = source.remote().map(|r| r.endpoint.clone()).unwrap_or_default();
                    let baseline = empty_result(&request, &endpoint);
                    registry.fail(continuous_id, error.clone(), baseline);
                    registry.fail(once_id, error, QueryResult::empty());
                }
            }
            if let Some(remote) = source.refresh() {
                manager
                    .refresh(&request, remote, &gate, Some(continuous_id))
                    .await;
            }
        });
        Ok(search)
    }

    /// Runs the read path for `source`. For [`DataSource::LocalThen`] this
    /// is the local half only.
    async fn read(
        &self,
        request: &Request,
        source: &DataSource,
        gate: &AccessGate,
    ) -> ManagerResult<QueryResult<E>> {
        match source {
            DataSource::Local | DataSource::LocalThen(_) => self.local_read(request, gate).await,
            DataSource::Remote(remote) => {
                let outcome = self.remote_read(request, remote, gate).await;
                self.absorb(outcome, request, remote, gate).await
            }
            DataSource::RemoteOrLocal(remote) => {
                match self.remote_read(request, remote, gate).await {
                    Err(ManagerError::Store(remote_error)) => {
                        debug!("remote read failed, falling back to local: {remote_error}");
                        self.local_read(request, gate).await.map_err(|e| match e {
                            ManagerError::Store(local_error) => {
                                StoreError::composite(local_error, remote_error).into()
                            }
                            other => other,
                        })
                    }
                    other => other,
                }
            }
            DataSource::LocalOr(remote) => match self.local_read(request, gate).await {
                Ok(local) if !local.is_empty() => Ok(local),
                Ok(_) => {
                    let outcome = self.remote_read(request, remote, gate).await;
                    self.absorb(outcome, request, remote, gate).await
                }
                Err(ManagerError::Store(local_error)) => {
                    debug!("local read failed, trying remote: {local_error}");
                    self.remote_read(request, remote, gate)
                        .await
                        .map_err(|e| match e {
                            ManagerError::Store(remote_error) => {
                                StoreError::composite(remote_error, local_error).into()
                            }
                            other => other,
                        })
                }
                Err(other) => Err(other),
            },
        }
    }

    async fn local_read(
        &self,
        request: &Request,
        gate: &AccessGate,
    ) -> ManagerResult<QueryResult<E>> {
        let result = self.inner.stack.read_local(request).await?;
        gate.confirm().await?;
        Ok(result)
    }

    /// Fetches from the remote tier, then merges and persists per strategy.
    async fn remote_read(
        &self,
        request: &Request,
        remote: &RemoteRead,
        gate: &AccessGate,
    ) -> ManagerResult<QueryResult<E>> {
        self.remote_read_into(request, remote, gate, None).await
    }

    /// [`Self::remote_read`], optionally handing a transient result to one
    /// observer under the commit lock. Persisted results reach observers
    /// through the broadcast of what was stored.
    async fn remote_read_into(
        &self,
        request: &Request,
        remote: &RemoteRead,
        gate: &AccessGate,
        observer: Option<SubscriberId>,
    ) -> ManagerResult<QueryResult<E>> {
        let fetched = self.fetch(request, &remote.endpoint).await?;
        let stack = &self.inner.stack;
        let _commit = self.inner.commit.lock().await;
        match remote.persistence {
            PersistenceStrategy::DoNotPersist => {
                let merged = stack.merge_with_local(fetched.entities().to_vec()).await?;
                gate.confirm().await?;
                let result = fetched.replace_entities(merged);
                if let Some(id) = observer {
                    self.inner.registry.update(id, result.clone());
                }
                Ok(result)
            }
            PersistenceStrategy::Persist(policy) => {
                let (result, mutation) = stack
                    .persist(request, fetched, policy, self.inner.config.write_mode)
                    .await?;
                // Local tiers hold it now; observers follow even if the caller
                // is refused the result.
                self.inner.registry.apply(mutation);
                gate.confirm().await?;
                Ok(result)
            }
        }
    }

    /// Maps connectivity and empty-response failures to an empty result,
    /// scoped as the remote answer would have been.
    async fn absorb(
        &self,
        outcome: ManagerResult<QueryResult<E>>,
        request: &Request,
        remote: &RemoteRead,
        gate: &AccessGate,
    ) -> ManagerResult<QueryResult<E>> {
        match outcome {
            Err(ManagerError::Store(e)) if e.is_absorbable() => {
                debug!("remote read returned no data: {e}");
                gate.confirm().await?;
                Ok(empty_result(request, &remote.endpoint))
            }
            other => other,
        }
    }

    async fn fetch(&self, request: &Request, endpoint: &Endpoint) -> StoreResult<QueryResult<E>> {
        let remote = Arc::clone(self.inner.stack.require_remote()?);
        let start = {
            let request = request.clone();
            let endpoint = endpoint.clone();
            move || fetch_remote(remote, request, endpoint).boxed()
        };
        if self.inner.config.coalesce_remote_reads {
            self.inner.coalescer.fetch(request, endpoint, start).await
        } else {
            start().await
        }
    }

    /// The remote half of a local-then-remote read. Failures keep whatever
    /// observers already have.
    async fn refresh(
        &self,
        request: &Request,
        remote: &RemoteRead,
        gate: &AccessGate,
        observer: Option<SubscriberId>,
    ) {
        match self.remote_read_into(request, remote, gate, observer).await {
            Ok(_) => {}
            Err(ManagerError::Store(e)) if e.is_absorbable() => {
                debug!("remote refresh skipped: {e}");
            }
            Err(ManagerError::UserAccessInvalid) => {
                warn!("access changed during remote refresh");
                if let Some(id) = observer {
                    self.inner.registry.cancel(id);
                }
            }
            Err(e) => warn!("remote refresh failed: {e}"),
        }
    }

    // ── Writes ───────────────────────────────────────────────────

    /// Writes records to the tiers named by the context.
    ///
    /// With a remote target the remote goes first and the entities it
    /// returns, merged over the local copies, are what the local tiers store
    /// and observers see. Returns the committed entities.
    pub async fn set(&self, entities: Vec<E>, context: WriteContext) -> ManagerResult<Vec<E>> {
        let gate = AccessGate::enter(context.validator).await?;
        let target = gate.narrow_target(context.target);
        let stack = &self.inner.stack;

        let mut written = entities;
        if target.includes_remote() {
            written = stack.set_remote(written).await?;
        }

        let _commit = self.inner.commit.lock().await;
        if target.includes_local() {
            if target.includes_remote() {
                written = stack.merge_with_local(written).await?;
            }
            written = stack.set_local(written, self.inner.config.write_mode).await?;
        }

        debug!(
            "committed {} {} record(s) to {:?}",
            written.len(),
            E::entity_type(),
            target
        );
        self.inner.registry.apply(Mutation::upsert(written.clone()));
        gate.confirm().await?;
        Ok(written)
    }

    pub async fn set_one(&self, entity: E, context: WriteContext) -> ManagerResult<E> {
        self.set(vec![entity], context)
            .await?
            .into_iter()
            .next()
            .ok_or(ManagerError::Store(StoreError::EmptyResponse))
    }

    /// Deletes records from the tiers named by the context.
    pub async fn remove(
        &self,
        identifiers: Vec<Identifier>,
        context: WriteContext,
    ) -> ManagerResult<()> {
        let gate = AccessGate::enter(context.validator).await?;
        let target = gate.narrow_target(context.target);
        let stack = &self.inner.stack;

        if target.includes_remote() {
            stack.remove_remote(&identifiers).await?;
        }

        let _commit = self.inner.commit.lock().await;
        if target.includes_local() {
            stack
                .remove_local(&identifiers, self.inner.config.write_mode)
                .await?;
        }

        self.inner.registry.apply(Mutation::remove(identifiers));
        gate.confirm().await?;
        Ok(())
    }

    pub async fn remove_one(&self, identifier: Identifier, context: WriteContext) -> ManagerResult<()> {
        self.remove(vec![identifier], context).await
    }

    /// Deletes every record matching `query`, returning the union of what
    /// the targeted tiers removed.
    pub async fn remove_all(
        &self,
        query: Query,
        context: WriteContext,
    ) -> ManagerResult<Vec<Identifier>> {
        let gate = AccessGate::enter(context.validator).await?;
        let target = gate.narrow_target(context.target);
        let stack = &self.inner.stack;

        let mut removed = Vec::new();
        if target.includes_remote() {
            removed = stack.remove_all_remote(&query).await?;
        }

        let _commit = self.inner.commit.lock().await;
        if target.includes_local() {
            let local = stack
                .remove_all_local(&query, self.inner.config.write_mode)
                .await?;
            removed = union_identifiers(removed, local);
        }

        debug!("removed {} {} record(s)", removed.len(), E::entity_type());
        self.inner.registry.apply(Mutation::remove(removed.clone()));
        gate.confirm().await?;
        Ok(removed)
    }
}
