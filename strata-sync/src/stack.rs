//! Tiered store stack: routing of reads and writes across tiers.
//!
//! The stack owns an ordered list of [`Tier`]s. Local tiers (memory, disk)
//! are consulted in order; at most one remote tier is used. The stack knows
//! nothing about observers or access; the manager drives it and broadcasts
//! what it commits.

use futures::future::join_all;
use std::sync::Arc;
use strata_query::{Query, QueryResult, ResultScope};
use strata_store::{Endpoint, Store, StoreContext, StoreError, StoreResult, Tier};
use strata_types::{Entity, Identifier, RemoteSyncState};
use tracing::{debug, info, warn};

use crate::config::WriteMode;
use crate::context::LocalDataPolicy;
use crate::registry::Mutation;

/// What a read asks a tier for.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum Request {
    Get(Identifier),
    Search(Query),
}

impl Request {
    /// The query observers of this request are registered under.
    pub(crate) fn query(&self) -> Query {
        match self {
            Self::Get(identifier) => Query::identifier(identifier.clone()),
            Self::Search(query) => query.clone(),
        }
    }

    fn is_paginated(&self) -> bool {
        matches!(self, Self::Search(query) if query.is_paginated())
    }
}

async fn read_tier<E: Entity>(
    store: &dyn Store<E>,
    request: &Request,
    context: &StoreContext,
) -> StoreResult<QueryResult<E>> {
    match request {
        Request::Get(identifier) => {
            let found = store.get(identifier, context).await?;
            Ok(QueryResult::complete(found.into_iter().collect()))
        }
        Request::Search(query) => store.search(query, context).await,
    }
}

/// The narrowest scope a result for `request` through `endpoint` is held to,
/// whatever the store reports.
fn scope_limit(request: &Request, endpoint: &Endpoint) -> Option<ResultScope> {
    if request.is_paginated() {
        Some(ResultScope::Paginated)
    } else if matches!(endpoint, Endpoint::Request(_)) {
        Some(ResultScope::Contextual)
    } else {
        None
    }
}

/// An empty answer to `request`, scoped as a real answer through
/// `endpoint` would be. Observers starting from it still admit later
/// matching writes when the request could have been answered completely.
pub(crate) fn empty_result<E>(request: &Request, endpoint: &Endpoint) -> QueryResult<E> {
    let scope = scope_limit(request, endpoint).unwrap_or(ResultScope::Complete);
    QueryResult::new(Vec::new(), scope)
}

/// One remote read, with the result scope narrowed to what the request
/// can vouch for. Owns its inputs so it can be shared between waiters.
pub(crate) async fn fetch_remote<E: Entity>(
    store: Arc<dyn Store<E>>,
    request: Request,
    endpoint: Endpoint,
) -> StoreResult<QueryResult<E>> {
    let context = StoreContext::with_endpoint(endpoint);
    let result = read_tier(store.as_ref(), &request, &context).await?;
    let scope = scope_limit(&request, &context.endpoint).unwrap_or(result.scope());
    Ok(result.with_scope(scope))
}

/// Appends the identifiers in `more` not already named in `ids`.
fn union_into(ids: &mut Vec<Identifier>, more: Vec<Identifier>) {
    for id in more {
        if !ids.iter().any(|known| known.matches(&id)) {
            ids.push(id);
        }
    }
}

pub(crate) fn union_identifiers(mut ids: Vec<Identifier>, more: Vec<Identifier>) -> Vec<Identifier> {
    union_into(&mut ids, more);
    ids
}

/// An ordered composition of storage tiers.
pub struct StoreStack<E: Entity> {
    tiers: Vec<Tier<E>>,
}

impl<E: Entity> StoreStack<E> {
    /// Builds a stack. Local tiers are consulted in the given order; when
    /// several remote tiers are given, the first one is used.
    pub fn new(tiers: impl IntoIterator<Item = Tier<E>>) -> Self {
        let tiers: Vec<Tier<E>> = tiers.into_iter().collect();
        if tiers.iter().filter(|t| !t.is_local()).count() > 1 {
            warn!("store stack has more than one remote tier; only the first is used");
        }
        Self { tiers }
    }

    pub fn tiers(&self) -> &[Tier<E>] {
        &self.tiers
    }

    fn local_tiers(&self) -> impl Iterator<Item = &Tier<E>> {
        self.tiers.iter().filter(|t| t.is_local())
    }

    pub fn has_local(&self) -> bool {
        self.local_tiers().next().is_some()
    }

    /// The remote tier's store, if the stack has one.
    pub fn remote(&self) -> Option<&Arc<dyn Store<E>>> {
        self.tiers.iter().find(|t| !t.is_local()).map(Tier::store)
    }

    pub(crate) fn require_remote(&self) -> StoreResult<&Arc<dyn Store<E>>> {
        self.remote()
            .ok_or(StoreError::NotSupported("store stack has no remote tier"))
    }

    // ── Reads ────────────────────────────────────────────────────

    /// Asks the first local tier; on failure, the next one. When every
    /// local tier fails the failures are chained into a composite error.
    pub(crate) async fn read_local(&self, request: &Request) -> StoreResult<QueryResult<E>> {
        let context = StoreContext::default();
        let mut failure: Option<StoreError> = None;
        for tier in self.local_tiers() {
            match read_tier(tier.store().as_ref(), request, &context).await {
                Ok(result) => {
                    if failure.is_some() {
                        debug!("{} tier answered after an earlier local failure", tier.level());
                    }
                    return Ok(result);
                }
                Err(e) => {
                    warn!("{} tier read failed: {e}", tier.level());
                    failure = Some(match failure {
                        None => e,
                        Some(previous) => StoreError::composite(e, previous),
                    });
                }
            }
        }
        match failure {
            Some(e) => Err(e),
            None => Ok(empty_result(request, &Endpoint::Derived)),
        }
    }

    /// Merges each entity over the locally held version of the same record.
    pub(crate) async fn merge_with_local(&self, entities: Vec<E>) -> StoreResult<Vec<E>> {
        if entities.is_empty() || !self.has_local() {
            return Ok(entities);
        }
        let ids = entities.iter().map(|e| e.identifier().clone());
        let held = self
            .read_local(&Request::Search(Query::identifiers(ids)))
            .await?;
        Ok(entities
            .into_iter()
            .map(|incoming| {
                match held
                    .iter()
                    .find(|h| h.identifier().matches(incoming.identifier()))
                {
                    Some(local) => local.merge(&incoming),
                    None => incoming,
                }
            })
            .collect())
    }

    /// Writes a fetched remote result into the local tiers.
    ///
    /// Entities are merged over their local versions first. With
    /// [`LocalDataPolicy::DiscardExtra`] and a complete result, local
    /// records matching the query but absent from the result are removed,
    /// except those marked out of sync.
    pub(crate) async fn persist(
        &self,
        request: &Request,
        fetched: QueryResult<E>,
        policy: LocalDataPolicy,
        mode: WriteMode,
    ) -> StoreResult<(QueryResult<E>, Mutation<E>)> {
        let merged = self.merge_with_local(fetched.entities().to_vec()).await?;
        let stored = self.set_local(merged, mode).await?;

        let removed = if policy == LocalDataPolicy::DiscardExtra && fetched.is_complete() {
            self.discard_stale(&request.query(), &stored).await?
        } else {
            Vec::new()
        };

        let result = fetched.replace_entities(stored.clone());
        Ok((result, Mutation::new(stored, removed)))
    }

    /// Removes, tier by tier, synced records matching `query` that are not
    /// in `kept`. Tiers may disagree on what they hold, so each is read on
    /// its own. Returns the union of what was removed.
    async fn discard_stale(&self, query: &Query, kept: &[E]) -> StoreResult<Vec<Identifier>> {
        let context = StoreContext::default();
        let lookup = Request::Search(query.clone());
        let mut removed = Vec::new();
        for tier in self.local_tiers() {
            let held = read_tier(tier.store().as_ref(), &lookup, &context).await?;
            let stale: Vec<Identifier> = held
                .iter()
                .filter(|h| !kept.iter().any(|k| k.identifier().matches(h.identifier())))
                .filter(|h| h.remote_sync_state() != Some(RemoteSyncState::OutOfSync))
                .map(|h| h.identifier().clone())
                .collect();
            if stale.is_empty() {
                continue;
            }
            info!(
                "discarding {} {} record(s) from {} tier missing from complete remote result",
                stale.len(),
                E::entity_type(),
                tier.level()
            );
            tier.store().remove(&stale, &context).await?;
            union_into(&mut removed, stale);
        }
        Ok(removed)
    }

    // ── Writes ───────────────────────────────────────────────────

    pub(crate) async fn set_remote(&self, entities: Vec<E>) -> StoreResult<Vec<E>> {
        self.require_remote()?
            .set(entities, &StoreContext::default())
            .await
    }

    /// Writes to every local tier. Returns what the first local tier
    /// reports holding.
    pub(crate) async fn set_local(&self, entities: Vec<E>, mode: WriteMode) -> StoreResult<Vec<E>> {
        let context = StoreContext::default();
        let results = match mode {
            WriteMode::Sequential => {
                let mut results = Vec::new();
                for tier in self.local_tiers() {
                    results.push(tier.store().set(entities.clone(), &context).await?);
                }
                results
            }
            WriteMode::Parallel => join_all(
                self.local_tiers()
                    .map(|tier| tier.store().set(entities.clone(), &context)),
            )
            .await
            .into_iter()
            .collect::<StoreResult<Vec<_>>>()?,
        };
        Ok(results.into_iter().next().unwrap_or(entities))
    }

    pub(crate) async fn remove_remote(&self, identifiers: &[Identifier]) -> StoreResult<()> {
        self.require_remote()?
            .remove(identifiers, &StoreContext::default())
            .await
    }

    pub(crate) async fn remove_local(
        &self,
        identifiers: &[Identifier],
        mode: WriteMode,
    ) -> StoreResult<()> {
        let context = StoreContext::default();
        match mode {
            WriteMode::Sequential => {
                for tier in self.local_tiers() {
                    tier.store().remove(identifiers, &context).await?;
                }
            }
            WriteMode::Parallel => {
                join_all(
                    self.local_tiers()
                        .map(|tier| tier.store().remove(identifiers, &context)),
                )
                .await
                .into_iter()
                .collect::<StoreResult<Vec<()>>>()?;
            }
        }
        Ok(())
    }

    pub(crate) async fn remove_all_remote(&self, query: &Query) -> StoreResult<Vec<Identifier>> {
        self.require_remote()?
            .remove_all(query, &StoreContext::default())
            .await
    }

    /// Removes matches from every local tier, returning the union of what
    /// the tiers removed.
    pub(crate) async fn remove_all_local(
        &self,
        query: &Query,
        mode: WriteMode,
    ) -> StoreResult<Vec<Identifier>> {
        let context = StoreContext::default();
        let per_tier = match mode {
            WriteMode::Sequential => {
                let mut per_tier = Vec::new();
                for tier in self.local_tiers() {
                    per_tier.push(tier.store().remove_all(query, &context).await?);
                }
                per_tier
            }
            WriteMode::Parallel => join_all(
                self.local_tiers()
                    .map(|tier| tier.store().remove_all(query, &context)),
            )
            .await
            .into_iter()
            .collect::<StoreResult<Vec<_>>>()?,
        };
        let mut removed = Vec::new();
        for ids in per_tier {
            union_into(&mut removed, ids);
        }
        Ok(removed)
    }
}
