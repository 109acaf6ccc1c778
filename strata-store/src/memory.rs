//! In-process memory tier.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use strata_query::{Query, QueryResult, ResultScope};
use strata_types::{Entity, Identifier, IdentifierKey, LocalId};

use crate::error::StoreResult;
use crate::store::{Store, StoreContext, StoreLevel};

struct Slot<E> {
    seq: u64,
    entity: E,
}

struct Records<E> {
    slots: HashMap<IdentifierKey, Slot<E>>,
    /// Local ID -> key the record is currently filed under.
    aliases: HashMap<LocalId, IdentifierKey>,
    next_seq: u64,
}

impl<E: Entity> Records<E> {
    fn resolve(&self, identifier: &Identifier) -> Option<IdentifierKey> {
        let key = identifier.key();
        if self.slots.contains_key(&key) {
            return Some(key);
        }
        identifier
            .local_id()
            .and_then(|local| self.aliases.get(&local))
            .filter(|key| self.slots.contains_key(key))
            .cloned()
    }

    fn insert(&mut self, entity: E) {
        let identifier = entity.identifier();
        let local = identifier.local_id();
        let aliased = local.and_then(|l| self.aliases.get(&l).cloned());
        let key = match aliased.clone() {
            // A local-only write never demotes a confirmed record.
            Some(existing) if identifier.is_local_only() => existing,
            _ => identifier.key(),
        };

        // Confirmation moves the record from its local key to its remote
        // key, keeping its place in natural order.
        let mut seq = self.slots.get(&key).map(|slot| slot.seq);
        if let Some(previous) = aliased.filter(|p| *p != key) {
            if let Some(slot) = self.slots.remove(&previous) {
                seq = seq.or(Some(slot.seq));
            }
        }
        if let Some(local) = local {
            self.aliases.insert(local, key.clone());
        }

        let seq = seq.unwrap_or_else(|| {
            self.next_seq += 1;
            self.next_seq
        });
        self.slots.insert(key, Slot { seq, entity });
    }

    fn remove(&mut self, key: &IdentifierKey) -> Option<E> {
        let slot = self.slots.remove(key)?;
        self.aliases.retain(|_, k| k != key);
        Some(slot.entity)
    }

    fn ordered(&self) -> Vec<E> {
        let mut slots: Vec<&Slot<E>> = self.slots.values().collect();
        slots.sort_by_key(|slot| slot.seq);
        slots.into_iter().map(|slot| slot.entity.clone()).collect()
    }
}

/// A hash-map backed store. Natural order is first-insertion order.
///
/// Records are filed under [`Identifier::key`]; a local-ID alias table lets
/// a record written under its local identifier and later under its confirmed
/// remote identifier resolve from either one.
pub struct MemoryStore<E> {
    records: RwLock<Records<E>>,
}

impl<E: Entity> MemoryStore<E> {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(Records {
                slots: HashMap::new(),
                aliases: HashMap::new(),
                next_seq: 0,
            }),
        }
    }

    /// Creates a store pre-filled with `entities`.
    pub fn with_entities(entities: impl IntoIterator<Item = E>) -> Self {
        let store = Self::new();
        store.extend(entities);
        store
    }

    /// Synchronous write, same semantics as [`Store::set`].
    pub fn extend(&self, entities: impl IntoIterator<Item = E>) {
        let mut records = self.write();
        for entity in entities {
            records.insert(entity);
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Records<E>> {
        self.records.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Records<E>> {
        self.records.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Every record, in natural order.
    pub fn snapshot(&self) -> Vec<E> {
        self.read().ordered()
    }

    /// Synchronous lookup.
    pub fn lookup(&self, identifier: &Identifier) -> Option<E> {
        let records = self.read();
        let key = records.resolve(identifier)?;
        records.slots.get(&key).map(|slot| slot.entity.clone())
    }

    pub fn len(&self) -> usize {
        self.read().slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<E: Entity> Default for MemoryStore<E> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<E: Entity> Store<E> for MemoryStore<E> {
    fn level(&self) -> StoreLevel {
        StoreLevel::Memory
    }

    async fn get(&self, identifier: &Identifier, _context: &StoreContext) -> StoreResult<Option<E>> {
        Ok(self.lookup(identifier))
    }

    async fn search(&self, query: &Query, _context: &StoreContext) -> StoreResult<QueryResult<E>> {
        let entities = query.apply(self.read().ordered());
        let scope = if query.is_paginated() {
            ResultScope::Paginated
        } else {
            ResultScope::Complete
        };
        Ok(QueryResult::new(entities, scope))
    }

    async fn set(&self, entities: Vec<E>, _context: &StoreContext) -> StoreResult<Vec<E>> {
        let mut records = self.write();
        for entity in &entities {
            records.insert(entity.clone());
        }
        Ok(entities)
    }

    async fn remove(&self, identifiers: &[Identifier], _context: &StoreContext) -> StoreResult<()> {
        let mut records = self.write();
        for identifier in identifiers {
            if let Some(key) = records.resolve(identifier) {
                records.remove(&key);
            }
        }
        Ok(())
    }

    async fn remove_all(
        &self,
        query: &Query,
        _context: &StoreContext,
    ) -> StoreResult<Vec<Identifier>> {
        let mut records = self.write();
        let doomed = query.apply(records.ordered());
        let mut removed = Vec::with_capacity(doomed.len());
        for entity in doomed {
            let Some(key) = records.resolve(entity.identifier()) else {
                continue;
            };
            if records.remove(&key).is_some() {
                removed.push(entity.identifier().clone());
            }
        }
        Ok(removed)
    }
}
