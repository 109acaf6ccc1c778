//! Observer registry and broadcast core.
//!
//! Every live observation is filed under its [`Query`]. A committed
//! [`Mutation`] is applied to every subscriber's last result under one lock,
//! so subscribers see mutations in commit order. A recomputed result equal to
//! the last delivered one is not sent.
//!
//! A subscriber starts out pending: mutations committed before its first
//! result arrives are queued and replayed onto that result.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use strata_query::{Query, QueryResult};
use strata_types::{Entity, Identifier};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use crate::error::{ManagerError, ManagerResult};

/// A committed change: records written and records removed.
#[derive(Debug, Clone)]
pub(crate) struct Mutation<E> {
    upserted: Vec<E>,
    removed: Vec<Identifier>,
}

impl<E: Entity> Mutation<E> {
    pub(crate) fn new(upserted: Vec<E>, removed: Vec<Identifier>) -> Self {
        Self { upserted, removed }
    }

    pub(crate) fn upsert(upserted: Vec<E>) -> Self {
        Self::new(upserted, Vec::new())
    }

    pub(crate) fn remove(removed: Vec<Identifier>) -> Self {
        Self::new(Vec::new(), removed)
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.upserted.is_empty() && self.removed.is_empty()
    }

    fn removes(&self, identifier: &Identifier) -> bool {
        self.removed.iter().any(|r| r.matches(identifier))
    }
}

/// Applies one mutation to a previously computed result.
///
/// Complete results admit new matching records. Paginated and contextual
/// results only update or drop records they already hold, since absence
/// from them says nothing about a record.
fn recompute<E: Entity>(query: &Query, last: &QueryResult<E>, mutation: &Mutation<E>) -> QueryResult<E> {
    let mut entities: Vec<E> = last
        .iter()
        .filter(|e| !mutation.removes(e.identifier()))
        .cloned()
        .collect();

    for incoming in &mutation.upserted {
        let held = entities
            .iter()
            .position(|e| e.identifier().matches(incoming.identifier()));
        let admitted = query.matches(incoming);
        match held {
            Some(i) if admitted => entities[i] = incoming.clone(),
            Some(i) => {
                entities.remove(i);
            }
            None if admitted && last.is_complete() => entities.push(incoming.clone()),
            None => {}
        }
    }

    if !query.order().is_empty() {
        query.sort(&mut entities);
    }
    last.replace_entities(entities)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct SubscriberId(u64);

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

enum Sink<E> {
    Once(oneshot::Sender<ManagerResult<QueryResult<E>>>),
    Continuous(mpsc::UnboundedSender<QueryResult<E>>),
}

enum State<E> {
    Pending(Vec<Arc<Mutation<E>>>),
    Live(QueryResult<E>),
}

struct Subscriber<E> {
    id: SubscriberId,
    sink: Sink<E>,
    state: State<E>,
}

struct Observers<E> {
    next_id: u64,
    entries: HashMap<Query, Vec<Subscriber<E>>>,
    queries: HashMap<SubscriberId, Query>,
}

impl<E: Entity> Observers<E> {
    fn attach(&mut self, query: Query, sink: Sink<E>) -> SubscriberId {
        self.next_id += 1;
        let id = SubscriberId(self.next_id);
        self.queries.insert(id, query.clone());
        self.entries.entry(query).or_default().push(Subscriber {
            id,
            sink,
            state: State::Pending(Vec::new()),
        });
        id
    }

    fn find(&mut self, id: SubscriberId) -> Option<(Query, &mut Subscriber<E>)> {
        let query = self.queries.get(&id)?.clone();
        let subscriber = self
            .entries
            .get_mut(&query)?
            .iter_mut()
            .find(|s| s.id == id)?;
        Some((query, subscriber))
    }

    fn detach(&mut self, id: SubscriberId) -> Option<Subscriber<E>> {
        let query = self.queries.remove(&id)?;
        let subscribers = self.entries.get_mut(&query)?;
        let position = subscribers.iter().position(|s| s.id == id)?;
        let subscriber = subscribers.remove(position);
        if subscribers.is_empty() {
            self.entries.remove(&query);
        }
        Some(subscriber)
    }
}

/// The registry of live queries and their subscribers.
pub(crate) struct ObserverRegistry<E: Entity> {
    observers: Mutex<Observers<E>>,
}

impl<E: Entity> ObserverRegistry<E> {
    pub(crate) fn new() -> Self {
        Self {
            observers: Mutex::new(Observers {
                next_id: 0,
                entries: HashMap::new(),
                queries: HashMap::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Observers<E>> {
        self.observers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers a subscriber that receives exactly one terminal outcome.
    pub(crate) fn register_once(
        &self,
        query: Query,
    ) -> (SubscriberId, oneshot::Receiver<ManagerResult<QueryResult<E>>>) {
        let (tx, rx) = oneshot::channel();
        (self.lock().attach(query, Sink::Once(tx)), rx)
    }

    /// Registers a subscriber that receives every change until cancelled.
    pub(crate) fn register_continuous(
        &self,
        query: Query,
    ) -> (SubscriberId, mpsc::UnboundedReceiver<QueryResult<E>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (self.lock().attach(query, Sink::Continuous(tx)), rx)
    }

    /// Hands a store result to one subscriber.
    ///
    /// A pending subscriber first has its queued mutations replayed onto the
    /// result. A once subscriber is then completed and removed; a continuous
    /// one is sent the result if it differs from what it last received.
    pub(crate) fn update(&self, id: SubscriberId, result: QueryResult<E>) {
        let mut observers = self.lock();
        let Some((query, subscriber)) = observers.find(id) else {
            return;
        };
        let result = match &subscriber.state {
            State::Pending(queue) => queue
                .iter()
                .fold(result, |acc, mutation| recompute(&query, &acc, mutation)),
            State::Live(_) => result,
        };

        if let Sink::Continuous(tx) = &subscriber.sink {
            if matches!(&subscriber.state, State::Live(last) if *last == result) {
                return;
            }
            let _ = tx.send(result.clone());
            subscriber.state = State::Live(result);
            return;
        }
        if let Some(Subscriber {
            sink: Sink::Once(tx),
            ..
        }) = observers.detach(id)
        {
            let _ = tx.send(Ok(result));
        }
    }

    /// Reports a failed read to one subscriber.
    ///
    /// A once subscriber receives the error and is removed. A continuous
    /// subscriber never terminates on a failure: it keeps its last result,
    /// or, if it had none yet, goes live from `baseline` with its queued
    /// mutations replayed. The replayed result is sent only if it holds
    /// records.
    pub(crate) fn fail(&self, id: SubscriberId, error: ManagerError, baseline: QueryResult<E>) {
        let mut observers = self.lock();
        let Some((query, subscriber)) = observers.find(id) else {
            return;
        };
        if let Sink::Continuous(tx) = &subscriber.sink {
            warn!("observer {id} keeps its last result after failed read: {error}");
            if let State::Pending(queue) = &subscriber.state {
                let replayed = queue
                    .iter()
                    .fold(baseline, |acc, mutation| recompute(&query, &acc, mutation));
                if !replayed.is_empty() {
                    let _ = tx.send(replayed.clone());
                }
                subscriber.state = State::Live(replayed);
            }
            return;
        }
        if let Some(Subscriber {
            sink: Sink::Once(tx),
            ..
        }) = observers.detach(id)
        {
            let _ = tx.send(Err(error));
        }
    }

    /// Broadcasts a committed mutation to every subscriber.
    pub(crate) fn apply(&self, mutation: Mutation<E>) {
        if mutation.is_empty() {
            return;
        }
        let mutation = Arc::new(mutation);
        let mut observers = self.lock();
        let mut delivered = 0usize;
        for (query, subscribers) in observers.entries.iter_mut() {
            for subscriber in subscribers.iter_mut() {
                match &mut subscriber.state {
                    State::Pending(queue) => queue.push(Arc::clone(&mutation)),
                    State::Live(last) => {
                        let next = recompute(query, last, &mutation);
                        if next == *last {
                            continue;
                        }
                        if let Sink::Continuous(tx) = &subscriber.sink {
                            if tx.send(next.clone()).is_ok() {
                                delivered += 1;
                            }
                        }
                        *last = next;
                    }
                }
            }
        }
        if delivered > 0 {
            debug!("broadcast mutation to {delivered} observer(s)");
        }
    }

    /// Removes a subscriber. Nothing is sent to it once this returns.
    pub(crate) fn cancel(&self, id: SubscriberId) {
        if self.lock().detach(id).is_some() {
            debug!("observer {id} cancelled");
        }
    }

    /// Number of distinct queries being observed.
    pub(crate) fn query_count(&self) -> usize {
        self.lock().entries.len()
    }

    pub(crate) fn subscriber_count(&self) -> usize {
        self.lock().queries.len()
    }
}
