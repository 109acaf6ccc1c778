//! At most one in-flight remote fetch per request and endpoint.

use futures::future::{BoxFuture, FutureExt, Shared};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use strata_query::QueryResult;
use strata_store::{Endpoint, StoreResult};
use tracing::debug;

use crate::stack::Request;

type SharedFetch<E> = Shared<BoxFuture<'static, StoreResult<QueryResult<E>>>>;

/// Identity of a remote fetch.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct Fingerprint {
    request: Request,
    endpoint: Endpoint,
}

/// Shares in-flight remote fetches between identical concurrent reads.
pub(crate) struct Coalescer<E> {
    in_flight: Mutex<HashMap<Fingerprint, SharedFetch<E>>>,
}

impl<E: Clone + Send + Sync + 'static> Coalescer<E> {
    pub(crate) fn new() -> Self {
        Self {
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<Fingerprint, SharedFetch<E>>> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Awaits the in-flight fetch for this request, or starts one with
    /// `start` if there is none. Every waiter gets the same outcome.
    pub(crate) async fn fetch<F>(
        &self,
        request: &Request,
        endpoint: &Endpoint,
        start: F,
    ) -> StoreResult<QueryResult<E>>
    where
        F: FnOnce() -> BoxFuture<'static, StoreResult<QueryResult<E>>>,
    {
        let fingerprint = Fingerprint {
            request: request.clone(),
            endpoint: endpoint.clone(),
        };
        let fetch = {
            let mut in_flight = self.lock();
            match in_flight.get(&fingerprint) {
                Some(existing) => {
                    debug!("joining in-flight remote fetch");
                    existing.clone()
                }
                None => {
                    let fetch = start().shared();
                    in_flight.insert(fingerprint.clone(), fetch.clone());
                    fetch
                }
            }
        };

        let outcome = fetch.clone().await;

        let mut in_flight = self.lock();
        if in_flight
            .get(&fingerprint)
            .is_some_and(|current| current.ptr_eq(&fetch))
        {
            in_flight.remove(&fingerprint);
        }
        outcome
    }
}
