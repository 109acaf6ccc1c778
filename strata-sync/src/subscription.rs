//! Caller-side handles for observed reads.

use futures::Stream;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use strata_query::QueryResult;
use strata_types::Entity;
use tokio::sync::{mpsc, oneshot};

use crate::error::{ManagerError, ManagerResult};
use crate::registry::{ObserverRegistry, SubscriberId};

/// The single terminal outcome of a read. Resolves like a future.
///
/// Dropping it before it resolves cancels the delivery.
pub struct OnceResult<E: Entity> {
    id: SubscriberId,
    receiver: oneshot::Receiver<ManagerResult<QueryResult<E>>>,
    registry: Arc<ObserverRegistry<E>>,
}

impl<E: Entity> OnceResult<E> {
    pub(crate) fn new(
        id: SubscriberId,
        receiver: oneshot::Receiver<ManagerResult<QueryResult<E>>>,
        registry: Arc<ObserverRegistry<E>>,
    ) -> Self {
        Self {
            id,
            receiver,
            registry,
        }
    }
}

impl<E: Entity> Future for OnceResult<E> {
    type Output = ManagerResult<QueryResult<E>>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.get_mut().receiver)
            .poll(cx)
            .map(|received| received.unwrap_or(Err(ManagerError::Cancelled)))
    }
}

impl<E: Entity> Drop for OnceResult<E> {
    fn drop(&mut self) {
        self.registry.cancel(self.id);
    }
}

/// A continuous stream of results for one observed query.
///
/// The first item is the initial result; each later item follows a
/// committed change that altered the result. Dropping the subscription
/// cancels it.
pub struct Subscription<E: Entity> {
    id: SubscriberId,
    receiver: mpsc::UnboundedReceiver<QueryResult<E>>,
    registry: Arc<ObserverRegistry<E>>,
}

impl<E: Entity> Subscription<E> {
    pub(crate) fn new(
        id: SubscriberId,
        receiver: mpsc::UnboundedReceiver<QueryResult<E>>,
        registry: Arc<ObserverRegistry<E>>,
    ) -> Self {
        Self {
            id,
            receiver,
            registry,
        }
    }

    /// Waits for the next delivery.
    pub async fn next(&mut self) -> Option<QueryResult<E>> {
        self.receiver.recv().await
    }

    /// A delivery that has already arrived, without waiting.
    pub fn try_next(&mut self) -> Option<QueryResult<E>> {
        self.receiver.try_recv().ok()
    }

    /// Stops deliveries. Nothing further is sent once this returns.
    pub fn cancel(self) {
        drop(self);
    }
}

impl<E: Entity> Stream for Subscription<E> {
    type Item = QueryResult<E>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().receiver.poll_recv(cx)
    }
}

impl<E: Entity> Drop for Subscription<E> {
    fn drop(&mut self) {
        self.registry.cancel(self.id);
        self.receiver.close();
    }
}

/// Both deliveries of an observed read.
pub struct Search<E: Entity> {
    /// The terminal answer for this request.
    pub once: OnceResult<E>,
    /// The initial answer, then every change to it.
    pub continuous: Subscription<E>,
}
