//! Shared fixtures for cache manager tests.

#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use strata_query::QueryResult;
use strata_store::mock::{MockStore, Track};
use strata_store::{MemoryStore, StoreLevel, Tier};
use strata_sync::{AccessLevel, AccessValidator, CacheManager, ManagerConfig, StoreStack, Subscription};

/// Routes manager logs to the test output. Honors `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A memory tier and a scripted remote tier behind one manager.
pub struct Fixture {
    pub memory: Arc<MemoryStore<Track>>,
    pub remote: Arc<MockStore<Track>>,
    pub manager: CacheManager<Track>,
}

pub fn fixture(
    local: impl IntoIterator<Item = Track>,
    remote: impl IntoIterator<Item = Track>,
) -> Fixture {
    fixture_with(local, remote, ManagerConfig::default())
}

pub fn fixture_with(
    local: impl IntoIterator<Item = Track>,
    remote: impl IntoIterator<Item = Track>,
    config: ManagerConfig,
) -> Fixture {
    init_tracing();
    let memory = Arc::new(MemoryStore::with_entities(local));
    let remote = Arc::new(MockStore::remote(remote));
    let stack = StoreStack::new([Tier::Memory(memory.clone()), Tier::Remote(remote.clone())]);
    Fixture {
        memory,
        remote,
        manager: CacheManager::new(stack, config),
    }
}

/// A manager over a single memory tier.
pub fn local_only(local: impl IntoIterator<Item = Track>) -> (Arc<MemoryStore<Track>>, CacheManager<Track>) {
    init_tracing();
    let memory = Arc::new(MemoryStore::with_entities(local));
    let stack = StoreStack::new([Tier::Memory(memory.clone())]);
    (memory, CacheManager::new(stack, ManagerConfig::default()))
}

/// A scripted local tier in front of a memory tier.
pub fn mock_local() -> MockStore<Track> {
    MockStore::new(StoreLevel::Memory)
}

/// Waits for the next delivery, failing the test after a second.
pub async fn next(subscription: &mut Subscription<Track>) -> QueryResult<Track> {
    tokio::time::timeout(Duration::from_secs(1), subscription.next())
        .await
        .expect("no delivery within a second")
        .expect("subscription closed")
}

/// Lets spawned work run to completion.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(30)).await;
}

pub fn titles(result: &QueryResult<Track>) -> Vec<String> {
    result.iter().map(|t| t.title.clone()).collect()
}

pub fn ids(result: &QueryResult<Track>) -> Vec<i64> {
    result
        .iter()
        .filter_map(|t| match t.id.remote_id() {
            Some(strata_types::RemoteId::Int(id)) => Some(*id),
            _ => None,
        })
        .collect()
}

/// Reports `before` on the first check and `after` on every later one.
pub struct FlipAccess {
    before: AccessLevel,
    after: AccessLevel,
    checks: AtomicUsize,
}

impl FlipAccess {
    pub fn new(before: AccessLevel, after: AccessLevel) -> Arc<Self> {
        Arc::new(Self {
            before,
            after,
            checks: AtomicUsize::new(0),
        })
    }

    pub fn checks(&self) -> usize {
        self.checks.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AccessValidator for FlipAccess {
    async fn current_access_level(&self) -> AccessLevel {
        match self.checks.fetch_add(1, Ordering::SeqCst) {
            0 => self.before,
            _ => self.after,
        }
    }
}
