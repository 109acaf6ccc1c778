mod common;

use common::{fixture, fixture_with, mock_local, next, titles};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use strata_query::{Filter, Query};
use strata_store::mock::{Operation, Track};
use strata_store::{MemoryStore, StoreError, Tier};
use strata_sync::{
    CacheManager, ManagerConfig, ManagerError, ReadContext, Search, StoreStack, WriteContext,
    WriteMode,
};
use strata_types::{Identifier, Lazy, LocalId};

// ── Set ──────────────────────────────────────────────────────────

#[tokio::test]
async fn local_write_stays_local() {
    let f = fixture([], []);
    let written = f
        .manager
        .set(vec![Track::new(1, "a"), Track::new(2, "b")], WriteContext::local())
        .await
        .unwrap();

    assert_eq!(written.len(), 2);
    assert_eq!(f.memory.len(), 2);
    assert_eq!(f.remote.calls(Operation::Set), 0);
}

#[tokio::test]
async fn remote_write_skips_local_tiers() {
    let f = fixture([], []);
    f.manager
        .set_one(Track::new(1, "a"), WriteContext::remote())
        .await
        .unwrap();

    assert!(f.memory.is_empty());
    assert_eq!(f.remote.snapshot().len(), 1);
}

#[tokio::test]
async fn server_version_is_what_gets_stored_and_returned() {
    let f = fixture([], []);
    f.remote.transform_set(|t| t.plays(99).genre("assigned"));

    let stored = f
        .manager
        .set_one(Track::new(1, "a"), WriteContext::local_and_remote())
        .await
        .unwrap();

    assert_eq!(stored.plays, 99);
    assert_eq!(stored.genre.as_deref(), Some("assigned"));
    let local = f.memory.lookup(&Identifier::from_remote(1)).unwrap();
    assert_eq!(local.plays, 99);
}

#[tokio::test]
async fn server_confirmation_replaces_local_draft() {
    let f = fixture([], []);
    let local_id = LocalId::new();
    let draft = Track::with_identifier(Identifier::Local(local_id), "draft");
    f.manager
        .set_one(draft.clone(), WriteContext::local())
        .await
        .unwrap();

    f.remote
        .transform_set(move |t| Track { id: Identifier::confirmed(500, local_id), ..t });
    let confirmed = f
        .manager
        .set_one(draft, WriteContext::local_and_remote())
        .await
        .unwrap();

    assert_eq!(confirmed.id, Identifier::confirmed(500, local_id));
    assert_eq!(f.memory.len(), 1);
    assert!(f.memory.lookup(&Identifier::Local(local_id)).is_some());
    assert!(f.memory.lookup(&Identifier::from_remote(500)).is_some());
}

#[tokio::test]
async fn server_version_keeps_local_lazy_values() {
    let f = fixture(
        [Track::new(1, "a").artwork(Lazy::Requested("art.jpg".into()))],
        [],
    );
    f.remote
        .transform_set(|t| t.artwork(Lazy::Unrequested));

    let stored = f
        .manager
        .set_one(
            Track::new(1, "renamed").artwork(Lazy::Requested("art.jpg".into())),
            WriteContext::local_and_remote(),
        )
        .await
        .unwrap();

    assert_eq!(stored.title, "renamed");
    assert_eq!(stored.artwork, Lazy::Requested("art.jpg".into()));
}

#[tokio::test]
async fn failed_remote_write_leaves_local_untouched() {
    let f = fixture([Track::new(1, "original")], []);
    f.remote.fail(Operation::Set, StoreError::Network("timeout".into()));

    let err = f
        .manager
        .set_one(Track::new(1, "changed"), WriteContext::local_and_remote())
        .await
        .unwrap_err();

    assert_eq!(err, ManagerError::Store(StoreError::Network("timeout".into())));
    assert_eq!(
        f.memory.lookup(&Identifier::from_remote(1)).unwrap().title,
        "original"
    );
}

#[tokio::test]
async fn failed_local_write_propagates() {
    let local = Arc::new(mock_local());
    local.fail(Operation::Set, StoreError::Persistence("read-only".into()));
    let manager = CacheManager::new(
        StoreStack::new([Tier::Memory(local)]),
        ManagerConfig::default(),
    );

    let err = manager
        .set_one(Track::new(1, "a"), WriteContext::local())
        .await
        .unwrap_err();
    assert_eq!(err, ManagerError::Store(StoreError::Persistence("read-only".into())));
}

#[tokio::test]
async fn parallel_writes_reach_every_local_tier() {
    let memory = Arc::new(MemoryStore::<Track>::new());
    let disk = Arc::new(MemoryStore::<Track>::new());
    let stack = StoreStack::new([Tier::Memory(memory.clone()), Tier::Disk(disk.clone())]);
    let config = ManagerConfig {
        write_mode: WriteMode::Parallel,
        ..Default::default()
    };
    let manager = CacheManager::new(stack, config);

    manager
        .set(vec![Track::new(1, "a"), Track::new(2, "b")], WriteContext::local())
        .await
        .unwrap();
    manager
        .remove_one(Identifier::from_remote(1), WriteContext::local())
        .await
        .unwrap();

    assert_eq!(memory.len(), 1);
    assert_eq!(disk.len(), 1);
}

#[tokio::test]
async fn sequential_writes_reach_every_local_tier() {
    let memory = Arc::new(MemoryStore::<Track>::new());
    let disk = Arc::new(MemoryStore::<Track>::new());
    let stack = StoreStack::new([Tier::Memory(memory.clone()), Tier::Disk(disk.clone())]);
    let manager = CacheManager::new(stack, ManagerConfig::default());

    manager
        .set_one(Track::new(1, "a"), WriteContext::local())
        .await
        .unwrap();

    assert_eq!(memory.len(), 1);
    assert_eq!(disk.len(), 1);
}

// ── Remove ───────────────────────────────────────────────────────

#[tokio::test]
async fn remove_from_both_targets() {
    let f = fixture([Track::new(1, "a"), Track::new(2, "b")], [Track::new(1, "a")]);
    f.manager
        .remove(vec![Identifier::from_remote(1)], WriteContext::local_and_remote())
        .await
        .unwrap();

    assert_eq!(f.memory.len(), 1);
    assert!(f.remote.snapshot().is_empty());
}

#[tokio::test]
async fn remove_all_returns_union_of_tiers() {
    let f = fixture(
        [
            Track::new(1, "a").genre("jazz"),
            Track::new(2, "b").genre("jazz"),
            Track::new(3, "c").genre("rock"),
        ],
        [Track::new(1, "a").genre("jazz"), Track::new(4, "d").genre("jazz")],
    );
    let removed = f
        .manager
        .remove_all(
            Query::filtered(Filter::equals("genre", "jazz")),
            WriteContext::local_and_remote(),
        )
        .await
        .unwrap();

    assert_eq!(
        removed,
        vec![
            Identifier::from_remote(1),
            Identifier::from_remote(4),
            Identifier::from_remote(2),
        ]
    );
    assert_eq!(f.memory.len(), 1);
}

#[tokio::test]
async fn remove_all_broadcasts_removals() {
    let f = fixture_with(
        [Track::new(1, "a").genre("jazz"), Track::new(2, "b")],
        [],
        ManagerConfig::default(),
    );
    let Search { mut continuous, .. } = f
        .manager
        .search(Query::all(), ReadContext::local())
        .await
        .unwrap();
    assert_eq!(titles(&next(&mut continuous).await), vec!["a", "b"]);

    f.manager
        .remove_all(
            Query::filtered(Filter::equals("genre", "jazz")),
            WriteContext::local(),
        )
        .await
        .unwrap();
    assert_eq!(titles(&next(&mut continuous).await), vec!["b"]);
}
