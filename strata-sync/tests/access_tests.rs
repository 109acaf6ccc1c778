mod common;

use common::{FlipAccess, fixture, next, titles};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use strata_query::Query;
use strata_store::mock::{Operation, Track};
use strata_sync::{AccessLevel, ManagerError, ReadContext, RemoteRead, Search, WriteContext};
use strata_types::Identifier;

// ── Before dispatch ──────────────────────────────────────────────

#[tokio::test]
async fn no_access_fails_without_touching_stores() {
    let f = fixture([Track::new(1, "a")], [Track::new(1, "a")]);
    let denied = Arc::new(AccessLevel::NoAccess);

    let read = f
        .manager
        .search(
            Query::all(),
            ReadContext::remote(RemoteRead::new()).with_validator(denied.clone()),
        )
        .await;
    assert!(matches!(read, Err(ManagerError::UserAccessInvalid)));

    let write = f
        .manager
        .set_one(
            Track::new(2, "b"),
            WriteContext::local_and_remote().with_validator(denied),
        )
        .await;
    assert_eq!(write.unwrap_err(), ManagerError::UserAccessInvalid);

    assert_eq!(f.remote.calls(Operation::Search), 0);
    assert_eq!(f.remote.calls(Operation::Set), 0);
    assert_eq!(f.memory.len(), 1);
    assert_eq!(f.manager.subscriber_count(), 0);
}

#[tokio::test]
async fn local_access_narrows_remote_reads() {
    let f = fixture([Track::new(1, "cached")], [Track::new(1, "remote")]);
    let result = f
        .manager
        .get(
            &Identifier::from_remote(1),
            ReadContext::remote(RemoteRead::new()).with_validator(Arc::new(AccessLevel::LocalAccess)),
        )
        .await
        .unwrap();

    assert_eq!(result.entity().unwrap().title, "cached");
    assert_eq!(f.remote.calls(Operation::Get), 0);
}

#[tokio::test]
async fn local_access_narrows_remote_writes() {
    let f = fixture([], []);
    f.manager
        .set_one(
            Track::new(1, "offline edit"),
            WriteContext::local_and_remote().with_validator(Arc::new(AccessLevel::LocalAccess)),
        )
        .await
        .unwrap();

    assert_eq!(f.remote.calls(Operation::Set), 0);
    assert_eq!(f.memory.len(), 1);
}

#[tokio::test]
async fn stable_access_passes() {
    let f = fixture([], [Track::new(1, "a")]);
    let validator = FlipAccess::new(AccessLevel::RemoteAccess, AccessLevel::RemoteAccess);
    let result = f
        .manager
        .get(
            &Identifier::from_remote(1),
            ReadContext::remote(RemoteRead::new()).with_validator(validator.clone()),
        )
        .await
        .unwrap();

    assert_eq!(result.len(), 1);
    assert_eq!(validator.checks(), 2);
}

// ── After completion ─────────────────────────────────────────────

#[tokio::test]
async fn downgrade_during_read_invalidates_result() {
    for after in [AccessLevel::LocalAccess, AccessLevel::NoAccess] {
        let f = fixture([], [Track::new(1, "secret")]);
        let validator = FlipAccess::new(AccessLevel::RemoteAccess, after);
        let Search { once, .. } = f
            .manager
            .search(
                Query::all(),
                ReadContext::remote(RemoteRead::new()).with_validator(validator),
            )
            .await
            .unwrap();

        assert_eq!(once.await.unwrap_err(), ManagerError::UserAccessInvalid);
    }
}

#[tokio::test]
async fn downgrade_during_get_invalidates_result() {
    let f = fixture([Track::new(1, "cached")], []);
    let validator = FlipAccess::new(AccessLevel::RemoteAccess, AccessLevel::NoAccess);
    let err = f
        .manager
        .get(
            &Identifier::from_remote(1),
            ReadContext::local().with_validator(validator),
        )
        .await
        .unwrap_err();
    assert_eq!(err, ManagerError::UserAccessInvalid);
}

#[tokio::test]
async fn upgrade_during_read_also_invalidates() {
    let f = fixture([Track::new(1, "cached")], []);
    let validator = FlipAccess::new(AccessLevel::LocalAccess, AccessLevel::RemoteAccess);
    let err = f
        .manager
        .get(
            &Identifier::from_remote(1),
            ReadContext::local().with_validator(validator),
        )
        .await
        .unwrap_err();
    assert_eq!(err, ManagerError::UserAccessInvalid);
}

#[tokio::test]
async fn downgrade_during_write_still_updates_other_observers() {
    let f = fixture([], []);
    let Search { mut continuous, .. } = f
        .manager
        .search(Query::all(), ReadContext::local())
        .await
        .unwrap();
    next(&mut continuous).await;

    let validator = FlipAccess::new(AccessLevel::RemoteAccess, AccessLevel::NoAccess);
    let err = f
        .manager
        .set_one(
            Track::new(1, "a"),
            WriteContext::local_and_remote().with_validator(validator),
        )
        .await
        .unwrap_err();
    assert_eq!(err, ManagerError::UserAccessInvalid);

    assert_eq!(f.memory.len(), 1);
    assert_eq!(titles(&next(&mut continuous).await), vec!["a"]);
}

#[tokio::test]
async fn downgrade_during_persisting_read_closes_own_stream_only() {
    let f = fixture([], [Track::new(1, "fetched")]);
    let Search {
        continuous: mut bystander,
        ..
    } = f
        .manager
        .search(Query::all(), ReadContext::local())
        .await
        .unwrap();
    next(&mut bystander).await;

    let validator = FlipAccess::new(AccessLevel::RemoteAccess, AccessLevel::NoAccess);
    let Search {
        once,
        mut continuous,
    } = f
        .manager
        .search(
            Query::all(),
            ReadContext::remote(RemoteRead::new()).with_validator(validator),
        )
        .await
        .unwrap();

    assert_eq!(once.await.unwrap_err(), ManagerError::UserAccessInvalid);
    assert!(continuous.next().await.is_none());
    assert_eq!(titles(&next(&mut bystander).await), vec!["fetched"]);
}
