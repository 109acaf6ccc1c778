use pretty_assertions::assert_eq;
use strata_query::{Filter, Query, ResultScope};
use strata_store::mock::Track;
use strata_store::{SqliteStore, Store, StoreContext, StoreLevel};
use strata_types::{Identifier, Lazy, LocalId};
use tempfile::TempDir;

fn ctx() -> StoreContext {
    StoreContext::default()
}

fn open_store() -> SqliteStore<Track> {
    SqliteStore::open_in_memory().unwrap()
}

// ── Basic CRUD ───────────────────────────────────────────────────

#[tokio::test]
async fn level_is_disk() {
    assert_eq!(open_store().level(), StoreLevel::Disk);
}

#[tokio::test]
async fn set_and_get_round_trips_body() {
    let store = open_store();
    let track = Track::new(1, "Blue in Green")
        .genre("jazz")
        .plays(12)
        .artwork(Lazy::Requested("cover.png".into()));
    store.set(vec![track.clone()], &ctx()).await.unwrap();

    let got = store.get(&Identifier::from_remote(1), &ctx()).await.unwrap();
    assert_eq!(got, Some(track));
}

#[tokio::test]
async fn get_missing_returns_none() {
    let store = open_store();
    let got = store.get(&Identifier::from_remote(404), &ctx()).await.unwrap();
    assert!(got.is_none());
}

#[tokio::test]
async fn upsert_replaces_in_place() {
    let store = open_store();
    store
        .set(vec![Track::new(1, "a"), Track::new(2, "b")], &ctx())
        .await
        .unwrap();
    store.set(vec![Track::new(1, "a2")], &ctx()).await.unwrap();

    let all = store.search(&Query::all(), &ctx()).await.unwrap();
    let titles: Vec<_> = all.iter().map(|t| t.title.clone()).collect();
    assert_eq!(titles, vec!["a2", "b"]);
    assert_eq!(all.scope(), ResultScope::Complete);
}

// ── Aliasing ─────────────────────────────────────────────────────

#[tokio::test]
async fn confirmation_moves_record_to_remote_key() {
    let store = open_store();
    let local = LocalId::new();
    store
        .set(vec![Track::with_identifier(Identifier::Local(local), "draft")], &ctx())
        .await
        .unwrap();
    store
        .set(
            vec![Track::with_identifier(Identifier::confirmed(30, local), "saved")],
            &ctx(),
        )
        .await
        .unwrap();

    let all = store.search(&Query::all(), &ctx()).await.unwrap();
    assert_eq!(all.len(), 1);
    let by_local = store.get(&Identifier::Local(local), &ctx()).await.unwrap();
    assert_eq!(by_local.unwrap().title, "saved");
}

#[tokio::test]
async fn local_write_after_confirmation_stays_under_remote_key() {
    let store = open_store();
    let local = LocalId::new();
    store
        .set(
            vec![Track::with_identifier(Identifier::confirmed(31, local), "saved")],
            &ctx(),
        )
        .await
        .unwrap();
    store
        .set(vec![Track::with_identifier(Identifier::Local(local), "edit")], &ctx())
        .await
        .unwrap();

    let all = store.search(&Query::all(), &ctx()).await.unwrap();
    assert_eq!(all.len(), 1);
    let by_remote = store.get(&Identifier::from_remote(31), &ctx()).await.unwrap();
    assert_eq!(by_remote.unwrap().title, "edit");
}

// ── Removal ──────────────────────────────────────────────────────

#[tokio::test]
async fn remove_and_remove_all() {
    let store = open_store();
    store
        .set(
            vec![
                Track::new(1, "a").genre("jazz"),
                Track::new(2, "b").genre("rock"),
                Track::new(3, "c").genre("jazz"),
                Track::new(4, "d"),
            ],
            &ctx(),
        )
        .await
        .unwrap();

    store.remove(&[Identifier::from_remote(4)], &ctx()).await.unwrap();
    let removed = store
        .remove_all(&Query::filtered(Filter::equals("genre", "jazz")), &ctx())
        .await
        .unwrap();
    assert_eq!(
        removed,
        vec![Identifier::from_remote(1), Identifier::from_remote(3)]
    );

    let left = store.search(&Query::all(), &ctx()).await.unwrap();
    assert_eq!(left.identifiers(), vec![Identifier::from_remote(2)]);
}

// ── Durability ───────────────────────────────────────────────────

#[tokio::test]
async fn records_survive_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("cache.db");

    {
        let store: SqliteStore<Track> = SqliteStore::open(&path).unwrap();
        store
            .set(vec![Track::new(7, "persisted").plays(3)], &ctx())
            .await
            .unwrap();
    }

    let store: SqliteStore<Track> = SqliteStore::open(&path).unwrap();
    let got = store.get(&Identifier::from_remote(7), &ctx()).await.unwrap();
    assert_eq!(got.unwrap().plays, 3);
}
