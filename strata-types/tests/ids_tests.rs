use strata_types::{Identifier, IdentifierKey, LocalId, RemoteId};
use std::collections::HashSet;
use std::str::FromStr;

// ── LocalId ──────────────────────────────────────────────────────

#[test]
fn local_id_new_is_unique() {
    let a = LocalId::new();
    let b = LocalId::new();
    assert_ne!(a, b);
}

#[test]
fn local_id_wraps_uuid() {
    let uuid = uuid::Uuid::now_v7();
    let id = LocalId::from(uuid);
    assert_eq!(id.uuid(), uuid);
}

#[test]
fn local_id_display_and_parse() {
    let id = LocalId::new();
    let parsed = LocalId::parse(&id.to_string()).unwrap();
    assert_eq!(id, parsed);
}

#[test]
fn local_id_parse_invalid() {
    assert!(matches!(
        LocalId::parse("not-a-uuid"),
        Err(strata_types::Error::InvalidUuid(_))
    ));
}

// ── RemoteId ─────────────────────────────────────────────────────

#[test]
fn remote_id_conversions() {
    assert_eq!(RemoteId::from(42), RemoteId::Int(42));
    assert_eq!(RemoteId::from("abc"), RemoteId::Text("abc".into()));
    assert_eq!(RemoteId::from(String::from("x")).to_string(), "x");
}

#[test]
fn remote_int_orders_before_text() {
    assert!(RemoteId::Int(1_000) < RemoteId::Text("0".into()));
    assert!(RemoteId::Int(2) < RemoteId::Int(10));
}

// ── Identifier ───────────────────────────────────────────────────

#[test]
fn local_identifier_accessors() {
    let local = LocalId::new();
    let id = Identifier::from(local);
    assert!(id.is_local_only());
    assert_eq!(id.local_id(), Some(local));
    assert_eq!(id.remote_id(), None);
    assert_eq!(id.key(), IdentifierKey::Local(local));
}

#[test]
fn confirmed_identifier_keys_by_remote() {
    let local = LocalId::new();
    let id = Identifier::confirmed(42, local);
    assert!(!id.is_local_only());
    assert_eq!(id.local_id(), Some(local));
    assert_eq!(id.remote_id(), Some(&RemoteId::Int(42)));
    assert_eq!(id.key(), IdentifierKey::Remote(RemoteId::Int(42)));
}

#[test]
fn matches_local_and_confirmed_forms() {
    let local = LocalId::new();
    let transient = Identifier::Local(local);
    let confirmed = Identifier::confirmed(7, local);

    assert!(transient.matches(&confirmed));
    assert!(confirmed.matches(&transient));
    assert_ne!(transient, confirmed);
}

#[test]
fn matches_remote_ignores_alias() {
    let a = Identifier::confirmed(7, LocalId::new());
    let b = Identifier::from_remote(7);
    assert!(a.matches(&b));
}

#[test]
fn different_remote_keys_never_match() {
    let local = LocalId::new();
    let a = Identifier::confirmed(1, local);
    let b = Identifier::confirmed(2, local);
    assert!(!a.matches(&b));
}

#[test]
fn remote_without_alias_does_not_match_local() {
    let a = Identifier::from_remote(1);
    let b = Identifier::new_local();
    assert!(!a.matches(&b));
}

#[test]
fn order_cmp_puts_remote_first() {
    let remote = Identifier::from_remote(99);
    let local = Identifier::new_local();
    assert!(remote.order_cmp(&local).is_lt());
    assert!(Identifier::from_remote(1)
        .order_cmp(&Identifier::from_remote(2))
        .is_lt());
}

#[test]
fn identifier_display_parse() {
    let local = LocalId::new();
    for id in [
        Identifier::Local(local),
        Identifier::from_remote(5),
        Identifier::from_remote("abc-def"),
        Identifier::confirmed(12, local),
    ] {
        let parsed = Identifier::from_str(&id.to_string()).unwrap();
        assert_eq!(parsed, id);
    }
}

#[test]
fn identifier_parse_rejects_garbage() {
    assert!(Identifier::from_str("nope").is_err());
    assert!(Identifier::from_str("remote:").is_err());
    assert!(Identifier::from_str("local:xyz").is_err());
}

#[test]
fn identifiers_usable_in_hash_set() {
    let mut set = HashSet::new();
    let id = Identifier::from_remote(3);
    set.insert(id.clone());
    set.insert(id.clone());
    assert_eq!(set.len(), 1);
}

#[test]
fn identifier_serde_shape() {
    let id = Identifier::from_remote(5);
    let json = serde_json::to_value(&id).unwrap();
    assert_eq!(json, serde_json::json!({"remote": {"id": 5}}));
}
