//! Query routing and record type validation

use crate::common::*;
use std::sync::Arc;
use strata_objects::{
    Condition, Error, Index, IndexKind, InMemoryStore, ObjectStoreConfig, RecordType,
};

#[test]
fn query_without_exact_index_is_rejected() {
    let users = users();
    users.create(fields(&[("name", "a"), ("country", "fr")])).unwrap();

    // (country, city) is indexed, country alone is not
    match users.find(&Condition::new().is("country", "fr")) {
        Err(Error::NoMatchingIndex { fields }) => assert_eq!(fields, vec!["country"]),
        other => panic!("expected NoMatchingIndex, got {:?}", other),
    }

    let err = users
        .find(&Condition::new().is("name", "a").is("email", "x"))
        .unwrap_err();
    assert!(matches!(err, Error::NoMatchingIndex { .. }));
}

#[test]
fn conditions_route_to_their_index_kind() {
    let users = users();
    let spec = users.key_spec();
    let kind = |cond: Condition| spec.resolve_for_query(&cond).unwrap().kind();

    assert_eq!(kind(Condition::new().is("name", "a")), IndexKind::Unique);
    assert_eq!(kind(Condition::new().is("email", "a")), IndexKind::Unordered);
    assert_eq!(
        kind(Condition::new().between("score", 0.0, 1.0)),
        IndexKind::OrderedNumeric
    );
    assert_eq!(
        kind(Condition::new().is("city", "x").is("country", "y")),
        IndexKind::Unordered
    );

    let tracks = tracks();
    let fulltext = tracks
        .key_spec()
        .resolve_for_query(&Condition::new().is("search", "x"))
        .unwrap();
    assert_eq!(fulltext.kind(), IndexKind::FullText);
}

#[test]
fn index_over_unknown_field_is_rejected() {
    let err = RecordType::builder("users", Arc::new(InMemoryStore::new()))
        .fields(["name"])
        .index(Index::unordered("users", ["email"]))
        .build()
        .unwrap_err();
    assert!(matches!(err, Error::InvalidKeySpec(_)));
}

#[test]
fn two_indexes_for_the_same_fields_are_rejected() {
    let err = RecordType::builder("users", Arc::new(InMemoryStore::new()))
        .fields(["name"])
        .index(Index::unique("users", ["name"]))
        .index(Index::unordered("users", ["name"]))
        .build()
        .unwrap_err();
    assert!(matches!(err, Error::InvalidKeySpec(_)));
}

#[test]
fn reserved_id_field_is_rejected() {
    let err = RecordType::builder("users", Arc::new(InMemoryStore::new()))
        .fields(["id", "name"])
        .build()
        .unwrap_err();
    assert!(matches!(err, Error::InvalidKeySpec(_)));
}

#[test]
fn invalid_config_is_rejected() {
    let config = ObjectStoreConfig {
        id_batch_size: 0,
        ..ObjectStoreConfig::default()
    };
    let err = RecordType::builder("users", Arc::new(InMemoryStore::new()))
        .fields(["name"])
        .config(config)
        .build()
        .unwrap_err();
    assert!(matches!(err, Error::Config(_)));
}

#[test]
fn record_type_without_indexes_still_stores_records() {
    let notes = RecordType::builder("notes", Arc::new(InMemoryStore::new()))
        .field("body")
        .build()
        .unwrap();
    notes.create(fields(&[("body", "hello")])).unwrap();
    assert_eq!(notes.all(0, 10, &[]).unwrap().len(), 1);
    assert!(matches!(
        notes.find(&Condition::new().is("body", "hello")),
        Err(Error::NoMatchingIndex { .. })
    ));
}
