//! Partial updates touch only the indexes reading changed fields

use crate::common::*;
use std::sync::Arc;
use strata_objects::{Condition, Error, InMemoryStore, Record, Value};

#[test]
fn email_change_leaves_other_indexes_alone() {
    let store = Arc::new(InMemoryStore::new());
    let users = users_on(store.clone());
    let mut alice = users
        .create(fields(&[
            ("name", Value::from("alice")),
            ("email", "old@example.com".into()),
            ("score", 5.into()),
        ]))
        .unwrap();

    users
        .update(&mut alice, fields(&[("email", "new@example.com")]))
        .unwrap();

    assert!(users
        .find(&Condition::new().is("email", "old@example.com"))
        .unwrap()
        .is_empty());
    assert_eq!(
        raw_ids(&users.find(&Condition::new().is("email", "new@example.com")).unwrap()),
        vec![1]
    );
    assert_eq!(
        raw_ids(&users.find(&Condition::new().is("name", "alice")).unwrap()),
        vec![1]
    );
    assert_eq!(
        raw_ids(&users.find(&Condition::new().between("score", 5.0, 5.0)).unwrap()),
        vec![1]
    );
    assert_eq!(alice.get("email"), Some(&Value::from("new@example.com")));
    assert_eq!(alice.get("name"), Some(&Value::from("alice")));
}

#[test]
fn update_of_unsaved_record_is_invalid_state() {
    let users = users();
    let mut draft = Record::new().with("name", "x");
    let err = users.update(&mut draft, fields(&[("email", "y")])).unwrap_err();
    assert!(matches!(err, Error::InvalidState(_)));
}

#[test]
fn update_with_unknown_field_is_rejected() {
    let users = users();
    let mut alice = users.create(fields(&[("name", "alice")])).unwrap();
    let err = users.update(&mut alice, fields(&[("age", 3)])).unwrap_err();
    assert!(matches!(err, Error::UnknownField(f) if f == "age"));
    assert_eq!(alice.get("age"), None);
}

#[test]
fn resave_keeps_fields_missing_from_the_record() {
    let users = users();
    let alice = users
        .create(fields(&[("name", "alice"), ("email", "a@example.com")]))
        .unwrap();

    // A projection holds only some fields; saving it must not drop the rest
    let mut partial = users.load_by_ids(&[alice.id().unwrap()], &["name"]).unwrap().remove(0);
    partial.set("score", 9);
    users.save(&mut partial).unwrap();

    let stored = users.load_by_ids(&[alice.id().unwrap()], &[]).unwrap().remove(0);
    assert_eq!(stored.get("email"), Some(&Value::from("a@example.com")));
    assert_eq!(stored.get("score"), Some(&Value::Int(9)));
    assert_eq!(
        raw_ids(&users.find(&Condition::new().is("email", "a@example.com")).unwrap()),
        vec![1]
    );
}

#[test]
fn update_where_rewrites_matching_records_and_indexes() {
    let users = users();
    for (name, city) in [("a", "paris"), ("b", "lyon"), ("c", "paris")] {
        users
            .create(fields(&[("name", name), ("country", "fr"), ("city", city)]))
            .unwrap();
    }

    let changed = users
        .update_where(
            &Condition::new().is("country", "fr").is("city", "paris"),
            &fields(&[("city", "nice")]),
        )
        .unwrap();
    assert_eq!(changed, 2);

    let paris = Condition::new().is("country", "fr").is("city", "paris");
    let nice = Condition::new().is("country", "fr").is("city", "nice");
    assert!(users.find(&paris).unwrap().is_empty());
    assert_eq!(raw_ids(&users.find(&nice).unwrap()), vec![1, 3]);
}

#[test]
fn update_where_without_matches_changes_nothing() {
    let users = users();
    users.create(fields(&[("name", "a"), ("email", "a@x")])).unwrap();
    let changed = users
        .update_where(&Condition::new().is("email", "nobody@x"), &fields(&[("score", 1)]))
        .unwrap();
    assert_eq!(changed, 0);
}
