//! Unique index claims across records

use crate::common::*;
use strata_objects::{Condition, Error, Record, RecordId};

#[test]
fn resave_then_conflicting_record() {
    let users = users();

    let mut alice = Record::new().with("name", "alice");
    assert_eq!(users.save(&mut alice).unwrap(), RecordId::new(1));

    // Saving the same record again keeps its claim
    assert_eq!(users.save(&mut alice).unwrap(), RecordId::new(1));

    let mut impostor = Record::new().with("name", "alice");
    match users.save(&mut impostor) {
        Err(Error::DuplicateKey { index, value, owner }) => {
            assert_eq!(index, "uk:users:name");
            assert_eq!(value, "alice");
            assert_eq!(owner, "1");
        }
        other => panic!("expected DuplicateKey, got {:?}", other),
    }
}

#[test]
fn rejected_record_is_not_stored() {
    let users = users();
    users.create(fields(&[("name", "alice")])).unwrap();
    let err = users
        .create(fields(&[("name", "alice"), ("email", "other@example.com")]))
        .unwrap_err();
    assert!(matches!(err, Error::DuplicateKey { .. }));

    assert_eq!(users.all(0, 10, &[]).unwrap().len(), 1);
    assert!(users
        .find(&Condition::new().is("email", "other@example.com"))
        .unwrap()
        .is_empty());
}

#[test]
fn renaming_releases_the_old_value() {
    let users = users();
    let mut alice = users.create(fields(&[("name", "alice")])).unwrap();
    users.update(&mut alice, fields(&[("name", "alicia")])).unwrap();

    assert!(users
        .find(&Condition::new().is("name", "alice"))
        .unwrap()
        .is_empty());
    assert_eq!(
        raw_ids(&users.find(&Condition::new().is("name", "alicia")).unwrap()),
        vec![1]
    );

    // The old name is free again
    let other = users.create(fields(&[("name", "alice")])).unwrap();
    assert_eq!(other.id(), Some(RecordId::new(2)));
}

#[test]
fn update_to_taken_value_fails_and_keeps_record() {
    let users = users();
    users.create(fields(&[("name", "alice")])).unwrap();
    let mut bob = users.create(fields(&[("name", "bob")])).unwrap();

    let err = users.update(&mut bob, fields(&[("name", "alice")])).unwrap_err();
    assert!(matches!(err, Error::DuplicateKey { .. }));
    assert_eq!(bob.get("name"), Some(&strata_objects::Value::from("bob")));
    assert_eq!(
        raw_ids(&users.find(&Condition::new().is("name", "bob")).unwrap()),
        vec![2]
    );
}

#[test]
fn record_without_unique_field_is_not_indexed() {
    let users = users();
    users.create(fields(&[("email", "anon@example.com")])).unwrap();
    users.create(fields(&[("email", "anon2@example.com")])).unwrap();
    assert_eq!(users.all(0, 10, &[]).unwrap().len(), 2);
}
