//! Record removal

use crate::common::*;
use strata_objects::{Condition, Error, Record};

#[test]
fn deleted_record_disappears_from_every_index() {
    let users = users();
    let alice = users
        .create(fields(&[
            ("name", strata_objects::Value::from("alice")),
            ("email", "a@example.com".into()),
            ("score", 7.into()),
        ]))
        .unwrap();

    assert!(users.delete(&alice).unwrap());

    assert!(users.find(&Condition::new().is("name", "alice")).unwrap().is_empty());
    assert!(users
        .find(&Condition::new().is("email", "a@example.com"))
        .unwrap()
        .is_empty());
    assert!(users
        .find(&Condition::new().between("score", 0.0, 10.0))
        .unwrap()
        .is_empty());
    assert!(users.all(0, 10, &[]).unwrap().is_empty());
    assert!(users.load_by_ids(&[alice.id().unwrap()], &[]).unwrap().is_empty());
}

#[test]
fn delete_frees_the_unique_value() {
    let users = users();
    let alice = users.create(fields(&[("name", "alice")])).unwrap();
    users.delete(&alice).unwrap();
    let again = users.create(fields(&[("name", "alice")])).unwrap();
    assert_eq!(
        users.find(&Condition::new().is("name", "alice")).unwrap(),
        vec![again.id().unwrap()]
    );
}

#[test]
fn second_delete_reports_nothing_removed() {
    let users = users();
    let alice = users.create(fields(&[("name", "alice")])).unwrap();
    assert!(users.delete(&alice).unwrap());
    assert!(!users.delete(&alice).unwrap());
}

#[test]
fn deleting_unsaved_record_is_invalid_state() {
    let users = users();
    let err = users.delete(&Record::new().with("name", "x")).unwrap_err();
    assert!(matches!(err, Error::InvalidState(_)));
}

#[test]
fn deleted_track_leaves_search() {
    let tracks = tracks();
    let doomed = tracks
        .create(fields(&[("title", "Gigantic"), ("artist", "The Pixies")]))
        .unwrap();
    tracks
        .create(fields(&[("title", "Hey"), ("artist", "The Pixies")]))
        .unwrap();

    tracks.delete(&doomed).unwrap();
    let ids = tracks.find(&Condition::new().is("search", "pixies")).unwrap();
    assert_eq!(raw_ids(&ids), vec![2]);
    assert!(tracks
        .find(&Condition::new().is("search", "gigantic"))
        .unwrap()
        .is_empty());
}
