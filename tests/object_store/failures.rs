//! Store failures in the middle of record writes
//!
//! `FaultyStore::fail_after(n)` lets `n` commands through and fails the
//! next. Command counts below follow the write path: one `INCRBY` per id
//! batch, two commands per unique claim, then the write batch.

use crate::common::*;
use std::sync::Arc;
use strata_objects::testing::FaultyStore;
use strata_objects::{Condition, InMemoryStore, ObjectStoreConfig, Record, Value};

fn faulty() -> Arc<FaultyStore<InMemoryStore>> {
    Arc::new(FaultyStore::new(InMemoryStore::new()))
}

// ============================================================================
// Transactional writes
// ============================================================================

#[test]
fn failed_update_leaves_record_and_store_unchanged() {
    let store = faulty();
    let users = users_on(store.clone());
    let mut alice = users
        .create(fields(&[("name", "alice"), ("email", "old@example.com")]))
        .unwrap();
    let before = alice.clone();

    // HGETALL of the stored hash passes, the write batch fails
    store.fail_after(1);
    let err = users
        .update(&mut alice, fields(&[("email", "new@example.com")]))
        .unwrap_err();
    assert!(err.is_store_error());
    assert_eq!(store.faults_injected(), 1);
    assert_eq!(alice, before);

    assert_eq!(
        raw_ids(&users.find(&Condition::new().is("email", "old@example.com")).unwrap()),
        vec![1]
    );
    let stored = users.load_by_ids(&[alice.id().unwrap()], &[]).unwrap();
    assert_eq!(stored[0].get("email"), Some(&Value::from("old@example.com")));
}

#[test]
fn failed_unique_update_releases_the_new_value() {
    let store = faulty();
    let users = users_on(store.clone());
    let mut alice = users.create(fields(&[("name", "alice")])).unwrap();

    // HGETALL, then the two claim commands, then the batch fails
    store.fail_after(3);
    let err = users
        .update(&mut alice, fields(&[("name", "alicia")]))
        .unwrap_err();
    assert!(err.is_store_error());
    assert_eq!(alice.get("name"), Some(&Value::from("alice")));

    assert!(users
        .find(&Condition::new().is("name", "alicia"))
        .unwrap()
        .is_empty());
    assert_eq!(
        raw_ids(&users.find(&Condition::new().is("name", "alice")).unwrap()),
        vec![1]
    );
    let other = users.create(fields(&[("name", "alicia")])).unwrap();
    assert_eq!(other.id().map(|id| id.as_u64()), Some(2));
}

#[test]
fn failed_resave_releases_the_new_value() {
    let store = faulty();
    let users = users_on(store.clone());
    let mut alice = users.create(fields(&[("name", "alice")])).unwrap();
    alice.set("name", "alicia");

    store.fail_after(3);
    assert!(users.save(&mut alice).unwrap_err().is_store_error());

    assert!(users
        .find(&Condition::new().is("name", "alicia"))
        .unwrap()
        .is_empty());
    assert_eq!(
        raw_ids(&users.find(&Condition::new().is("name", "alice")).unwrap()),
        vec![1]
    );

    // The retry claims the new value and frees the old one
    users.save(&mut alice).unwrap();
    assert_eq!(
        raw_ids(&users.find(&Condition::new().is("name", "alicia")).unwrap()),
        vec![1]
    );
    assert!(users
        .find(&Condition::new().is("name", "alice"))
        .unwrap()
        .is_empty());
}

#[test]
fn duplicate_on_second_unique_index_releases_the_first() {
    let users = strata_objects::RecordType::builder("accounts", faulty())
        .fields(["name", "email"])
        .index(strata_objects::Index::unique("accounts", ["name"]))
        .index(strata_objects::Index::unique("accounts", ["email"]))
        .build()
        .unwrap();
    users
        .create(fields(&[("name", "bob"), ("email", "bob@example.com")]))
        .unwrap();
    let mut carol = users
        .create(fields(&[("name", "carol"), ("email", "carol@example.com")]))
        .unwrap();

    let err = users
        .update(
            &mut carol,
            fields(&[("name", "caroline"), ("email", "bob@example.com")]),
        )
        .unwrap_err();
    assert!(matches!(err, strata_objects::Error::DuplicateKey { .. }));

    assert!(users
        .find(&Condition::new().is("name", "caroline"))
        .unwrap()
        .is_empty());
    assert_eq!(
        raw_ids(&users.find(&Condition::new().is("name", "carol")).unwrap()),
        vec![2]
    );
}

#[test]
fn failed_save_releases_unique_claim() {
    let store = faulty();
    let users = users_on(store.clone());

    // id reservation, then the two claim commands, then the batch fails
    store.fail_after(3);
    let mut alice = Record::new().with("name", "alice");
    assert!(users.save(&mut alice).unwrap_err().is_store_error());

    assert!(!store.inner().contains_key("users:1"));
    assert!(users
        .find(&Condition::new().is("name", "alice"))
        .unwrap()
        .is_empty());

    // The name is free for another record
    let other = users.create(fields(&[("name", "alice")])).unwrap();
    assert!(other.id().is_some());
}

#[test]
fn failed_save_keeps_its_id_for_retry() {
    let store = faulty();
    let users = users_on(store.clone());

    store.fail_after(3);
    let mut alice = Record::new().with("name", "alice").with("score", 3);
    users.save(&mut alice).unwrap_err();
    let id = alice.id().expect("id assigned before the write");

    assert_eq!(users.save(&mut alice).unwrap(), id);
    assert_eq!(
        users.find(&Condition::new().is("name", "alice")).unwrap(),
        vec![id]
    );
}

#[test]
fn failed_id_reservation_leaves_record_unsaved() {
    let store = faulty();
    let users = users_on(store.clone());

    store.fail_after(0);
    let mut alice = Record::new().with("name", "alice");
    assert!(users.save(&mut alice).unwrap_err().is_store_error());
    assert!(!alice.is_persisted());
    assert_eq!(store.inner().key_count(), 0);
}

#[test]
fn failed_delete_keeps_record_indexed() {
    let store = faulty();
    let users = users_on(store.clone());
    let alice = users.create(fields(&[("name", "alice")])).unwrap();

    store.fail_after(1);
    assert!(users.delete(&alice).unwrap_err().is_store_error());
    assert_eq!(
        raw_ids(&users.find(&Condition::new().is("name", "alice")).unwrap()),
        vec![1]
    );
    assert_eq!(users.all(0, 10, &[]).unwrap().len(), 1);
}

// ============================================================================
// Pipelined writes
// ============================================================================

#[test]
fn pipelined_save_applies_commands_before_the_failure() {
    let store = faulty();
    let config = ObjectStoreConfig {
        transactional_saves: false,
        ..ObjectStoreConfig::default()
    };
    let users = strata_objects::RecordType::builder("users", store.clone())
        .fields(["name", "email"])
        .index(strata_objects::Index::unique("users", ["name"]))
        .index(strata_objects::Index::unordered("users", ["email"]))
        .config(config)
        .build()
        .unwrap();

    // Only the record hash lands: the id-set entry fails
    store.fail_after(4);
    let mut alice = Record::new().with("name", "alice").with("email", "a@example.com");
    assert!(users.save(&mut alice).unwrap_err().is_store_error());
    assert!(store.inner().contains_key("users:1"));
    assert!(users.all(0, 10, &[]).unwrap().is_empty());

    // Retrying repeats the same writes under the same id
    users.save(&mut alice).unwrap();
    assert_eq!(raw_ids(&[alice.id().unwrap()]), vec![1]);
    assert_eq!(users.all(0, 10, &[]).unwrap().len(), 1);
    assert_eq!(
        raw_ids(&users.find(&Condition::new().is("email", "a@example.com")).unwrap()),
        vec![1]
    );
}
