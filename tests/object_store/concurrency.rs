//! Concurrent writers sharing one record type

use crate::common::*;
use std::collections::HashSet;
use std::thread;
use strata_objects::{Condition, Error};

const THREADS: usize = 8;

#[test]
fn one_writer_wins_a_unique_value() {
    let users = users();

    let results: Vec<_> = thread::scope(|s| {
        let handles: Vec<_> = (0..THREADS)
            .map(|_| s.spawn(|| users.create(fields(&[("name", "contested")]))))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let winners: Vec<_> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
    assert_eq!(winners.len(), 1);
    assert!(results
        .iter()
        .filter_map(|r| r.as_ref().err())
        .all(|e| matches!(e, Error::DuplicateKey { .. })));

    let owner = users.find(&Condition::new().is("name", "contested")).unwrap();
    assert_eq!(owner, vec![winners[0].id().unwrap()]);
    assert_eq!(users.all(0, 100, &[]).unwrap().len(), 1);
}

#[test]
fn concurrent_saves_get_distinct_ids() {
    let users = users();

    let ids: Vec<u64> = thread::scope(|s| {
        let handles: Vec<_> = (0..THREADS)
            .map(|t| {
                let users = &users;
                s.spawn(move || {
                    (0..10)
                        .map(|i| {
                            users
                                .create(fields(&[("name", format!("user-{}-{}", t, i))]))
                                .unwrap()
                                .id()
                                .unwrap()
                                .as_u64()
                        })
                        .collect::<Vec<_>>()
                })
            })
            .collect();
        handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect()
    });

    let unique: HashSet<_> = ids.iter().collect();
    assert_eq!(unique.len(), THREADS * 10);
    assert_eq!(users.all(0, 1000, &[]).unwrap().len(), THREADS * 10);
}
