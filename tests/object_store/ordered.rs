//! Numeric range queries

use crate::common::*;
use strata_objects::{Condition, Error, Record, Value};

fn scored(users: &strata_objects::RecordType, scores: &[i64]) {
    for (i, score) in scores.iter().enumerate() {
        let mut r = Record::new()
            .with("name", format!("user{}", i))
            .with("score", *score);
        users.save(&mut r).unwrap();
    }
}

#[test]
fn range_is_inclusive_and_ascending() {
    let users = users();
    scored(&users, &[50, 10, 30, 20, 40]);

    let ids = users
        .find(&Condition::new().between("score", 20.0, 40.0))
        .unwrap();
    // scores 20 (id 4), 30 (id 3), 40 (id 5)
    assert_eq!(raw_ids(&ids), vec![4, 3, 5]);
}

#[test]
fn range_paging() {
    let users = users();
    scored(&users, &[1, 2, 3, 4, 5]);

    let cond = Condition::new().between("score", 0.0, 10.0).with_paging(1, 2);
    assert_eq!(raw_ids(&users.find(&cond).unwrap()), vec![2, 3]);
}

#[test]
fn exact_value_on_ordered_index() {
    let users = users();
    scored(&users, &[7, 8, 7]);
    let ids = users.find(&Condition::new().is("score", 7)).unwrap();
    assert_eq!(raw_ids(&ids), vec![1, 3]);
}

#[test]
fn non_numeric_value_is_rejected() {
    let users = users();
    let mut r = Record::new().with("name", "x").with("score", "lots");
    let err = users.save(&mut r).unwrap_err();
    assert!(matches!(err, Error::InvalidValue { ref field, .. } if field == "score"));
}

#[test]
fn increment_where_moves_records_in_the_range() {
    let users = users();
    scored(&users, &[10, 20, 30]);

    let bumped = users
        .increment_where(&Condition::new().between("score", 15.0, 35.0), "score", 100)
        .unwrap();
    let bumped: Vec<(u64, i64)> = bumped.into_iter().map(|(id, v)| (id.as_u64(), v)).collect();
    assert_eq!(bumped, vec![(2, 120), (3, 130)]);

    let high = users
        .find(&Condition::new().between("score", 100.0, 200.0))
        .unwrap();
    assert_eq!(raw_ids(&high), vec![2, 3]);
    let low = users
        .find(&Condition::new().between("score", 0.0, 50.0))
        .unwrap();
    assert_eq!(raw_ids(&low), vec![1]);

    let stored = users.load_by_ids(&high[..1], &["score"]).unwrap();
    assert_eq!(stored[0].get("score"), Some(&Value::Int(120)));
}

#[test]
fn increment_where_without_matches_is_empty() {
    let users = users();
    scored(&users, &[1]);
    let bumped = users
        .increment_where(&Condition::new().between("score", 5.0, 6.0), "score", 1)
        .unwrap();
    assert!(bumped.is_empty());
}
