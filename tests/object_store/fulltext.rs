//! Full-text search over weighted fields

use crate::common::*;
use strata_objects::{Condition, RecordType};

fn catalog() -> RecordType {
    let tracks = tracks();
    for (title, artist, plays) in [
        ("Where Is My Mind", "The Pixies", 10),
        ("Pixies Live", "Various", 3),
        ("The Man", "The Killers", 100),
        ("The Pixies Anthology", "The Pixies", 1),
    ] {
        tracks
            .create(fields(&[
                ("title", strata_objects::Value::from(title)),
                ("artist", artist.into()),
                ("plays", plays.into()),
            ]))
            .unwrap();
    }
    tracks
}

fn search(tracks: &RecordType, text: &str) -> Vec<u64> {
    raw_ids(&tracks.find(&Condition::new().is("search", text)).unwrap())
}

#[test]
fn single_token_ranks_by_weighted_score() {
    let tracks = catalog();
    // pixies: artist 1 x 10, title 2 x 3, title 2 x 1 + artist 1 x 1
    assert_eq!(search(&tracks, "pixies"), vec![1, 2, 4]);
    assert_eq!(search(&tracks, "the"), vec![3, 1, 4]);
}

#[test]
fn tokens_are_combined_with_and() {
    let tracks = catalog();
    assert_eq!(search(&tracks, "the pixies"), vec![1, 4]);
    assert!(search(&tracks, "pixies zeppelin").is_empty());
}

#[test]
fn absent_token_finds_nothing() {
    let tracks = catalog();
    assert!(search(&tracks, "zeppelin").is_empty());
    assert!(search(&tracks, "   ").is_empty());
}

#[test]
fn query_is_case_folded() {
    let tracks = catalog();
    assert_eq!(search(&tracks, "PIXIES"), vec![1, 2, 4]);
}

#[test]
fn paged_search() {
    let tracks = catalog();
    let cond = Condition::new().is("search", "pixies").with_paging(1, 5);
    assert_eq!(raw_ids(&tracks.find(&cond).unwrap()), vec![2, 4]);
}

#[test]
fn changed_title_refreshes_tokens() {
    let tracks = catalog();
    let mut live = tracks
        .load_by_ids(&[strata_objects::RecordId::new(2)], &[])
        .unwrap()
        .remove(0);
    tracks
        .update(&mut live, fields(&[("title", "Live Bootleg")]))
        .unwrap();

    assert_eq!(search(&tracks, "pixies"), vec![1, 4]);
    assert_eq!(search(&tracks, "bootleg"), vec![2]);
    assert_eq!(search(&tracks, "various"), vec![2]);
}

#[test]
fn search_results_hydrate_records() {
    let tracks = catalog();
    let found = tracks
        .get(&Condition::new().is("search", "the pixies"), &["title"])
        .unwrap();
    let titles: Vec<_> = found
        .iter()
        .filter_map(|r| r.get("title").and_then(|v| v.as_str()))
        .collect();
    assert_eq!(titles, vec!["Where Is My Mind", "The Pixies Anthology"]);
}

#[test]
fn unordered_composite_alongside_fulltext() {
    let tracks = catalog();
    tracks
        .create(fields(&[("title", "Debaser"), ("artist", "The Pixies"), ("album", "Doolittle")]))
        .unwrap();
    let ids = tracks
        .find(&Condition::new().is("artist", "The Pixies").is("album", "Doolittle"))
        .unwrap();
    assert_eq!(raw_ids(&ids), vec![5]);
}
