//! Score-ordered member set
//!
//! Members are unique strings; each carries an `f64` score. Iteration order
//! is `(score, member)` ascending, so members with equal scores cluster and
//! tie-break lexicographically.
//!
//! # Design
//!
//! - `FxHashMap<member, score>`: O(1) score lookup and rescoring
//! - `BTreeSet<(Score, member)>`: ordered range scans
//!
//! Both structures are always updated together.

use rustc_hash::FxHashMap;
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::ops::Bound;

/// Total-ordered wrapper over `f64`
///
/// `-0.0` is folded into `0.0` on construction so that exact-score lookups
/// match IEEE equality.
#[derive(Debug, Clone, Copy)]
pub struct Score(f64);

impl Score {
    /// Wrap a score
    pub fn new(value: f64) -> Self {
        if value == 0.0 {
            Score(0.0)
        } else {
            Score(value)
        }
    }

    /// Raw score
    pub fn get(self) -> f64 {
        self.0
    }
}

impl PartialEq for Score {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Score {}

impl PartialOrd for Score {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Score {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

/// Sorted set of members
#[derive(Debug, Clone, Default)]
pub struct SortedSet {
    scores: FxHashMap<String, f64>,
    ordered: BTreeSet<(Score, String)>,
}

impl SortedSet {
    /// Empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or rescore a member. Returns true if the member is new.
    pub fn insert(&mut self, member: String, score: f64) -> bool {
        let score = Score::new(score);
        match self.scores.insert(member.clone(), score.get()) {
            Some(old) => {
                self.ordered.remove(&(Score::new(old), member.clone()));
                self.ordered.insert((score, member));
                false
            }
            None => {
                self.ordered.insert((score, member));
                true
            }
        }
    }

    /// Remove a member. Returns true if it was present.
    pub fn remove(&mut self, member: &str) -> bool {
        match self.scores.remove(member) {
            Some(old) => {
                self.ordered.remove(&(Score::new(old), member.to_string()));
                true
            }
            None => false,
        }
    }

    /// Score of a member
    pub fn score(&self, member: &str) -> Option<f64> {
        self.scores.get(member).copied()
    }

    /// Number of members
    pub fn len(&self) -> usize {
        self.scores.len()
    }

    /// True if the set has no members
    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    /// Members with `min <= score <= max`, ascending
    pub fn range_by_score(&self, min: f64, max: f64) -> impl Iterator<Item = &str> + '_ {
        let (min, max) = (Score::new(min), Score::new(max));
        let start = Bound::Included((min, String::new()));
        self.ordered
            .range((start, Bound::Unbounded))
            .take_while(move |(s, _)| *s <= max)
            .map(|(_, m)| m.as_str())
    }

    /// All `(member, score)` pairs, ascending
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = (&str, f64)> + '_ {
        self.ordered.iter().map(|(s, m)| (m.as_str(), s.get()))
    }
}
