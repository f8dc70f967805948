//! Full-text index
//!
//! Indexes a virtual alias field backed by several weighted source fields.
//! Every token produced by a source field gets a sorted set
//! (`{namespace}:{token}`) mapping record ids to a relevance score:
//!
//! ```text
//! score(token, record) = sum over source fields f producing token of
//!                        weight(f) * record_score(record)
//! ```
//!
//! `record_score` is 1.0 unless a scorer callback is installed.
//!
//! A query is tokenized the same way. The per-token sets are intersected into
//! a temporary key with summed scores (logical AND of tokens) and read back
//! highest score first. The temporary key expires after the configured TTL so
//! repeated queries within that window reuse it lazily.

use crate::index::{namespace_for, parse_ids, RecordView};
use crate::tokenizer::Tokenizer;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use strata_core::{Condition, Error, FieldMap, RecordId, Result, StoreError};
use strata_storage::{Command, Pipeline, Store};
use tracing::debug;

/// Default lifetime of intersection result keys
pub const DEFAULT_RESULT_TTL: Duration = Duration::from_secs(60);

/// Per-record relevance multiplier
pub type Scorer = Arc<dyn Fn(&FieldMap) -> f64 + Send + Sync>;

/// Weighted token index over an alias field
#[derive(Clone)]
pub struct FullTextIndex {
    prefix: String,
    alias: String,
    namespace: String,
    field_set: BTreeSet<String>,
    weights: BTreeMap<String, f64>,
    tokenizer: Option<Tokenizer>,
    scorer: Option<Scorer>,
    result_ttl: Option<Duration>,
}

fn default_tokenizer() -> &'static Tokenizer {
    static DEFAULT: OnceLock<Tokenizer> = OnceLock::new();
    DEFAULT.get_or_init(Tokenizer::default)
}

impl fmt::Debug for FullTextIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FullTextIndex")
            .field("namespace", &self.namespace)
            .field("weights", &self.weights)
            .field("tokenizer", self.tokenizer())
            .field("scorer", &self.scorer.as_ref().map(|_| "<fn>"))
            .field("result_ttl", &self.result_ttl())
            .finish()
    }
}

impl FullTextIndex {
    /// Index queried as `alias`, fed by `weights` (`source field -> weight`)
    pub fn new<S: Into<String>>(
        prefix: &str,
        alias: &str,
        weights: impl IntoIterator<Item = (S, f64)>,
    ) -> Self {
        let alias = alias.to_string();
        FullTextIndex {
            prefix: prefix.to_string(),
            namespace: namespace_for("ft", prefix, std::slice::from_ref(&alias)),
            field_set: BTreeSet::from([alias.clone()]),
            alias,
            weights: weights.into_iter().map(|(f, w)| (f.into(), w)).collect(),
            tokenizer: None,
            scorer: None,
            result_ttl: None,
        }
    }

    /// Use a custom tokenizer
    pub fn with_tokenizer(mut self, tokenizer: Tokenizer) -> Self {
        self.tokenizer = Some(tokenizer);
        self
    }

    /// Split source text on `delimiter`
    pub fn with_delimiter(self, delimiter: &str) -> Self {
        self.with_tokenizer(Tokenizer::new(delimiter))
    }

    /// Multiply every token score of a record by `scorer(record)`
    pub fn with_scorer<F>(mut self, scorer: F) -> Self
    where
        F: Fn(&FieldMap) -> f64 + Send + Sync + 'static,
    {
        self.scorer = Some(Arc::new(scorer));
        self
    }

    /// Lifetime of intersection result keys
    pub fn with_result_ttl(mut self, ttl: Duration) -> Self {
        self.result_ttl = Some(ttl);
        self
    }

    /// Fill in the tokenizer and result TTL where none was set explicitly
    pub fn apply_defaults(&mut self, tokenizer: &Tokenizer, ttl: Duration) {
        self.tokenizer.get_or_insert_with(|| tokenizer.clone());
        self.result_ttl.get_or_insert(ttl);
    }

    /// Prefix of the per-token keys
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Query field name
    pub fn alias(&self) -> &str {
        &self.alias
    }

    /// Query field as a set
    pub fn field_set(&self) -> &BTreeSet<String> {
        &self.field_set
    }

    /// Weighted source fields
    pub fn source_fields(&self) -> impl Iterator<Item = &str> {
        self.weights.keys().map(String::as_str)
    }

    /// Weight of a source field
    pub fn weight(&self, field: &str) -> Option<f64> {
        self.weights.get(field).copied()
    }

    /// Configured tokenizer
    pub fn tokenizer(&self) -> &Tokenizer {
        match &self.tokenizer {
            Some(tokenizer) => tokenizer,
            None => default_tokenizer(),
        }
    }

    /// Lifetime of intersection result keys
    pub fn result_ttl(&self) -> Duration {
        self.result_ttl.unwrap_or(DEFAULT_RESULT_TTL)
    }

    /// Sorted-set key for one token
    pub fn token_key(&self, token: &str) -> String {
        format!("{}:{}", self.namespace, token)
    }

    /// Temporary key holding the intersection for `tokens`
    pub fn result_key(&self, tokens: &[String]) -> String {
        format!("tk:{}:{}:{}", self.prefix, self.alias, tokens.join("|"))
    }

    fn record_score(&self, fields: &FieldMap) -> f64 {
        self.scorer.as_ref().map_or(1.0, |score| score(fields))
    }

    /// Token scores for a record, or `None` if it has no source fields
    pub fn token_scores(&self, fields: &FieldMap) -> Result<Option<BTreeMap<String, f64>>> {
        if !self.weights.keys().any(|f| fields.contains_key(f)) {
            return Ok(None);
        }
        let record_score = self.record_score(fields);
        if !record_score.is_finite() {
            return Err(Error::InvalidValue {
                field: self.alias.clone(),
                reason: format!("record score {} is not finite", record_score),
            });
        }
        let mut scores = BTreeMap::new();
        for (field, weight) in &self.weights {
            let Some(value) = fields.get(field) else {
                continue;
            };
            for token in self.tokenizer().tokenize_unique(&value.to_string()) {
                *scores.entry(token).or_insert(0.0) += weight * record_score;
            }
        }
        Ok(Some(scores))
    }

    /// Queue `ZADD {namespace}:{token} score id` per token
    ///
    /// With previous values attached, the record is also removed from tokens
    /// it no longer produces.
    pub fn update(&self, record: RecordView<'_>, pipe: &mut Pipeline) -> Result<()> {
        let Some(current) = self.token_scores(record.fields)? else {
            debug!(index = %self.namespace, id = %record.id, "record lacks source fields, skipping");
            return Ok(());
        };
        let member = record.id.to_string();

        if let Some(previous) = record.previous {
            let stale: Vec<String> = self
                .tokens_of(previous)
                .into_iter()
                .filter(|t| !current.contains_key(t))
                .collect();
            if !stale.is_empty() {
                debug!(index = %self.namespace, id = %record.id, stale = stale.len(), "dropping stale tokens");
            }
            for token in stale {
                pipe.zrem(self.token_key(&token), vec![member.clone()]);
            }
        }

        debug!(index = %self.namespace, id = %record.id, tokens = current.len(), "indexing tokens");
        for (token, score) in current {
            pipe.zadd(self.token_key(&token), vec![(member.clone(), score)]);
        }
        Ok(())
    }

    fn tokens_of(&self, fields: &FieldMap) -> BTreeSet<String> {
        self.weights
            .keys()
            .filter_map(|f| fields.get(f))
            .flat_map(|v| self.tokenizer().tokenize(&v.to_string()))
            .collect()
    }

    /// Queue `ZREM` of the record from every token it produces
    pub fn remove(&self, record: RecordView<'_>, pipe: &mut Pipeline) {
        let member = record.id.to_string();
        for token in self.tokens_of(record.fields) {
            pipe.zrem(self.token_key(&token), vec![member.clone()]);
        }
    }

    /// Ids containing every query token, highest summed score first
    pub fn find(&self, store: &dyn Store, condition: &Condition) -> Result<Vec<RecordId>> {
        let text = condition.values_for(std::slice::from_ref(&self.alias))?[0]
            .exact(&self.alias)?
            .to_string();
        let tokens = self.tokenizer().tokenize_unique(&text);
        if tokens.is_empty() {
            debug!(index = %self.namespace, query = %text, "query has no tokens");
            return Ok(Vec::new());
        }

        let dest = self.result_key(&tokens);
        let mut pipe = Pipeline::new();
        pipe.push(Command::ZInterStore {
            dest: dest.clone(),
            keys: tokens.iter().map(|t| self.token_key(t)).collect(),
        });
        pipe.expire(dest.clone(), self.result_ttl());
        let range = pipe.push(Command::ZRange {
            key: dest,
            limit: condition.paging(),
            reverse: true,
        });

        let members = pipe
            .execute(store)?
            .into_iter()
            .nth(range)
            .ok_or_else(|| StoreError::Protocol("missing full-text range reply".to_string()))?
            .into_members()?;
        parse_ids(members)
    }
}
