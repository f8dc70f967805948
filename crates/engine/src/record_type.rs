//! Record lifecycle orchestration
//!
//! A [`RecordType`] binds a schema and a [`KeySpec`] to a store handle and an
//! id generator. Every write keeps the record hash, the master id set and the
//! indexes in step:
//!
//! | operation | store layout touched |
//! |-----------|----------------------|
//! | save      | `{type}:{id}` hash, `ids:{type}` sorted set, every index |
//! | update    | `{type}:{id}` hash, indexes reading a changed field |
//! | delete    | `{type}:{id}` hash, `ids:{type}` sorted set, every index |
//!
//! Unique claims are made against the store before the write batch is sent,
//! so a duplicate value aborts the write without touching the record. The
//! batch itself runs as a transaction unless `transactional_saves` is off.
//!
//! Index updates that run after the record hash is written (the `*_where`
//! bulk operations) are best effort: a failing index leaves the field write
//! in place and surfaces the error.

use crate::config::ObjectStoreConfig;
use crate::idgen::{IdGenerator, IncrementalIdGenerator};
use crate::record::Record;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use strata_core::{
    Condition, Error, FieldMap, Paging, RecordId, Result, StoreError, Value, ID_FIELD,
};
use strata_index::{Index, KeySpec, RecordView};
use strata_storage::{Command, Pipeline, Reply, Store};
use tracing::{debug, info, warn};

// ============================================================================
// Builder
// ============================================================================

/// Builder for a [`RecordType`]
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use strata_engine::RecordType;
/// use strata_index::Index;
/// use strata_storage::InMemoryStore;
///
/// let users = RecordType::builder("users", Arc::new(InMemoryStore::new()))
///     .fields(["name", "email"])
///     .index(Index::unique("users", ["name"]))
///     .build()
///     .unwrap();
/// assert_eq!(users.schema(), ["name", "email"]);
/// ```
pub struct RecordTypeBuilder {
    name: String,
    store: Arc<dyn Store>,
    schema: Vec<String>,
    indexes: Vec<Index>,
    config: ObjectStoreConfig,
    id_gen: Option<Arc<dyn IdGenerator>>,
}

impl RecordTypeBuilder {
    /// Add one schema field
    pub fn field(mut self, name: impl Into<String>) -> Self {
        self.schema.push(name.into());
        self
    }

    /// Add schema fields, in order
    pub fn fields<S: Into<String>>(mut self, names: impl IntoIterator<Item = S>) -> Self {
        self.schema.extend(names.into_iter().map(Into::into));
        self
    }

    /// Add an index
    pub fn index(mut self, index: impl Into<Index>) -> Self {
        self.indexes.push(index.into());
        self
    }

    /// Add several indexes
    pub fn indexes(mut self, indexes: impl IntoIterator<Item = Index>) -> Self {
        self.indexes.extend(indexes);
        self
    }

    /// Use `config` instead of the defaults
    pub fn config(mut self, config: ObjectStoreConfig) -> Self {
        self.config = config;
        self
    }

    /// Use a custom id generator instead of the store counter
    pub fn id_generator(mut self, id_gen: Arc<dyn IdGenerator>) -> Self {
        self.id_gen = Some(id_gen);
        self
    }

    /// Validate and build
    ///
    /// # Errors
    ///
    /// `Config` for invalid configuration. `InvalidKeySpec` for an empty
    /// name, a schema naming `id`, an index reading a field outside the
    /// schema, or a key spec violating its own invariants.
    pub fn build(self) -> Result<RecordType> {
        self.config.validate()?;
        if self.name.is_empty() {
            return Err(Error::InvalidKeySpec(
                "record type name must not be empty".to_string(),
            ));
        }

        let mut seen = BTreeSet::new();
        let schema: Vec<String> = self
            .schema
            .into_iter()
            .filter(|f| seen.insert(f.clone()))
            .collect();
        if seen.contains(ID_FIELD) {
            return Err(Error::InvalidKeySpec(format!(
                "'{}' is reserved and cannot be a schema field",
                ID_FIELD
            )));
        }

        let tokenizer = self.config.tokenizer();
        let ttl = self.config.intersection_ttl();
        let mut indexes = self.indexes;
        for index in &mut indexes {
            if let Some(missing) = index.source_fields().into_iter().find(|f| !seen.contains(*f)) {
                return Err(Error::InvalidKeySpec(format!(
                    "{} reads '{}', which is not in the schema of '{}'",
                    index, missing, self.name
                )));
            }
            if let Index::FullText(fulltext) = index {
                fulltext.apply_defaults(&tokenizer, ttl);
            }
        }
        let key_spec = KeySpec::new(indexes)?;

        let id_gen = self.id_gen.unwrap_or_else(|| {
            Arc::new(IncrementalIdGenerator::new(
                Arc::clone(&self.store),
                &self.name,
                self.config.id_batch_size,
            ))
        });

        info!(
            record_type = %self.name,
            fields = schema.len(),
            indexes = key_spec.len(),
            "record type defined"
        );
        Ok(RecordType {
            name: self.name,
            schema,
            schema_set: seen,
            key_spec,
            store: self.store,
            id_gen,
            config: self.config,
        })
    }
}

// ============================================================================
// RecordType
// ============================================================================

/// Schema, indexes and store binding for one kind of record
///
/// Thread safety: all operations take `&self` and may run concurrently;
/// coordination between writers happens in the store.
pub struct RecordType {
    name: String,
    schema: Vec<String>,
    schema_set: BTreeSet<String>,
    key_spec: KeySpec,
    store: Arc<dyn Store>,
    id_gen: Arc<dyn IdGenerator>,
    config: ObjectStoreConfig,
}

impl fmt::Debug for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordType")
            .field("name", &self.name)
            .field("schema", &self.schema)
            .field("key_spec", &self.key_spec)
            .field("config", &self.config)
            .finish()
    }
}

impl RecordType {
    /// Start defining a record type stored in `store`
    pub fn builder(name: impl Into<String>, store: Arc<dyn Store>) -> RecordTypeBuilder {
        RecordTypeBuilder {
            name: name.into(),
            store,
            schema: Vec::new(),
            indexes: Vec::new(),
            config: ObjectStoreConfig::default(),
            id_gen: None,
        }
    }

    /// Record type name, also the key prefix of its hashes
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Persisted fields, in definition order (`id` excluded)
    pub fn schema(&self) -> &[String] {
        &self.schema
    }

    /// Configured indexes
    pub fn key_spec(&self) -> &KeySpec {
        &self.key_spec
    }

    /// Active configuration
    pub fn config(&self) -> &ObjectStoreConfig {
        &self.config
    }

    /// Hash key of one record
    pub fn record_key(&self, id: RecordId) -> String {
        format!("{}:{}", self.name, id)
    }

    /// Sorted-set key of every id of this type, scored by id
    pub fn ids_key(&self) -> String {
        format!("ids:{}", self.name)
    }

    fn store(&self) -> &dyn Store {
        self.store.as_ref()
    }

    fn check_fields<'f>(&self, fields: impl IntoIterator<Item = &'f str>) -> Result<()> {
        for field in fields {
            if !self.schema_set.contains(field) {
                return Err(Error::UnknownField(field.to_string()));
            }
        }
        Ok(())
    }

    // ========================================================================
    // Writes
    // ========================================================================

    /// Persist a record and index it
    ///
    /// An unsaved record is assigned a fresh id first; the id stays on the
    /// record even if the write fails, so retrying repeats the same writes
    /// under the same id. Fields are merged into the stored hash, not
    /// replaced: fields absent from the record are left untouched.
    ///
    /// Round trips: one id reservation per id batch, an `HGETALL` when the
    /// record already has an id, one claim per unique index, then the write
    /// batch. Claims of values that never reached the store are released
    /// if the write fails.
    ///
    /// # Errors
    ///
    /// `UnknownField` for fields outside the schema, `DuplicateKey` when a
    /// unique value belongs to another record, `InvalidValue` for values an
    /// index cannot score, `StoreUnavailable` for store failures.
    pub fn save(&self, record: &mut Record) -> Result<RecordId> {
        self.check_fields(record.fields.keys().map(String::as_str))?;

        let (id, stored) = match record.id {
            Some(id) => (id, self.load_hash(id)?),
            None => {
                let id = self.id_gen.next_id()?;
                record.id = Some(id);
                debug!(record_type = %self.name, id = %id, "assigned id");
                (id, FieldMap::new())
            }
        };
        let previous = (!stored.is_empty()).then_some(&stored);
        let mut current = stored.clone();
        current.extend(record.fields.iter().map(|(k, v)| (k.clone(), v.clone())));

        let mut view = RecordView::new(id, &current);
        if let Some(previous) = previous {
            view = view.with_previous(previous);
        }

        let mut pipe = Pipeline::with_mode(self.config.write_mode());
        let mut hash = field_pairs(&record.fields);
        hash.push((ID_FIELD.to_string(), id.to_value()));
        pipe.hset(self.record_key(id), hash);
        pipe.zadd(self.ids_key(), vec![(id.to_string(), id.as_u64() as f64)]);

        let written = self
            .index_all(self.key_spec.indexes().iter(), view, &mut pipe)
            .and_then(|()| pipe.execute(self.store()).map_err(Error::from));
        if let Err(e) = written {
            self.release_claims(self.key_spec.indexes().iter(), view);
            return Err(e);
        }

        debug!(
            record_type = %self.name,
            id = %id,
            resave = previous.is_some(),
            "record saved"
        );
        Ok(id)
    }

    /// Construct and save a record in one call
    pub fn create(&self, fields: FieldMap) -> Result<Record> {
        let mut record = Record::from_fields(fields);
        self.save(&mut record)?;
        Ok(record)
    }

    /// Write `changes` to a saved record and refresh the indexes they affect
    ///
    /// The in-memory record changes only after the store accepted the write.
    /// Unique claims for changed values are released if the write fails.
    ///
    /// # Errors
    ///
    /// `InvalidState` if the record was never saved, plus the errors of
    /// [`save`](Self::save).
    pub fn update(&self, record: &mut Record, changes: FieldMap) -> Result<()> {
        let id = record.id.ok_or_else(|| {
            Error::InvalidState(format!("cannot update unsaved {} record", self.name))
        })?;
        self.check_fields(changes.keys().map(String::as_str))?;
        if changes.is_empty() {
            return Ok(());
        }

        let affected = self
            .key_spec
            .resolve_for_update(changes.keys().map(String::as_str));
        let mut pipe = Pipeline::with_mode(self.config.write_mode());
        pipe.hset(self.record_key(id), field_pairs(&changes));

        let (stored, current) = if affected.is_empty() {
            (FieldMap::new(), FieldMap::new())
        } else {
            let stored = self.load_hash(id)?;
            let mut current = stored.clone();
            current.extend(changes.iter().map(|(k, v)| (k.clone(), v.clone())));
            (stored, current)
        };
        let view = RecordView::new(id, &current).with_previous(&stored);

        let written = self
            .index_all(affected.iter().copied(), view, &mut pipe)
            .and_then(|()| pipe.execute(self.store()).map_err(Error::from));
        if let Err(e) = written {
            self.release_claims(affected.iter().copied(), view);
            return Err(e);
        }

        debug!(
            record_type = %self.name,
            id = %id,
            fields = ?changes.keys().collect::<Vec<_>>(),
            indexes = affected.len(),
            "record updated"
        );
        record.fields.extend(changes);
        Ok(())
    }

    /// Remove a saved record, its id-set entry and its index entries
    ///
    /// Unique claims are released only if still owned by this record.
    ///
    /// # Errors
    ///
    /// `InvalidState` if the record was never saved.
    pub fn delete(&self, record: &Record) -> Result<bool> {
        let id = record.id.ok_or_else(|| {
            Error::InvalidState(format!("cannot delete unsaved {} record", self.name))
        })?;
        self.delete_by_id(id)
    }

    /// Remove a record by id; `false` if nothing was stored under it
    pub fn delete_by_id(&self, id: RecordId) -> Result<bool> {
        let stored = self.load_hash(id)?;
        if stored.is_empty() {
            debug!(record_type = %self.name, id = %id, "delete of absent record");
            return Ok(false);
        }

        let mut pipe = Pipeline::with_mode(self.config.write_mode());
        let view = RecordView::new(id, &stored);
        for index in self.key_spec.indexes() {
            index.remove(view, &mut pipe);
        }
        pipe.push(Command::Del {
            keys: vec![self.record_key(id)],
        });
        pipe.zrem(self.ids_key(), vec![id.to_string()]);
        pipe.execute(self.store())?;

        debug!(record_type = %self.name, id = %id, "record deleted");
        Ok(true)
    }

    /// Atomically add `amount` to an integer field of every matching record
    ///
    /// Returns each matched id with its new value. Indexes reading the field
    /// are refreshed afterwards.
    pub fn increment_where(
        &self,
        condition: &Condition,
        field: &str,
        amount: i64,
    ) -> Result<Vec<(RecordId, i64)>> {
        self.check_fields([field])?;
        let ids = self.find(condition)?;
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut pipe = Pipeline::new();
        for id in &ids {
            pipe.push(Command::HIncrBy {
                key: self.record_key(*id),
                field: field.to_string(),
                delta: amount,
            });
        }
        let results = ids
            .iter()
            .copied()
            .zip(pipe.execute(self.store())?)
            .map(|(id, reply)| Ok((id, reply.into_int()?)))
            .collect::<Result<Vec<_>>>()?;

        let affected = self.key_spec.resolve_for_update([field]);
        if !affected.is_empty() {
            let current = self.load_hashes(&ids)?;
            let previous: Vec<FieldMap> = current
                .iter()
                .zip(&results)
                .map(|(fields, (_, value))| {
                    let mut before = fields.clone();
                    before.insert(field.to_string(), Value::Int(value - amount));
                    before
                })
                .collect();
            let views: Vec<RecordView<'_>> = ids
                .iter()
                .zip(current.iter().zip(&previous))
                .map(|(id, (now, before))| RecordView::new(*id, now).with_previous(before))
                .collect();
            for index in &affected {
                index.update_many(self.store(), &views)?;
            }
        }

        debug!(
            record_type = %self.name,
            field,
            amount,
            records = results.len(),
            "incremented matching records"
        );
        Ok(results)
    }

    /// Apply the same changes to every matching record
    ///
    /// Returns the number of records written. Indexes reading a changed
    /// field are refreshed after the field write.
    pub fn update_where(&self, condition: &Condition, changes: &FieldMap) -> Result<usize> {
        self.check_fields(changes.keys().map(String::as_str))?;
        let ids = self.find(condition)?;
        if ids.is_empty() || changes.is_empty() {
            return Ok(0);
        }

        let affected = self
            .key_spec
            .resolve_for_update(changes.keys().map(String::as_str));
        let previous = if affected.is_empty() {
            Vec::new()
        } else {
            self.load_hashes(&ids)?
        };

        let mut pipe = Pipeline::with_mode(self.config.write_mode());
        let pairs = field_pairs(changes);
        for id in &ids {
            pipe.hset(self.record_key(*id), pairs.clone());
        }
        pipe.execute(self.store())?;

        if !affected.is_empty() {
            let current: Vec<FieldMap> = previous
                .iter()
                .map(|before| {
                    let mut now = before.clone();
                    now.extend(changes.iter().map(|(k, v)| (k.clone(), v.clone())));
                    now
                })
                .collect();
            let views: Vec<RecordView<'_>> = ids
                .iter()
                .zip(current.iter().zip(&previous))
                .map(|(id, (now, before))| RecordView::new(*id, now).with_previous(before))
                .collect();
            for index in &affected {
                index.update_many(self.store(), &views)?;
            }
        }

        debug!(
            record_type = %self.name,
            records = ids.len(),
            indexes = affected.len(),
            "updated matching records"
        );
        Ok(ids.len())
    }

    fn index_all<'i>(
        &self,
        indexes: impl IntoIterator<Item = &'i Index>,
        view: RecordView<'_>,
        pipe: &mut Pipeline,
    ) -> Result<()> {
        for index in indexes {
            index.update(self.store(), view, pipe)?;
        }
        Ok(())
    }

    /// Best-effort release of unique claims made for a write that failed
    ///
    /// Values matching the stored record keep their claim.
    fn release_claims<'i>(&self, indexes: impl IntoIterator<Item = &'i Index>, view: RecordView<'_>) {
        let mut pipe = Pipeline::new();
        for index in indexes {
            index.release_unsaved(view, &mut pipe);
        }
        if pipe.is_empty() {
            return;
        }
        if let Err(e) = pipe.execute(self.store()) {
            warn!(
                record_type = %self.name,
                id = %view.id,
                error = %e,
                "failed to release unique claims after aborted write"
            );
        }
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// Ids matching a condition, in the resolved index's order
    ///
    /// # Errors
    ///
    /// `NoMatchingIndex` if no index has exactly the condition's fields.
    pub fn find(&self, condition: &Condition) -> Result<Vec<RecordId>> {
        let index = self.key_spec.resolve_for_query(condition)?;
        debug!(record_type = %self.name, index = %index, condition = %condition, "resolved query");
        index.find(self.store(), condition)
    }

    /// Records matching a condition, restricted to `fields` if non-empty
    pub fn get(&self, condition: &Condition, fields: &[&str]) -> Result<Vec<Record>> {
        let ids = self.find(condition)?;
        self.load_by_ids(&ids, fields)
    }

    /// The first record matching a condition
    pub fn get_one(&self, condition: &Condition, fields: &[&str]) -> Result<Option<Record>> {
        Ok(self.get(condition, fields)?.into_iter().next())
    }

    /// Hydrate records by id, in the given order
    ///
    /// Ids with nothing stored are omitted. With a non-empty `fields` only
    /// those fields are loaded; the id is always present.
    pub fn load_by_ids(&self, ids: &[RecordId], fields: &[&str]) -> Result<Vec<Record>> {
        let wanted: Vec<String> = fields
            .iter()
            .filter(|f| **f != ID_FIELD)
            .map(|f| f.to_string())
            .collect();
        self.check_fields(wanted.iter().map(String::as_str))?;
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut pipe = Pipeline::new();
        for id in ids {
            if fields.is_empty() {
                pipe.hgetall(self.record_key(*id));
            } else {
                let mut requested = wanted.clone();
                requested.push(ID_FIELD.to_string());
                pipe.hmget(self.record_key(*id), requested);
            }
        }
        let replies = pipe.execute(self.store())?;

        let mut records = Vec::with_capacity(ids.len());
        for (id, reply) in ids.iter().copied().zip(replies) {
            let loaded = if fields.is_empty() {
                hydrate_hash(reply)?
            } else {
                hydrate_values(&wanted, reply)?
            };
            match loaded {
                Some(fields) => records.push(Record::loaded(id, fields)),
                None => debug!(record_type = %self.name, id = %id, "indexed id has no record"),
            }
        }
        Ok(records)
    }

    /// A page of records in id order
    pub fn all(&self, offset: usize, count: usize, fields: &[&str]) -> Result<Vec<Record>> {
        let members = self
            .store()
            .call(Command::ZRange {
                key: self.ids_key(),
                limit: Some(Paging { offset, count }),
                reverse: false,
            })?
            .into_members()?;
        let ids = members
            .into_iter()
            .map(|m| {
                m.parse::<RecordId>().map_err(|_| {
                    Error::from(StoreError::Protocol(format!("id set member '{}' is not an id", m)))
                })
            })
            .collect::<Result<Vec<_>>>()?;
        self.load_by_ids(&ids, fields)
    }

    fn load_hash(&self, id: RecordId) -> Result<FieldMap> {
        let reply = self.store().call(Command::HGetAll {
            key: self.record_key(id),
        })?;
        Ok(hydrate_hash(reply)?.unwrap_or_default())
    }

    fn load_hashes(&self, ids: &[RecordId]) -> Result<Vec<FieldMap>> {
        let mut pipe = Pipeline::new();
        for id in ids {
            pipe.hgetall(self.record_key(*id));
        }
        pipe.execute(self.store())?
            .into_iter()
            .map(|reply| Ok(hydrate_hash(reply)?.unwrap_or_default()))
            .collect()
    }
}

fn field_pairs(fields: &FieldMap) -> Vec<(String, Value)> {
    fields.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
}

/// Record fields from an `HGETALL` reply, `None` if nothing is stored
fn hydrate_hash(reply: Reply) -> Result<Option<FieldMap>> {
    let mut hash = reply.into_hash()?;
    if hash.is_empty() {
        return Ok(None);
    }
    hash.remove(ID_FIELD);
    Ok(Some(hash))
}

/// Record fields from an `HMGET` reply whose last value is the id
fn hydrate_values(wanted: &[String], reply: Reply) -> Result<Option<FieldMap>> {
    let mut values = reply.into_values()?;
    if values.pop().flatten().is_none() {
        return Ok(None);
    }
    Ok(Some(
        wanted
            .iter()
            .cloned()
            .zip(values)
            .filter_map(|(field, value)| value.map(|v| (field, v)))
            .collect(),
    ))
}
