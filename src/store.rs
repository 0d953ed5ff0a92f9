//! Store engine for todolist
//!
//! Durable storage of named collections keyed by record id, each with
//! non-unique secondary indexes on named fields.
//!
//! # Directory Structure
//!
//! ```text
//! <data_dir>/<store name>/
//!   schema.json           # Store name, version, collection + index layout
//!   categories.json       # { "records": {id: record}, "indexes": {...} }
//!   tasks.json
//!   clients.json
//!   *.json.lock           # fs2 lock files, one per document
//! ```
//!
//! Every operation is its own atomic unit: it locks the collection document,
//! reads it, applies one change and atomically replaces it. There is no
//! transaction spanning several operations or collections.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::error::{Error, Result};
use crate::lock::{self, FileLock, DEFAULT_LOCK_TIMEOUT_MS};

/// Default store name under the data directory
pub const DEFAULT_STORE_NAME: &str = "omni-personal-todolist";

/// Current on-disk schema version
pub const SCHEMA_VERSION: u32 = 1;

/// Field used as the primary key of every collection
pub const KEY_PATH: &str = "id";

const SCHEMA_FILE: &str = "schema.json";

/// The named collections of the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Collection {
    Categories,
    Tasks,
    Clients,
}

impl Collection {
    pub const ALL: [Collection; 3] = [Collection::Categories, Collection::Tasks, Collection::Clients];

    pub fn name(self) -> &'static str {
        match self {
            Collection::Categories => "categories",
            Collection::Tasks => "tasks",
            Collection::Clients => "clients",
        }
    }

    /// Secondary indexes created for this collection
    pub fn indexes(self) -> &'static [&'static str] {
        match self {
            Collection::Categories => &["priority"],
            Collection::Tasks => &["categoryId", "status", "priority"],
            Collection::Clients => &["priority"],
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Persisted layout of the store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    pub name: String,
    pub version: u32,
    #[serde(default)]
    pub collections: BTreeMap<String, CollectionSchema>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionSchema {
    pub key_path: String,
    #[serde(default)]
    pub indexes: Vec<String>,
}

impl CollectionSchema {
    fn for_collection(collection: Collection) -> Self {
        Self {
            key_path: KEY_PATH.to_string(),
            indexes: collection.indexes().iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Outcome of [`Store::init`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InitReport {
    pub created: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upgraded_from: Option<u32>,
    pub version: u32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub added: Vec<String>,
}

/// One collection document: records by id plus materialised indexes.
///
/// Index maps go `index name -> canonical JSON of the field value -> ids`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct CollectionDoc {
    #[serde(default)]
    records: BTreeMap<String, Value>,
    #[serde(default)]
    indexes: BTreeMap<String, BTreeMap<String, BTreeSet<String>>>,
}

impl CollectionDoc {
    fn with_indexes(names: &[String]) -> Self {
        let mut doc = Self::default();
        for name in names {
            doc.indexes.insert(name.clone(), BTreeMap::new());
        }
        doc
    }

    fn insert(&mut self, id: &str, record: Value) {
        self.unindex(id);
        for (field, entries) in self.indexes.iter_mut() {
            if let Some(key) = index_key(&record, field) {
                entries.entry(key).or_default().insert(id.to_string());
            }
        }
        self.records.insert(id.to_string(), record);
    }

    fn remove(&mut self, id: &str) -> Option<Value> {
        self.unindex(id);
        self.records.remove(id)
    }

    fn unindex(&mut self, id: &str) {
        let Some(previous) = self.records.get(id) else {
            return;
        };
        for (field, entries) in self.indexes.iter_mut() {
            if let Some(key) = index_key(previous, field) {
                if let Some(ids) = entries.get_mut(&key) {
                    ids.remove(id);
                    if ids.is_empty() {
                        entries.remove(&key);
                    }
                }
            }
        }
    }

    fn add_index(&mut self, field: &str) {
        let mut entries: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for (id, record) in &self.records {
            if let Some(key) = index_key(record, field) {
                entries.entry(key).or_default().insert(id.clone());
            }
        }
        self.indexes.insert(field.to_string(), entries);
    }

    fn clear(&mut self) {
        self.records.clear();
        for entries in self.indexes.values_mut() {
            entries.clear();
        }
    }
}

/// Canonical index key for a field; missing and null fields are not indexed.
fn index_key(record: &Value, field: &str) -> Option<String> {
    match record.get(field) {
        None | Some(Value::Null) => None,
        Some(value) => Some(value.to_string()),
    }
}

fn record_id(record: &Value) -> Result<String> {
    match record.get(KEY_PATH) {
        Some(Value::String(id)) if !id.trim().is_empty() => Ok(id.clone()),
        _ => Err(Error::InvalidArgument(format!(
            "record has no string `{KEY_PATH}` field"
        ))),
    }
}

/// Converts engine-level failures into `StoreUnavailable`.
fn engine(err: Error) -> Error {
    match err {
        Error::Io(_) | Error::Json(_) | Error::LockFailed(_) => {
            error!(error = %err, "store operation failed");
            Error::unavailable(err)
        }
        other => other,
    }
}

/// Handle to an on-disk store. Construct once and pass by reference.
#[derive(Debug, Clone)]
pub struct Store {
    root: PathBuf,
    name: String,
    lock_timeout_ms: u64,
}

impl Store {
    /// Create a handle for `<data_dir>/<name>` without touching the disk
    pub fn new(data_dir: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        let name = name.into();
        let root = data_dir.into().join(&name);
        Self {
            root,
            name,
            lock_timeout_ms: DEFAULT_LOCK_TIMEOUT_MS,
        }
    }

    /// Create a handle and run [`Store::init`]
    pub fn open(data_dir: impl Into<PathBuf>, name: impl Into<String>) -> Result<Self> {
        let store = Self::new(data_dir, name);
        store.init()?;
        Ok(store)
    }

    pub fn with_lock_timeout(mut self, timeout_ms: u64) -> Self {
        self.lock_timeout_ms = timeout_ms;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema_file(&self) -> PathBuf {
        self.root.join(SCHEMA_FILE)
    }

    pub fn collection_file(&self, collection: Collection) -> PathBuf {
        self.root.join(format!("{}.json", collection.name()))
    }

    /// Read the persisted schema
    pub fn schema(&self) -> Result<Schema> {
        let path = self.schema_file();
        if !path.exists() {
            return Err(Error::unavailable(format!(
                "store not initialized at {}",
                self.root.display()
            )));
        }
        let content = fs::read_to_string(&path).map_err(|e| engine(e.into()))?;
        serde_json::from_str(&content).map_err(|e| engine(e.into()))
    }

    // =========================================================================
    // Schema creation and additive upgrade
    // =========================================================================

    /// Open or create the store at the current schema version.
    ///
    /// On creation every collection and index is laid out. On an older store
    /// missing collections and indexes are added; nothing is ever dropped.
    pub fn init(&self) -> Result<InitReport> {
        self.init_inner().map_err(engine)
    }

    fn init_inner(&self) -> Result<InitReport> {
        fs::create_dir_all(&self.root)?;
        let schema_path = self.schema_file();
        let _lock = FileLock::acquire(lock::lock_path_for(&schema_path), self.lock_timeout_ms)?;

        if !schema_path.exists() {
            let mut schema = Schema {
                name: self.name.clone(),
                version: SCHEMA_VERSION,
                collections: BTreeMap::new(),
            };
            let mut added = Vec::new();
            for collection in Collection::ALL {
                self.create_collection(&mut schema, collection)?;
                added.push(collection.name().to_string());
            }
            self.write_schema(&schema)?;
            info!(store = %self.name, version = SCHEMA_VERSION, "store created");
            return Ok(InitReport {
                created: true,
                upgraded_from: None,
                version: SCHEMA_VERSION,
                added,
            });
        }

        let mut schema: Schema = serde_json::from_str(&fs::read_to_string(&schema_path)?)?;
        if schema.name != self.name {
            return Err(Error::unavailable(format!(
                "store at {} is named '{}', expected '{}'",
                self.root.display(),
                schema.name,
                self.name
            )));
        }
        if schema.version > SCHEMA_VERSION {
            return Err(Error::unavailable(format!(
                "store version {} is newer than supported version {}",
                schema.version, SCHEMA_VERSION
            )));
        }

        let previous = schema.version;
        let mut added = Vec::new();
        for collection in Collection::ALL {
            match schema.collections.get(collection.name()).cloned() {
                None => {
                    self.create_collection(&mut schema, collection)?;
                    added.push(collection.name().to_string());
                }
                Some(existing) => {
                    let missing: Vec<&str> = collection
                        .indexes()
                        .iter()
                        .copied()
                        .filter(|index| !existing.indexes.iter().any(|name| name == index))
                        .collect();
                    if missing.is_empty() {
                        continue;
                    }
                    let path = self.collection_file(collection);
                    let _doc_lock =
                        FileLock::acquire(lock::lock_path_for(&path), self.lock_timeout_ms)?;
                    let mut doc = self.read_doc(&path)?;
                    let entry = schema
                        .collections
                        .entry(collection.name().to_string())
                        .or_insert(existing);
                    for index in missing {
                        doc.add_index(index);
                        entry.indexes.push(index.to_string());
                        added.push(format!("{}.{}", collection.name(), index));
                    }
                    self.write_doc(&path, &doc)?;
                }
            }
        }

        let upgraded = previous < SCHEMA_VERSION || !added.is_empty();
        if upgraded {
            schema.version = SCHEMA_VERSION;
            self.write_schema(&schema)?;
            info!(
                store = %self.name,
                from = previous,
                to = SCHEMA_VERSION,
                added = ?added,
                "store upgraded"
            );
        } else {
            debug!(store = %self.name, version = schema.version, "store opened");
        }

        Ok(InitReport {
            created: false,
            upgraded_from: if upgraded { Some(previous) } else { None },
            version: schema.version,
            added,
        })
    }

    fn create_collection(&self, schema: &mut Schema, collection: Collection) -> Result<()> {
        let layout = CollectionSchema::for_collection(collection);
        let path = self.collection_file(collection);
        if !path.exists() {
            self.write_doc(&path, &CollectionDoc::with_indexes(&layout.indexes))?;
        }
        schema
            .collections
            .insert(collection.name().to_string(), layout);
        info!(collection = collection.name(), "collection created");
        Ok(())
    }

    fn write_schema(&self, schema: &Schema) -> Result<()> {
        let json = serde_json::to_string_pretty(schema)?;
        lock::write_atomic(self.schema_file(), json.as_bytes())
    }

    fn read_doc(&self, path: &Path) -> Result<CollectionDoc> {
        if !path.exists() {
            return Ok(CollectionDoc::default());
        }
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    fn write_doc(&self, path: &Path, doc: &CollectionDoc) -> Result<()> {
        let json = serde_json::to_string_pretty(doc)?;
        lock::write_atomic(path, json.as_bytes())
    }

    // =========================================================================
    // Per-operation transactions
    // =========================================================================

    fn read_txn<T, F>(&self, collection: Collection, f: F) -> Result<T>
    where
        F: FnOnce(&CollectionDoc) -> Result<T>,
    {
        self.ensure_collection(collection)?;
        let path = self.collection_file(collection);
        let result = (|| -> Result<T> {
            let _lock = FileLock::acquire(lock::lock_path_for(&path), self.lock_timeout_ms)?;
            let doc = self.read_doc(&path)?;
            f(&doc)
        })();
        result.map_err(engine)
    }

    fn write_txn<T, F>(&self, collection: Collection, f: F) -> Result<T>
    where
        F: FnOnce(&mut CollectionDoc) -> Result<T>,
    {
        self.ensure_collection(collection)?;
        let path = self.collection_file(collection);
        let result = (|| -> Result<T> {
            let _lock = FileLock::acquire(lock::lock_path_for(&path), self.lock_timeout_ms)?;
            let mut doc = self.read_doc(&path)?;
            let value = f(&mut doc)?;
            self.write_doc(&path, &doc)?;
            Ok(value)
        })();
        result.map_err(engine)
    }

    fn ensure_collection(&self, collection: Collection) -> Result<()> {
        let schema = self.schema()?;
        if schema.collections.contains_key(collection.name()) {
            Ok(())
        } else {
            Err(Error::unavailable(format!(
                "collection '{}' does not exist; run init",
                collection.name()
            )))
        }
    }

    // =========================================================================
    // Raw record operations
    // =========================================================================

    /// Insert a new record; fails with `DuplicateKey` if the id exists
    pub fn add_value(&self, collection: Collection, record: Value) -> Result<String> {
        let id = record_id(&record)?;
        self.write_txn(collection, |doc| {
            if doc.records.contains_key(&id) {
                return Err(Error::DuplicateKey {
                    collection: collection.name().to_string(),
                    id: id.clone(),
                });
            }
            doc.insert(&id, record);
            Ok(())
        })?;
        debug!(collection = collection.name(), id = %id, "record added");
        Ok(id)
    }

    /// Insert or replace a record by id
    pub fn put_value(&self, collection: Collection, record: Value) -> Result<String> {
        let id = record_id(&record)?;
        self.write_txn(collection, |doc| {
            doc.insert(&id, record);
            Ok(())
        })?;
        debug!(collection = collection.name(), id = %id, "record stored");
        Ok(id)
    }

    pub fn get_value(&self, collection: Collection, id: &str) -> Result<Option<Value>> {
        self.read_txn(collection, |doc| Ok(doc.records.get(id).cloned()))
    }

    pub fn all_values(&self, collection: Collection) -> Result<Vec<Value>> {
        self.read_txn(collection, |doc| Ok(doc.records.values().cloned().collect()))
    }

    /// Records whose indexed field equals `value`
    pub fn query_values(
        &self,
        collection: Collection,
        index: &str,
        value: &Value,
    ) -> Result<Vec<Value>> {
        let key = value.to_string();
        self.read_txn(collection, |doc| {
            let entries = doc.indexes.get(index).ok_or_else(|| {
                Error::InvalidArgument(format!(
                    "collection '{}' has no index '{index}'",
                    collection.name()
                ))
            })?;
            Ok(entries
                .get(&key)
                .map(|ids| {
                    ids.iter()
                        .filter_map(|id| doc.records.get(id).cloned())
                        .collect()
                })
                .unwrap_or_default())
        })
    }

    // =========================================================================
    // Typed record operations
    // =========================================================================

    pub fn add<T: Serialize>(&self, collection: Collection, item: &T) -> Result<String> {
        self.add_value(collection, serde_json::to_value(item)?)
    }

    pub fn put<T: Serialize>(&self, collection: Collection, item: &T) -> Result<String> {
        self.put_value(collection, serde_json::to_value(item)?)
    }

    /// Fetch a record; absence is `Ok(None)`
    pub fn get<T: DeserializeOwned>(&self, collection: Collection, id: &str) -> Result<Option<T>> {
        self.get_value(collection, id)?
            .map(|value| decode(collection, value))
            .transpose()
    }

    /// All records in unspecified order. Records that no longer decode are
    /// skipped with a warning; `get` still reports them as `Format` errors.
    pub fn get_all<T: DeserializeOwned>(&self, collection: Collection) -> Result<Vec<T>> {
        Ok(decode_valid(collection, self.all_values(collection)?))
    }

    pub fn query_by_index<T: DeserializeOwned, V: Serialize>(
        &self,
        collection: Collection,
        index: &str,
        value: &V,
    ) -> Result<Vec<T>> {
        let value = serde_json::to_value(value)?;
        Ok(decode_valid(
            collection,
            self.query_values(collection, index, &value)?,
        ))
    }

    /// Remove a record; no-op when absent. Returns whether it existed.
    pub fn delete(&self, collection: Collection, id: &str) -> Result<bool> {
        let existed = self.write_txn(collection, |doc| Ok(doc.remove(id).is_some()))?;
        debug!(collection = collection.name(), id = %id, existed, "record deleted");
        Ok(existed)
    }

    /// Remove every record from a collection, keeping its indexes
    pub fn clear(&self, collection: Collection) -> Result<usize> {
        let removed = self.write_txn(collection, |doc| {
            let count = doc.records.len();
            doc.clear();
            Ok(count)
        })?;
        info!(collection = collection.name(), removed, "collection cleared");
        Ok(removed)
    }

    pub fn count(&self, collection: Collection) -> Result<usize> {
        self.read_txn(collection, |doc| Ok(doc.records.len()))
    }
}

fn decode<T: DeserializeOwned>(collection: Collection, value: Value) -> Result<T> {
    let id = value
        .get(KEY_PATH)
        .and_then(Value::as_str)
        .unwrap_or("?")
        .to_string();
    serde_json::from_value(value).map_err(|err| {
        Error::Format(format!(
            "stored {} record {id} is malformed: {err}",
            collection.name()
        ))
    })
}

fn decode_valid<T: DeserializeOwned>(collection: Collection, values: Vec<Value>) -> Vec<T> {
    values
        .into_iter()
        .filter_map(|value| match decode(collection, value) {
            Ok(item) => Some(item),
            Err(err) => {
                warn!(
                    collection = collection.name(),
                    error = %err,
                    "skipping malformed record"
                );
                None
            }
        })
        .collect()
}
