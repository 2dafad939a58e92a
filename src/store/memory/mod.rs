//! In-process document store.
//!
//! Implements the driver interface over shared in-memory collections so the
//! helper layer can run without a MongoDB server. Data outlives individual
//! clients: closing a client and connecting again sees the same documents,
//! the way a restarted process sees a running server.

pub mod filter;
pub mod projection;
pub mod update;

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use mongodb::bson::{Bson, Document, oid::ObjectId};
use parking_lot::RwLock;

use self::filter::{lookup_path, matches, values_equal};
use self::projection::apply_projection;
use self::update::{apply_update, upsert_seed, validate_update};
use super::{
    Connector, DbError, DeleteOutcome, FindOneAndUpdateOptions, FindOptions, InsertManyOutcome,
    InsertOneOutcome, ReturnDocument, StoreClient, StoreCollection, StoreDatabase, UpdateOutcome,
};

pub const DEFAULT_MEMORY_URL: &str = "memory://localhost/";

type Collections = HashMap<String, Vec<Document>>;

struct Shared {
    databases: RwLock<HashMap<String, Collections>>,
    reachable: AtomicBool,
}

/// Connector for the in-process store. Counts successful connects.
pub struct MemoryConnector {
    url: String,
    shared: Arc<Shared>,
    connects: AtomicUsize,
}

impl MemoryConnector {
    pub fn new() -> Self {
        Self::with_url(DEFAULT_MEMORY_URL)
    }

    pub fn with_url(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            shared: Arc::new(Shared {
                databases: RwLock::new(HashMap::new()),
                reachable: AtomicBool::new(true),
            }),
            connects: AtomicUsize::new(0),
        }
    }

    /// Simulate the server going away (or coming back). Affects open clients too.
    pub fn set_reachable(&self, reachable: bool) {
        self.shared.reachable.store(reachable, Ordering::SeqCst);
    }

    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

impl Default for MemoryConnector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Connector for MemoryConnector {
    type Client = MemoryClient;

    async fn connect(&self) -> Result<MemoryClient, DbError> {
        if !self.shared.reachable.load(Ordering::SeqCst) {
            return Err(DbError::Unreachable(format!(
                "server selection failed for {}",
                self.url
            )));
        }
        self.connects.fetch_add(1, Ordering::SeqCst);
        Ok(MemoryClient {
            url: self.url.clone(),
            shared: self.shared.clone(),
            open: Arc::new(AtomicBool::new(true)),
        })
    }
}

#[derive(Clone)]
pub struct MemoryClient {
    url: String,
    shared: Arc<Shared>,
    open: Arc<AtomicBool>,
}

impl std::fmt::Debug for MemoryClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryClient")
            .field("url", &self.url)
            .field("open", &self.open.load(Ordering::SeqCst))
            .finish()
    }
}

#[async_trait]
impl StoreClient for MemoryClient {
    type Database = MemoryDatabase;

    fn url(&self) -> &str {
        &self.url
    }

    fn database(&self, name: &str) -> MemoryDatabase {
        MemoryDatabase {
            name: name.to_string(),
            shared: self.shared.clone(),
            open: self.open.clone(),
        }
    }

    async fn ping(&self) -> Result<(), DbError> {
        available(&self.shared, &self.open)
    }

    async fn shutdown(self) {
        self.open.store(false, Ordering::SeqCst);
    }
}

fn available(shared: &Shared, open: &AtomicBool) -> Result<(), DbError> {
    if !open.load(Ordering::SeqCst) {
        return Err(DbError::Unreachable("client has been closed".to_string()));
    }
    if !shared.reachable.load(Ordering::SeqCst) {
        return Err(DbError::Unreachable("connection to server lost".to_string()));
    }
    Ok(())
}

pub struct MemoryDatabase {
    name: String,
    shared: Arc<Shared>,
    open: Arc<AtomicBool>,
}

impl StoreDatabase for MemoryDatabase {
    type Collection = MemoryCollection;

    fn name(&self) -> &str {
        &self.name
    }

    fn collection(&self, name: &str) -> MemoryCollection {
        MemoryCollection {
            database: self.name.clone(),
            name: name.to_string(),
            shared: self.shared.clone(),
            open: self.open.clone(),
        }
    }
}

pub struct MemoryCollection {
    database: String,
    name: String,
    shared: Arc<Shared>,
    open: Arc<AtomicBool>,
}

impl MemoryCollection {
    fn read<R>(&self, f: impl FnOnce(&[Document]) -> Result<R, DbError>) -> Result<R, DbError> {
        available(&self.shared, &self.open)?;
        let databases = self.shared.databases.read();
        let documents = databases
            .get(&self.database)
            .and_then(|collections| collections.get(&self.name))
            .map(Vec::as_slice)
            .unwrap_or(&[]);
        f(documents)
    }

    fn write<R>(
        &self,
        f: impl FnOnce(&mut Vec<Document>) -> Result<R, DbError>,
    ) -> Result<R, DbError> {
        available(&self.shared, &self.open)?;
        let mut databases = self.shared.databases.write();
        let documents = databases
            .entry(self.database.clone())
            .or_default()
            .entry(self.name.clone())
            .or_default();
        f(documents)
    }

    fn duplicate(&self, id: &Bson) -> DbError {
        DbError::DuplicateKey {
            collection: self.name.clone(),
            message: format!(
                "E11000 duplicate key error collection: {}.{} index: _id_ dup key: {{ _id: {} }}",
                self.database, self.name, id
            ),
        }
    }

    /// Append a document, assigning `_id` first when absent.
    fn push(&self, documents: &mut Vec<Document>, document: Document) -> Result<Bson, DbError> {
        let document = with_id(document);
        let id = document.get("_id").cloned().unwrap_or(Bson::Null);
        let taken = documents
            .iter()
            .filter_map(|existing| existing.get("_id"))
            .any(|existing| values_equal(existing, &id));
        if taken {
            return Err(self.duplicate(&id));
        }
        documents.push(document);
        Ok(id)
    }

    fn update(
        &self,
        filter: Document,
        update: Document,
        upsert: bool,
        multi: bool,
    ) -> Result<UpdateOutcome, DbError> {
        validate_update(&update)?;
        self.write(|documents| {
            let mut matched_count = 0;
            let mut modified_count = 0;
            for document in documents.iter_mut() {
                if !matches(document, &filter)? {
                    continue;
                }
                matched_count += 1;
                if apply_update(document, &update)? {
                    modified_count += 1;
                }
                if !multi {
                    break;
                }
            }

            let upserted_id = if matched_count == 0 && upsert {
                let seed = upsert_seed(&filter, &update)?;
                Some(self.push(documents, seed)?)
            } else {
                None
            };

            Ok(UpdateOutcome {
                matched_count,
                modified_count,
                upserted_id,
            })
        })
    }
}

fn with_id(document: Document) -> Document {
    if document.contains_key("_id") {
        return document;
    }
    let mut identified = Document::new();
    identified.insert("_id", ObjectId::new());
    for (key, value) in document {
        identified.insert(key, value);
    }
    identified
}

fn position(documents: &[Document], filter: &Document) -> Result<Option<usize>, DbError> {
    for (index, document) in documents.iter().enumerate() {
        if matches(document, filter)? {
            return Ok(Some(index));
        }
    }
    Ok(None)
}

fn project(document: Document, projection: Option<&Document>) -> Result<Document, DbError> {
    match projection {
        Some(projection) => apply_projection(&document, projection),
        None => Ok(document),
    }
}

#[async_trait]
impl StoreCollection for MemoryCollection {
    fn name(&self) -> &str {
        &self.name
    }

    async fn distinct(&self, field: &str, filter: Document) -> Result<Vec<Bson>, DbError> {
        self.read(|documents| {
            let mut values: Vec<Bson> = Vec::new();
            let mut remember = |value: &Bson| {
                if !values.iter().any(|seen| values_equal(seen, value)) {
                    values.push(value.clone());
                }
            };
            for document in documents {
                if !matches(document, &filter)? {
                    continue;
                }
                match lookup_path(document, field) {
                    Some(Bson::Array(items)) => items.iter().for_each(&mut remember),
                    Some(value) => remember(value),
                    None => {}
                }
            }
            Ok(values)
        })
    }

    async fn find(
        &self,
        filter: Document,
        options: FindOptions,
    ) -> Result<Vec<Document>, DbError> {
        let limit = match options.limit {
            Some(n) if n != 0 => n.unsigned_abs() as usize,
            _ => usize::MAX,
        };
        self.read(|documents| {
            let mut found = Vec::new();
            for document in documents {
                if found.len() >= limit {
                    break;
                }
                if matches(document, &filter)? {
                    found.push(project(document.clone(), options.projection.as_ref())?);
                }
            }
            Ok(found)
        })
    }

    async fn find_one(
        &self,
        filter: Document,
        projection: Option<Document>,
    ) -> Result<Option<Document>, DbError> {
        self.read(|documents| {
            position(documents, &filter)?
                .map(|index| project(documents[index].clone(), projection.as_ref()))
                .transpose()
        })
    }

    async fn find_one_and_update(
        &self,
        filter: Document,
        update: Document,
        options: FindOneAndUpdateOptions,
    ) -> Result<Option<Document>, DbError> {
        validate_update(&update)?;
        self.write(|documents| {
            let value = match position(documents, &filter)? {
                Some(index) => {
                    let before = documents[index].clone();
                    let mut after = before.clone();
                    apply_update(&mut after, &update)?;
                    documents[index] = after.clone();
                    match options.return_document {
                        ReturnDocument::Before => Some(before),
                        ReturnDocument::After => Some(after),
                    }
                }
                None if options.upsert => {
                    let seed = with_id(upsert_seed(&filter, &update)?);
                    self.push(documents, seed.clone())?;
                    match options.return_document {
                        ReturnDocument::Before => None,
                        ReturnDocument::After => Some(seed),
                    }
                }
                None => None,
            };
            value
                .map(|document| project(document, options.projection.as_ref()))
                .transpose()
        })
    }

    async fn find_one_and_delete(&self, filter: Document) -> Result<Option<Document>, DbError> {
        self.write(|documents| {
            Ok(position(documents, &filter)?.map(|index| documents.remove(index)))
        })
    }

    async fn insert_one(&self, document: Document) -> Result<InsertOneOutcome, DbError> {
        self.write(|documents| {
            let inserted_id = self.push(documents, document)?;
            Ok(InsertOneOutcome {
                acknowledged: true,
                inserted_id,
            })
        })
    }

    async fn insert_many(&self, documents: Vec<Document>) -> Result<InsertManyOutcome, DbError> {
        self.write(|stored| {
            // ordered: stop at the first failure, keeping what was inserted before it
            let inserted_ids = documents
                .into_iter()
                .map(|document| self.push(stored, document))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(InsertManyOutcome {
                acknowledged: true,
                inserted_ids,
            })
        })
    }

    async fn update_one(
        &self,
        filter: Document,
        update: Document,
        upsert: bool,
    ) -> Result<UpdateOutcome, DbError> {
        self.update(filter, update, upsert, false)
    }

    async fn update_many(
        &self,
        filter: Document,
        update: Document,
        upsert: bool,
    ) -> Result<UpdateOutcome, DbError> {
        self.update(filter, update, upsert, true)
    }

    async fn delete_many(&self, filter: Document) -> Result<DeleteOutcome, DbError> {
        self.write(|documents| {
            let doomed = documents
                .iter()
                .map(|document| matches(document, &filter))
                .collect::<Result<Vec<bool>, _>>()?;
            let mut flags = doomed.iter();
            documents.retain(|_| !flags.next().copied().unwrap_or(false));
            Ok(DeleteOutcome {
                deleted_count: doomed.iter().filter(|d| **d).count() as u64,
            })
        })
    }

    async fn count_documents(&self, filter: Document) -> Result<u64, DbError> {
        self.read(|documents| {
            let mut count = 0;
            for document in documents {
                if matches(document, &filter)? {
                    count += 1;
                }
            }
            Ok(count)
        })
    }

    async fn drop_collection(&self) -> Result<(), DbError> {
        available(&self.shared, &self.open)?;
        if let Some(collections) = self.shared.databases.write().get_mut(&self.database) {
            collections.remove(&self.name);
        }
        Ok(())
    }
}
