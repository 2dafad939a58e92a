pub mod error;
pub mod memory;
pub mod models;

use async_trait::async_trait;
use mongodb::bson::{Bson, Document};

pub use error::DbError;
pub use models::*;

/// Opens connections to a document store.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    type Client: StoreClient;

    async fn connect(&self) -> Result<Self::Client, DbError>;
}

/// Shared handle to an open store connection. Clones share the underlying session.
#[async_trait]
pub trait StoreClient: Clone + Send + Sync + 'static {
    type Database: StoreDatabase;

    /// Connection string this client was opened against
    fn url(&self) -> &str;

    fn database(&self, name: &str) -> Self::Database;

    async fn ping(&self) -> Result<(), DbError>;

    async fn shutdown(self);
}

pub trait StoreDatabase: Send + Sync {
    type Collection: StoreCollection;

    fn name(&self) -> &str;

    /// Resolve a collection by name. Nothing is validated until the first call.
    fn collection(&self, name: &str) -> Self::Collection;
}

/// Primitive operations on a single collection.
#[async_trait]
pub trait StoreCollection: Send + Sync {
    fn name(&self) -> &str;

    async fn distinct(&self, field: &str, filter: Document) -> Result<Vec<Bson>, DbError>;

    async fn find(&self, filter: Document, options: FindOptions)
        -> Result<Vec<Document>, DbError>;

    async fn find_one(
        &self,
        filter: Document,
        projection: Option<Document>,
    ) -> Result<Option<Document>, DbError>;

    async fn find_one_and_update(
        &self,
        filter: Document,
        update: Document,
        options: FindOneAndUpdateOptions,
    ) -> Result<Option<Document>, DbError>;

    async fn find_one_and_delete(&self, filter: Document) -> Result<Option<Document>, DbError>;

    async fn insert_one(&self, document: Document) -> Result<InsertOneOutcome, DbError>;

    async fn insert_many(&self, documents: Vec<Document>) -> Result<InsertManyOutcome, DbError>;

    async fn update_one(
        &self,
        filter: Document,
        update: Document,
        upsert: bool,
    ) -> Result<UpdateOutcome, DbError>;

    async fn update_many(
        &self,
        filter: Document,
        update: Document,
        upsert: bool,
    ) -> Result<UpdateOutcome, DbError>;

    async fn delete_many(&self, filter: Document) -> Result<DeleteOutcome, DbError>;

    async fn count_documents(&self, filter: Document) -> Result<u64, DbError>;

    /// Drop the collection. Dropping a collection that does not exist succeeds.
    async fn drop_collection(&self) -> Result<(), DbError>;
}
