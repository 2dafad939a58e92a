//! Collection-scoped query helpers.
//!
//! Each helper resolves `collection` against the given database handle at
//! call time and forwards to the store. Nothing is retried and absence is
//! reported as `None` or an empty result, never as an error.

use mongodb::bson::{Bson, Document};

use crate::store::{
    DbError, DeleteOutcome, FindAndModifyResult, FindOneAndUpdateOptions, FindOptions,
    InsertManyOutcome, InsertOneOutcome, StoreCollection, StoreDatabase, UpdateOutcome,
};

/// Distinct values of `field` across documents matching `filter` (all documents when `None`).
pub async fn distinct_database<D: StoreDatabase>(
    database: &D,
    collection: &str,
    field: &str,
    filter: Option<Document>,
) -> Result<Vec<Bson>, DbError> {
    tracing::debug!("distinct {} on {}.{}", field, database.name(), collection);
    database
        .collection(collection)
        .distinct(field, filter.unwrap_or_default())
        .await
}

pub async fn find_in_database<D: StoreDatabase>(
    database: &D,
    collection: &str,
    query: Document,
    options: Option<FindOptions>,
) -> Result<Vec<Document>, DbError> {
    tracing::debug!("find in {}.{}", database.name(), collection);
    database
        .collection(collection)
        .find(query, options.unwrap_or_default())
        .await
}

/// First document matching `query`, projected when a projection is given.
pub async fn find_one_in_database<D: StoreDatabase>(
    database: &D,
    collection: &str,
    query: Document,
    projection: Option<Document>,
) -> Result<Option<Document>, DbError> {
    tracing::debug!("findOne in {}.{}", database.name(), collection);
    database
        .collection(collection)
        .find_one(query, projection)
        .await
}

/// Atomically update the first match.
///
/// `value` holds the document before the update unless the options ask for
/// the state after it, and is `None` when nothing matched.
pub async fn find_one_and_update_in_database<D: StoreDatabase>(
    database: &D,
    collection: &str,
    query: Document,
    update: Document,
    options: Option<FindOneAndUpdateOptions>,
) -> Result<FindAndModifyResult, DbError> {
    tracing::debug!("findOneAndUpdate in {}.{}", database.name(), collection);
    let value = database
        .collection(collection)
        .find_one_and_update(query, update, options.unwrap_or_default())
        .await?;
    Ok(FindAndModifyResult { ok: true, value })
}

pub async fn find_one_and_delete_in_database<D: StoreDatabase>(
    database: &D,
    collection: &str,
    query: Document,
) -> Result<FindAndModifyResult, DbError> {
    tracing::debug!("findOneAndDelete in {}.{}", database.name(), collection);
    let value = database
        .collection(collection)
        .find_one_and_delete(query)
        .await?;
    Ok(FindAndModifyResult { ok: true, value })
}

pub async fn insert_one_to_database<D: StoreDatabase>(
    database: &D,
    collection: &str,
    document: Document,
) -> Result<InsertOneOutcome, DbError> {
    tracing::debug!("insertOne into {}.{}", database.name(), collection);
    database.collection(collection).insert_one(document).await
}

pub async fn insert_many_to_database<D: StoreDatabase>(
    database: &D,
    collection: &str,
    documents: Vec<Document>,
) -> Result<InsertManyOutcome, DbError> {
    tracing::debug!(
        "insertMany of {} documents into {}.{}",
        documents.len(),
        database.name(),
        collection
    );
    database.collection(collection).insert_many(documents).await
}

pub async fn update_one_in_database<D: StoreDatabase>(
    database: &D,
    collection: &str,
    query: Document,
    update: Document,
    upsert: bool,
) -> Result<UpdateOutcome, DbError> {
    tracing::debug!("updateOne in {}.{}", database.name(), collection);
    database
        .collection(collection)
        .update_one(query, update, upsert)
        .await
}

pub async fn update_in_database<D: StoreDatabase>(
    database: &D,
    collection: &str,
    query: Document,
    update: Document,
    upsert: bool,
) -> Result<UpdateOutcome, DbError> {
    tracing::debug!("updateMany in {}.{}", database.name(), collection);
    database
        .collection(collection)
        .update_many(query, update, upsert)
        .await
}

pub async fn remove_documents_from_collection<D: StoreDatabase>(
    database: &D,
    collection: &str,
    query: Document,
) -> Result<DeleteOutcome, DbError> {
    tracing::debug!("deleteMany from {}.{}", database.name(), collection);
    database.collection(collection).delete_many(query).await
}

pub async fn count_in_database<D: StoreDatabase>(
    database: &D,
    collection: &str,
    query: Document,
) -> Result<u64, DbError> {
    database.collection(collection).count_documents(query).await
}

pub async fn drop_collection<D: StoreDatabase>(
    database: &D,
    collection: &str,
) -> Result<(), DbError> {
    tracing::info!("Dropping collection {}.{}", database.name(), collection);
    database.collection(collection).drop_collection().await
}
