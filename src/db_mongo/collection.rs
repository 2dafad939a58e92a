use async_trait::async_trait;
use futures_util::TryStreamExt;
use mongodb::{
    Collection,
    bson::{Bson, Document},
    options::ReturnDocument as DriverReturnDocument,
};

use super::errors::classify;
use crate::store::{
    DbError, DeleteOutcome, FindOneAndUpdateOptions, FindOptions, InsertManyOutcome,
    InsertOneOutcome, ReturnDocument, StoreCollection, UpdateOutcome,
};

#[derive(Debug, Clone)]
pub struct MongoCollection {
    inner: Collection<Document>,
}

impl MongoCollection {
    pub fn new(inner: Collection<Document>) -> Self {
        Self { inner }
    }

    fn error(&self, err: mongodb::error::Error) -> DbError {
        classify(err, self.inner.name())
    }

    async fn update(
        &self,
        filter: Document,
        update: Document,
        upsert: bool,
        multi: bool,
    ) -> Result<UpdateOutcome, DbError> {
        let result = if multi {
            self.inner.update_many(filter, update).upsert(upsert).await
        } else {
            self.inner.update_one(filter, update).upsert(upsert).await
        };
        let result = result.map_err(|e| self.error(e))?;

        Ok(UpdateOutcome {
            matched_count: result.matched_count,
            modified_count: result.modified_count,
            upserted_id: result.upserted_id,
        })
    }
}

#[async_trait]
impl StoreCollection for MongoCollection {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn distinct(&self, field: &str, filter: Document) -> Result<Vec<Bson>, DbError> {
        self.inner
            .distinct(field, filter)
            .await
            .map_err(|e| self.error(e))
    }

    async fn find(
        &self,
        filter: Document,
        options: FindOptions,
    ) -> Result<Vec<Document>, DbError> {
        let mut action = self.inner.find(filter);
        if let Some(projection) = options.projection {
            action = action.projection(projection);
        }
        if let Some(limit) = options.limit {
            action = action.limit(limit);
        }
        let cursor = action.await.map_err(|e| self.error(e))?;
        cursor.try_collect().await.map_err(|e| self.error(e))
    }

    async fn find_one(
        &self,
        filter: Document,
        projection: Option<Document>,
    ) -> Result<Option<Document>, DbError> {
        let mut action = self.inner.find_one(filter);
        if let Some(projection) = projection {
            action = action.projection(projection);
        }
        action.await.map_err(|e| self.error(e))
    }

    async fn find_one_and_update(
        &self,
        filter: Document,
        update: Document,
        options: FindOneAndUpdateOptions,
    ) -> Result<Option<Document>, DbError> {
        let return_document = match options.return_document {
            ReturnDocument::Before => DriverReturnDocument::Before,
            ReturnDocument::After => DriverReturnDocument::After,
        };
        let mut action = self
            .inner
            .find_one_and_update(filter, update)
            .return_document(return_document)
            .upsert(options.upsert);
        if let Some(projection) = options.projection {
            action = action.projection(projection);
        }
        action.await.map_err(|e| self.error(e))
    }

    async fn find_one_and_delete(&self, filter: Document) -> Result<Option<Document>, DbError> {
        self.inner
            .find_one_and_delete(filter)
            .await
            .map_err(|e| self.error(e))
    }

    async fn insert_one(&self, document: Document) -> Result<InsertOneOutcome, DbError> {
        let result = self
            .inner
            .insert_one(document)
            .await
            .map_err(|e| self.error(e))?;
        Ok(InsertOneOutcome {
            acknowledged: true,
            inserted_id: result.inserted_id,
        })
    }

    async fn insert_many(&self, documents: Vec<Document>) -> Result<InsertManyOutcome, DbError> {
        let result = self
            .inner
            .insert_many(documents)
            .await
            .map_err(|e| self.error(e))?;
        let mut inserted: Vec<(usize, Bson)> = result.inserted_ids.into_iter().collect();
        inserted.sort_by_key(|(index, _)| *index);
        Ok(InsertManyOutcome {
            acknowledged: true,
            inserted_ids: inserted.into_iter().map(|(_, id)| id).collect(),
        })
    }

    async fn update_one(
        &self,
        filter: Document,
        update: Document,
        upsert: bool,
    ) -> Result<UpdateOutcome, DbError> {
        self.update(filter, update, upsert, false).await
    }

    async fn update_many(
        &self,
        filter: Document,
        update: Document,
        upsert: bool,
    ) -> Result<UpdateOutcome, DbError> {
        self.update(filter, update, upsert, true).await
    }

    async fn delete_many(&self, filter: Document) -> Result<DeleteOutcome, DbError> {
        let result = self
            .inner
            .delete_many(filter)
            .await
            .map_err(|e| self.error(e))?;
        Ok(DeleteOutcome {
            deleted_count: result.deleted_count,
        })
    }

    async fn count_documents(&self, filter: Document) -> Result<u64, DbError> {
        self.inner
            .count_documents(filter)
            .await
            .map_err(|e| self.error(e))
    }

    async fn drop_collection(&self) -> Result<(), DbError> {
        self.inner.drop().await.map_err(|e| self.error(e))
    }
}
