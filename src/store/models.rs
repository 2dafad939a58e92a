use mongodb::bson::{Bson, Document};
use serde::Serialize;

/// Which state of the document `find_one_and_update` hands back.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReturnDocument {
    #[default]
    Before,
    After,
}

#[derive(Debug, Clone, Default)]
pub struct FindOptions {
    pub projection: Option<Document>,
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Default)]
pub struct FindOneAndUpdateOptions {
    pub return_document: ReturnDocument,
    pub upsert: bool,
    pub projection: Option<Document>,
}

impl FindOneAndUpdateOptions {
    pub fn return_after() -> Self {
        Self {
            return_document: ReturnDocument::After,
            ..Default::default()
        }
    }
}

/// Envelope returned by `find_one_and_update`; `value` is `None` when nothing matched.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FindAndModifyResult {
    pub ok: bool,
    pub value: Option<Document>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InsertOneOutcome {
    pub acknowledged: bool,
    pub inserted_id: Bson,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InsertManyOutcome {
    pub acknowledged: bool,
    pub inserted_ids: Vec<Bson>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpdateOutcome {
    pub matched_count: u64,
    pub modified_count: u64,
    pub upserted_id: Option<Bson>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeleteOutcome {
    pub deleted_count: u64,
}
