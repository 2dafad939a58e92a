#![allow(dead_code)]

use docdb_helper::config::DatabaseConfig;
use docdb_helper::db_helper;
use docdb_helper::store::StoreDatabase;
use mongodb::bson::{Document, doc, oid::ObjectId};

pub fn oid(hex: &str) -> ObjectId {
    ObjectId::parse_str(hex).unwrap()
}

pub fn test_insert() -> Vec<Document> {
    vec![
        doc! {
            "_id": oid("5f99562a09aef91cd19fbb93"),
            "name": "App1",
            "description": "Test",
            "owner": "1LZe3AUYQC4aT5YWLhgEcH1nLLdoKNBi9t",
        },
        doc! {
            "_id": oid("5fa25bf73ba9312a4d83712d"),
            "name": "App1",
            "description": "Test",
            "owner": "1LZe3AUYQC4aT5YWLhgEcH1nLLdoKNBi9u",
        },
        doc! {
            "_id": oid("5fb48e724b82682e2bd22269"),
            "name": "App2",
            "description": "Test3",
            "owner": "1LZe3AUYQC4aT5YWLhgEcH1nLLdoKNBi9w",
        },
        doc! {
            "_id": oid("5fec239ec4ef4d416e70ac61"),
            "name": "App3",
            "description": "Test3",
            "owner": "1LZe3AUYQC4aT5YWLhgEcH1nLLdoKNBi9x",
        },
    ]
}

pub fn config() -> DatabaseConfig {
    DatabaseConfig::default()
}

/// Drop the collection and load the four fixture documents into it.
pub async fn reset_collection<D: StoreDatabase>(database: &D, collection: &str) {
    db_helper::drop_collection(database, collection).await.unwrap();
    db_helper::insert_many_to_database(database, collection, test_insert())
        .await
        .unwrap();
}
