mod common;

use common::{config, oid, reset_collection, test_insert};
use docdb_helper::DbError;
use docdb_helper::connection::ConnectionManager;
use docdb_helper::db_helper::*;
use docdb_helper::store::memory::{MemoryConnector, MemoryDatabase};
use docdb_helper::store::{FindOneAndUpdateOptions, FindOptions, StoreClient};
use mongodb::bson::{Bson, doc};

/// Open a fresh store and seed the apps information collection.
async fn apps_global() -> (MemoryDatabase, String) {
    let manager = ConnectionManager::new(MemoryConnector::new());
    manager.initiate().await.unwrap();
    let client = manager.current_connection().unwrap();

    let settings = config().apps_global;
    let database = client.database(&settings.database);
    reset_collection(&database, &settings.apps_information).await;
    (database, settings.apps_information)
}

async fn local() -> (MemoryDatabase, String) {
    let client = ConnectionManager::new(MemoryConnector::new())
        .initiate()
        .await
        .unwrap();
    let settings = config().local;
    let database = client.database(&settings.database);
    reset_collection(&database, &settings.logged_users).await;
    (database, settings.logged_users)
}

fn strings(values: &[&str]) -> Vec<Bson> {
    values.iter().map(|v| Bson::String(v.to_string())).collect()
}

#[tokio::test]
async fn test_distinct_without_filter() {
    for (database, collection) in [local().await, apps_global().await] {
        let values = distinct_database(&database, &collection, "description", None)
            .await
            .unwrap();
        assert_eq!(values, strings(&["Test", "Test3"]));
    }
}

#[tokio::test]
async fn test_distinct_with_filter() {
    for (database, collection) in [local().await, apps_global().await] {
        let values = distinct_database(
            &database,
            &collection,
            "description",
            Some(doc! { "name": "App1" }),
        )
        .await
        .unwrap();
        assert_eq!(values, strings(&["Test"]));
    }
}

#[tokio::test]
async fn test_distinct_unknown_field_or_empty_match() {
    let (database, collection) = apps_global().await;
    let values = distinct_database(&database, &collection, "test", None)
        .await
        .unwrap();
    assert!(values.is_empty());

    let values = distinct_database(
        &database,
        &collection,
        "description",
        Some(doc! { "name": "Nope" }),
    )
    .await
    .unwrap();
    assert!(values.is_empty());
}

#[tokio::test]
async fn test_find_one_without_projection() {
    let (database, collection) = apps_global().await;
    let found = find_one_in_database(&database, &collection, doc! { "name": "App1" }, None)
        .await
        .unwrap();
    assert_eq!(found, Some(test_insert()[0].clone()));
}

#[tokio::test]
async fn test_find_one_with_projection() {
    let (database, collection) = apps_global().await;
    let found = find_one_in_database(
        &database,
        &collection,
        doc! { "name": "App1" },
        Some(doc! { "_id": 0, "name": 1, "owner": 1 }),
    )
    .await
    .unwrap()
    .unwrap();
    assert_eq!(
        found,
        doc! { "name": "App1", "owner": "1LZe3AUYQC4aT5YWLhgEcH1nLLdoKNBi9t" }
    );
    assert_eq!(found.len(), 2);
}

#[tokio::test]
async fn test_find_one_no_match_is_none() {
    let (database, collection) = apps_global().await;
    let found = find_one_in_database(&database, &collection, doc! { "name": "Test1234" }, None)
        .await
        .unwrap();
    assert!(found.is_none());
}

fn new_description() -> mongodb::bson::Document {
    doc! { "$set": { "description": "New Description", "owner": "1SZe3AUYQC4aT5YWLhgEcH1nLLdoKNSi9a" } }
}

fn updated_app1() -> mongodb::bson::Document {
    doc! {
        "_id": oid("5f99562a09aef91cd19fbb93"),
        "name": "App1",
        "description": "New Description",
        "owner": "1SZe3AUYQC4aT5YWLhgEcH1nLLdoKNSi9a",
    }
}

#[tokio::test]
async fn test_find_one_and_update_returns_previous_by_default() {
    let (database, collection) = apps_global().await;
    let query = doc! { "_id": oid("5f99562a09aef91cd19fbb93") };

    let response = find_one_and_update_in_database(
        &database,
        &collection,
        query.clone(),
        new_description(),
        None,
    )
    .await
    .unwrap();
    assert!(response.ok);
    assert_eq!(response.value, Some(test_insert()[0].clone()));

    let stored = find_one_in_database(&database, &collection, query, None)
        .await
        .unwrap();
    assert_eq!(stored, Some(updated_app1()));
}

#[tokio::test]
async fn test_find_one_and_update_returns_new_document() {
    let (database, collection) = apps_global().await;
    let response = find_one_and_update_in_database(
        &database,
        &collection,
        doc! { "_id": oid("5f99562a09aef91cd19fbb93") },
        new_description(),
        Some(FindOneAndUpdateOptions::return_after()),
    )
    .await
    .unwrap();
    assert!(response.ok);
    assert_eq!(response.value, Some(updated_app1()));
}

#[tokio::test]
async fn test_find_one_and_update_missing_document() {
    let (database, collection) = apps_global().await;
    let response = find_one_and_update_in_database(
        &database,
        &collection,
        doc! { "_id": oid("5f91562a011ef91cd19fbb93") },
        new_description(),
        None,
    )
    .await
    .unwrap();
    assert!(response.ok);
    assert!(response.value.is_none());
    assert_eq!(
        count_in_database(&database, &collection, doc! { "description": "New Description" })
            .await
            .unwrap(),
        0
    );
}

#[tokio::test]
async fn test_find_one_and_update_rejects_malformed_update() {
    let (database, collection) = apps_global().await;
    let err = find_one_and_update_in_database(
        &database,
        &collection,
        doc! { "name": "App1" },
        doc! { "$frobnicate": { "name": "x" } },
        None,
    )
    .await
    .unwrap_err();
    assert!(matches!(err, DbError::InvalidExpression(_)));
}

#[tokio::test]
async fn test_insert_one_round_trip() {
    let (database, collection) = apps_global().await;
    let document = doc! {
        "_id": oid("4f99562a09aef92cd1afbe93"),
        "name": "App5",
        "description": "Test3",
        "owner": "1SZe3AUYQC4aT5Y0LhgEcH2nLLdoKNSi9e",
    };

    let response = insert_one_to_database(&database, &collection, document.clone())
        .await
        .unwrap();
    assert!(response.acknowledged);
    assert_eq!(response.inserted_id, Bson::ObjectId(oid("4f99562a09aef92cd1afbe93")));

    let stored = find_one_in_database(
        &database,
        &collection,
        doc! { "_id": oid("4f99562a09aef92cd1afbe93") },
        None,
    )
    .await
    .unwrap();
    assert_eq!(stored, Some(document));
}

#[tokio::test]
async fn test_insert_one_assigns_identifier() {
    let (database, collection) = apps_global().await;
    let response = insert_one_to_database(&database, &collection, doc! { "name": "App6" })
        .await
        .unwrap();
    let stored = find_one_in_database(
        &database,
        &collection,
        doc! { "_id": response.inserted_id.clone() },
        None,
    )
    .await
    .unwrap()
    .unwrap();
    assert_eq!(stored.get_str("name").unwrap(), "App6");
}

#[tokio::test]
async fn test_insert_one_duplicate_identifier() {
    let (database, collection) = apps_global().await;
    let err = insert_one_to_database(&database, &collection, test_insert()[2].clone())
        .await
        .unwrap_err();
    assert!(err.is_duplicate_key());
    assert_eq!(count_in_database(&database, &collection, doc! {}).await.unwrap(), 4);
}

#[tokio::test]
async fn test_find_in_database_with_options() {
    let (database, collection) = apps_global().await;
    let found = find_in_database(
        &database,
        &collection,
        doc! { "description": "Test3" },
        Some(FindOptions {
            projection: Some(doc! { "_id": 0, "name": 1 }),
            limit: None,
        }),
    )
    .await
    .unwrap();
    assert_eq!(found, vec![doc! { "name": "App2" }, doc! { "name": "App3" }]);
}

#[tokio::test]
async fn test_update_and_remove_helpers() {
    let (database, collection) = apps_global().await;

    let outcome = update_one_in_database(
        &database,
        &collection,
        doc! { "name": "App1" },
        doc! { "$set": { "height": 1 } },
        false,
    )
    .await
    .unwrap();
    assert_eq!((outcome.matched_count, outcome.modified_count), (1, 1));

    let outcome = update_in_database(
        &database,
        &collection,
        doc! { "description": "Test3" },
        doc! { "$set": { "expired": true } },
        false,
    )
    .await
    .unwrap();
    assert_eq!(outcome.modified_count, 2);

    let removed = find_one_and_delete_in_database(&database, &collection, doc! { "name": "App3" })
        .await
        .unwrap();
    let mut expected = test_insert()[3].clone();
    expected.insert("expired", true);
    assert!(removed.ok);
    assert_eq!(removed.value, Some(expected));

    let outcome = remove_documents_from_collection(&database, &collection, doc! { "name": "App1" })
        .await
        .unwrap();
    assert_eq!(outcome.deleted_count, 2);
    assert_eq!(count_in_database(&database, &collection, doc! {}).await.unwrap(), 1);
}

#[tokio::test]
async fn test_operations_fail_after_connection_lost() {
    let manager = ConnectionManager::new(MemoryConnector::new());
    let client = manager.initiate().await.unwrap();
    let database = client.database("globaldb");
    reset_collection(&database, "appsinformation").await;

    manager.close().await;
    let err = find_one_in_database(&database, "appsinformation", doc! {}, None)
        .await
        .unwrap_err();
    assert!(err.is_connectivity());
}

#[tokio::test]
async fn test_find_one_and_update_rejects_increment_overflow() {
    let (database, collection) = apps_global().await;
    insert_one_to_database(&database, &collection, doc! { "_id": 1, "hits": i64::MAX })
        .await
        .unwrap();

    let err = find_one_and_update_in_database(
        &database,
        &collection,
        doc! { "_id": 1 },
        doc! { "$inc": { "hits": 1_i64 } },
        None,
    )
    .await
    .unwrap_err();
    assert!(matches!(err, DbError::InvalidExpression(_)));

    let stored = find_one_in_database(&database, &collection, doc! { "_id": 1 }, None)
        .await
        .unwrap();
    assert_eq!(stored, Some(doc! { "_id": 1, "hits": i64::MAX }));
}
