pub mod collection;
pub mod errors;

use async_trait::async_trait;
use mongodb::{Client, bson::doc, options::ClientOptions};

use crate::config::DatabaseConfig;
use crate::store::{Connector, DbError, StoreClient, StoreDatabase};

pub use collection::MongoCollection;

/// Create MongoDB connection
pub async fn create_client(uri: &str, config: &DatabaseConfig) -> Result<MongoClient, DbError> {
    let mut options = ClientOptions::parse(uri)
        .await
        .map_err(|e| errors::classify(e, "admin"))?;
    options.app_name = Some(config.app_name.clone());
    options.connect_timeout = Some(config.connect_timeout);
    options.server_selection_timeout = Some(config.server_selection_timeout);

    let client = Client::with_options(options).map_err(|e| errors::classify(e, "admin"))?;

    // Ping to verify connection
    client
        .database("admin")
        .run_command(doc! {"ping": 1})
        .await
        .map_err(|e| errors::classify(e, "admin"))?;

    tracing::info!("Successfully connected to MongoDB at {}", uri);
    Ok(MongoClient {
        client,
        url: uri.to_string(),
    })
}

/// Opens MongoDB clients against the configured endpoint.
pub struct MongoConnector {
    config: DatabaseConfig,
}

impl MongoConnector {
    pub fn new(config: DatabaseConfig) -> Self {
        Self { config }
    }

    /// Open a fresh, unmanaged client. Defaults to the configured URL.
    pub async fn connect_mongodb(&self, url: Option<&str>) -> Result<MongoClient, DbError> {
        let url = url
            .map(str::to_string)
            .unwrap_or_else(|| self.config.mongo_url());
        create_client(&url, &self.config).await.inspect_err(|e| {
            tracing::error!("Failed to connect to MongoDB at {}: {}", url, e);
        })
    }
}

#[async_trait]
impl Connector for MongoConnector {
    type Client = MongoClient;

    async fn connect(&self) -> Result<MongoClient, DbError> {
        self.connect_mongodb(None).await
    }
}

#[derive(Debug, Clone)]
pub struct MongoClient {
    client: Client,
    url: String,
}

#[async_trait]
impl StoreClient for MongoClient {
    type Database = MongoDatabase;

    fn url(&self) -> &str {
        &self.url
    }

    fn database(&self, name: &str) -> MongoDatabase {
        MongoDatabase {
            db: self.client.database(name),
        }
    }

    async fn ping(&self) -> Result<(), DbError> {
        self.client
            .database("admin")
            .run_command(doc! {"ping": 1})
            .await
            .map(|_| ())
            .map_err(|e| errors::classify(e, "admin"))
    }

    async fn shutdown(self) {
        self.client.shutdown().await;
    }
}

/// Database handle resolved from a live client
#[derive(Debug, Clone)]
pub struct MongoDatabase {
    db: mongodb::Database,
}

impl StoreDatabase for MongoDatabase {
    type Collection = MongoCollection;

    fn name(&self) -> &str {
        self.db.name()
    }

    fn collection(&self, name: &str) -> MongoCollection {
        MongoCollection::new(self.db.collection(name))
    }
}
