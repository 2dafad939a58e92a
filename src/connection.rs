use parking_lot::RwLock;
use tokio::sync::Mutex;

use crate::store::{Connector, DbError, StoreClient};

/// Owns the process-wide store connection.
///
/// Lifecycle is uninitialized -> open -> closed; a closed manager only
/// reopens through an explicit `initiate`. `initiate` and `close` are
/// serialized with each other, readers never wait on them.
pub struct ConnectionManager<K: Connector> {
    connector: K,
    current: RwLock<Option<K::Client>>,
    lifecycle: Mutex<()>,
}

impl<K: Connector> ConnectionManager<K> {
    pub fn new(connector: K) -> Self {
        Self {
            connector,
            current: RwLock::new(None),
            lifecycle: Mutex::new(()),
        }
    }

    pub fn connector(&self) -> &K {
        &self.connector
    }

    /// Open the connection, or hand back the one already open.
    pub async fn initiate(&self) -> Result<K::Client, DbError> {
        let _guard = self.lifecycle.lock().await;
        let existing = self.current.read().clone();
        if let Some(client) = existing {
            tracing::debug!("Reusing open database connection to {}", client.url());
            return Ok(client);
        }

        let client = self.connector.connect().await?;
        tracing::info!("Database connection initiated ({})", client.url());
        *self.current.write() = Some(client.clone());
        Ok(client)
    }

    /// The live connection, or `None` before `initiate` and after `close`.
    pub fn current_connection(&self) -> Option<K::Client> {
        self.current.read().clone()
    }

    pub fn is_connected(&self) -> bool {
        self.current.read().is_some()
    }

    /// Release the connection. Calling it while already closed does nothing.
    pub async fn close(&self) {
        let _guard = self.lifecycle.lock().await;
        let Some(client) = self.current.write().take() else {
            return;
        };
        let url = client.url().to_string();
        client.shutdown().await;
        tracing::info!("Database connection to {} closed", url);
    }
}
