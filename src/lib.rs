pub mod config;
pub mod connection;
pub mod db_helper;
pub mod db_mongo;
pub mod health;
pub mod store;

use std::sync::Arc;

use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

use crate::connection::ConnectionManager;
use crate::health::health_check;
use crate::store::Connector;

pub use store::DbError;

pub struct AppState<K: Connector> {
    pub connection: ConnectionManager<K>,
}

pub fn router<K: Connector>(state: Arc<AppState<K>>) -> Router {
    Router::new()
        .route("/health", get(health_check::<K>))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
