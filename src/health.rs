use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode};
use serde::Serialize;

use crate::AppState;
use crate::store::{Connector, StoreClient};

#[derive(Debug, Serialize)]
pub struct HealthCheckResponse {
    status: String,
    database: String,
}

pub async fn health_check<K: Connector>(
    State(state): State<Arc<AppState<K>>>,
) -> (StatusCode, Json<HealthCheckResponse>) {
    let database = match state.connection.current_connection() {
        None => "disconnected",
        Some(client) => match client.ping().await {
            Ok(()) => "connected",
            Err(e) => {
                tracing::warn!("Health check ping failed: {}", e);
                "unreachable"
            }
        },
    };

    let (code, status) = if database == "connected" {
        (StatusCode::OK, "ok")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded")
    };
    let response = HealthCheckResponse {
        status: status.to_string(),
        database: database.to_string(),
    };
    (code, Json(response))
}
