use tracing::warn;

use crate::{dto::health::HealthResponse, state::SharedState};

/// Report store counts and open connections, degrading when the store cannot answer.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    let connections = state.rooms().connection_count();

    match state.store().counts().await {
        Ok(counts) => HealthResponse::ok(counts, connections),
        Err(err) => {
            warn!(error = %err, "storage health check failed");
            HealthResponse::degraded(connections)
        }
    }
}
