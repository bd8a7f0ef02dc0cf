use serde::Serialize;
use utoipa::ToSchema;

use crate::dao::session_store::StoreCounts;

/// Health response returned by the `/healthcheck` route.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// Health status ("ok" or "degraded").
    pub status: String,
    /// Number of stored quizzes.
    pub quizzes: usize,
    /// Number of stored sessions.
    pub sessions: usize,
    /// Open realtime connections.
    pub connections: usize,
}

impl HealthResponse {
    /// Create a health response indicating the system is operational.
    pub fn ok(counts: StoreCounts, connections: usize) -> Self {
        Self {
            status: "ok".to_string(),
            quizzes: counts.quizzes,
            sessions: counts.sessions,
            connections,
        }
    }

    /// Whether the store answered the probe.
    pub fn is_ok(&self) -> bool {
        self.status == "ok"
    }

    /// Create a health response indicating the store could not be queried.
    pub fn degraded(connections: usize) -> Self {
        Self {
            status: "degraded".to_string(),
            quizzes: 0,
            sessions: 0,
            connections,
        }
    }
}
