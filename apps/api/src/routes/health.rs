//! Liveness plus database ping.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use tracing::warn;

use crate::response::ApiResponse;
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthStatus {
    pub status: &'static str,
    pub version: &'static str,
    pub database: bool,
    pub migrations_applied: usize,
    pub migrations_total: usize,
    pub server_time: String,
}

pub async fn health(State(state): State<AppState>) -> Response {
    let database = state.db.health_check().await;
    let (migrations_total, migrations_applied) = match state.db.migration_status().await {
        Ok(counts) => counts,
        Err(e) => {
            warn!(error = %e, "Failed to read migration status");
            (0, 0)
        }
    };

    let healthy = database && migrations_total == migrations_applied;
    let body = HealthStatus {
        status: if healthy { "healthy" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        database,
        migrations_applied,
        migrations_total,
        server_time: chrono::Utc::now().to_rfc3339(),
    };

    if healthy {
        ApiResponse::ok(body).into_response()
    } else {
        let envelope = ApiResponse {
            success: false,
            data: Some(body),
            message: Some("Database unavailable".to_string()),
        };
        (StatusCode::SERVICE_UNAVAILABLE, envelope).into_response()
    }
}
