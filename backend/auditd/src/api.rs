//! Axum REST API handlers.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use bursary_workflow::AuditEntry;
use serde::Serialize;
use sqlx::SqlitePool;

use crate::db;
use crate::db::AuditRow;

#[derive(Clone)]
pub struct ApiState {
    pub pool: SqlitePool,
}

// ─────────────────────────────────────────────────────────
// Response shapes
// ─────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct AuditResponse {
    pub count: usize,
    pub entries: Vec<AuditRow>,
}

#[derive(Serialize)]
pub struct ActorAuditResponse {
    pub actor: String,
    pub count: usize,
    pub entries: Vec<AuditRow>,
}

#[derive(Serialize)]
pub struct IngestResponse {
    pub inserted: bool,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

// ─────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────

/// `GET /health`
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// `POST /audit`
///
/// Append one audit entry from the workflow. Redelivery of the same entry
/// is acknowledged without a duplicate row.
pub async fn ingest(
    State(state): State<Arc<ApiState>>,
    Json(entry): Json<AuditEntry>,
) -> impl IntoResponse {
    match db::append_entry(&state.pool, &entry).await {
        Ok(inserted) => {
            let status = if inserted {
                StatusCode::CREATED
            } else {
                StatusCode::OK
            };
            (status, Json(serde_json::json!(IngestResponse { inserted }))).into_response()
        }
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!(ErrorResponse {
                error: e.to_string()
            })),
        )
            .into_response(),
    }
}

/// `GET /audit`
///
/// All audit entries, in insertion order.
pub async fn get_all_audit(State(state): State<Arc<ApiState>>) -> impl IntoResponse {
    match db::get_all_entries(&state.pool).await {
        Ok(entries) => {
            let count = entries.len();
            (
                StatusCode::OK,
                Json(serde_json::json!(AuditResponse { count, entries })),
            )
                .into_response()
        }
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!(ErrorResponse {
                error: e.to_string()
            })),
        )
            .into_response(),
    }
}

/// `GET /actors/:id/audit`
///
/// Entries where the given user appears as actor or target.
pub async fn get_actor_audit(
    State(state): State<Arc<ApiState>>,
    Path(actor): Path<String>,
) -> impl IntoResponse {
    match db::get_entries_for_user(&state.pool, &actor).await {
        Ok(entries) => {
            let count = entries.len();
            (
                StatusCode::OK,
                Json(serde_json::json!(ActorAuditResponse {
                    actor,
                    count,
                    entries,
                })),
            )
                .into_response()
        }
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!(ErrorResponse {
                error: e.to_string()
            })),
        )
            .into_response(),
    }
}
