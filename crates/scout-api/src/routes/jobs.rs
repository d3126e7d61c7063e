//! Job-run history.

use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};

use scout_store::jobs;

use crate::error::AppError;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/jobs", get(list_jobs))
}

#[derive(Debug, Deserialize)]
pub struct JobsQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    50
}

/// Recent job runs, newest first.
#[utoipa::path(
    get,
    path = "/api/jobs",
    params(("limit" = Option<i64>, Query, description = "Max rows (1–500)")),
    responses((status = 200, description = "Recent job runs"))
)]
pub async fn list_jobs(
    State(state): State<AppState>,
    Query(query): Query<JobsQuery>,
) -> Result<Json<Vec<Value>>, AppError> {
    let limit = query.limit.clamp(1, 500);
    let rows = jobs::recent(&state.pool, limit).await?;
    Ok(Json(
        rows.into_iter()
            .map(|row| {
                json!({
                    "id": row.id,
                    "job_name": row.job_name,
                    "scope": row.scope,
                    "status": row.status,
                    "started_at": row.started_at.to_rfc3339(),
                    "finished_at": row.finished_at.map(|t| t.to_rfc3339()),
                    "processed_count": row.processed_count,
                    "details": row.details,
                    "error": row.error,
                })
            })
            .collect(),
    ))
}
