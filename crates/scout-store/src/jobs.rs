//! Job-run ledger and per-job checkpoints.
//!
//! Every batch worker wraps its work in `start` / `complete`-or-`fail` so
//! operators can see each batch's outcome. Checkpoints are upserted on
//! `(job_name, scope, checkpoint_key)` and deliberately survive the run
//! that wrote them.

use serde_json::Value;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::models::JobRunRow;

/// Scope used when the caller passes none.
pub const GLOBAL_SCOPE: &str = "__global__";

/// Normalize an operator-supplied scope: empty/whitespace → `__global__`.
pub fn normalize_scope(scope: Option<&str>) -> String {
    match scope.map(str::trim) {
        Some(s) if !s.is_empty() => s.to_string(),
        _ => GLOBAL_SCOPE.to_string(),
    }
}

/// Insert a `running` job-run row and return its id.
pub async fn start(
    pool: &PgPool,
    job_name: &str,
    scope: Option<&str>,
    details: Option<&Value>,
) -> Result<Uuid, sqlx::Error> {
    let id: Uuid = sqlx::query_scalar(
        "INSERT INTO job_runs (job_name, scope, status, details)
         VALUES ($1, $2, 'running', $3)
         RETURNING id",
    )
    .bind(job_name)
    .bind(normalize_scope(scope))
    .bind(details)
    .fetch_one(pool)
    .await?;
    Ok(id)
}

/// Mark a run successful.
pub async fn complete(
    pool: &PgPool,
    run_id: Uuid,
    processed_count: i64,
    details: Option<&Value>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE job_runs
         SET status = 'success',
             processed_count = $2,
             finished_at = now(),
             details = COALESCE($3, details)
         WHERE id = $1",
    )
    .bind(run_id)
    .bind(processed_count as i32)
    .bind(details)
    .execute(pool)
    .await?;
    Ok(())
}

/// Mark a run failed. The error message is truncated to 4000 chars so a
/// pathological stack dump cannot bloat the ledger.
pub async fn fail(
    pool: &PgPool,
    run_id: Uuid,
    error: &str,
    details: Option<&Value>,
) -> Result<(), sqlx::Error> {
    let truncated: String = error.chars().take(4000).collect();
    sqlx::query(
        "UPDATE job_runs
         SET status = 'failed',
             error = $2,
             finished_at = now(),
             details = COALESCE($3, details)
         WHERE id = $1",
    )
    .bind(run_id)
    .bind(truncated)
    .bind(details)
    .execute(pool)
    .await?;
    Ok(())
}

/// Upsert a checkpoint value on `(job_name, scope, checkpoint_key)`.
pub async fn set_checkpoint(
    conn: &mut PgConnection,
    job_name: &str,
    scope: Option<&str>,
    checkpoint_key: &str,
    checkpoint_value: &str,
    details: Option<&Value>,
    job_run_id: Option<Uuid>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO job_checkpoints
            (job_run_id, job_name, scope, checkpoint_key, checkpoint_value, details)
         VALUES ($1, $2, $3, $4, $5, $6)
         ON CONFLICT ON CONSTRAINT job_checkpoints_unique_scope_key_uidx
         DO UPDATE SET checkpoint_value = EXCLUDED.checkpoint_value,
                       details = EXCLUDED.details,
                       job_run_id = EXCLUDED.job_run_id,
                       updated_at = now()",
    )
    .bind(job_run_id)
    .bind(job_name)
    .bind(normalize_scope(scope))
    .bind(checkpoint_key)
    .bind(checkpoint_value)
    .bind(details)
    .execute(conn)
    .await?;
    Ok(())
}

/// Read the most recently updated checkpoint value for the triple.
pub async fn get_checkpoint(
    pool: &PgPool,
    job_name: &str,
    scope: Option<&str>,
    checkpoint_key: &str,
) -> Result<Option<String>, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT checkpoint_value FROM job_checkpoints
         WHERE job_name = $1 AND scope = $2 AND checkpoint_key = $3
         ORDER BY updated_at DESC, id DESC
         LIMIT 1",
    )
    .bind(job_name)
    .bind(normalize_scope(scope))
    .bind(checkpoint_key)
    .fetch_optional(pool)
    .await
}

/// Recent job runs, newest first, for the dashboard.
pub async fn recent(pool: &PgPool, limit: i64) -> Result<Vec<JobRunRow>, sqlx::Error> {
    sqlx::query_as::<_, JobRunRow>(
        "SELECT id, job_name, scope, status, started_at, finished_at,
                processed_count, details, error
         FROM job_runs
         ORDER BY started_at DESC
         LIMIT $1",
    )
    .bind(limit)
    .fetch_all(pool)
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scope_normalization() {
        assert_eq!(normalize_scope(None), GLOBAL_SCOPE);
        assert_eq!(normalize_scope(Some("")), GLOBAL_SCOPE);
        assert_eq!(normalize_scope(Some("   ")), GLOBAL_SCOPE);
        assert_eq!(normalize_scope(Some("toronto")), "toronto");
        assert_eq!(normalize_scope(Some("  dubai ")), "dubai");
    }
}
