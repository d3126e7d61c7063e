//! Dashboard metrics (JSON) and the Prometheus scrape endpoint.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Map, Value};

use scout_core::confidence::verification_confidence;
use scout_core::verdict::ALL_SOURCES;
use scout_store::{businesses, contact_pipeline, domains, exports, jobs};

use crate::error::AppError;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/metrics", get(dashboard_metrics))
        .route("/metrics", get(prometheus_metrics))
}

/// Aggregate pipeline metrics for the dashboard.
#[utoipa::path(
    get,
    path = "/api/metrics",
    responses((status = 200, description = "Aggregate pipeline metrics"))
)]
pub async fn dashboard_metrics(
    State(state): State<AppState>,
) -> Result<Json<Value>, AppError> {
    let pool = &state.pool;

    let (business_total, no_website_total, businesses_scored, no_website_scored) =
        businesses::totals(pool).await?;

    let domain_counts: Map<String, Value> = domains::status_counts(pool)
        .await?
        .into_iter()
        .map(|(status, count)| (status, json!(count)))
        .collect();

    let (contacts_total, contacts_scored) = contact_pipeline::contact_totals(pool).await?;
    let (contact_exports_total, contact_exports_queued) =
        contact_pipeline::contact_export_totals(pool).await?;
    let (business_exports_total, business_exports_queued) = exports::totals(pool).await?;

    // Verification coverage per source.
    let mut verification = Map::new();
    for source in ALL_SOURCES {
        let count = businesses::count_with_raw_key(pool, source.verified_key()).await?;
        verification.insert(source.as_str().to_string(), json!(count));
    }
    let all_keys: Vec<String> = ALL_SOURCES
        .iter()
        .map(|s| s.verified_key().to_string())
        .collect();
    verification.insert(
        "any_source".to_string(),
        json!(businesses::count_with_any_raw_key(pool, &all_keys).await?),
    );

    // Conclusive vs inconclusive breakdowns for the noisier sources.
    let conclusive = vec!["no_website".to_string(), "has_website".to_string()];
    let ddg_conclusive =
        businesses::count_results(pool, "ddg_verified", "ddg_verify_result", &conclusive).await?;
    let ddg_no_results = businesses::count_results(
        pool,
        "ddg_verified",
        "ddg_verify_result",
        &vec!["no_results".to_string()],
    )
    .await?;
    let llm_conclusive =
        businesses::count_results(pool, "llm_verified", "llm_verify_result", &conclusive).await?;
    let llm_not_sure = businesses::count_results(
        pool,
        "llm_verified",
        "llm_verify_result",
        &vec!["no_results".to_string(), "not_sure".to_string()],
    )
    .await?;
    let searxng_conclusive =
        businesses::count_results(pool, "searxng_verified", "searxng_result", &conclusive).await?;
    let searxng_no_results = businesses::count_results(
        pool,
        "searxng_verified",
        "searxng_result",
        &vec!["no_results".to_string()],
    )
    .await?;

    // Confidence distribution is a derived field, computed in process.
    let mut confidence_dist = Map::new();
    for level in ["high", "medium", "low", "unverified"] {
        confidence_dist.insert(level.to_string(), json!(0));
    }
    for raw in businesses::scored_no_website_raws(pool).await? {
        let level = verification_confidence(raw.as_ref()).as_str();
        let entry = confidence_dist.entry(level.to_string()).or_insert(json!(0));
        *entry = json!(entry.as_i64().unwrap_or(0) + 1);
    }

    let recent_jobs: Vec<Value> = jobs::recent(pool, 10)
        .await?
        .into_iter()
        .map(|job| {
            json!({
                "job_name": job.job_name,
                "status": job.status,
                "started_at": job.started_at.to_rfc3339(),
                "finished_at": job.finished_at.map(|t| t.to_rfc3339()),
                "processed_count": job.processed_count,
            })
        })
        .collect();

    Ok(Json(json!({
        "businesses": {
            "total": business_total,
            "no_website": no_website_total,
            "scored": businesses_scored,
            "no_website_scored": no_website_scored,
            "no_website_unscored": (no_website_total - no_website_scored).max(0),
        },
        "domains": domain_counts,
        "contacts": {
            "total": contacts_total,
            "scored": contacts_scored,
            "unscored": (contacts_total - contacts_scored).max(0),
        },
        "exports": {
            "total": contact_exports_total,
            "queued": contact_exports_queued,
        },
        "business_exports": {
            "total": business_exports_total,
            "queued": business_exports_queued,
        },
        "verification": verification,
        "verification_details": {
            "ddg_conclusive": ddg_conclusive,
            "ddg_no_results": ddg_no_results,
            "llm_conclusive": llm_conclusive,
            "llm_not_sure": llm_not_sure,
            "searxng_conclusive": searxng_conclusive,
            "searxng_no_results": searxng_no_results,
        },
        "confidence_distribution": confidence_dist,
        "recent_jobs": recent_jobs,
        "automation": state.controller.status(),
    })))
}

/// Prometheus text-format scrape endpoint.
pub async fn prometheus_metrics(State(state): State<AppState>) -> String {
    state.metrics.refresh_gauges(&state.pool).await;
    state.metrics.encode()
}
