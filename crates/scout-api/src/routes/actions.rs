//! Mutation endpoints. Every route here is mounted behind the auth
//! gate; none of them partially mutate on failure — each delegates to a
//! worker whose writes are transactional.

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};

use scout_export::leads::{export_business_leads, ExportParams};
use scout_sched::settings::{PipelineSettingsUpdate, VerificationSettingsUpdate};
use scout_verify::places::PlacesProvider;

use crate::error::AppError;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/actions/pipeline-run", post(pipeline_run))
        .route("/api/actions/daily-target-run", post(daily_target_run))
        .route("/api/actions/business-score", post(business_score))
        .route("/api/actions/validate-domains", post(validate_domains))
        .route("/api/actions/sync-domains", post(sync_domains))
        .route("/api/actions/domain-guess", post(domain_guess))
        .route("/api/actions/verify-websites-searxng", post(verify_searxng))
        .route("/api/actions/verify-websites-llm", post(verify_llm))
        .route("/api/actions/verify-websites-ddg", post(verify_ddg))
        .route(
            "/api/actions/verify-websites-google-search",
            post(verify_google_search),
        )
        .route("/api/actions/verify-websites", post(verify_places))
        .route(
            "/api/actions/verify-websites-foursquare",
            post(verify_foursquare),
        )
        .route("/api/actions/enrich-google-places", post(enrich_places))
        .route("/api/actions/enrich-foursquare", post(enrich_foursquare))
        .route("/api/actions/business-export", post(business_export))
        .route("/api/actions/automation/start", post(automation_start))
        .route("/api/actions/automation/stop", post(automation_stop))
        .route("/api/actions/automation/settings", post(automation_settings))
        .route("/api/actions/verification/start", post(verification_start))
        .route("/api/actions/verification/stop", post(verification_stop))
        .route(
            "/api/actions/verification/settings",
            post(verification_settings),
        )
        .route("/api/actions/test-notification", post(test_notification))
}

// ─── Request payloads ───────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BatchRequest {
    pub limit: Option<i64>,
    #[serde(default)]
    pub min_score: Option<f64>,
    pub scope: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScoreRequest {
    pub limit: Option<i64>,
    pub scope: Option<String>,
    #[serde(default)]
    pub force_rescore: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClassifyRequest {
    pub limit: Option<i64>,
    pub scope: Option<String>,
    pub statuses: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SyncRequest {
    pub limit: Option<i64>,
    pub scope: Option<String>,
    #[serde(default)]
    pub reset_cursor: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EnrichRequest {
    pub limit: Option<i64>,
    #[serde(default = "default_priority")]
    pub priority: String,
}

fn default_priority() -> String {
    "no_contacts".to_string()
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BusinessExportRequest {
    #[serde(default = "default_export_platform")]
    pub platform: String,
    pub min_score: Option<f64>,
    pub limit: Option<i64>,
    #[serde(default = "default_true")]
    pub require_contact: bool,
    #[serde(default)]
    pub require_unhosted_domain: bool,
    #[serde(default = "default_true")]
    pub require_domain_qualification: bool,
    #[serde(default = "default_true")]
    pub exclude_hosted_email_domain: bool,
}

fn default_export_platform() -> String {
    "csv_business".to_string()
}
fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NotificationRequest {
    #[serde(default = "default_notification_title")]
    pub title: String,
    #[serde(default = "default_notification_message")]
    pub message: String,
}

fn default_notification_title() -> String {
    "Test Notification".to_string()
}
fn default_notification_message() -> String {
    "webscout test notification".to_string()
}

// ─── Pipeline & scoring ─────────────────────────────────────────────────

async fn pipeline_run(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    let result = state.controller.run_cycle("manual").await;
    if result.get("busy").and_then(Value::as_bool).unwrap_or(false) {
        return Err(AppError::Conflict("pipeline is already running".into()));
    }
    Ok(Json(result))
}

async fn daily_target_run(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    let result = state.controller.run_daily_target_now().await;
    if result.get("busy").and_then(Value::as_bool).unwrap_or(false) {
        return Err(AppError::Conflict("pipeline is already running".into()));
    }
    Ok(Json(result))
}

async fn business_score(
    State(state): State<AppState>,
    Json(request): Json<ScoreRequest>,
) -> Result<Json<Value>, AppError> {
    let outcome = scout_score::score_businesses(
        &state.pool,
        state.config,
        request.limit,
        request.scope.as_deref(),
        request.force_rescore,
    )
    .await?;
    Ok(Json(json!({ "scored": outcome.processed })))
}

async fn validate_domains(
    State(state): State<AppState>,
    Json(request): Json<ClassifyRequest>,
) -> Result<Json<Value>, AppError> {
    let outcome = scout_classify::classifier::run_batch(
        &state.pool,
        state.config,
        request.limit,
        request.scope.as_deref(),
        request.statuses,
    )
    .await?;
    Ok(Json(json!({ "processed": outcome.processed })))
}

async fn sync_domains(
    State(state): State<AppState>,
    Json(request): Json<SyncRequest>,
) -> Result<Json<Value>, AppError> {
    let outcome = scout_classify::sync::run_batch(
        &state.pool,
        state.config.batch_size,
        request.limit,
        request.scope.as_deref(),
        request.reset_cursor,
    )
    .await?;
    Ok(Json(json!({
        "processed": outcome.processed,
        "domains_inserted": outcome.domains_inserted,
        "links_inserted": outcome.links_inserted,
    })))
}

// ─── Verifier triggers ──────────────────────────────────────────────────

fn verify_response(outcome: &scout_verify::VerifyOutcome) -> Json<Value> {
    Json(json!({
        "processed": outcome.processed,
        "websites_found": outcome.websites_found,
        "no_website_confirmed": outcome.no_website_confirmed,
        "inconclusive": outcome.inconclusive,
        "errors": outcome.errors,
    }))
}

async fn domain_guess(
    State(state): State<AppState>,
    Json(request): Json<BatchRequest>,
) -> Result<Json<Value>, AppError> {
    let outcome = scout_verify::name_guess::run_batch(
        &state.pool,
        state.config,
        request.limit,
        request.min_score.unwrap_or(0.0),
        request.scope.as_deref(),
    )
    .await?;
    Ok(verify_response(&outcome))
}

async fn verify_searxng(
    State(state): State<AppState>,
    Json(request): Json<BatchRequest>,
) -> Result<Json<Value>, AppError> {
    let outcome = scout_verify::meta_search::run_batch(
        &state.pool,
        state.config,
        request.limit,
        request.min_score.unwrap_or(0.0),
        request.scope.as_deref(),
    )
    .await?;
    Ok(verify_response(&outcome))
}

async fn verify_llm(
    State(state): State<AppState>,
    Json(request): Json<BatchRequest>,
) -> Result<Json<Value>, AppError> {
    let outcome = scout_verify::llm::run_batch(
        &state.pool,
        state.config,
        request.limit,
        request.min_score.unwrap_or(30.0),
        request.scope.as_deref(),
    )
    .await?;
    Ok(verify_response(&outcome))
}

async fn verify_ddg(
    State(state): State<AppState>,
    Json(request): Json<BatchRequest>,
) -> Result<Json<Value>, AppError> {
    let outcome = scout_verify::web_search::run_ddg_batch(
        &state.pool,
        state.config,
        request.limit,
        request.min_score.unwrap_or(30.0),
        request.scope.as_deref(),
    )
    .await?;
    Ok(verify_response(&outcome))
}

async fn verify_google_search(
    State(state): State<AppState>,
    Json(request): Json<BatchRequest>,
) -> Result<Json<Value>, AppError> {
    let outcome = scout_verify::web_search::run_google_batch(
        &state.pool,
        state.config,
        request.limit,
        request.min_score.unwrap_or(30.0),
        request.scope.as_deref(),
    )
    .await?;
    Ok(verify_response(&outcome))
}

async fn verify_places(
    State(state): State<AppState>,
    Json(request): Json<BatchRequest>,
) -> Result<Json<Value>, AppError> {
    let outcome = scout_verify::places::run_verify_batch(
        &state.pool,
        state.config,
        PlacesProvider::Google,
        request.limit,
        request.min_score.unwrap_or(30.0),
        request.scope.as_deref(),
    )
    .await?;
    Ok(verify_response(&outcome))
}

async fn verify_foursquare(
    State(state): State<AppState>,
    Json(request): Json<BatchRequest>,
) -> Result<Json<Value>, AppError> {
    let outcome = scout_verify::places::run_verify_batch(
        &state.pool,
        state.config,
        PlacesProvider::Foursquare,
        request.limit,
        request.min_score.unwrap_or(30.0),
        request.scope.as_deref(),
    )
    .await?;
    Ok(verify_response(&outcome))
}

async fn enrich_places(
    State(state): State<AppState>,
    Json(request): Json<EnrichRequest>,
) -> Result<Json<Value>, AppError> {
    let outcome = scout_verify::places::run_enrich_batch(
        &state.pool,
        state.config,
        PlacesProvider::Google,
        request.limit,
        &request.priority,
        None,
    )
    .await?;
    Ok(Json(json!({
        "processed": outcome.processed,
        "enriched": outcome.enriched,
        "phones_added": outcome.phones_added,
    })))
}

async fn enrich_foursquare(
    State(state): State<AppState>,
    Json(request): Json<EnrichRequest>,
) -> Result<Json<Value>, AppError> {
    let outcome = scout_verify::places::run_enrich_batch(
        &state.pool,
        state.config,
        PlacesProvider::Foursquare,
        request.limit,
        &request.priority,
        None,
    )
    .await?;
    Ok(Json(json!({
        "processed": outcome.processed,
        "enriched": outcome.enriched,
        "phones_added": outcome.phones_added,
    })))
}

// ─── Exports ────────────────────────────────────────────────────────────

async fn business_export(
    State(state): State<AppState>,
    Json(request): Json<BusinessExportRequest>,
) -> Result<Json<Value>, AppError> {
    let params = ExportParams {
        platform: request.platform,
        min_score: request.min_score,
        limit: request.limit,
        max_written: None,
        require_contact: request.require_contact,
        require_unhosted_domain: request.require_unhosted_domain,
        require_domain_qualification: request.require_domain_qualification,
        exclude_hosted_email_domain: request.exclude_hosted_email_domain,
        exclude_previously_exported: false,
    };
    let path = export_business_leads(&state.pool, state.config, &params).await?;
    Ok(Json(json!({
        "export_path": path.map(|p| p.display().to_string()),
    })))
}

// ─── Automation control ─────────────────────────────────────────────────

async fn automation_start(State(state): State<AppState>) -> Json<Value> {
    Json(state.controller.start())
}

async fn automation_stop(State(state): State<AppState>) -> Json<Value> {
    Json(state.controller.stop().await)
}

async fn automation_settings(
    State(state): State<AppState>,
    Json(update): Json<PipelineSettingsUpdate>,
) -> Json<Value> {
    state.controller.update_settings(&update);
    Json(state.controller.status())
}

async fn verification_start(State(state): State<AppState>) -> Json<Value> {
    Json(state.controller.start_verification())
}

async fn verification_stop(State(state): State<AppState>) -> Json<Value> {
    Json(state.controller.stop_verification().await)
}

async fn verification_settings(
    State(state): State<AppState>,
    Json(update): Json<VerificationSettingsUpdate>,
) -> Json<Value> {
    state.controller.update_verify_settings(&update);
    Json(state.controller.status())
}

// ─── Notifications ──────────────────────────────────────────────────────

async fn test_notification(
    State(state): State<AppState>,
    Json(request): Json<NotificationRequest>,
) -> Json<Value> {
    let notifier = scout_clients::notify::Notifier::new(
        &state.config.ntfy_server,
        state.config.ntfy_topic.as_deref(),
    );
    let sent = notifier
        .send(&request.title, &request.message, "default", &["bell"])
        .await;
    Json(json!({ "sent": sent }))
}
