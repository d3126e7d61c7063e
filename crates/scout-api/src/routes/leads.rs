//! Lead queries for the dashboard: the exporter's eligibility filters
//! plus ad-hoc category/city/confidence filters and paging.

use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use scout_classify::features::load_features;
use scout_core::confidence::{verification_confidence, verification_count, verification_sources};
use scout_store::exports::{self, LeadFilter};
use scout_store::{businesses, cities};

use crate::error::AppError;
use crate::state::AppState;

const MAX_FILTER_LENGTH: usize = 100;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/leads/business", get(list_leads))
        .route("/api/leads/business/categories", get(list_categories))
        .route("/api/leads/business/cities", get(list_cities))
}

#[derive(Debug, Deserialize)]
pub struct LeadsQuery {
    pub min_score: Option<f64>,
    pub category: Option<String>,
    pub city: Option<String>,
    pub min_confidence: Option<String>,
    #[serde(default)]
    pub require_contact: bool,
    #[serde(default)]
    pub require_unhosted_domain: bool,
    #[serde(default)]
    pub require_domain_qualification: bool,
    #[serde(default = "default_true")]
    pub require_no_website: bool,
    #[serde(default = "default_true")]
    pub exclude_hosted_email_domain: bool,
    #[serde(default)]
    pub only_unexported: bool,
    #[serde(default)]
    pub only_verified: bool,
    #[serde(default = "default_platform")]
    pub platform: String,
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_true() -> bool {
    true
}
fn default_platform() -> String {
    "csv_business".to_string()
}
fn default_limit() -> i64 {
    200
}

/// Reject filter values that cannot be legitimate and would only ever
/// appear in probing requests.
fn validate_filter(value: &Option<String>, name: &str) -> Result<Option<String>, AppError> {
    let Some(value) = value else { return Ok(None) };
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    if value.len() > MAX_FILTER_LENGTH {
        return Err(AppError::Validation(format!(
            "parameter '{name}' exceeds maximum length of {MAX_FILTER_LENGTH}"
        )));
    }
    if value.chars().any(|c| matches!(c, '\0' | '\n' | '\r')) {
        return Err(AppError::Validation(format!(
            "parameter '{name}' contains control characters"
        )));
    }
    Ok(Some(trimmed.to_string()))
}

fn confidence_rank(level: &str) -> u8 {
    match level {
        "high" => 3,
        "medium" => 2,
        "low" => 1,
        _ => 0,
    }
}

pub async fn list_leads(
    State(state): State<AppState>,
    Query(query): Query<LeadsQuery>,
) -> Result<Json<Value>, AppError> {
    let category = validate_filter(&query.category, "category")?;
    let city = validate_filter(&query.city, "city")?;
    let platform = validate_filter(&Some(query.platform.clone()), "platform")?
        .unwrap_or_else(default_platform);

    let filter = LeadFilter {
        platform: platform.clone(),
        min_score: query.min_score,
        require_no_website: query.require_no_website,
        require_scored: true,
        require_contact: query.require_contact,
        require_unhosted_domain: query.require_unhosted_domain,
        require_domain_qualification: query.require_domain_qualification,
        exclude_hosted_email_domain: query.exclude_hosted_email_domain,
        exclude_exported_for_platform: query.only_unexported,
        exclude_previously_exported: false,
        only_verified: query.only_verified,
        category,
        city,
    };

    let limit = query.limit.clamp(1, 2000);
    let offset = query.offset.max(0);

    let total_candidates = exports::count_leads(&state.pool, &filter).await?;
    let rows = exports::select_leads(&state.pool, &filter, Some(limit), offset).await?;

    let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
    let features = load_features(&state.pool, &ids).await?;
    let exported: std::collections::HashSet<Uuid> =
        exports::exported_ids(&state.pool, &ids, &platform)
            .await?
            .into_iter()
            .collect();

    let mut items: Vec<Value> = Vec::with_capacity(rows.len());
    for row in &rows {
        let feature = features.get(&row.id).cloned().unwrap_or_default();
        let confidence = verification_confidence(row.raw.as_ref());
        items.push(json!({
            "id": row.id,
            "name": row.name,
            "category": row.category,
            "address": row.address,
            "city": row.city_name,
            "country": row.city_country,
            "lead_score": row.lead_score,
            "scored_at": row.scored_at.map(|t| t.to_rfc3339()),
            "source": row.source,
            "source_id": row.source_id,
            "emails": feature.emails,
            "business_emails": feature.business_emails,
            "free_emails": feature.free_emails,
            "phones": feature.phones,
            "domains": feature.domains,
            "verified_unhosted_domains": feature.verified_unhosted_domains,
            "unregistered_domains": feature.unregistered_domains,
            "unknown_domains": feature.unknown_domains,
            "hosted_domains": feature.hosted_domains,
            "parked_domains": feature.parked_domains,
            "domain_status_counts": feature.domain_status_counts,
            "exported": exported.contains(&row.id),
            "verification_count": verification_count(row.raw.as_ref()),
            "verification_sources": verification_sources(row.raw.as_ref()),
            "verification_confidence": confidence.as_str(),
        }));
    }

    // Confidence is derived in process, so this filter applies after
    // the database page.
    if let Some(min_confidence) = query
        .min_confidence
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
    {
        let min_rank = confidence_rank(min_confidence);
        items.retain(|item| {
            let level = item["verification_confidence"].as_str().unwrap_or("");
            confidence_rank(level) >= min_rank
        });
    }

    Ok(Json(json!({
        "total_candidates": total_candidates,
        "returned": items.len(),
        "items": items,
    })))
}

pub async fn list_categories(
    State(state): State<AppState>,
) -> Result<Json<Vec<String>>, AppError> {
    Ok(Json(businesses::distinct_categories(&state.pool).await?))
}

#[derive(Debug, Deserialize)]
pub struct CitiesQuery {
    #[serde(default = "default_cities_limit")]
    pub limit: i64,
}

fn default_cities_limit() -> i64 {
    200
}

pub async fn list_cities(
    State(state): State<AppState>,
    Query(query): Query<CitiesQuery>,
) -> Result<Json<Vec<String>>, AppError> {
    Ok(Json(
        cities::names(&state.pool, query.limit.clamp(1, 2000)).await?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use scout_core::confidence::ConfidenceLevel;

    #[test]
    fn filter_validation_rejects_control_characters() {
        assert!(validate_filter(&Some("tor\nonto".to_string()), "city").is_err());
        assert!(validate_filter(&Some("x".repeat(200)), "city").is_err());
        assert_eq!(validate_filter(&Some("  ".to_string()), "city").unwrap(), None);
        assert_eq!(
            validate_filter(&Some(" Toronto ".to_string()), "city").unwrap(),
            Some("Toronto".to_string())
        );
        assert_eq!(validate_filter(&None, "city").unwrap(), None);
    }

    #[test]
    fn confidence_ranks_order() {
        assert!(confidence_rank("high") > confidence_rank("medium"));
        assert!(confidence_rank("medium") > confidence_rank("low"));
        assert!(confidence_rank("low") > confidence_rank("unverified"));
        assert_eq!(confidence_rank("bogus"), 0);
    }

    #[test]
    fn confidence_level_display_matches_rank_keys() {
        assert_eq!(confidence_rank(ConfidenceLevel::High.as_str()), 3);
        assert_eq!(confidence_rank(ConfidenceLevel::Unverified.as_str()), 0);
    }
}
