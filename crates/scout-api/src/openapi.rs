//! OpenAPI document for the read surface.
//!
//! Only the dashboard-facing GET endpoints are documented; the mutation
//! routes sit behind the auth gate and are operator tooling, not a
//! public contract.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::OpenApi;

use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "webscout API",
        description = "Lead-generation pipeline: domain classification, website verification, scoring, and outreach exports."
    ),
    paths(
        crate::health,
        crate::routes::metrics::dashboard_metrics,
        crate::routes::jobs::list_jobs,
    ),
    components(schemas(crate::error::ErrorBody, crate::error::ErrorDetail))
)]
pub struct ApiDoc;

pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(openapi_json))
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_includes_read_paths() {
        let doc = ApiDoc::openapi();
        let json = serde_json::to_string(&doc).unwrap();
        assert!(json.contains("/health"));
        assert!(json.contains("/api/metrics"));
        assert!(json.contains("/api/jobs"));
    }
}
