//! Export file listing and download.

use axum::extract::{Path as PathParam, State};
use axum::http::header;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};

use crate::error::AppError;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/exports", get(list_exports))
        .route("/api/exports/:name", get(download_export))
}

/// A name is a plain CSV file name — no separators, no traversal.
fn validate_name(name: &str) -> Result<(), AppError> {
    if name.is_empty()
        || name.contains('/')
        || name.contains('\\')
        || name.contains("..")
        || !name.ends_with(".csv")
    {
        return Err(AppError::Validation("invalid export file name".into()));
    }
    Ok(())
}

/// List written export CSVs, newest first.
pub async fn list_exports(State(state): State<AppState>) -> Result<Json<Vec<Value>>, AppError> {
    let dir = std::path::Path::new(&state.config.export_dir);
    let mut entries = Vec::new();

    if dir.is_dir() {
        let read_dir = std::fs::read_dir(dir)
            .map_err(|e| AppError::Internal(format!("cannot read export dir: {e}")))?;
        for entry in read_dir.flatten() {
            let name = entry.file_name().to_string_lossy().to_string();
            if !name.ends_with(".csv") {
                continue;
            }
            let metadata = entry.metadata().ok();
            let modified = metadata
                .as_ref()
                .and_then(|m| m.modified().ok())
                .map(chrono::DateTime::<chrono::Utc>::from);
            entries.push(json!({
                "name": name,
                "size_bytes": metadata.map(|m| m.len()),
                "modified_at": modified.map(|t| t.to_rfc3339()),
            }));
        }
    }

    entries.sort_by(|a, b| {
        b["modified_at"]
            .as_str()
            .unwrap_or("")
            .cmp(a["modified_at"].as_str().unwrap_or(""))
    });
    Ok(Json(entries))
}

/// Download one export CSV by name.
pub async fn download_export(
    State(state): State<AppState>,
    PathParam(name): PathParam<String>,
) -> Result<impl IntoResponse, AppError> {
    validate_name(&name)?;

    let path = std::path::Path::new(&state.config.export_dir).join(&name);
    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|_| AppError::NotFound(format!("export file {name} not found")))?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{name}\""),
            ),
        ],
        bytes,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_with_traversal_are_rejected() {
        assert!(validate_name("../etc/passwd").is_err());
        assert!(validate_name("a/b.csv").is_err());
        assert!(validate_name("a\\b.csv").is_err());
        assert!(validate_name("").is_err());
        assert!(validate_name("report.txt").is_err());
        assert!(validate_name("business_leads_csv_business_20260301_120000.csv").is_ok());
    }
}
