//! Business-leads CSV export.
//!
//! Selection, CSV write, and the queued export-ledger rows all happen
//! against one snapshot: the rows are selected once, the file is
//! written to a temp path, the ledger rows are inserted in a single
//! transaction, and only after the commit does the temp file move to
//! its final name. Zero selected rows produce no file at all.

use std::path::{Path, PathBuf};

use chrono::Utc;
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use scout_classify::features::{load_features, FeatureBundle};
use scout_clients::Config;
use scout_store::exports::LeadFilter;
use scout_store::models::BusinessWithCity;
use scout_store::{exports, jobs};

use crate::error::ExportError;

pub const JOB_NAME: &str = "export_business_leads";

/// The fixed column set. Multi-value columns are `;`-separated, sorted
/// lexicographically.
pub const CSV_HEADER: [&str; 19] = [
    "business_name",
    "category",
    "address",
    "city",
    "country",
    "emails",
    "business_emails",
    "free_emails",
    "phones",
    "domains",
    "verified_unhosted_domains",
    "unregistered_domains",
    "registered_domains",
    "unknown_domains",
    "hosted_domains",
    "parked_domains",
    "lead_score",
    "source",
    "source_id",
];

/// Parameters for one export run.
#[derive(Debug, Clone)]
pub struct ExportParams {
    pub platform: String,
    pub min_score: Option<f64>,
    pub limit: Option<i64>,
    pub max_written: Option<i64>,
    pub require_contact: bool,
    pub require_unhosted_domain: bool,
    pub require_domain_qualification: bool,
    pub exclude_hosted_email_domain: bool,
    pub exclude_previously_exported: bool,
}

impl ExportParams {
    pub fn new(platform: &str) -> Self {
        Self {
            platform: platform.to_string(),
            min_score: None,
            limit: None,
            max_written: None,
            require_contact: true,
            require_unhosted_domain: false,
            require_domain_qualification: true,
            exclude_hosted_email_domain: true,
            exclude_previously_exported: false,
        }
    }

    fn details(&self, final_limit: Option<i64>) -> serde_json::Value {
        json!({
            "min_score": self.min_score,
            "require_contact": self.require_contact,
            "require_unhosted_domain": self.require_unhosted_domain,
            "require_domain_qualification": self.require_domain_qualification,
            "limit": self.limit,
            "final_limit": final_limit,
            "max_written": self.max_written,
            "exclude_previously_exported": self.exclude_previously_exported,
        })
    }

    fn to_filter(&self) -> LeadFilter {
        let mut filter = LeadFilter::for_export(&self.platform);
        filter.min_score = self.min_score;
        filter.require_contact = self.require_contact;
        filter.require_unhosted_domain = self.require_unhosted_domain;
        filter.require_domain_qualification = self.require_domain_qualification;
        filter.exclude_hosted_email_domain = self.exclude_hosted_email_domain;
        filter.exclude_previously_exported = self.exclude_previously_exported;
        filter
    }
}

fn joined(set: &std::collections::BTreeSet<String>) -> String {
    set.iter().cloned().collect::<Vec<_>>().join(";")
}

fn write_rows(
    path: &Path,
    rows: &[BusinessWithCity],
    features: &std::collections::HashMap<Uuid, FeatureBundle>,
) -> Result<u64, ExportError> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(CSV_HEADER)?;

    let empty = FeatureBundle::default();
    let mut written = 0;
    for row in rows {
        let feature = features.get(&row.id).unwrap_or(&empty);
        writer.write_record([
            row.name.as_deref().unwrap_or(""),
            row.category.as_deref().unwrap_or(""),
            row.address.as_deref().unwrap_or(""),
            row.city_name.as_deref().unwrap_or(""),
            row.city_country.as_deref().unwrap_or(""),
            &joined(&feature.emails),
            &joined(&feature.business_emails),
            &joined(&feature.free_emails),
            &joined(&feature.phones),
            &joined(&feature.domains),
            &joined(&feature.verified_unhosted_domains),
            &joined(&feature.unregistered_domains),
            &joined(&feature.registered_domains),
            &joined(&feature.unknown_domains),
            &joined(&feature.hosted_domains),
            &joined(&feature.parked_domains),
            &row.lead_score.map(|s| s.to_string()).unwrap_or_default(),
            &row.source,
            &row.source_id,
        ])?;
        written += 1;
    }
    writer.flush().map_err(std::io::Error::from)?;
    Ok(written)
}

/// Export eligible leads for a platform. Returns the written file path,
/// or `None` when nothing was eligible.
pub async fn export_business_leads(
    pool: &PgPool,
    config: &'static Config,
    params: &ExportParams,
) -> Result<Option<PathBuf>, ExportError> {
    // The effective cap is min(limit, max_written); a non-positive
    // value in either means "nothing to do".
    let row_limit = params.limit.filter(|n| *n > 0);
    let final_limit = match (row_limit, params.max_written) {
        (_, Some(n)) if n <= 0 => {
            return Ok(None);
        }
        (Some(l), Some(m)) => Some(l.min(m)),
        (Some(l), None) => Some(l),
        (None, Some(m)) => Some(m),
        (None, None) => None,
    };
    if params.limit.map(|n| n == 0).unwrap_or(false) {
        return Ok(None);
    }

    let run_id = jobs::start(
        pool,
        JOB_NAME,
        Some(&params.platform),
        Some(&params.details(final_limit)),
    )
    .await?;

    let result = async {
        let filter = params.to_filter();
        let rows = exports::select_leads(pool, &filter, final_limit, 0).await?;
        if rows.is_empty() {
            return Ok::<(Option<PathBuf>, u64), ExportError>((None, 0));
        }

        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        let features = load_features(pool, &ids).await?;

        let export_dir = PathBuf::from(&config.export_dir);
        std::fs::create_dir_all(&export_dir)?;
        let timestamp = Utc::now().format("%Y%m%d_%H%M%S");
        let final_path = export_dir.join(format!(
            "business_leads_{}_{timestamp}.csv",
            params.platform
        ));
        let temp_path = final_path.with_extension("csv.tmp");

        let written = write_rows(&temp_path, &rows, &features)?;
        if written == 0 {
            let _ = std::fs::remove_file(&temp_path);
            return Ok((None, 0));
        }

        // Ledger rows commit atomically with the batch; the file only
        // takes its final name after the commit succeeds.
        let mut tx = pool.begin().await?;
        for row in &rows {
            exports::insert_export(&mut tx, row.id, &params.platform).await?;
        }
        tx.commit().await?;

        std::fs::rename(&temp_path, &final_path)?;
        tracing::info!(platform = %params.platform, written, path = %final_path.display(), "exported leads");
        Ok((Some(final_path), written))
    }
    .await;

    match result {
        Ok((path, written)) => {
            jobs::complete(pool, run_id, written as i64, Some(&params.details(final_limit)))
                .await?;
            Ok(path)
        }
        Err(e) => {
            jobs::fail(pool, run_id, &e.to_string(), Some(&params.details(final_limit)))
                .await?;
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn row(name: &str, score: f64) -> BusinessWithCity {
        BusinessWithCity {
            id: Uuid::new_v4(),
            source: "osm".into(),
            source_id: "node/1".into(),
            name: Some(name.to_string()),
            category: Some("trades".into()),
            website_url: None,
            address: Some("1 Main St".into()),
            lead_score: Some(score),
            scored_at: None,
            lat: None,
            lon: None,
            raw: None,
            created_at: Utc::now(),
            city_name: Some("Toronto".into()),
            city_country: Some("CA".into()),
        }
    }

    #[test]
    fn csv_has_fixed_header_and_sorted_multivalues() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");

        let business = row("Acme Plumbing", 80.0);
        let mut feature = FeatureBundle::default();
        feature.add_contact("email", "zeta@acme.ca");
        feature.add_contact("email", "alpha@acme.ca");
        feature.add_contact("phone", "+1 416 555 0100");
        let features = [(business.id, feature)].into_iter().collect();

        let written = write_rows(&path, &[business], &features).unwrap();
        assert_eq!(written, 1);

        let content = std::fs::read_to_string(&path).unwrap();
        let mut lines = content.lines();
        assert_eq!(lines.next().unwrap(), CSV_HEADER.join(","));
        let data = lines.next().unwrap();
        // BTreeSet ordering puts alpha before zeta.
        assert!(data.contains("alpha@acme.ca;zeta@acme.ca"));
        assert!(data.contains("Acme Plumbing"));
        assert!(data.contains("80"));
    }

    #[test]
    fn empty_row_set_writes_header_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.csv");
        let written = write_rows(&path, &[], &Default::default()).unwrap();
        assert_eq!(written, 0);
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 1);
    }
}
