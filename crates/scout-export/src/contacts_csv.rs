//! Contact-pipeline CSV export over `enriched` domains.

use std::path::PathBuf;

use chrono::Utc;
use serde_json::json;
use sqlx::PgPool;

use scout_clients::Config;
use scout_store::{contact_pipeline, jobs};

use crate::error::ExportError;

pub const JOB_NAME: &str = "export_contacts";

const HEADER: [&str; 8] = [
    "domain",
    "organization",
    "email",
    "first_name",
    "last_name",
    "title",
    "source",
    "lead_score",
];

/// Export contacts on enriched domains not yet sent to `platform`.
/// Returns the file path, or `None` when nothing was written.
pub async fn export_contacts_csv(
    pool: &PgPool,
    config: &'static Config,
    platform: &str,
    min_score: Option<f64>,
) -> Result<Option<PathBuf>, ExportError> {
    let run_id = jobs::start(
        pool,
        JOB_NAME,
        Some(platform),
        Some(&json!({ "min_score": min_score })),
    )
    .await?;

    let result = async {
        let rows = contact_pipeline::contacts_for_export(pool, min_score).await?;
        if rows.is_empty() {
            return Ok::<(Option<PathBuf>, u64), ExportError>((None, 0));
        }

        let export_dir = PathBuf::from(&config.export_dir);
        std::fs::create_dir_all(&export_dir)?;
        let timestamp = Utc::now().format("%Y%m%d_%H%M%S");
        let final_path = export_dir.join(format!("contacts_{platform}_{timestamp}.csv"));
        let temp_path = final_path.with_extension("csv.tmp");

        let mut writer = csv::Writer::from_path(&temp_path)?;
        writer.write_record(HEADER)?;

        let mut tx = pool.begin().await?;
        let mut written: u64 = 0;
        for contact in &rows {
            if contact_pipeline::contact_exported(&mut tx, contact.contact_id, platform).await? {
                continue;
            }
            writer.write_record([
                contact.domain.as_str(),
                contact.org_name.as_deref().unwrap_or(""),
                contact.email.as_deref().unwrap_or(""),
                contact.first_name.as_deref().unwrap_or(""),
                contact.last_name.as_deref().unwrap_or(""),
                contact.title.as_deref().unwrap_or(""),
                contact.contact_source.as_deref().unwrap_or(""),
                &contact.lead_score.map(|s| s.to_string()).unwrap_or_default(),
            ])?;
            contact_pipeline::insert_contact_export(&mut tx, contact.contact_id, platform).await?;
            written += 1;
        }
        writer.flush().map_err(std::io::Error::from)?;
        drop(writer);

        if written == 0 {
            let _ = std::fs::remove_file(&temp_path);
            return Ok((None, 0));
        }

        tx.commit().await?;
        std::fs::rename(&temp_path, &final_path)?;
        Ok((Some(final_path), written))
    }
    .await;

    match result {
        Ok((path, written)) => {
            jobs::complete(
                pool,
                run_id,
                written as i64,
                Some(&json!({ "min_score": min_score })),
            )
            .await?;
            Ok(path)
        }
        Err(e) => {
            jobs::fail(pool, run_id, &e.to_string(), None).await?;
            Err(e)
        }
    }
}
