//! The daily-target engine.
//!
//! Each day gets its own export platform (`<prefix>_<YYYYMMDD>`), so
//! the per-platform unique constraint naturally tracks daily progress.
//! Pass one exports never-exported leads up to the remaining target;
//! pass two (when recycling is allowed) relaxes the never-exported
//! clause to refill the day from previously-exported candidates.

use chrono::NaiveDate;
use serde::Serialize;
use sqlx::PgPool;

use scout_clients::Config;
use scout_store::exports;

use crate::error::ExportError;
use crate::leads::{export_business_leads, ExportParams};

/// Platform name for a date: `daily_20260311`.
pub fn daily_platform_name(prefix: &str, date: NaiveDate) -> String {
    format!("{prefix}_{}", date.format("%Y%m%d"))
}

/// Rolling progress for one day's target.
#[derive(Debug, Clone, Serialize)]
pub struct DailyTargetSummary {
    pub platform: String,
    pub date: String,
    pub target_count: i64,
    pub generated_count: i64,
    pub remaining_count: i64,
    pub completed: bool,
}

/// Current progress toward a day's target.
pub async fn daily_target_summary(
    pool: &PgPool,
    prefix: &str,
    date: NaiveDate,
    target_count: i64,
) -> Result<DailyTargetSummary, sqlx::Error> {
    let platform = daily_platform_name(prefix, date);
    let generated = exports::count_for_platform(pool, &platform).await?;
    Ok(DailyTargetSummary {
        platform,
        date: date.to_string(),
        target_count,
        generated_count: generated,
        remaining_count: (target_count - generated).max(0),
        completed: generated >= target_count,
    })
}

/// Outcome of one `ensure` run.
#[derive(Debug, Clone, Serialize)]
pub struct DailyTargetResult {
    #[serde(flatten)]
    pub summary: DailyTargetSummary,
    pub created_now: i64,
    pub export_path: Option<String>,
    pub allow_recycle: bool,
}

/// Eligibility knobs for the daily target, mirroring the exporter's.
#[derive(Debug, Clone)]
pub struct DailyTargetParams {
    pub target_count: i64,
    pub min_score: Option<f64>,
    pub platform_prefix: String,
    pub require_contact: bool,
    pub require_unhosted_domain: bool,
    pub require_domain_qualification: bool,
    pub exclude_hosted_email_domain: bool,
    pub allow_recycle: bool,
}

impl DailyTargetParams {
    /// Defaults from configuration.
    pub fn from_config(config: &Config) -> Self {
        Self {
            target_count: config.daily_target_count,
            min_score: Some(config.daily_target_min_score),
            platform_prefix: config.daily_target_platform_prefix.clone(),
            require_contact: config.daily_target_require_contact,
            require_unhosted_domain: config.daily_target_require_unhosted_domain,
            require_domain_qualification: config.daily_target_require_domain_qualification,
            exclude_hosted_email_domain: true,
            allow_recycle: config.daily_target_allow_recycle,
        }
    }

    fn export_params(&self, platform: &str, max_written: i64, fresh_only: bool) -> ExportParams {
        ExportParams {
            platform: platform.to_string(),
            min_score: self.min_score,
            limit: None,
            max_written: Some(max_written),
            require_contact: self.require_contact,
            require_unhosted_domain: self.require_unhosted_domain,
            require_domain_qualification: self.require_domain_qualification,
            exclude_hosted_email_domain: self.exclude_hosted_email_domain,
            exclude_previously_exported: fresh_only,
        }
    }
}

/// Top up today's export batch to the target count.
pub async fn ensure_daily_target(
    pool: &PgPool,
    config: &'static Config,
    params: &DailyTargetParams,
    date: NaiveDate,
) -> Result<DailyTargetResult, ExportError> {
    let initial =
        daily_target_summary(pool, &params.platform_prefix, date, params.target_count).await?;
    if initial.remaining_count <= 0 {
        return Ok(DailyTargetResult {
            summary: initial,
            created_now: 0,
            export_path: None,
            allow_recycle: params.allow_recycle,
        });
    }

    // Pass 1: never-exported candidates only.
    let first_path = export_business_leads(
        pool,
        config,
        &params.export_params(&initial.platform, initial.remaining_count, true),
    )
    .await?;

    let mut updated =
        daily_target_summary(pool, &params.platform_prefix, date, params.target_count).await?;

    // Pass 2: recycle previously-exported candidates if still short.
    let mut recycled_path = None;
    if params.allow_recycle && updated.remaining_count > 0 {
        recycled_path = export_business_leads(
            pool,
            config,
            &params.export_params(&initial.platform, updated.remaining_count, false),
        )
        .await?;
        updated =
            daily_target_summary(pool, &params.platform_prefix, date, params.target_count).await?;
    }

    let created_now = (updated.generated_count - initial.generated_count).max(0);
    Ok(DailyTargetResult {
        summary: updated,
        created_now,
        export_path: recycled_path
            .or(first_path)
            .map(|p| p.display().to_string()),
        allow_recycle: params.allow_recycle,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn platform_name_embeds_the_date() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 11).unwrap();
        assert_eq!(daily_platform_name("daily", date), "daily_20260311");
        assert_eq!(daily_platform_name("outreach", date), "outreach_20260311");
    }

    #[test]
    fn pass_one_is_fresh_only_and_pass_two_recycles() {
        let params = DailyTargetParams {
            target_count: 100,
            min_score: Some(40.0),
            platform_prefix: "daily".into(),
            require_contact: true,
            require_unhosted_domain: false,
            require_domain_qualification: false,
            exclude_hosted_email_domain: true,
            allow_recycle: true,
        };

        let first = params.export_params("daily_20260311", 70, true);
        assert!(first.exclude_previously_exported);
        assert_eq!(first.max_written, Some(70));
        assert_eq!(first.min_score, Some(40.0));

        let second = params.export_params("daily_20260311", 12, false);
        assert!(!second.exclude_previously_exported);
        assert_eq!(second.max_written, Some(12));
        // Both passes target the same per-day platform, so the unique
        // constraint still caps the day at the target.
        assert_eq!(first.platform, second.platform);
    }

    #[test]
    fn summary_arithmetic() {
        // target 100, already exported 30 → 70 remaining.
        let summary = DailyTargetSummary {
            platform: "daily_20260311".into(),
            date: "2026-03-11".into(),
            target_count: 100,
            generated_count: 30,
            remaining_count: 70,
            completed: false,
        };
        assert_eq!(summary.target_count - summary.generated_count, summary.remaining_count);
        assert!(!summary.completed);
    }
}
