//! Scheduler settings.
//!
//! Both settings structs are plain data: the loops take a clone (a
//! snapshot) under the settings lock at the top of each cycle and never
//! read the shared copy mid-cycle. Updates are partial — absent fields
//! leave the current value untouched.

use serde::{Deserialize, Serialize};

use scout_clients::Config;

/// Settings for the periodic full-pipeline loop.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineSettings {
    pub interval_seconds: u64,
    /// Optional area key to import from OSM each cycle.
    pub area: Option<String>,
    /// Comma-separated category keys, or `all`.
    pub categories: String,
    pub areas_file: String,
    pub categories_file: String,
    pub sync_limit: Option<i64>,
    pub classify_limit: Option<i64>,
    /// Domain statuses the classifier re-examines each cycle.
    pub classify_statuses: Vec<String>,
    pub email_limit: Option<i64>,
    pub contact_score_limit: Option<i64>,
    pub contact_platform: String,
    pub contact_min_score: Option<f64>,
    pub business_score_limit: Option<i64>,
    pub business_platform: String,
    pub business_min_score: Option<f64>,
    pub business_require_unhosted_domain: bool,
    pub business_require_contact: bool,
    pub business_require_domain_qualification: bool,
    pub daily_target_enabled: bool,
    pub daily_target_count: i64,
    pub daily_target_min_score: f64,
    pub daily_target_platform_prefix: String,
    pub daily_target_require_contact: bool,
    pub daily_target_require_domain_qualification: bool,
    pub daily_target_require_unhosted_domain: bool,
    pub daily_target_allow_recycle: bool,
}

impl PipelineSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            interval_seconds: config.auto_runner_interval_seconds.max(30),
            area: None,
            categories: "all".to_string(),
            areas_file: "config/areas.json".to_string(),
            categories_file: "config/categories.json".to_string(),
            sync_limit: Some(1000),
            classify_limit: Some(200),
            classify_statuses: vec![
                "new".to_string(),
                "skipped".to_string(),
                "rdap_error".to_string(),
                "dns_error".to_string(),
            ],
            email_limit: Some(1000),
            contact_score_limit: Some(1000),
            contact_platform: "csv".to_string(),
            contact_min_score: None,
            business_score_limit: Some(500),
            business_platform: "csv_business".to_string(),
            business_min_score: Some(40.0),
            business_require_unhosted_domain: false,
            business_require_contact: true,
            business_require_domain_qualification: false,
            daily_target_enabled: config.auto_daily_target_enabled,
            daily_target_count: config.daily_target_count.max(1),
            daily_target_min_score: config.daily_target_min_score,
            daily_target_platform_prefix: config.daily_target_platform_prefix.clone(),
            daily_target_require_contact: config.daily_target_require_contact,
            daily_target_require_domain_qualification: config
                .daily_target_require_domain_qualification,
            daily_target_require_unhosted_domain: config.daily_target_require_unhosted_domain,
            daily_target_allow_recycle: config.daily_target_allow_recycle,
        }
    }

    /// Apply a partial update; numeric fields are clamped to sane
    /// minimums.
    pub fn apply(&mut self, update: &PipelineSettingsUpdate) {
        if let Some(value) = update.interval_seconds {
            self.interval_seconds = value.max(30);
        }
        if let Some(value) = &update.area {
            self.area = Some(value.clone());
        }
        if let Some(value) = &update.categories {
            self.categories = value.clone();
        }
        if let Some(value) = update.sync_limit {
            self.sync_limit = Some(value);
        }
        if let Some(value) = update.classify_limit {
            self.classify_limit = Some(value);
        }
        if let Some(value) = &update.classify_statuses {
            let cleaned: Vec<String> = value
                .iter()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
            if !cleaned.is_empty() {
                self.classify_statuses = cleaned;
            }
        }
        if let Some(value) = update.email_limit {
            self.email_limit = Some(value);
        }
        if let Some(value) = update.contact_score_limit {
            self.contact_score_limit = Some(value);
        }
        if let Some(value) = &update.contact_platform {
            self.contact_platform = value.clone();
        }
        if let Some(value) = update.contact_min_score {
            self.contact_min_score = Some(value);
        }
        if let Some(value) = update.business_score_limit {
            self.business_score_limit = Some(value);
        }
        if let Some(value) = &update.business_platform {
            self.business_platform = value.clone();
        }
        if let Some(value) = update.business_min_score {
            self.business_min_score = Some(value);
        }
        if let Some(value) = update.business_require_unhosted_domain {
            self.business_require_unhosted_domain = value;
        }
        if let Some(value) = update.business_require_contact {
            self.business_require_contact = value;
        }
        if let Some(value) = update.business_require_domain_qualification {
            self.business_require_domain_qualification = value;
        }
        if let Some(value) = update.daily_target_enabled {
            self.daily_target_enabled = value;
        }
        if let Some(value) = update.daily_target_count {
            self.daily_target_count = value.max(1);
        }
        if let Some(value) = update.daily_target_min_score {
            self.daily_target_min_score = value;
        }
        if let Some(value) = &update.daily_target_platform_prefix {
            self.daily_target_platform_prefix = value.clone();
        }
        if let Some(value) = update.daily_target_require_contact {
            self.daily_target_require_contact = value;
        }
        if let Some(value) = update.daily_target_require_domain_qualification {
            self.daily_target_require_domain_qualification = value;
        }
        if let Some(value) = update.daily_target_require_unhosted_domain {
            self.daily_target_require_unhosted_domain = value;
        }
        if let Some(value) = update.daily_target_allow_recycle {
            self.daily_target_allow_recycle = value;
        }
    }
}

/// Partial update payload for [`PipelineSettings`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineSettingsUpdate {
    pub interval_seconds: Option<u64>,
    pub area: Option<String>,
    pub categories: Option<String>,
    pub sync_limit: Option<i64>,
    pub classify_limit: Option<i64>,
    pub classify_statuses: Option<Vec<String>>,
    pub email_limit: Option<i64>,
    pub contact_score_limit: Option<i64>,
    pub contact_platform: Option<String>,
    pub contact_min_score: Option<f64>,
    pub business_score_limit: Option<i64>,
    pub business_platform: Option<String>,
    pub business_min_score: Option<f64>,
    pub business_require_unhosted_domain: Option<bool>,
    pub business_require_contact: Option<bool>,
    pub business_require_domain_qualification: Option<bool>,
    pub daily_target_enabled: Option<bool>,
    pub daily_target_count: Option<i64>,
    pub daily_target_min_score: Option<f64>,
    pub daily_target_platform_prefix: Option<String>,
    pub daily_target_require_contact: Option<bool>,
    pub daily_target_require_domain_qualification: Option<bool>,
    pub daily_target_require_unhosted_domain: Option<bool>,
    pub daily_target_allow_recycle: Option<bool>,
}

/// Settings for the continuous verification loop. Batch sizes reflect
/// each source's throughput: name-guess handles hundreds per minute,
/// HTML scrapers only a handful.
#[derive(Debug, Clone, Serialize)]
pub struct VerificationSettings {
    pub domain_guess_batch: i64,
    pub domain_guess_min_score: f64,
    pub searxng_batch: i64,
    pub searxng_min_score: f64,
    pub ddg_batch: i64,
    pub ddg_min_score: f64,
    pub llm_batch: i64,
    pub llm_min_score: f64,
    pub google_search_batch: i64,
    pub google_search_min_score: f64,
    pub rescore_after_batch: bool,
    /// Seconds between cycles when work was found.
    pub pause_between_batches: u64,
    /// Seconds to sleep when every layer processed zero.
    pub pause_when_idle: u64,
}

impl Default for VerificationSettings {
    fn default() -> Self {
        Self {
            domain_guess_batch: 200,
            domain_guess_min_score: 0.0,
            searxng_batch: 200,
            searxng_min_score: 0.0,
            ddg_batch: 10,
            ddg_min_score: 30.0,
            llm_batch: 10,
            llm_min_score: 30.0,
            google_search_batch: 5,
            google_search_min_score: 30.0,
            rescore_after_batch: true,
            pause_between_batches: 3,
            pause_when_idle: 60,
        }
    }
}

/// Partial update payload for [`VerificationSettings`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VerificationSettingsUpdate {
    pub domain_guess_batch: Option<i64>,
    pub domain_guess_min_score: Option<f64>,
    pub searxng_batch: Option<i64>,
    pub searxng_min_score: Option<f64>,
    pub ddg_batch: Option<i64>,
    pub ddg_min_score: Option<f64>,
    pub llm_batch: Option<i64>,
    pub llm_min_score: Option<f64>,
    pub google_search_batch: Option<i64>,
    pub google_search_min_score: Option<f64>,
    pub rescore_after_batch: Option<bool>,
    pub pause_between_batches: Option<u64>,
    pub pause_when_idle: Option<u64>,
}

impl VerificationSettings {
    pub fn apply(&mut self, update: &VerificationSettingsUpdate) {
        if let Some(v) = update.domain_guess_batch {
            self.domain_guess_batch = v.max(1);
        }
        if let Some(v) = update.domain_guess_min_score {
            self.domain_guess_min_score = v;
        }
        if let Some(v) = update.searxng_batch {
            self.searxng_batch = v.max(1);
        }
        if let Some(v) = update.searxng_min_score {
            self.searxng_min_score = v;
        }
        if let Some(v) = update.ddg_batch {
            self.ddg_batch = v.max(1);
        }
        if let Some(v) = update.ddg_min_score {
            self.ddg_min_score = v;
        }
        if let Some(v) = update.llm_batch {
            self.llm_batch = v.max(1);
        }
        if let Some(v) = update.llm_min_score {
            self.llm_min_score = v;
        }
        if let Some(v) = update.google_search_batch {
            self.google_search_batch = v.max(1);
        }
        if let Some(v) = update.google_search_min_score {
            self.google_search_min_score = v;
        }
        if let Some(v) = update.rescore_after_batch {
            self.rescore_after_batch = v;
        }
        if let Some(v) = update.pause_between_batches {
            self.pause_between_batches = v.max(1);
        }
        if let Some(v) = update.pause_when_idle {
            self.pause_when_idle = v.clamp(10, 3600);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interval_updates_clamp_to_thirty_seconds() {
        let mut settings = PipelineSettings::from_config(Config::load());
        settings.apply(&PipelineSettingsUpdate {
            interval_seconds: Some(5),
            ..Default::default()
        });
        assert_eq!(settings.interval_seconds, 30);
    }

    #[test]
    fn partial_update_leaves_other_fields() {
        let mut settings = PipelineSettings::from_config(Config::load());
        let before_platform = settings.business_platform.clone();
        settings.apply(&PipelineSettingsUpdate {
            daily_target_count: Some(0),
            ..Default::default()
        });
        assert_eq!(settings.daily_target_count, 1, "clamped to 1");
        assert_eq!(settings.business_platform, before_platform);
    }

    #[test]
    fn empty_classify_statuses_are_ignored() {
        let mut settings = PipelineSettings::from_config(Config::load());
        let before = settings.classify_statuses.clone();
        settings.apply(&PipelineSettingsUpdate {
            classify_statuses: Some(vec!["  ".to_string()]),
            ..Default::default()
        });
        assert_eq!(settings.classify_statuses, before);
    }

    #[test]
    fn verification_idle_pause_is_clamped() {
        let mut settings = VerificationSettings::default();
        settings.apply(&VerificationSettingsUpdate {
            pause_when_idle: Some(1),
            ..Default::default()
        });
        assert_eq!(settings.pause_when_idle, 10);
    }
}
