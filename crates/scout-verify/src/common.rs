//! Shared verifier plumbing: the outcome counters and the single place
//! that writes a verdict back onto a business.

use serde_json::{Map, Value};
use sqlx::PgPool;
use uuid::Uuid;

use scout_core::{Verdict, VerificationSource};
use scout_store::businesses;

/// Counters every verifier batch reports into its job-run details.
#[derive(Debug, Default, Clone)]
pub struct VerifyOutcome {
    pub processed: u64,
    pub websites_found: u64,
    pub no_website_confirmed: u64,
    pub inconclusive: u64,
    pub errors: u64,
}

impl VerifyOutcome {
    pub fn details(&self, min_score: f64) -> Value {
        serde_json::json!({
            "min_score": min_score,
            "websites_found": self.websites_found,
            "no_website_confirmed": self.no_website_confirmed,
            "inconclusive": self.inconclusive,
            "errors": self.errors,
        })
    }

    /// Tally one verdict.
    pub fn record(&mut self, verdict: Verdict) {
        self.processed += 1;
        match verdict {
            Verdict::HasWebsite => self.websites_found += 1,
            Verdict::NoWebsite => self.no_website_confirmed += 1,
            Verdict::Error => self.errors += 1,
            _ => self.inconclusive += 1,
        }
    }
}

/// One verifier's result for one business, ready to persist.
#[derive(Debug, Clone)]
pub struct VerdictWrite {
    pub business_id: Uuid,
    pub verdict: Verdict,
    pub website_url: Option<String>,
    /// Source-specific extras (`domain_guess_candidates_checked`,
    /// `llm_reason`, `searxng_engines`, …), merged alongside the two
    /// bookkeeping keys.
    pub extras: Map<String, Value>,
}

impl VerdictWrite {
    pub fn new(business_id: Uuid, verdict: Verdict) -> Self {
        Self {
            business_id,
            verdict,
            website_url: None,
            extras: Map::new(),
        }
    }

    pub fn with_website(mut self, url: impl Into<String>) -> Self {
        self.website_url = Some(url.into());
        self
    }

    pub fn extra(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extras.insert(key.into(), value);
        self
    }
}

/// Persist a verdict: stamp `<source>_verified` / `<source>_result` plus
/// extras into `raw` (additive merge) and clear `scored_at`.
pub async fn apply_verdict(
    pool: &PgPool,
    source: VerificationSource,
    write: &VerdictWrite,
) -> Result<(), sqlx::Error> {
    let mut patch = Map::new();
    patch.insert(source.verified_key().to_string(), Value::Bool(true));
    patch.insert(
        source.result_key().to_string(),
        Value::String(write.verdict.as_str().to_string()),
    );
    for (key, value) in &write.extras {
        patch.insert(key.clone(), value.clone());
    }

    let mut conn = pool.acquire().await?;
    businesses::apply_verification(
        &mut conn,
        write.business_id,
        &Value::Object(patch),
        write.website_url.as_deref(),
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_tallies_by_verdict_kind() {
        let mut outcome = VerifyOutcome::default();
        outcome.record(Verdict::HasWebsite);
        outcome.record(Verdict::NoWebsite);
        outcome.record(Verdict::NoResults);
        outcome.record(Verdict::NotSure);
        outcome.record(Verdict::Error);
        assert_eq!(outcome.processed, 5);
        assert_eq!(outcome.websites_found, 1);
        assert_eq!(outcome.no_website_confirmed, 1);
        assert_eq!(outcome.inconclusive, 2);
        assert_eq!(outcome.errors, 1);
    }

    #[test]
    fn verdict_write_builder_collects_extras() {
        let id = Uuid::new_v4();
        let write = VerdictWrite::new(id, Verdict::HasWebsite)
            .with_website("https://acme.ca/")
            .extra("domain_guess_candidates_checked", serde_json::json!(12));
        assert_eq!(write.website_url.as_deref(), Some("https://acme.ca/"));
        assert_eq!(write.extras["domain_guess_candidates_checked"], 12);
    }
}
