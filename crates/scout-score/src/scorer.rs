//! The business lead scorer.
//!
//! Scoring only trusts signals that actually predict "this business
//! needs a website and can be reached": contacts, category, and the
//! absence of an OSM website tag. Domain-status additive bonuses were
//! deliberately removed — an email at `info@company.ae` says nothing
//! about whether the business runs a website at `company.ae` or
//! anywhere else. Domain statuses still matter, but only as
//! disqualifiers and caps.

use std::collections::HashSet;

use serde_json::{json, Value};
use sqlx::PgPool;
use uuid::Uuid;

use scout_classify::features::{load_features, FeatureBundle};
use scout_clients::{wikidata, Config};
use scout_core::confidence::{verification_confidence, ConfidenceLevel};
use scout_core::data::name_looks_like_domain;
use scout_store::models::BusinessRow;
use scout_store::{businesses, jobs};

pub const JOB_NAME: &str = "score_business_leads";

// Additive weights.
const SCORE_NO_WEBSITE: f64 = 25.0;
const SCORE_BUSINESS_EMAIL: f64 = 20.0;
const SCORE_ANY_EMAIL: f64 = 5.0;
const SCORE_PHONE: f64 = 15.0;
const SCORE_HIGH_PRIORITY_CATEGORY: f64 = 20.0;
const SCORE_MEDIUM_PRIORITY_CATEGORY: f64 = 10.0;
const SCORE_ANY_CATEGORY: f64 = 5.0;

const HIGH_PRIORITY_CATEGORIES: &[&str] = &["trades", "contractors"];
const MEDIUM_PRIORITY_CATEGORIES: &[&str] =
    &["professional_services", "retail", "health", "food", "auto"];

/// Branded-chain detection: OSM brand tags are definitive; the Wikidata
/// chain snapshot catches untagged franchises by name.
fn is_branded_chain(business: &BusinessRow, chains: &HashSet<String>) -> bool {
    if let Some(raw) = &business.raw {
        if raw.get("brand:wikidata").is_some() || raw.get("operator:wikidata").is_some() {
            return true;
        }
        if raw.get("brand").is_some() {
            return true;
        }
    }
    match &business.name {
        Some(name) => wikidata::matches_chain(chains, name),
        None => false,
    }
}

fn build_reasons(
    business: &BusinessRow,
    feature: &FeatureBundle,
    chains: &HashSet<String>,
    disqualify_reason: Option<&str>,
) -> Value {
    let category = business
        .category
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty());
    let raw = business.raw.as_ref();

    json!({
        "category": category,
        "has_email": !feature.emails.is_empty(),
        "has_business_email": !feature.business_emails.is_empty(),
        "has_phone": !feature.phones.is_empty(),
        "has_hosted_domain": !feature.hosted_domains.is_empty(),
        "has_parked_domain": !feature.parked_domains.is_empty(),
        "has_registered_domain": !feature.registered_domains.is_empty(),
        "has_any_active_domain": feature.has_active_domain(),
        "disqualify_reason": disqualify_reason,
        "is_branded_chain": is_branded_chain(business, chains),
        "brand": raw.and_then(|r| r.get("brand").cloned()),
        "name_looks_like_domain": business
            .name
            .as_deref()
            .map(name_looks_like_domain)
            .unwrap_or(false),
        "domain_count": feature.domains.len(),
        "verified_unhosted_domain_count": feature.verified_unhosted_domains.len(),
        "unregistered_domain_count": feature.unregistered_domains.len(),
        "registered_domain_count": feature.registered_domains.len(),
        "unknown_domain_count": feature.unknown_domains.len(),
        "domains": feature.domains,
        "verified_unhosted_domains": feature.verified_unhosted_domains,
        "unregistered_domains": feature.unregistered_domains,
        "registered_domains": feature.registered_domains,
        "unknown_domains": feature.unknown_domains,
        "hosted_domains": feature.hosted_domains,
        "parked_domains": feature.parked_domains,
        "domain_status_counts": feature.domain_status_counts,
        "verification_confidence": verification_confidence(raw).as_str(),
    })
}

/// Score one business. Pure: same inputs, same output.
pub fn score_business(
    business: &BusinessRow,
    feature: &FeatureBundle,
    chains: &HashSet<String>,
) -> (f64, Value) {
    let has_website = business
        .website_url
        .as_deref()
        .map(|w| !w.trim().is_empty())
        .unwrap_or(false);

    // -- Disqualifiers --

    if is_branded_chain(business, chains) {
        return (
            0.0,
            build_reasons(business, feature, chains, Some("branded_chain")),
        );
    }

    // Any linked domain with DNS records means the business is active
    // online somewhere — not a lead, even without an OSM website tag.
    if !has_website && feature.has_active_domain() {
        return (
            0.0,
            build_reasons(business, feature, chains, Some("active_domain")),
        );
    }

    // -- Additive signals --

    let mut score = 0.0;
    if !has_website {
        score += SCORE_NO_WEBSITE;
    }
    if !feature.business_emails.is_empty() {
        score += SCORE_BUSINESS_EMAIL;
    } else if !feature.emails.is_empty() {
        score += SCORE_ANY_EMAIL;
    }
    if !feature.phones.is_empty() {
        score += SCORE_PHONE;
    }

    let category = business
        .category
        .as_deref()
        .map(str::trim)
        .unwrap_or_default();
    if HIGH_PRIORITY_CATEGORIES.contains(&category) {
        score += SCORE_HIGH_PRIORITY_CATEGORY;
    } else if MEDIUM_PRIORITY_CATEGORIES.contains(&category) {
        score += SCORE_MEDIUM_PRIORITY_CATEGORY;
    } else if !category.is_empty() {
        score += SCORE_ANY_CATEGORY;
    }

    // -- Quality caps --

    // Unclassified linked domains with no qualified domain to offset
    // them: very likely hosted once the classifier catches up.
    let has_qualified_domain = !feature.verified_unhosted_domains.is_empty()
        || !feature.unregistered_domains.is_empty();
    if !has_website && !feature.unknown_domains.is_empty() && !has_qualified_domain {
        score = score.min(10.0);
    }

    let name_is_domain = business
        .name
        .as_deref()
        .map(name_looks_like_domain)
        .unwrap_or(false);
    if name_is_domain {
        score = score.min(15.0);
    }

    if !feature.has_any_contact() {
        score = score.min(5.0);
    }

    // Verification confidence bounds the score: an unverified lead can
    // never reach export territory.
    match verification_confidence(business.raw.as_ref()) {
        ConfidenceLevel::Unverified => score = score.min(35.0),
        ConfidenceLevel::Low => score = score.min(50.0),
        ConfidenceLevel::Medium | ConfidenceLevel::High => {}
    }

    let disqualify_reason = if !feature.has_any_contact() {
        Some("no_contacts")
    } else if name_is_domain {
        Some("name_is_domain")
    } else {
        None
    };

    (
        score.min(100.0),
        build_reasons(business, feature, chains, disqualify_reason),
    )
}

/// Batch-scoring counters.
#[derive(Debug, Default, Clone)]
pub struct ScoreOutcome {
    pub processed: u64,
}

/// Score every business whose features are newer than its `scored_at`
/// (or all of them under `force_rescore`), then sweep businesses that
/// already have a website to zero.
pub async fn score_businesses(
    pool: &PgPool,
    config: &'static Config,
    limit: Option<i64>,
    scope: Option<&str>,
    force_rescore: bool,
) -> Result<ScoreOutcome, sqlx::Error> {
    let batch_limit = match limit {
        Some(n) if n > 0 => Some(n),
        _ => None,
    };

    let run_id = jobs::start(
        pool,
        JOB_NAME,
        scope,
        Some(&json!({ "force_rescore": force_rescore })),
    )
    .await?;

    let result = async {
        let chains = wikidata::chain_names(&config.http_user_agent).await;
        let mut outcome = ScoreOutcome::default();

        let rows = businesses::select_for_scoring(pool, batch_limit, force_rescore).await?;
        if !rows.is_empty() {
            let ids: Vec<Uuid> = rows.iter().map(|b| b.id).collect();
            let features = load_features(pool, &ids).await?;

            let mut tx = pool.begin().await?;
            for business in &rows {
                let empty = FeatureBundle::default();
                let feature = features.get(&business.id).unwrap_or(&empty);
                let (score, reasons) = score_business(business, feature, chains);
                businesses::update_score(&mut tx, business.id, score, &reasons).await?;
                outcome.processed += 1;
            }
            tx.commit().await?;
        }

        // Businesses with a website are not leads; zero them so they
        // never surface in exports.
        let with_website =
            businesses::select_has_website_for_scoring(pool, batch_limit, force_rescore).await?;
        if !with_website.is_empty() {
            let mut tx = pool.begin().await?;
            for business in &with_website {
                let reasons = json!({
                    "disqualify_reason": "has_website",
                    "website_url": business.website_url,
                });
                businesses::update_score(&mut tx, business.id, 0.0, &reasons).await?;
                outcome.processed += 1;
            }
            tx.commit().await?;
        }

        Ok::<ScoreOutcome, sqlx::Error>(outcome)
    }
    .await;

    match result {
        Ok(outcome) => {
            jobs::complete(
                pool,
                run_id,
                outcome.processed as i64,
                Some(&json!({ "force_rescore": force_rescore })),
            )
            .await?;
            Ok(outcome)
        }
        Err(e) => {
            jobs::fail(pool, run_id, &e.to_string(), None).await?;
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn business(name: &str, category: Option<&str>, website: Option<&str>, raw: Option<Value>) -> BusinessRow {
        BusinessRow {
            id: Uuid::new_v4(),
            source: "osm".into(),
            source_id: "node/1".into(),
            name: Some(name.to_string()),
            category: category.map(str::to_string),
            website_url: website.map(str::to_string),
            address: None,
            lead_score: None,
            score_reasons: None,
            scored_at: None,
            lat: None,
            lon: None,
            raw,
            city_id: None,
            created_at: Utc::now(),
        }
    }

    fn no_chains() -> HashSet<String> {
        HashSet::new()
    }

    /// Raw map giving high verification confidence (0.7 + 0.9 = 1.6).
    fn high_confidence_raw() -> Value {
        json!({
            "domain_guess_verified": true,
            "domain_guess_result": "no_match",
            "searxng_verified": true,
            "searxng_result": "no_website",
        })
    }

    #[test]
    fn acme_plumbing_scores_one_hundred() {
        // +25 no website, +20 business email, +15 phone, +20 trades
        // = 80; verified-unhosted domain, high confidence → no caps.
        let mut feature = FeatureBundle::default();
        feature.add_contact("email", "info@acmeplumbing.ca");
        feature.add_contact("phone", "+1 416 555 0100");
        feature.add_domain("acmeplumbing.ca", "verified_unhosted");

        let business = business("Acme Plumbing", Some("trades"), None, Some(high_confidence_raw()));
        let (score, reasons) = score_business(&business, &feature, &no_chains());
        assert_eq!(score, 80.0);
        assert_eq!(reasons["verification_confidence"], "high");
        assert_eq!(reasons["disqualify_reason"], Value::Null);
    }

    #[test]
    fn branded_chain_scores_zero() {
        let mut feature = FeatureBundle::default();
        feature.add_contact("phone", "+1 416 555 0100");
        let business = business(
            "Tim Hortons #1234",
            Some("food"),
            None,
            Some(json!({ "brand:wikidata": "Q175106" })),
        );
        let (score, reasons) = score_business(&business, &feature, &no_chains());
        assert_eq!(score, 0.0);
        assert_eq!(reasons["disqualify_reason"], "branded_chain");
    }

    #[test]
    fn wikidata_chain_without_tags_scores_zero() {
        let chains: HashSet<String> = ["tim hortons".to_string()].into_iter().collect();
        let business = business("Tim Hortons", Some("food"), None, None);
        let (score, _) = score_business(&business, &FeatureBundle::default(), &chains);
        assert_eq!(score, 0.0);
    }

    #[test]
    fn hosted_email_domain_disqualifies() {
        let mut feature = FeatureBundle::default();
        feature.add_contact("email", "info@hostedsomewhere.ca");
        feature.add_domain("hostedsomewhere.ca", "hosted");
        let business = business("Quiet Shop", Some("retail"), None, None);
        let (score, reasons) = score_business(&business, &feature, &no_chains());
        assert_eq!(score, 0.0);
        assert_eq!(reasons["disqualify_reason"], "active_domain");
    }

    #[test]
    fn registered_dns_only_domain_also_disqualifies() {
        let mut feature = FeatureBundle::default();
        feature.add_contact("email", "info@dnsonly.ca");
        feature.add_domain("dnsonly.ca", "registered_dns_only");
        let business = business("Quiet Shop", None, None, None);
        let (score, _) = score_business(&business, &feature, &no_chains());
        assert_eq!(score, 0.0);
    }

    #[test]
    fn name_looking_like_domain_caps_at_fifteen() {
        let mut feature = FeatureBundle::default();
        feature.add_contact("phone", "+1 416 555 0100");
        let business = business("iRepair.ca", Some("retail"), None, Some(high_confidence_raw()));
        // Would be 25 + 15 + 10 = 50 without the cap.
        let (score, reasons) = score_business(&business, &feature, &no_chains());
        assert_eq!(score, 15.0);
        assert_eq!(reasons["disqualify_reason"], "name_is_domain");
    }

    #[test]
    fn no_contacts_caps_at_five() {
        let business = business("Lonely Shop", Some("retail"), None, Some(high_confidence_raw()));
        let (score, reasons) = score_business(&business, &FeatureBundle::default(), &no_chains());
        assert_eq!(score, 5.0);
        assert_eq!(reasons["disqualify_reason"], "no_contacts");
    }

    #[test]
    fn unverified_caps_at_thirty_five() {
        let mut feature = FeatureBundle::default();
        feature.add_contact("email", "info@acmeplumbing.ca");
        feature.add_contact("phone", "+1 416 555 0100");
        // 25 + 20 + 15 + 20 = 80, but nothing verified this business.
        let business = business("Acme Plumbing", Some("trades"), None, None);
        let (score, reasons) = score_business(&business, &feature, &no_chains());
        assert_eq!(score, 35.0);
        assert_eq!(reasons["verification_confidence"], "unverified");
    }

    #[test]
    fn low_confidence_caps_at_fifty() {
        let mut feature = FeatureBundle::default();
        feature.add_contact("email", "info@acmeplumbing.ca");
        feature.add_contact("phone", "+1 416 555 0100");
        let raw = json!({
            "ddg_verified": true,
            "ddg_verify_result": "no_results",
        });
        let business = business("Acme Plumbing", Some("trades"), None, Some(raw));
        let (score, _) = score_business(&business, &feature, &no_chains());
        assert_eq!(score, 50.0);
    }

    #[test]
    fn unknown_domain_without_qualified_caps_at_ten() {
        let mut feature = FeatureBundle::default();
        feature.add_contact("email", "info@unclassified.ca");
        feature.add_domain("unclassified.ca", "new");
        let business = business("Acme Plumbing", Some("trades"), None, Some(high_confidence_raw()));
        let (score, _) = score_business(&business, &feature, &no_chains());
        assert_eq!(score, 10.0);
    }

    #[test]
    fn qualified_domain_lifts_unknown_domain_cap() {
        let mut feature = FeatureBundle::default();
        feature.add_contact("email", "info@acmeplumbing.ca");
        feature.add_domain("unclassified.ca", "new");
        feature.add_domain("acmeplumbing.ca", "unregistered_candidate");
        let business = business("Acme Plumbing", Some("trades"), None, Some(high_confidence_raw()));
        let (score, _) = score_business(&business, &feature, &no_chains());
        assert!(score > 10.0, "qualified domain should lift the cap, got {score}");
    }

    #[test]
    fn scorer_is_pure() {
        let mut feature = FeatureBundle::default();
        feature.add_contact("phone", "+1 416 555 0100");
        let business = business("Acme Plumbing", Some("trades"), None, Some(high_confidence_raw()));
        let first = score_business(&business, &feature, &no_chains());
        let second = score_business(&business, &feature, &no_chains());
        assert_eq!(first.0, second.0);
        assert_eq!(first.1, second.1);
    }

    #[test]
    fn free_email_scores_less_than_business_email() {
        let mut with_free = FeatureBundle::default();
        with_free.add_contact("email", "shop@gmail.com");
        let mut with_business = FeatureBundle::default();
        with_business.add_contact("email", "shop@acme.ca");

        let business = business("Acme Plumbing", None, None, Some(high_confidence_raw()));
        let (free_score, _) = score_business(&business, &with_free, &no_chains());
        let (business_score, _) = score_business(&business, &with_business, &no_chains());
        assert_eq!(business_score - free_score, 15.0);
    }
}
