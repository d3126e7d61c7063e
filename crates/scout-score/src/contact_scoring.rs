//! Contact lead-scoring for the enrichment pipeline.
//!
//! Contacts hang off organizations which hang off domains, so the
//! scoring features are per-domain: the categories and website coverage
//! of the businesses linked to that domain, plus phone availability.
//! Hosted or parked domains disqualify outright — mail to a contact at
//! a domain that already serves a website is not a lead.

use std::collections::{BTreeSet, HashMap, HashSet};

use serde_json::{json, Value};
use sqlx::PgPool;
use uuid::Uuid;

use scout_clients::Config;
use scout_store::models::ContactWithDomain;
use scout_store::{contact_pipeline, contacts, jobs, links};

pub const JOB_NAME: &str = "lead_scoring";

const ROLE_PREFIXES: &[&str] = &["info", "admin", "sales", "support", "contact"];
const HIGH_PRIORITY_CATEGORIES: &[&str] = &["trades", "contractors"];
const MEDIUM_PRIORITY_CATEGORIES: &[&str] =
    &["professional_services", "retail", "health", "food", "auto"];

/// Per-domain features shared by every contact on that domain.
#[derive(Debug, Default, Clone)]
pub struct DomainFeatures {
    pub categories: BTreeSet<String>,
    pub has_no_website_business: bool,
    pub has_phone: bool,
}

/// Score one contact. Pure.
pub fn score_contact(contact: &ContactWithDomain, features: &DomainFeatures) -> (f64, Value) {
    if matches!(contact.domain_status.as_str(), "hosted" | "parked") {
        return (
            0.0,
            json!({
                "domain_status": contact.domain_status,
                "disqualified": true,
                "disqualification_reason": "hosted_or_parked_domain",
                "source": contact.contact_source,
            }),
        );
    }

    let mut score: f64 = 0.0;
    let mut reasons = json!({
        "domain_status": contact.domain_status,
        "categories": features.categories,
        "has_no_website_business": features.has_no_website_business,
        "has_phone": features.has_phone,
        "source": contact.contact_source,
    });

    if contact.contact_source.as_deref() == Some("role") {
        score += 10.0;
    }

    if let Some(email) = contact.email.as_deref() {
        if let Some((prefix, _)) = email.split_once('@') {
            let prefix = prefix.to_lowercase();
            if ROLE_PREFIXES.contains(&prefix.as_str()) {
                score += 10.0;
                reasons["role_prefix"] = json!(prefix);
            }
        }
    }

    score += match contact.domain_status.as_str() {
        "verified_unhosted" | "enriched" => 20.0,
        "checked" | "mx_missing" | "no_mx" => 15.0,
        "unregistered_candidate" => 10.0,
        _ => 0.0,
    };

    if features.has_no_website_business {
        score += 25.0;
    }
    if features.has_phone {
        score += 20.0;
    }

    let categories: HashSet<&str> = features.categories.iter().map(String::as_str).collect();
    if HIGH_PRIORITY_CATEGORIES.iter().any(|c| categories.contains(c)) {
        score += 25.0;
    } else if MEDIUM_PRIORITY_CATEGORIES.iter().any(|c| categories.contains(c)) {
        score += 10.0;
    } else if !categories.is_empty() {
        score += 5.0;
    }

    (score.min(100.0), reasons)
}

/// Score unscored contacts (or all of them under `force_rescore`).
pub async fn run_batch(
    pool: &PgPool,
    config: &'static Config,
    limit: Option<i64>,
    force_rescore: bool,
) -> Result<u64, sqlx::Error> {
    let batch_limit = match limit {
        Some(n) if n > 0 => Some(n),
        Some(_) => None,
        None => Some(config.batch_size),
    };

    let run_id = jobs::start(pool, JOB_NAME, None, None).await?;

    let result = async {
        let rows = contact_pipeline::contacts_for_scoring(pool, batch_limit, force_rescore).await?;
        if rows.is_empty() {
            return Ok::<u64, sqlx::Error>(0);
        }

        // Per-domain features from the linked businesses.
        let domain_ids: Vec<Uuid> = {
            let mut ids: Vec<Uuid> = rows.iter().map(|r| r.domain_id).collect();
            ids.sort();
            ids.dedup();
            ids
        };
        let link_rows = links::businesses_for_domains(pool, &domain_ids).await?;

        let mut features: HashMap<Uuid, DomainFeatures> = domain_ids
            .iter()
            .map(|id| (*id, DomainFeatures::default()))
            .collect();
        let mut business_ids: Vec<Uuid> = Vec::new();
        let mut businesses_by_domain: HashMap<Uuid, Vec<Uuid>> = HashMap::new();

        for (domain_id, business_id, category, website_url) in link_rows {
            let feature = features.entry(domain_id).or_default();
            if let Some(category) = category.filter(|c| !c.is_empty()) {
                feature.categories.insert(category);
            }
            if website_url.map(|w| w.trim().is_empty()).unwrap_or(true) {
                feature.has_no_website_business = true;
            }
            businesses_by_domain.entry(domain_id).or_default().push(business_id);
            business_ids.push(business_id);
        }

        business_ids.sort();
        business_ids.dedup();
        let with_phone: HashSet<Uuid> = contacts::businesses_with_phone(pool, &business_ids)
            .await?
            .into_iter()
            .collect();
        for (domain_id, linked) in &businesses_by_domain {
            if linked.iter().any(|id| with_phone.contains(id)) {
                if let Some(feature) = features.get_mut(domain_id) {
                    feature.has_phone = true;
                }
            }
        }

        let mut tx = pool.begin().await?;
        let mut processed: u64 = 0;
        let empty = DomainFeatures::default();
        for contact in &rows {
            let feature = features.get(&contact.domain_id).unwrap_or(&empty);
            let (score, reasons) = score_contact(contact, feature);
            contact_pipeline::update_contact_score(&mut tx, contact.contact_id, score, &reasons)
                .await?;
            processed += 1;
        }
        tx.commit().await?;

        Ok(processed)
    }
    .await;

    match result {
        Ok(processed) => {
            jobs::complete(
                pool,
                run_id,
                processed as i64,
                Some(&json!({ "force_rescore": force_rescore })),
            )
            .await?;
            Ok(processed)
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

    fn contact(email: &str, source: Option<&str>, status: &str) -> ContactWithDomain {
        ContactWithDomain {
            contact_id: Uuid::new_v4(),
            email: Some(email.to_string()),
            first_name: None,
            last_name: None,
            title: None,
            contact_source: source.map(str::to_string),
            lead_score: None,
            org_name: Some("acme.ca".to_string()),
            domain_id: Uuid::new_v4(),
            domain: "acme.ca".to_string(),
            domain_status: status.to_string(),
        }
    }

    #[test]
    fn hosted_domain_disqualifies_contact() {
        let (score, reasons) =
            score_contact(&contact("info@acme.ca", Some("role"), "hosted"), &DomainFeatures::default());
        assert_eq!(score, 0.0);
        assert_eq!(reasons["disqualification_reason"], "hosted_or_parked_domain");
    }

    #[test]
    fn role_contact_on_enriched_domain_scores_well() {
        let features = DomainFeatures {
            categories: ["trades".to_string()].into_iter().collect(),
            has_no_website_business: true,
            has_phone: true,
        };
        // role source 10 + role prefix 10 + enriched 20 + no-website 25
        // + phone 20 + trades 25 = 110 → capped 100.
        let (score, reasons) =
            score_contact(&contact("info@acme.ca", Some("role"), "enriched"), &features);
        assert_eq!(score, 100.0);
        assert_eq!(reasons["role_prefix"], "info");
    }

    #[test]
    fn non_role_email_on_unregistered_domain() {
        let features = DomainFeatures::default();
        // No role bonus, prefix "owner" not a role prefix,
        // unregistered_candidate → 10.
        let (score, _) =
            score_contact(&contact("owner@acme.ca", Some("import"), "unregistered_candidate"), &features);
        assert_eq!(score, 10.0);
    }
}
