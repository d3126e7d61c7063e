//! Per-business feature bundles.
//!
//! The scorer and exporter never read contact or link tables directly;
//! they consume the uniform bundle built here. Domains linked through
//! public email providers are excluded entirely, and every remaining
//! domain lands in exactly one bucket based on its classification
//! status.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use sqlx::PgPool;
use uuid::Uuid;

use scout_core::{extract_domain_from_email, is_public_email_domain};
use scout_store::exports::{
    HOSTED_STATUSES, PARKED_STATUSES, REGISTERED_STATUSES, UNREGISTERED_STATUSES,
    VERIFIED_UNHOSTED_STATUSES,
};
use scout_store::{contacts, links};

/// Everything the scorer needs to know about one business's contacts
/// and linked domains.
#[derive(Debug, Default, Clone)]
pub struct FeatureBundle {
    pub emails: BTreeSet<String>,
    /// Emails on non-public domains.
    pub business_emails: BTreeSet<String>,
    /// Emails on public providers / ISPs.
    pub free_emails: BTreeSet<String>,
    pub phones: BTreeSet<String>,
    pub domains: BTreeSet<String>,
    pub verified_unhosted_domains: BTreeSet<String>,
    pub unregistered_domains: BTreeSet<String>,
    pub hosted_domains: BTreeSet<String>,
    pub parked_domains: BTreeSet<String>,
    pub registered_domains: BTreeSet<String>,
    pub unknown_domains: BTreeSet<String>,
    pub domain_status_counts: BTreeMap<String, i64>,
}

impl FeatureBundle {
    pub fn has_any_contact(&self) -> bool {
        !self.emails.is_empty() || !self.phones.is_empty()
    }

    /// Any linked domain with DNS records — hosted, parked, or
    /// registered. The business is active online somewhere.
    pub fn has_active_domain(&self) -> bool {
        !self.hosted_domains.is_empty()
            || !self.parked_domains.is_empty()
            || !self.registered_domains.is_empty()
    }

    /// Sort a (verification-relevant) domain into its bucket.
    pub fn add_domain(&mut self, domain: &str, status: &str) {
        let normalized = domain.trim().to_lowercase();
        if normalized.is_empty() || is_public_email_domain(&normalized) {
            return;
        }
        self.domains.insert(normalized.clone());

        let status_key = if status.trim().is_empty() { "unknown" } else { status.trim() };
        *self
            .domain_status_counts
            .entry(status_key.to_string())
            .or_insert(0) += 1;

        if VERIFIED_UNHOSTED_STATUSES.contains(&status_key) {
            self.verified_unhosted_domains.insert(normalized);
        } else if UNREGISTERED_STATUSES.contains(&status_key) {
            self.unregistered_domains.insert(normalized);
        } else if HOSTED_STATUSES.contains(&status_key) {
            self.hosted_domains.insert(normalized);
        } else if PARKED_STATUSES.contains(&status_key) {
            self.parked_domains.insert(normalized);
        } else if REGISTERED_STATUSES.contains(&status_key) {
            self.registered_domains.insert(normalized);
        } else {
            // new / rdap_error / dns_error / skipped / anything else.
            self.unknown_domains.insert(normalized);
        }
    }

    /// Record one contact value.
    pub fn add_contact(&mut self, contact_type: &str, value: &str) {
        let value = value.trim();
        if value.is_empty() {
            return;
        }
        match contact_type {
            "email" => {
                let email = value.to_lowercase();
                self.emails.insert(email.clone());
                let is_business = extract_domain_from_email(&email)
                    .map(|d| !is_public_email_domain(&d))
                    .unwrap_or(false);
                if is_business {
                    self.business_emails.insert(email);
                } else {
                    self.free_emails.insert(email);
                }
            }
            "phone" => {
                self.phones.insert(value.to_string());
            }
            _ => {}
        }
    }
}

/// Load feature bundles for a set of businesses. Every requested id gets
/// a bundle, empty or not.
pub async fn load_features(
    pool: &PgPool,
    business_ids: &[Uuid],
) -> Result<HashMap<Uuid, FeatureBundle>, sqlx::Error> {
    let mut features: HashMap<Uuid, FeatureBundle> = business_ids
        .iter()
        .map(|id| (*id, FeatureBundle::default()))
        .collect();

    if business_ids.is_empty() {
        return Ok(features);
    }

    for (business_id, rows) in contacts::for_businesses(pool, business_ids).await? {
        let bundle = features.entry(business_id).or_default();
        for row in rows {
            bundle.add_contact(&row.contact_type, &row.value);
        }
    }

    for (business_id, rows) in links::linked_domains(pool, business_ids).await? {
        let bundle = features.entry(business_id).or_default();
        for row in rows {
            bundle.add_domain(&row.domain, &row.status);
        }
    }

    Ok(features)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emails_split_into_business_and_free() {
        let mut bundle = FeatureBundle::default();
        bundle.add_contact("email", "Info@Acme.CA");
        bundle.add_contact("email", "owner@gmail.com");
        bundle.add_contact("phone", " +1 416 555 0100 ");

        assert_eq!(bundle.emails.len(), 2);
        assert!(bundle.business_emails.contains("info@acme.ca"));
        assert!(bundle.free_emails.contains("owner@gmail.com"));
        assert!(bundle.phones.contains("+1 416 555 0100"));
        assert!(bundle.has_any_contact());
    }

    #[test]
    fn domains_land_in_exactly_one_bucket() {
        let mut bundle = FeatureBundle::default();
        bundle.add_domain("hosted.ca", "hosted");
        bundle.add_domain("parked.ca", "parked");
        bundle.add_domain("mail-only.ca", "registered_no_web");
        bundle.add_domain("dns-only.ca", "registered_dns_only");
        bundle.add_domain("legacy.ca", "mx_missing");
        bundle.add_domain("free.ca", "unregistered_candidate");
        bundle.add_domain("old.ca", "verified_unhosted");
        bundle.add_domain("fresh.ca", "new");

        assert_eq!(bundle.hosted_domains.len(), 1);
        assert_eq!(bundle.parked_domains.len(), 1);
        assert_eq!(bundle.registered_domains.len(), 3);
        assert_eq!(bundle.unregistered_domains.len(), 1);
        assert_eq!(bundle.verified_unhosted_domains.len(), 1);
        assert_eq!(bundle.unknown_domains.len(), 1);
        assert_eq!(bundle.domains.len(), 8);
        assert!(bundle.has_active_domain());
    }

    #[test]
    fn public_email_domains_never_enter_the_bundle() {
        let mut bundle = FeatureBundle::default();
        bundle.add_domain("gmail.com", "hosted");
        assert!(bundle.domains.is_empty());
        assert!(!bundle.has_active_domain());
    }

    #[test]
    fn status_histogram_counts_raw_statuses() {
        let mut bundle = FeatureBundle::default();
        bundle.add_domain("a.ca", "hosted");
        bundle.add_domain("b.ca", "hosted");
        bundle.add_domain("c.ca", "");
        assert_eq!(bundle.domain_status_counts.get("hosted"), Some(&2));
        assert_eq!(bundle.domain_status_counts.get("unknown"), Some(&1));
    }
}
