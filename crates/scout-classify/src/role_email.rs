//! Role-address contact enrichment.
//!
//! For domains confirmed registered-but-unhosted with working mail
//! (latest check has MX), fabricate the standard role addresses and
//! attach them as low-confidence contacts under an organization derived
//! from the domain. Domains without MX transition to `mx_missing`;
//! domains that gained contacts become `enriched`, the rest
//! `no_contacts`.

use sqlx::PgPool;

use scout_store::{contact_pipeline, domains, jobs};

use crate::error::ClassifyError;

pub const JOB_NAME: &str = "enrich_role_emails";

const ROLE_PREFIXES: &[&str] = &["info", "admin", "sales", "support", "contact"];

/// Statuses this worker consumes: the canonical mail-capable
/// classification plus the legacy vocabulary older runs wrote.
const ELIGIBLE_STATUSES: &[&str] = &["registered_no_web", "verified_unhosted", "checked"];

/// Build the candidate role addresses for a domain.
pub fn build_role_emails(domain: &str) -> Vec<String> {
    ROLE_PREFIXES
        .iter()
        .map(|prefix| format!("{prefix}@{domain}"))
        .collect()
}

/// Run one enrichment batch. Returns processed-domain count.
pub async fn run_batch(
    pool: &PgPool,
    batch_size: i64,
    limit: Option<i64>,
    scope: Option<&str>,
) -> Result<u64, ClassifyError> {
    let effective = match limit {
        Some(n) if n > 0 => n,
        Some(_) => i64::MAX,
        None => batch_size,
    };

    let run_id = jobs::start(pool, JOB_NAME, scope, None).await?;

    let result = async {
        let statuses: Vec<String> = ELIGIBLE_STATUSES.iter().map(|s| s.to_string()).collect();
        let mut tx = pool.begin().await?;
        let claimed = domains::claim_by_status(&mut tx, &statuses, effective).await?;

        let mut processed: u64 = 0;
        for domain_row in &claimed {
            let has_mx = domains::latest_has_mx(pool, domain_row.id).await?.unwrap_or(false);
            if !has_mx {
                domains::set_status(&mut tx, domain_row.id, "mx_missing").await?;
                processed += 1;
                continue;
            }

            let org_id =
                contact_pipeline::ensure_org(&mut tx, domain_row.id, &domain_row.domain).await?;
            let emails = build_role_emails(&domain_row.domain);
            let created = contact_pipeline::create_role_contacts(&mut tx, org_id, &emails).await?;

            let next_status = if created > 0 { "enriched" } else { "no_contacts" };
            domains::set_status(&mut tx, domain_row.id, next_status).await?;
            processed += 1;
        }

        tx.commit().await?;
        Ok::<u64, sqlx::Error>(processed)
    }
    .await;

    match result {
        Ok(processed) => {
            jobs::complete(pool, run_id, processed as i64, None).await?;
            Ok(processed)
        }
        Err(e) => {
            jobs::fail(pool, run_id, &e.to_string(), None).await?;
            Err(e.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_addresses_cover_standard_prefixes() {
        let emails = build_role_emails("acme.ca");
        assert_eq!(emails.len(), 5);
        assert!(emails.contains(&"info@acme.ca".to_string()));
        assert!(emails.contains(&"support@acme.ca".to_string()));
    }
}
