//! Lead selection and the per-business export ledger.
//!
//! The exporter and the dashboard lead queries share one SQL builder so
//! "what is exportable" has a single definition. The
//! `(business_id, platform)` unique constraint is the idempotency anchor:
//! re-running an export inserts nothing and writes an empty file.

use scout_core::domain::{public_email_domains, PUBLIC_EMAIL_DOMAIN_PREFIXES};
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::models::BusinessWithCity;

/// Statuses treated as "confirmed registered-but-unhosted" for domain
/// qualification. Includes strings only older pipeline versions wrote.
pub const VERIFIED_UNHOSTED_STATUSES: &[&str] =
    &["verified_unhosted", "checked", "no_mx", "enriched", "no_contacts"];

/// Statuses counting as unregistered candidates.
pub const UNREGISTERED_STATUSES: &[&str] = &["unregistered_candidate"];

/// Hosted / parked.
pub const HOSTED_STATUSES: &[&str] = &["hosted"];
pub const PARKED_STATUSES: &[&str] = &["parked"];

/// DNS records but no web server — the business is active online
/// somewhere, so it is not a lead opportunity.
pub const REGISTERED_STATUSES: &[&str] =
    &["registered_no_web", "registered_dns_only", "mx_missing"];

/// Eligibility and filter switches for lead selection.
#[derive(Debug, Clone)]
pub struct LeadFilter {
    /// Platform whose prior exports exclude a business.
    pub platform: String,
    pub min_score: Option<f64>,
    /// Require the business to have no website (the exporter always does;
    /// the dashboard can disable it to inspect disqualified rows).
    pub require_no_website: bool,
    /// Require a scored row (`lead_score IS NOT NULL`).
    pub require_scored: bool,
    pub require_contact: bool,
    pub require_unhosted_domain: bool,
    pub require_domain_qualification: bool,
    /// Exclude businesses whose linked non-public domain is hosted,
    /// parked, or registered; they have a web presence somewhere even if
    /// OSM did not tag it.
    pub exclude_hosted_email_domain: bool,
    /// Exclude businesses already exported for `platform`.
    pub exclude_exported_for_platform: bool,
    /// Exclude businesses ever exported for any platform (daily-target
    /// first pass).
    pub exclude_previously_exported: bool,
    /// Require at least one verification source to have run.
    pub only_verified: bool,
    pub category: Option<String>,
    pub city: Option<String>,
}

impl LeadFilter {
    /// The exporter's defaults for a platform.
    pub fn for_export(platform: &str) -> Self {
        Self {
            platform: platform.to_string(),
            min_score: None,
            require_no_website: true,
            require_scored: true,
            require_contact: true,
            require_unhosted_domain: false,
            require_domain_qualification: true,
            exclude_hosted_email_domain: true,
            exclude_exported_for_platform: true,
            exclude_previously_exported: false,
            only_verified: false,
            category: None,
            city: None,
        }
    }
}

fn owned(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

/// Push the "linked non-public domain with one of these statuses exists"
/// subquery. Public email domains are excluded both by the exact set and
/// the prefix families.
fn push_domain_status_exists(qb: &mut QueryBuilder<'static, Postgres>, statuses: Vec<String>) {
    let public: Vec<String> = public_email_domains().map(str::to_string).collect();
    let prefixes: Vec<String> = PUBLIC_EMAIL_DOMAIN_PREFIXES
        .iter()
        .map(|p| p.to_string())
        .collect();

    qb.push(
        "EXISTS (SELECT 1 FROM business_domain_links l \
         JOIN domains d ON d.id = l.domain_id \
         WHERE l.business_id = b.id \
           AND NOT (lower(d.domain) = ANY(",
    );
    qb.push_bind(public);
    qb.push(
        ")) \
           AND NOT EXISTS (SELECT 1 FROM unnest(",
    );
    qb.push_bind(prefixes);
    qb.push(
        "::text[]) AS p(prefix) WHERE lower(d.domain) LIKE p.prefix || '%') \
           AND d.status = ANY(",
    );
    qb.push_bind(statuses);
    qb.push("))");
}

/// Build the shared WHERE clause onto a query that selects from
/// `businesses b LEFT JOIN cities c`.
fn push_filters(qb: &mut QueryBuilder<'static, Postgres>, filter: &LeadFilter) {
    if filter.require_no_website {
        qb.push(" AND (b.website_url IS NULL OR b.website_url = '')");
    }
    if filter.require_scored {
        qb.push(" AND b.lead_score IS NOT NULL");
    }
    if let Some(min_score) = filter.min_score {
        qb.push(" AND b.lead_score >= ");
        qb.push_bind(min_score);
    }
    if filter.exclude_exported_for_platform {
        qb.push(
            " AND NOT EXISTS (SELECT 1 FROM business_outreach_exports e \
             WHERE e.business_id = b.id AND e.platform = ",
        );
        qb.push_bind(filter.platform.clone());
        qb.push(")");
    }
    if filter.exclude_previously_exported {
        qb.push(
            " AND NOT EXISTS (SELECT 1 FROM business_outreach_exports e \
             WHERE e.business_id = b.id)",
        );
    }
    if filter.require_contact {
        qb.push(
            " AND EXISTS (SELECT 1 FROM business_contacts bc \
             WHERE bc.business_id = b.id AND bc.contact_type IN ('email', 'phone'))",
        );
    }
    if filter.exclude_hosted_email_domain {
        // Any DNS-bearing domain (hosted, parked, or registered) indicates
        // active use somewhere.
        let mut active = owned(HOSTED_STATUSES);
        active.extend(owned(PARKED_STATUSES));
        active.extend(owned(REGISTERED_STATUSES));
        qb.push(" AND NOT ");
        push_domain_status_exists(qb, active);
    }
    if filter.require_domain_qualification || filter.require_unhosted_domain {
        let mut hosted_parked = owned(HOSTED_STATUSES);
        hosted_parked.extend(owned(PARKED_STATUSES));
        qb.push(" AND NOT ");
        push_domain_status_exists(qb, hosted_parked);

        let mut qualified = owned(VERIFIED_UNHOSTED_STATUSES);
        qualified.extend(owned(UNREGISTERED_STATUSES));
        qb.push(" AND ");
        push_domain_status_exists(qb, qualified);
    }
    if filter.only_verified {
        let keys: Vec<String> = scout_core::verdict::ALL_SOURCES
            .iter()
            .map(|s| s.verified_key().to_string())
            .collect();
        qb.push(" AND b.raw ?| ");
        qb.push_bind(keys);
        qb.push("::text[]");
    }
    if let Some(category) = filter.category.clone() {
        qb.push(" AND b.category = ");
        qb.push_bind(category);
    }
    if let Some(city) = filter.city.clone() {
        qb.push(" AND c.name ILIKE ");
        qb.push_bind(format!("%{city}%"));
    }
}

/// Select eligible leads, highest score first, oldest first on ties.
pub async fn select_leads(
    pool: &PgPool,
    filter: &LeadFilter,
    limit: Option<i64>,
    offset: i64,
) -> Result<Vec<BusinessWithCity>, sqlx::Error> {
    let mut qb = QueryBuilder::<Postgres>::new(
        "SELECT b.id, b.source, b.source_id, b.name, b.category, b.website_url, \
                b.address, b.lead_score, b.scored_at, b.lat, b.lon, b.raw, b.created_at, \
                c.name AS city_name, c.country AS city_country \
         FROM businesses b \
         LEFT JOIN cities c ON c.id = b.city_id \
         WHERE TRUE",
    );
    push_filters(&mut qb, filter);
    qb.push(" ORDER BY b.lead_score DESC, b.created_at");
    qb.push(" LIMIT ");
    qb.push_bind(limit);
    qb.push(" OFFSET ");
    qb.push_bind(offset);

    qb.build_query_as::<BusinessWithCity>().fetch_all(pool).await
}

/// Count of rows the same filter would select.
pub async fn count_leads(pool: &PgPool, filter: &LeadFilter) -> Result<i64, sqlx::Error> {
    let mut qb = QueryBuilder::<Postgres>::new(
        "SELECT count(*) FROM businesses b \
         LEFT JOIN cities c ON c.id = b.city_id \
         WHERE TRUE",
    );
    push_filters(&mut qb, filter);
    qb.build_query_scalar::<i64>().fetch_one(pool).await
}

/// Record a queued export. Returns false when the
/// `(business_id, platform)` row already exists.
pub async fn insert_export(
    conn: &mut PgConnection,
    business_id: Uuid,
    platform: &str,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO business_outreach_exports (business_id, platform, status)
         VALUES ($1, $2, 'queued')
         ON CONFLICT ON CONSTRAINT business_outreach_exports_business_platform_uidx
         DO NOTHING",
    )
    .bind(business_id)
    .bind(platform)
    .execute(conn)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Which of the given businesses already have an export row for a
/// platform — the dashboard's `exported` flag.
pub async fn exported_ids(
    pool: &PgPool,
    business_ids: &[Uuid],
    platform: &str,
) -> Result<Vec<Uuid>, sqlx::Error> {
    if business_ids.is_empty() {
        return Ok(Vec::new());
    }
    sqlx::query_scalar(
        "SELECT business_id FROM business_outreach_exports
         WHERE business_id = ANY($1) AND platform = $2",
    )
    .bind(business_ids)
    .bind(platform)
    .fetch_all(pool)
    .await
}

/// Number of export rows for a platform (the daily-target progress).
pub async fn count_for_platform(pool: &PgPool, platform: &str) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT count(*) FROM business_outreach_exports WHERE platform = $1")
        .bind(platform)
        .fetch_one(pool)
        .await
}

/// `(total, queued)` export counts for the metrics endpoint.
pub async fn totals(pool: &PgPool) -> Result<(i64, i64), sqlx::Error> {
    sqlx::query_as(
        "SELECT count(*), count(*) FILTER (WHERE status = 'queued')
         FROM business_outreach_exports",
    )
    .fetch_one(pool)
    .await
}
