//! Business↔domain links with provenance.

use std::collections::HashMap;

use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::models::LinkedDomainRow;

/// One link to insert: the `source` records how the association was
/// discovered (`website`, `email`, `verifier`).
#[derive(Debug, Clone)]
pub struct NewLink {
    pub business_id: Uuid,
    pub domain_id: Uuid,
    pub source: String,
}

/// Insert links, ignoring `(business_id, domain_id)` duplicates.
/// Returns inserted-row count.
pub async fn insert_many(conn: &mut PgConnection, links: &[NewLink]) -> Result<u64, sqlx::Error> {
    let mut inserted = 0;
    for link in links {
        let result = sqlx::query(
            "INSERT INTO business_domain_links (business_id, domain_id, source)
             VALUES ($1, $2, $3)
             ON CONFLICT ON CONSTRAINT business_domain_links_business_domain_uidx
             DO NOTHING",
        )
        .bind(link.business_id)
        .bind(link.domain_id)
        .bind(&link.source)
        .execute(&mut *conn)
        .await?;
        inserted += result.rows_affected();
    }
    Ok(inserted)
}

/// Businesses linked to a set of domains, with the lead-relevant
/// columns — the contact scorer's per-domain feature input.
pub async fn businesses_for_domains(
    pool: &PgPool,
    domain_ids: &[Uuid],
) -> Result<Vec<(Uuid, Uuid, Option<String>, Option<String>)>, sqlx::Error> {
    if domain_ids.is_empty() {
        return Ok(Vec::new());
    }
    sqlx::query_as(
        "SELECT l.domain_id, b.id, b.category, b.website_url
         FROM business_domain_links l
         JOIN businesses b ON b.id = l.business_id
         WHERE l.domain_id = ANY($1)",
    )
    .bind(domain_ids)
    .fetch_all(pool)
    .await
}

/// Linked domains with their statuses for a set of businesses — the
/// feature loader's input.
pub async fn linked_domains(
    pool: &PgPool,
    business_ids: &[Uuid],
) -> Result<HashMap<Uuid, Vec<LinkedDomainRow>>, sqlx::Error> {
    if business_ids.is_empty() {
        return Ok(HashMap::new());
    }
    let rows = sqlx::query_as::<_, LinkedDomainRow>(
        "SELECT l.business_id, d.domain, d.status
         FROM business_domain_links l
         JOIN domains d ON d.id = l.domain_id
         WHERE l.business_id = ANY($1)",
    )
    .bind(business_ids)
    .fetch_all(pool)
    .await?;

    let mut grouped: HashMap<Uuid, Vec<LinkedDomainRow>> = HashMap::new();
    for row in rows {
        grouped.entry(row.business_id).or_default().push(row);
    }
    Ok(grouped)
}
