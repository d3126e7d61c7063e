//! Domain table operations: upserts from the sync worker, claim queries
//! for the classifier, classification writes.

use std::collections::HashMap;

use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::models::{DomainRow, NewWhoisCheck};

/// Insert any domains not yet present; conflict on the unique domain is
/// the no-op path. Returns the number of rows actually inserted.
pub async fn upsert_many(
    conn: &mut PgConnection,
    domains: &[String],
) -> Result<u64, sqlx::Error> {
    if domains.is_empty() {
        return Ok(0);
    }
    let result = sqlx::query(
        "INSERT INTO domains (domain)
         SELECT DISTINCT unnest($1::text[])
         ON CONFLICT (domain) DO NOTHING",
    )
    .bind(domains)
    .execute(conn)
    .await?;
    Ok(result.rows_affected())
}

/// Resolve domain strings to ids.
pub async fn ids_by_domain(
    conn: &mut PgConnection,
    domains: &[String],
) -> Result<HashMap<String, Uuid>, sqlx::Error> {
    if domains.is_empty() {
        return Ok(HashMap::new());
    }
    let rows: Vec<(Uuid, String)> =
        sqlx::query_as("SELECT id, domain FROM domains WHERE domain = ANY($1)")
            .bind(domains)
            .fetch_all(conn)
            .await?;
    Ok(rows.into_iter().map(|(id, domain)| (domain, id)).collect())
}

/// Claim a batch of domains for classification.
///
/// `FOR UPDATE SKIP LOCKED` hands disjoint row-sets to parallel
/// classifier workers: a row claimed by one transaction is invisible to
/// the next claim until that transaction ends.
pub async fn claim_for_classification(
    conn: &mut PgConnection,
    statuses: &[String],
    limit: i64,
) -> Result<Vec<DomainRow>, sqlx::Error> {
    sqlx::query_as::<_, DomainRow>(
        "SELECT id, domain, status, created_at, updated_at
         FROM domains
         WHERE status = ANY($1)
         ORDER BY created_at
         LIMIT $2
         FOR UPDATE SKIP LOCKED",
    )
    .bind(statuses)
    .bind(limit)
    .fetch_all(conn)
    .await
}

/// Write one classification pass: the `whois_checks` row plus the new
/// domain status.
pub async fn record_classification(
    conn: &mut PgConnection,
    check: &NewWhoisCheck,
    new_status: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO whois_checks
            (domain_id, is_registered, is_parked, has_a, has_aaaa, has_cname,
             has_mx, has_http, http_status, registrar, raw)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
    )
    .bind(check.domain_id)
    .bind(check.is_registered)
    .bind(check.is_parked)
    .bind(check.has_a)
    .bind(check.has_aaaa)
    .bind(check.has_cname)
    .bind(check.has_mx)
    .bind(check.has_http)
    .bind(check.http_status)
    .bind(&check.registrar)
    .bind(&check.raw)
    .execute(&mut *conn)
    .await?;

    sqlx::query("UPDATE domains SET status = $2, updated_at = now() WHERE id = $1")
        .bind(check.domain_id)
        .bind(new_status)
        .execute(conn)
        .await?;

    Ok(())
}

/// Latest classification's `has_mx` for a domain, if any check exists.
pub async fn latest_has_mx(
    pool: &PgPool,
    domain_id: Uuid,
) -> Result<Option<bool>, sqlx::Error> {
    let row: Option<(Option<bool>,)> = sqlx::query_as(
        "SELECT has_mx FROM whois_checks
         WHERE domain_id = $1
         ORDER BY checked_at DESC
         LIMIT 1",
    )
    .bind(domain_id)
    .fetch_optional(pool)
    .await?;
    Ok(row.and_then(|(has_mx,)| has_mx))
}

/// Domains in the given statuses, oldest first, claimed with
/// `SKIP LOCKED` for the role-email enrichment worker.
pub async fn claim_by_status(
    conn: &mut PgConnection,
    statuses: &[String],
    limit: i64,
) -> Result<Vec<DomainRow>, sqlx::Error> {
    claim_for_classification(conn, statuses, limit).await
}

/// Set a domain's status directly (enrichment transitions).
pub async fn set_status(
    conn: &mut PgConnection,
    domain_id: Uuid,
    status: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE domains SET status = $2, updated_at = now() WHERE id = $1")
        .bind(domain_id)
        .bind(status)
        .execute(conn)
        .await?;
    Ok(())
}

/// `status → count` histogram for the metrics endpoint.
pub async fn status_counts(pool: &PgPool) -> Result<Vec<(String, i64)>, sqlx::Error> {
    sqlx::query_as("SELECT status, count(*) FROM domains GROUP BY status")
        .fetch_all(pool)
        .await
}

/// Insert a single domain by normalized name, returning its id whether it
/// was inserted or already present.
pub async fn get_or_insert(
    conn: &mut PgConnection,
    domain: &str,
) -> Result<Uuid, sqlx::Error> {
    if let Some(id) = sqlx::query_scalar::<_, Uuid>(
        "INSERT INTO domains (domain) VALUES ($1)
         ON CONFLICT (domain) DO NOTHING
         RETURNING id",
    )
    .bind(domain)
    .fetch_optional(&mut *conn)
    .await?
    {
        return Ok(id);
    }
    sqlx::query_scalar("SELECT id FROM domains WHERE domain = $1")
        .bind(domain)
        .fetch_one(conn)
        .await
}

