//! Contact-enrichment pipeline tables: organizations derived from
//! qualified domains, role-address contacts, and per-contact exports.

use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::models::ContactWithDomain;

/// Fetch-or-create the organization for a domain. Domains get at most
/// one auto-created organization, named after the domain itself.
pub async fn ensure_org(
    conn: &mut PgConnection,
    domain_id: Uuid,
    domain: &str,
) -> Result<Uuid, sqlx::Error> {
    let existing: Option<Uuid> = sqlx::query_scalar(
        "SELECT id FROM organizations WHERE domain_id = $1 ORDER BY created_at LIMIT 1",
    )
    .bind(domain_id)
    .fetch_optional(&mut *conn)
    .await?;
    if let Some(id) = existing {
        return Ok(id);
    }
    sqlx::query_scalar("INSERT INTO organizations (domain_id, name) VALUES ($1, $2) RETURNING id")
        .bind(domain_id)
        .bind(domain)
        .fetch_one(conn)
        .await
}

/// Insert role-address contacts for an organization, skipping addresses
/// already present. Returns how many were created.
pub async fn create_role_contacts(
    conn: &mut PgConnection,
    org_id: Uuid,
    emails: &[String],
) -> Result<u64, sqlx::Error> {
    let mut created = 0;
    for email in emails {
        let result = sqlx::query(
            "INSERT INTO contacts (org_id, email, source, confidence)
             VALUES ($1, $2, 'role', 0.2)
             ON CONFLICT ON CONSTRAINT contacts_org_email_uidx DO NOTHING",
        )
        .bind(org_id)
        .bind(email)
        .execute(&mut *conn)
        .await?;
        created += result.rows_affected();
    }
    Ok(created)
}

/// Contacts joined with their organization and domain, optionally only
/// unscored rows, oldest first.
pub async fn contacts_for_scoring(
    pool: &PgPool,
    limit: Option<i64>,
    force_rescore: bool,
) -> Result<Vec<ContactWithDomain>, sqlx::Error> {
    sqlx::query_as::<_, ContactWithDomain>(
        "SELECT ct.id AS contact_id, ct.email, ct.first_name, ct.last_name, ct.title,
                ct.source AS contact_source, ct.lead_score, o.name AS org_name,
                d.id AS domain_id, d.domain, d.status AS domain_status
         FROM contacts ct
         JOIN organizations o ON o.id = ct.org_id
         JOIN domains d ON d.id = o.domain_id
         WHERE ct.email IS NOT NULL
           AND ($1 OR ct.scored_at IS NULL)
         ORDER BY ct.created_at
         LIMIT $2",
    )
    .bind(force_rescore)
    .bind(limit)
    .fetch_all(pool)
    .await
}

/// Persist a contact's score.
pub async fn update_contact_score(
    conn: &mut PgConnection,
    contact_id: Uuid,
    score: f64,
    reasons: &serde_json::Value,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE contacts SET lead_score = $2, score_reasons = $3, scored_at = now()
         WHERE id = $1",
    )
    .bind(contact_id)
    .bind(score)
    .bind(reasons)
    .execute(conn)
    .await?;
    Ok(())
}

/// Contacts on `enriched` domains eligible for CSV export.
pub async fn contacts_for_export(
    pool: &PgPool,
    min_score: Option<f64>,
) -> Result<Vec<ContactWithDomain>, sqlx::Error> {
    sqlx::query_as::<_, ContactWithDomain>(
        "SELECT ct.id AS contact_id, ct.email, ct.first_name, ct.last_name, ct.title,
                ct.source AS contact_source, ct.lead_score, o.name AS org_name,
                d.id AS domain_id, d.domain, d.status AS domain_status
         FROM contacts ct
         JOIN organizations o ON o.id = ct.org_id
         JOIN domains d ON d.id = o.domain_id
         WHERE d.status = 'enriched'
           AND ($1::double precision IS NULL
                OR (ct.lead_score IS NOT NULL AND ct.lead_score >= $1))
         ORDER BY ct.created_at",
    )
    .bind(min_score)
    .fetch_all(pool)
    .await
}

/// Whether a contact was already exported for a platform.
pub async fn contact_exported(
    conn: &mut PgConnection,
    contact_id: Uuid,
    platform: &str,
) -> Result<bool, sqlx::Error> {
    let row: Option<(Uuid,)> = sqlx::query_as(
        "SELECT id FROM outreach_exports WHERE contact_id = $1 AND platform = $2",
    )
    .bind(contact_id)
    .bind(platform)
    .fetch_optional(conn)
    .await?;
    Ok(row.is_some())
}

/// Record a queued contact export.
pub async fn insert_contact_export(
    conn: &mut PgConnection,
    contact_id: Uuid,
    platform: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO outreach_exports (contact_id, platform, status)
         VALUES ($1, $2, 'queued')
         ON CONFLICT ON CONSTRAINT outreach_exports_contact_platform_uidx DO NOTHING",
    )
    .bind(contact_id)
    .bind(platform)
    .execute(conn)
    .await?;
    Ok(())
}

/// `(total, scored)` contact counts.
pub async fn contact_totals(pool: &PgPool) -> Result<(i64, i64), sqlx::Error> {
    sqlx::query_as(
        "SELECT count(*), count(*) FILTER (WHERE lead_score IS NOT NULL) FROM contacts",
    )
    .fetch_one(pool)
    .await
}

/// `(total, queued)` contact-export counts.
pub async fn contact_export_totals(pool: &PgPool) -> Result<(i64, i64), sqlx::Error> {
    sqlx::query_as(
        "SELECT count(*), count(*) FILTER (WHERE status = 'queued') FROM outreach_exports",
    )
    .fetch_one(pool)
    .await
}

