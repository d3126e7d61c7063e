//! Business table operations: import upserts, sync paging, verifier
//! eligibility and result writes, scoring selections, metrics counts.

use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::models::{BusinessRow, BusinessWithCity};

const BUSINESS_COLUMNS: &str = "b.id, b.source, b.source_id, b.name, b.category, b.website_url, \
     b.address, b.lead_score, b.score_reasons, b.scored_at, b.lat, b.lon, b.raw, b.city_id, \
     b.created_at";

const WITH_CITY_COLUMNS: &str = "b.id, b.source, b.source_id, b.name, b.category, b.website_url, \
     b.address, b.lead_score, b.scored_at, b.lat, b.lon, b.raw, b.created_at, \
     c.name AS city_name, c.country AS city_country";

/// Insert an imported business; the `(source, source_id)` unique
/// constraint makes re-imports a no-op. Returns the new id when a row was
/// actually inserted.
#[allow(clippy::too_many_arguments)]
pub async fn insert_imported(
    conn: &mut PgConnection,
    source: &str,
    source_id: &str,
    name: Option<&str>,
    category: Option<&str>,
    website_url: Option<&str>,
    address: Option<&str>,
    lat: Option<f64>,
    lon: Option<f64>,
    raw: Option<&Value>,
    city_id: Option<Uuid>,
) -> Result<Option<Uuid>, sqlx::Error> {
    sqlx::query_scalar(
        "INSERT INTO businesses
            (source, source_id, name, category, website_url, address, lat, lon, raw, city_id)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
         ON CONFLICT ON CONSTRAINT businesses_source_uidx DO NOTHING
         RETURNING id",
    )
    .bind(source)
    .bind(source_id)
    .bind(name)
    .bind(category)
    .bind(website_url)
    .bind(address)
    .bind(lat)
    .bind(lon)
    .bind(raw)
    .bind(city_id)
    .fetch_optional(conn)
    .await
}

/// Page businesses ordered by `(created_at, id)` strictly after the given
/// cursor — the sync worker's resumable scan.
pub async fn page_after_cursor(
    conn: &mut PgConnection,
    cursor: Option<(DateTime<Utc>, Uuid)>,
    limit: i64,
) -> Result<Vec<BusinessRow>, sqlx::Error> {
    let sql = format!(
        "SELECT {BUSINESS_COLUMNS} FROM businesses b
         WHERE ($1::timestamptz IS NULL OR (b.created_at, b.id) > ($1, $2))
         ORDER BY b.created_at, b.id
         LIMIT $3"
    );
    let (ts, id) = match cursor {
        Some((ts, id)) => (Some(ts), Some(id)),
        None => (None, None),
    };
    sqlx::query_as::<_, BusinessRow>(&sql)
        .bind(ts)
        .bind(id)
        .bind(limit)
        .fetch_all(conn)
        .await
}

/// Businesses a verifier may process: named, without a website, never
/// checked by this source (absence of its `_verified` key), optionally at
/// or above a score floor. Highest-scoring first so verification effort
/// lands on the most promising leads.
pub async fn eligible_for_verification(
    pool: &PgPool,
    verified_key: &str,
    min_score: Option<f64>,
    limit: i64,
) -> Result<Vec<BusinessWithCity>, sqlx::Error> {
    let sql = format!(
        "SELECT {WITH_CITY_COLUMNS}
         FROM businesses b
         LEFT JOIN cities c ON c.id = b.city_id
         WHERE b.name IS NOT NULL AND b.name <> ''
           AND (b.website_url IS NULL OR b.website_url = '')
           AND (b.raw IS NULL OR NOT (b.raw ? $1))
           AND ($2::double precision IS NULL OR b.lead_score >= $2)
         ORDER BY b.lead_score DESC NULLS LAST, b.created_at
         LIMIT $3"
    );
    sqlx::query_as::<_, BusinessWithCity>(&sql)
        .bind(verified_key)
        .bind(min_score)
        .bind(limit)
        .fetch_all(pool)
        .await
}

/// Businesses eligible for per-API enrichment, filtered by contact
/// coverage. `priority` is one of `no_contacts`, `no_phone`, `all`.
pub async fn eligible_for_enrichment(
    pool: &PgPool,
    enrich_key: &str,
    priority: &str,
    limit: i64,
) -> Result<Vec<BusinessWithCity>, sqlx::Error> {
    let contact_filter = match priority {
        "no_contacts" => {
            "AND NOT EXISTS (SELECT 1 FROM business_contacts bc WHERE bc.business_id = b.id)"
        }
        "no_phone" => {
            "AND NOT EXISTS (SELECT 1 FROM business_contacts bc
                             WHERE bc.business_id = b.id AND bc.contact_type = 'phone')"
        }
        _ => "",
    };
    let sql = format!(
        "SELECT {WITH_CITY_COLUMNS}
         FROM businesses b
         LEFT JOIN cities c ON c.id = b.city_id
         WHERE b.name IS NOT NULL AND b.name <> ''
           AND (b.raw IS NULL OR NOT (b.raw ? $1))
           {contact_filter}
         ORDER BY (b.website_url IS NOT NULL) ASC, b.created_at
         LIMIT $2"
    );
    sqlx::query_as::<_, BusinessWithCity>(&sql)
        .bind(enrich_key)
        .bind(limit)
        .fetch_all(pool)
        .await
}

/// Apply one verifier's outcome: additively merge the `raw` patch, clear
/// `scored_at` so the business re-scores, and set `website_url` when the
/// verifier found one (existing URLs are never overwritten with NULL).
pub async fn apply_verification(
    conn: &mut PgConnection,
    business_id: Uuid,
    raw_patch: &Value,
    website_url: Option<&str>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE businesses
         SET raw = COALESCE(raw, '{}'::jsonb) || $2,
             scored_at = NULL,
             website_url = COALESCE($3, website_url)
         WHERE id = $1",
    )
    .bind(business_id)
    .bind(raw_patch)
    .bind(website_url)
    .execute(conn)
    .await?;
    Ok(())
}

/// No-website businesses that need (re)scoring: never scored, or any
/// feature (contact, link, linked-domain classification) is newer than
/// `scored_at`. `force` rescores unconditionally.
pub async fn select_for_scoring(
    pool: &PgPool,
    limit: Option<i64>,
    force: bool,
) -> Result<Vec<BusinessRow>, sqlx::Error> {
    let sql = format!(
        "SELECT {BUSINESS_COLUMNS} FROM businesses b
         WHERE (b.website_url IS NULL OR b.website_url = '')
           AND ($1
                OR b.scored_at IS NULL
                OR EXISTS (SELECT 1 FROM business_contacts bc
                           WHERE bc.business_id = b.id AND bc.created_at > b.scored_at)
                OR EXISTS (SELECT 1 FROM business_domain_links l
                           WHERE l.business_id = b.id AND l.created_at > b.scored_at)
                OR EXISTS (SELECT 1 FROM business_domain_links l
                           JOIN domains d ON d.id = l.domain_id
                           WHERE l.business_id = b.id AND d.updated_at > b.scored_at))
         ORDER BY b.created_at
         LIMIT $2"
    );
    sqlx::query_as::<_, BusinessRow>(&sql)
        .bind(force)
        .bind(limit)
        .fetch_all(pool)
        .await
}

/// Businesses that already have a website and still need the zero-score
/// sweep (or all of them under `force`).
pub async fn select_has_website_for_scoring(
    pool: &PgPool,
    limit: Option<i64>,
    force: bool,
) -> Result<Vec<BusinessRow>, sqlx::Error> {
    let sql = format!(
        "SELECT {BUSINESS_COLUMNS} FROM businesses b
         WHERE b.website_url IS NOT NULL AND b.website_url <> ''
           AND ($1 OR b.scored_at IS NULL)
         ORDER BY b.created_at
         LIMIT $2"
    );
    sqlx::query_as::<_, BusinessRow>(&sql)
        .bind(force)
        .bind(limit)
        .fetch_all(pool)
        .await
}

/// Persist a scoring result.
pub async fn update_score(
    conn: &mut PgConnection,
    business_id: Uuid,
    score: f64,
    reasons: &Value,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE businesses
         SET lead_score = $2, score_reasons = $3, scored_at = now()
         WHERE id = $1",
    )
    .bind(business_id)
    .bind(score)
    .bind(reasons)
    .execute(conn)
    .await?;
    Ok(())
}

/// Aggregate business counts for the metrics endpoint:
/// `(total, no_website, scored, no_website_scored)`.
pub async fn totals(pool: &PgPool) -> Result<(i64, i64, i64, i64), sqlx::Error> {
    sqlx::query_as(
        "SELECT count(*),
                count(*) FILTER (WHERE website_url IS NULL OR website_url = ''),
                count(*) FILTER (WHERE lead_score IS NOT NULL),
                count(*) FILTER (WHERE (website_url IS NULL OR website_url = '')
                                 AND lead_score IS NOT NULL)
         FROM businesses",
    )
    .fetch_one(pool)
    .await
}

/// How many businesses carry a given `raw` key.
pub async fn count_with_raw_key(pool: &PgPool, key: &str) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT count(*) FROM businesses WHERE raw ? $1")
        .bind(key)
        .fetch_one(pool)
        .await
}

/// How many businesses carry at least one of the given `raw` keys.
pub async fn count_with_any_raw_key(pool: &PgPool, keys: &[String]) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT count(*) FROM businesses WHERE raw ?| $1::text[]")
        .bind(keys)
        .fetch_one(pool)
        .await
}

/// How many verified businesses recorded one of the given results for a
/// source — the conclusive/inconclusive breakdowns on the dashboard.
pub async fn count_results(
    pool: &PgPool,
    verified_key: &str,
    result_key: &str,
    results: &[String],
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT count(*) FROM businesses
         WHERE raw ? $1 AND raw->>$2 = ANY($3)",
    )
    .bind(verified_key)
    .bind(result_key)
    .bind(results)
    .fetch_one(pool)
    .await
}

/// `raw` maps of all scored no-website businesses, for the confidence
/// distribution (a derived field, computed in process).
pub async fn scored_no_website_raws(pool: &PgPool) -> Result<Vec<Option<Value>>, sqlx::Error> {
    let rows: Vec<(Option<Value>,)> = sqlx::query_as(
        "SELECT raw FROM businesses
         WHERE (website_url IS NULL OR website_url = '')
           AND lead_score IS NOT NULL",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(|(raw,)| raw).collect())
}

/// Distinct non-null categories, for dashboard filters.
pub async fn distinct_categories(pool: &PgPool) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT category FROM businesses
         WHERE category IS NOT NULL
         GROUP BY category
         ORDER BY category",
    )
    .fetch_all(pool)
    .await
}
