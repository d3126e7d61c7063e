//! City rows imported areas attach to.

use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

/// Fetch-or-create a city by `(name, country)`.
pub async fn get_or_create(
    conn: &mut PgConnection,
    name: &str,
    country: Option<&str>,
    region: Option<&str>,
) -> Result<Uuid, sqlx::Error> {
    let existing: Option<Uuid> = sqlx::query_scalar(
        "SELECT id FROM cities WHERE name = $1 AND country IS NOT DISTINCT FROM $2",
    )
    .bind(name)
    .bind(country)
    .fetch_optional(&mut *conn)
    .await?;

    if let Some(id) = existing {
        return Ok(id);
    }

    sqlx::query_scalar(
        "INSERT INTO cities (name, country, region) VALUES ($1, $2, $3) RETURNING id",
    )
    .bind(name)
    .bind(country)
    .bind(region)
    .fetch_one(conn)
    .await
}

/// Distinct city names for dashboard filters.
pub async fn names(pool: &PgPool, limit: i64) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT name FROM cities GROUP BY name ORDER BY name LIMIT $1",
    )
    .bind(limit)
    .fetch_all(pool)
    .await
}

