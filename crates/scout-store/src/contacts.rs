//! Business contact rows (emails and phones).

use std::collections::HashMap;

use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::models::BusinessContactRow;

/// One contact to insert.
#[derive(Debug, Clone)]
pub struct NewBusinessContact {
    pub business_id: Uuid,
    pub contact_type: String,
    pub value: String,
    pub source: Option<String>,
}

/// Insert contacts, ignoring duplicates on
/// `(business_id, contact_type, value)`. Returns inserted-row count.
pub async fn insert_many(
    conn: &mut PgConnection,
    contacts: &[NewBusinessContact],
) -> Result<u64, sqlx::Error> {
    let mut inserted = 0;
    for contact in contacts {
        let result = sqlx::query(
            "INSERT INTO business_contacts (business_id, contact_type, value, source)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT ON CONSTRAINT business_contacts_business_type_value_uidx
             DO NOTHING",
        )
        .bind(contact.business_id)
        .bind(&contact.contact_type)
        .bind(&contact.value)
        .bind(&contact.source)
        .execute(&mut *conn)
        .await?;
        inserted += result.rows_affected();
    }
    Ok(inserted)
}

/// All contacts for a set of businesses, grouped by business id.
pub async fn for_businesses(
    pool: &PgPool,
    business_ids: &[Uuid],
) -> Result<HashMap<Uuid, Vec<BusinessContactRow>>, sqlx::Error> {
    if business_ids.is_empty() {
        return Ok(HashMap::new());
    }
    let rows = sqlx::query_as::<_, BusinessContactRow>(
        "SELECT id, business_id, contact_type, value, source, created_at
         FROM business_contacts
         WHERE business_id = ANY($1)",
    )
    .bind(business_ids)
    .fetch_all(pool)
    .await?;

    let mut grouped: HashMap<Uuid, Vec<BusinessContactRow>> = HashMap::new();
    for row in rows {
        grouped.entry(row.business_id).or_default().push(row);
    }
    Ok(grouped)
}

/// Which of the given businesses have at least one phone contact.
pub async fn businesses_with_phone(
    pool: &PgPool,
    business_ids: &[Uuid],
) -> Result<Vec<Uuid>, sqlx::Error> {
    if business_ids.is_empty() {
        return Ok(Vec::new());
    }
    sqlx::query_scalar(
        "SELECT DISTINCT business_id FROM business_contacts
         WHERE business_id = ANY($1) AND contact_type = 'phone'",
    )
    .bind(business_ids)
    .fetch_all(pool)
    .await
}

/// Emails only, grouped by business id — the sync worker's input.
pub async fn emails_for_businesses(
    conn: &mut PgConnection,
    business_ids: &[Uuid],
) -> Result<HashMap<Uuid, Vec<String>>, sqlx::Error> {
    if business_ids.is_empty() {
        return Ok(HashMap::new());
    }
    let rows: Vec<(Uuid, String)> = sqlx::query_as(
        "SELECT business_id, value FROM business_contacts
         WHERE business_id = ANY($1) AND contact_type = 'email'",
    )
    .bind(business_ids)
    .fetch_all(conn)
    .await?;

    let mut grouped: HashMap<Uuid, Vec<String>> = HashMap::new();
    for (business_id, value) in rows {
        grouped.entry(business_id).or_default().push(value);
    }
    Ok(grouped)
}
