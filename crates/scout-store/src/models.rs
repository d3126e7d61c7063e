//! Row types mapped with `sqlx::FromRow`.
//!
//! These mirror the migration schema one-to-one. Status and verdict
//! strings stay as `String` at this layer; the typed enums in
//! `scout-core` are applied by the callers that reason about them.

use chrono::{DateTime, Utc};
use serde_json::Value;
use uuid::Uuid;

/// A domain and its latest classification.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct DomainRow {
    pub id: Uuid,
    pub domain: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One classification pass over a domain.
#[derive(Debug, Clone, Default)]
pub struct NewWhoisCheck {
    pub domain_id: Uuid,
    pub is_registered: Option<bool>,
    pub is_parked: Option<bool>,
    pub has_a: Option<bool>,
    pub has_aaaa: Option<bool>,
    pub has_cname: Option<bool>,
    pub has_mx: Option<bool>,
    pub has_http: Option<bool>,
    pub http_status: Option<i32>,
    pub registrar: Option<String>,
    pub raw: Option<Value>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct BusinessRow {
    pub id: Uuid,
    pub source: String,
    pub source_id: String,
    pub name: Option<String>,
    pub category: Option<String>,
    pub website_url: Option<String>,
    pub address: Option<String>,
    pub lead_score: Option<f64>,
    pub score_reasons: Option<Value>,
    pub scored_at: Option<DateTime<Utc>>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub raw: Option<Value>,
    pub city_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// Business joined with its (optional) city, the working set for
/// verifiers, scoring, and exports.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct BusinessWithCity {
    pub id: Uuid,
    pub source: String,
    pub source_id: String,
    pub name: Option<String>,
    pub category: Option<String>,
    pub website_url: Option<String>,
    pub address: Option<String>,
    pub lead_score: Option<f64>,
    pub scored_at: Option<DateTime<Utc>>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub raw: Option<Value>,
    pub created_at: DateTime<Utc>,
    pub city_name: Option<String>,
    pub city_country: Option<String>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct BusinessContactRow {
    pub id: Uuid,
    pub business_id: Uuid,
    pub contact_type: String,
    pub value: String,
    pub source: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// `(business_id, domain, status)` triple used by the feature loader.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct LinkedDomainRow {
    pub business_id: Uuid,
    pub domain: String,
    pub status: String,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct JobRunRow {
    pub id: Uuid,
    pub job_name: String,
    pub scope: String,
    pub status: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub processed_count: i32,
    pub details: Option<Value>,
    pub error: Option<String>,
}

/// Contact joined with its organization and domain for scoring/export.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ContactWithDomain {
    pub contact_id: Uuid,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub title: Option<String>,
    pub contact_source: Option<String>,
    pub lead_score: Option<f64>,
    pub org_name: Option<String>,
    pub domain_id: Uuid,
    pub domain: String,
    pub domain_status: String,
}
