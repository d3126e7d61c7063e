//! Business↔domain sync.
//!
//! Walks businesses in `(created_at, id)` order behind a durable cursor
//! checkpoint, derives candidate domains from the website URL (source
//! `website`) and non-public email domains (source `email`), and upserts
//! domains + links. Each chunk commits its own transaction together with
//! the advanced cursor, so a crash resumes at the last chunk boundary
//! and re-running over synced input inserts nothing.

use chrono::{DateTime, Utc};
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use scout_core::{extract_domain_from_email, is_public_email_domain, normalize_domain};
use scout_store::contacts::emails_for_businesses;
use scout_store::links::NewLink;
use scout_store::{businesses, domains, jobs, links};

use crate::error::ClassifyError;

pub const JOB_NAME: &str = "sync_business_domains";
const CURSOR_KEY: &str = "business_cursor";

/// Counters returned by one sync run.
#[derive(Debug, Default, Clone)]
pub struct SyncOutcome {
    pub processed: u64,
    pub domains_inserted: u64,
    pub links_inserted: u64,
}

/// Cursor format: `<rfc3339>|<uuid>`. Malformed cursors restart the scan
/// from the beginning rather than wedging the job.
fn parse_cursor(value: Option<&str>) -> Option<(DateTime<Utc>, Uuid)> {
    let value = value?;
    let (ts_raw, id_raw) = value.split_once('|')?;
    let ts = DateTime::parse_from_rfc3339(ts_raw).ok()?.with_timezone(&Utc);
    let id = Uuid::parse_str(id_raw).ok()?;
    Some((ts, id))
}

fn make_cursor(ts: DateTime<Utc>, id: Uuid) -> String {
    format!("{}|{id}", ts.to_rfc3339())
}

/// Candidate domains for one business, keyed by normalized domain with
/// provenance. The website source wins over email on collision.
fn discover_domains(
    website_url: Option<&str>,
    emails: &[String],
) -> Vec<(String, &'static str)> {
    let mut discovered: Vec<(String, &'static str)> = Vec::new();

    if let Some(url) = website_url {
        if let Some(domain) = normalize_domain(url) {
            discovered.push((domain, "website"));
        }
    }

    for email in emails {
        let Some(domain) = extract_domain_from_email(email) else {
            continue;
        };
        if is_public_email_domain(&domain) {
            continue;
        }
        if discovered.iter().any(|(existing, _)| existing == &domain) {
            continue;
        }
        discovered.push((domain, "email"));
    }

    discovered
}

/// Run one sync pass over up to `limit` businesses (config batch size
/// per chunk). `reset_cursor` restarts the scan.
pub async fn run_batch(
    pool: &PgPool,
    chunk_size: i64,
    limit: Option<i64>,
    scope: Option<&str>,
    reset_cursor: bool,
) -> Result<SyncOutcome, ClassifyError> {
    let max_items = match limit {
        Some(n) if n >= 0 => n,
        _ => chunk_size,
    };

    let run_id = jobs::start(pool, JOB_NAME, scope, None).await?;

    let result = run_inner(pool, chunk_size, max_items, scope, reset_cursor, run_id).await;

    match result {
        Ok(outcome) => {
            jobs::complete(
                pool,
                run_id,
                outcome.processed as i64,
                Some(&json!({
                    "domains_inserted": outcome.domains_inserted,
                    "links_inserted": outcome.links_inserted,
                })),
            )
            .await?;
            Ok(outcome)
        }
        Err(e) => {
            jobs::fail(pool, run_id, &e.to_string(), None).await?;
            Err(e.into())
        }
    }
}

async fn run_inner(
    pool: &PgPool,
    chunk_size: i64,
    max_items: i64,
    scope: Option<&str>,
    reset_cursor: bool,
    run_id: Uuid,
) -> Result<SyncOutcome, sqlx::Error> {
    if reset_cursor {
        let mut conn = pool.acquire().await?;
        jobs::set_checkpoint(&mut conn, JOB_NAME, scope, CURSOR_KEY, "", None, Some(run_id))
            .await?;
    }

    let mut cursor = parse_cursor(
        jobs::get_checkpoint(pool, JOB_NAME, scope, CURSOR_KEY)
            .await?
            .as_deref(),
    );

    let mut outcome = SyncOutcome::default();

    while (outcome.processed as i64) < max_items {
        let remaining = max_items - outcome.processed as i64;
        let page_size = chunk_size.min(remaining);

        let mut tx = pool.begin().await?;
        let page = businesses::page_after_cursor(&mut tx, cursor, page_size).await?;
        if page.is_empty() {
            tx.commit().await?;
            break;
        }

        let business_ids: Vec<Uuid> = page.iter().map(|b| b.id).collect();
        let emails = emails_for_businesses(&mut tx, &business_ids).await?;

        let mut all_domains: Vec<String> = Vec::new();
        let mut per_business: Vec<(Uuid, Vec<(String, &'static str)>)> = Vec::new();
        for business in &page {
            let discovered = discover_domains(
                business.website_url.as_deref(),
                emails.get(&business.id).map(Vec::as_slice).unwrap_or(&[]),
            );
            if discovered.is_empty() {
                continue;
            }
            for (domain, _) in &discovered {
                if !all_domains.contains(domain) {
                    all_domains.push(domain.clone());
                }
            }
            per_business.push((business.id, discovered));
        }

        if !all_domains.is_empty() {
            all_domains.sort();
            outcome.domains_inserted += domains::upsert_many(&mut tx, &all_domains).await?;
            let domain_ids = domains::ids_by_domain(&mut tx, &all_domains).await?;

            let mut new_links = Vec::new();
            for (business_id, discovered) in &per_business {
                for (domain, source) in discovered {
                    if let Some(&domain_id) = domain_ids.get(domain) {
                        new_links.push(NewLink {
                            business_id: *business_id,
                            domain_id,
                            source: source.to_string(),
                        });
                    }
                }
            }
            outcome.links_inserted += links::insert_many(&mut tx, &new_links).await?;
        }

        outcome.processed += page.len() as u64;
        let last = page.last().expect("page is non-empty");
        cursor = Some((last.created_at, last.id));
        jobs::set_checkpoint(
            &mut tx,
            JOB_NAME,
            scope,
            CURSOR_KEY,
            &make_cursor(last.created_at, last.id),
            Some(&json!({ "last_business_name": last.name.clone().unwrap_or_default() })),
            Some(run_id),
        )
        .await?;

        tx.commit().await?;
    }

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cursor_round_trips() {
        let ts = Utc::now();
        let id = Uuid::new_v4();
        let encoded = make_cursor(ts, id);
        let (parsed_ts, parsed_id) = parse_cursor(Some(&encoded)).unwrap();
        assert_eq!(parsed_id, id);
        assert_eq!(parsed_ts.timestamp_micros(), ts.timestamp_micros());
    }

    #[test]
    fn malformed_cursor_restarts_scan() {
        assert_eq!(parse_cursor(None), None);
        assert_eq!(parse_cursor(Some("")), None);
        assert_eq!(parse_cursor(Some("not-a-cursor")), None);
        assert_eq!(parse_cursor(Some("2026-01-01T00:00:00Z|not-a-uuid")), None);
    }

    #[test]
    fn website_beats_email_on_same_domain() {
        let discovered = discover_domains(
            Some("https://www.acme.ca/"),
            &["info@acme.ca".to_string(), "owner@gmail.com".to_string()],
        );
        assert_eq!(discovered, vec![("acme.ca".to_string(), "website")]);
    }

    #[test]
    fn public_email_domains_are_skipped() {
        let discovered = discover_domains(
            None,
            &[
                "owner@gmail.com".to_string(),
                "shop@yahoo.fr".to_string(),
                "info@acmeplumbing.ca".to_string(),
            ],
        );
        assert_eq!(
            discovered,
            vec![("acmeplumbing.ca".to_string(), "email")]
        );
    }

    #[test]
    fn junk_inputs_produce_nothing() {
        assert!(discover_domains(Some("not a url"), &["bad-email".to_string()]).is_empty());
        assert!(discover_domains(None, &[]).is_empty());
    }
}
