//! DuckDuckGo and Google HTML verification.
//!
//! Both scrape HTML result pages with conservative pacing. Transport
//! failures collapse to `no_results` (inconclusive, not a confirmation);
//! sustained rate limiting records `blocked` and aborts the batch after
//! three consecutive hits so a blocked scraper cannot burn the rest of
//! the queue.

use std::time::Duration;

use serde_json::json;
use sqlx::PgPool;

use scout_clients::search::{DdgClient, GoogleHtmlClient, SearchResult};
use scout_clients::{ClientError, Config};
use scout_core::{Verdict, VerificationSource};
use scout_store::models::BusinessWithCity;
use scout_store::{businesses, jobs};

use crate::common::{apply_verdict, VerdictWrite, VerifyOutcome};
use crate::error::VerifyError;
use crate::matching::{build_search_queries, extract_business_website, Hit};

pub const DDG_JOB_NAME: &str = "web_search_verify_websites";
pub const GOOGLE_JOB_NAME: &str = "google_search_verify_websites";

/// Consecutive rate-limit responses tolerated before aborting a batch.
const MAX_CONSECUTIVE_RATE_LIMITS: u32 = 3;

const DDG_DELAY: Duration = Duration::from_millis(1500);
const DDG_QUERY_RETRY_DELAY: Duration = Duration::from_millis(1000);
const GOOGLE_DELAY: Duration = Duration::from_secs(3);

enum Backend<'a> {
    Ddg(&'a DdgClient),
    Google(&'a GoogleHtmlClient),
}

impl Backend<'_> {
    async fn search(
        &self,
        query: &str,
        country: Option<&str>,
        max_results: usize,
    ) -> Result<Vec<SearchResult>, ClientError> {
        match self {
            Backend::Ddg(client) => client.search(query, max_results).await,
            Backend::Google(client) => client.search(query, country, max_results).await,
        }
    }
}

async fn search_with_ladder(
    backend: &Backend<'_>,
    row: &BusinessWithCity,
) -> Result<(Vec<SearchResult>, String), ClientError> {
    let name = row.name.clone().unwrap_or_default();
    let queries = build_search_queries(&name, row.city_name.as_deref());
    let mut used_query = queries[0].clone();

    for query in &queries {
        used_query = query.clone();
        match backend
            .search(query, row.city_country.as_deref(), 10)
            .await
        {
            Ok(results) if !results.is_empty() => return Ok((results, used_query)),
            Ok(_) => {
                tokio::time::sleep(DDG_QUERY_RETRY_DELAY).await;
            }
            Err(e) if e.is_rate_limited() => return Err(e),
            Err(e) => {
                // Transport noise — treat this query as empty and move
                // down the ladder.
                tracing::debug!(query, error = %e, "search query failed");
                tokio::time::sleep(DDG_QUERY_RETRY_DELAY).await;
            }
        }
    }
    Ok((Vec::new(), used_query))
}

async fn verify_with_backend(
    pool: &PgPool,
    source: VerificationSource,
    job_name: &str,
    backend: Backend<'_>,
    delay: Duration,
    limit: i64,
    min_score: f64,
    scope: Option<&str>,
) -> Result<VerifyOutcome, VerifyError> {
    let run_id = jobs::start(pool, job_name, scope, None).await?;

    let result = async {
        let rows = businesses::eligible_for_verification(
            pool,
            source.verified_key(),
            Some(min_score),
            limit,
        )
        .await?;

        let mut outcome = VerifyOutcome::default();
        let mut consecutive_rate_limits: u32 = 0;
        let prefix = source.as_str();
        // Frozen wire names: DDG historically wrote `ddg_search_query`,
        // Google `google_search_query`.
        let query_key = match source {
            VerificationSource::Ddg => "ddg_search_query".to_string(),
            _ => format!("{prefix}_query"),
        };

        for row in &rows {
            let name = row.name.clone().unwrap_or_default();
            if name.trim().is_empty() {
                outcome.processed += 1;
                continue;
            }

            let (results, query) = match search_with_ladder(&backend, row).await {
                Ok(pair) => {
                    consecutive_rate_limits = 0;
                    pair
                }
                Err(e) => {
                    // Rate limited: record `blocked` and count the streak.
                    let write = VerdictWrite::new(row.id, Verdict::Blocked);
                    apply_verdict(pool, source, &write).await?;
                    outcome.record(Verdict::Blocked);
                    consecutive_rate_limits += 1;
                    if consecutive_rate_limits >= MAX_CONSECUTIVE_RATE_LIMITS {
                        tracing::warn!(
                            job_name,
                            processed = outcome.processed,
                            "aborting batch after {consecutive_rate_limits} consecutive rate limits: {e}"
                        );
                        break;
                    }
                    tokio::time::sleep(delay).await;
                    continue;
                }
            };

            let verdict_write = if results.is_empty() {
                VerdictWrite::new(row.id, Verdict::NoResults)
                    .extra(query_key.clone(), json!(query))
            } else {
                let hits: Vec<Hit<'_>> = results
                    .iter()
                    .map(|r| Hit {
                        title: &r.title,
                        url: &r.url,
                    })
                    .collect();
                match extract_business_website(&hits, &name) {
                    Some(website) => {
                        tracing::debug!(business = %name, %website, "search found a website");
                        VerdictWrite::new(row.id, Verdict::HasWebsite)
                            .with_website(website.clone())
                            .extra(format!("{prefix}_website"), json!(website))
                            .extra(query_key.clone(), json!(query))
                            .extra(format!("{prefix}_result_count"), json!(results.len()))
                    }
                    None => VerdictWrite::new(row.id, Verdict::NoWebsite)
                        .extra(query_key.clone(), json!(query))
                        .extra(format!("{prefix}_result_count"), json!(results.len())),
                }
            };

            let verdict = verdict_write.verdict;
            apply_verdict(pool, source, &verdict_write).await?;
            outcome.record(verdict);

            tokio::time::sleep(delay).await;
        }

        Ok::<VerifyOutcome, VerifyError>(outcome)
    }
    .await;

    match result {
        Ok(outcome) => {
            jobs::complete(
                pool,
                run_id,
                outcome.processed as i64,
                Some(&outcome.details(min_score)),
            )
            .await?;
            Ok(outcome)
        }
        Err(e) => {
            jobs::fail(pool, run_id, &e.to_string(), None).await?;
            Err(e)
        }
    }
}

/// DuckDuckGo HTML verification batch.
pub async fn run_ddg_batch(
    pool: &PgPool,
    _config: &'static Config,
    limit: Option<i64>,
    min_score: f64,
    scope: Option<&str>,
) -> Result<VerifyOutcome, VerifyError> {
    let client = DdgClient::new().map_err(scout_clients::ClientError::from)?;
    verify_with_backend(
        pool,
        VerificationSource::Ddg,
        DDG_JOB_NAME,
        Backend::Ddg(&client),
        DDG_DELAY,
        limit.unwrap_or(100),
        min_score,
        scope,
    )
    .await
}

/// Google HTML verification batch.
pub async fn run_google_batch(
    pool: &PgPool,
    _config: &'static Config,
    limit: Option<i64>,
    min_score: f64,
    scope: Option<&str>,
) -> Result<VerifyOutcome, VerifyError> {
    let client = GoogleHtmlClient::new().map_err(scout_clients::ClientError::from)?;
    verify_with_backend(
        pool,
        VerificationSource::GoogleSearch,
        GOOGLE_JOB_NAME,
        Backend::Google(&client),
        GOOGLE_DELAY,
        limit.unwrap_or(30),
        min_score,
        scope,
    )
    .await
}
