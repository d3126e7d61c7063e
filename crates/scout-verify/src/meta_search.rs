//! SearXNG meta-search verification.
//!
//! One self-hosted meta-search request fans out to multiple engines
//! (DuckDuckGo, Bing, Brave, Mojeek, Qwant, …), so a single pass gives
//! broader coverage than any one scraper. Results are analyzed with the
//! shared matching rules; directory and social hits never count as the
//! business's website.

use std::time::Duration;

use futures::stream::{self, StreamExt};
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use scout_clients::search::{SearchResult, SearxClient};
use scout_clients::Config;
use scout_core::{Verdict, VerificationSource};
use scout_store::{businesses, jobs};

use crate::common::{apply_verdict, VerdictWrite, VerifyOutcome};
use crate::error::VerifyError;
use crate::matching::{build_search_queries, extract_business_website, is_excluded_host, Hit};

pub const JOB_NAME: &str = "searxng_verify_websites";

type Processed = (Uuid, Result<Analysis, scout_clients::ClientError>);

async fn process_one_row(
    client: &SearxClient,
    row: &scout_store::models::BusinessWithCity,
) -> Processed {
    let name = row.name.clone().unwrap_or_default();
    let analysis = process_one(client, &name, row.city_name.as_deref()).await;
    (row.id, analysis)
}

const BUSINESS_PARALLELISM: usize = 5;
const MAX_RESULTS: usize = 20;
const DELAY_BETWEEN_QUERIES: Duration = Duration::from_millis(300);

struct Analysis {
    verdict: Verdict,
    website: Option<String>,
    query: String,
    result_count: usize,
    engines: Vec<String>,
    non_directory_count: usize,
}

/// Search and analyze one business. Database-free, safe to fan out.
async fn process_one(
    client: &SearxClient,
    business_name: &str,
    city: Option<&str>,
) -> Result<Analysis, scout_clients::ClientError> {
    let queries = build_search_queries(business_name, city);
    let mut all_results: Vec<SearchResult> = Vec::new();
    let mut used_query = queries[0].clone();

    for query in &queries {
        let results = client.search(query, MAX_RESULTS).await?;
        for result in results {
            if !all_results.iter().any(|r| r.url == result.url) {
                all_results.push(result);
            }
        }
        if !all_results.is_empty() {
            // The first query with results is usually the best one.
            used_query = query.clone();
            break;
        }
        tokio::time::sleep(DELAY_BETWEEN_QUERIES).await;
    }

    if all_results.is_empty() {
        return Ok(Analysis {
            verdict: Verdict::NoResults,
            website: None,
            query: used_query,
            result_count: 0,
            engines: Vec::new(),
            non_directory_count: 0,
        });
    }

    let hits: Vec<Hit<'_>> = all_results
        .iter()
        .map(|r| Hit {
            title: &r.title,
            url: &r.url,
        })
        .collect();
    let website = extract_business_website(&hits, business_name);

    let mut engines: Vec<String> = all_results
        .iter()
        .flat_map(|r| r.engines.iter().cloned())
        .collect();
    engines.sort();
    engines.dedup();

    let non_directory_count = all_results
        .iter()
        .filter(|r| !is_excluded_host(&r.url))
        .count();

    Ok(Analysis {
        verdict: if website.is_some() {
            Verdict::HasWebsite
        } else {
            Verdict::NoWebsite
        },
        website,
        query: used_query,
        result_count: all_results.len(),
        engines,
        non_directory_count,
    })
}

/// Run one meta-search batch.
pub async fn run_batch(
    pool: &PgPool,
    config: &'static Config,
    limit: Option<i64>,
    min_score: f64,
    scope: Option<&str>,
) -> Result<VerifyOutcome, VerifyError> {
    let effective_limit = limit.unwrap_or(200);
    let run_id = jobs::start(pool, JOB_NAME, scope, None).await?;

    let result = async {
        let source = VerificationSource::Searxng;
        let rows = businesses::eligible_for_verification(
            pool,
            source.verified_key(),
            Some(min_score),
            effective_limit,
        )
        .await?;

        let mut outcome = VerifyOutcome::default();
        if rows.is_empty() {
            return Ok::<VerifyOutcome, VerifyError>(outcome);
        }

        let client =
            SearxClient::new(&config.searxng_url).map_err(scout_clients::ClientError::from)?;

        let results: Vec<Processed> = stream::iter(rows.iter())
            .map(|row| {
                Box::pin(process_one_row(&client, row))
                    as std::pin::Pin<Box<dyn std::future::Future<Output = _> + Send + '_>>
            })
            .buffer_unordered(BUSINESS_PARALLELISM)
            .collect()
            .await;

        for (business_id, analysis) in results {
            let analysis = match analysis {
                Ok(analysis) => analysis,
                Err(e) => {
                    // A failing SearXNG instance leaves the business
                    // untouched; the next cycle retries it.
                    tracing::warn!(%business_id, error = %e, "SearXNG error");
                    outcome.processed += 1;
                    outcome.errors += 1;
                    continue;
                }
            };

            let mut write = VerdictWrite::new(business_id, analysis.verdict)
                .extra("searxng_search_query", json!(analysis.query))
                .extra("searxng_result_count", json!(analysis.result_count));
            if !analysis.engines.is_empty() {
                write = write
                    .extra("searxng_engine_count", json!(analysis.engines.len()))
                    .extra("searxng_engines", json!(analysis.engines));
            }
            match analysis.verdict {
                Verdict::HasWebsite => {
                    let website = analysis.website.clone().expect("has_website carries a URL");
                    write = write
                        .with_website(website.clone())
                        .extra("searxng_website", json!(website));
                }
                Verdict::NoWebsite => {
                    write = write
                        .extra("searxng_non_directory_count", json!(analysis.non_directory_count));
                }
                _ => {}
            }
            apply_verdict(pool, source, &write).await?;
            outcome.record(analysis.verdict);
        }

        Ok(outcome)
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
