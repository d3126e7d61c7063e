//! LLM-over-search verification.
//!
//! The LLM never guesses blind: it analyzes real meta-search evidence.
//! One SearXNG fetch builds the context (top ~15 results), the
//! configured provider returns a strict JSON verdict, and transport
//! failures retry with backoff before degrading to an `error` verdict.
//! Three consecutive rate limits abort the batch early — free-tier
//! providers throttle hard, and hammering them only extends the ban.

use std::time::Duration;

use serde_json::json;
use sqlx::PgPool;

use scout_clients::llm::{LlmClient, LlmProvider};
use scout_clients::search::{SearchResult, SearxClient};
use scout_clients::{ClientError, Config};
use scout_core::{Verdict, VerificationSource};
use scout_store::{businesses, jobs};

use crate::common::{apply_verdict, VerdictWrite, VerifyOutcome};
use crate::error::VerifyError;

pub const JOB_NAME: &str = "llm_verify_websites";

const MAX_CONSECUTIVE_RATE_LIMITS: u32 = 3;
const CONTEXT_RESULTS: usize = 15;
const RETRY_ATTEMPTS: u32 = 3;

/// Fetch search context for the LLM. Failures just produce an empty
/// context — the model answers `not_sure` on thin evidence.
async fn fetch_context(
    searx: &SearxClient,
    business_name: &str,
    city: Option<&str>,
) -> Vec<SearchResult> {
    let query = match city {
        Some(city) => format!("{business_name} {city}"),
        None => business_name.to_string(),
    };
    match searx.search(&query, CONTEXT_RESULTS).await {
        Ok(results) => results,
        Err(e) => {
            tracing::debug!(business_name, error = %e, "search context fetch failed");
            Vec::new()
        }
    }
}

/// Call the provider with exponential backoff on transient failures.
/// Rate limits are returned immediately so the caller can count them.
async fn analyze_with_retry(
    client: &LlmClient,
    business_name: &str,
    city: Option<&str>,
    category: Option<&str>,
    results: &[SearchResult],
) -> Result<scout_clients::llm::LlmAnalysis, ClientError> {
    let mut delay = Duration::from_secs(2);
    for _attempt in 0..RETRY_ATTEMPTS {
        match client.analyze(business_name, city, category, results).await {
            Ok(analysis) => return Ok(analysis),
            Err(e) if e.is_rate_limited() => return Err(e),
            Err(e) => {
                tracing::warn!(business_name, error = %e, "LLM analysis failed, retrying");
                tokio::time::sleep(delay).await;
                delay = (delay * 2).min(Duration::from_secs(10));
            }
        }
    }
    client.analyze(business_name, city, category, results).await
}

/// Run one LLM verification batch. Silently no-ops when no provider key
/// is configured.
pub async fn run_batch(
    pool: &PgPool,
    config: &'static Config,
    limit: Option<i64>,
    min_score: f64,
    scope: Option<&str>,
) -> Result<VerifyOutcome, VerifyError> {
    let Some(client) = LlmClient::from_keys(
        config.openrouter_api_key.as_deref(),
        config.gemini_api_key.as_deref(),
        config.groq_api_key.as_deref(),
    ) else {
        tracing::warn!("no LLM API keys configured, skipping LLM verification");
        return Ok(VerifyOutcome::default());
    };

    let effective_limit = limit.unwrap_or(100);
    let run_id = jobs::start(
        pool,
        JOB_NAME,
        scope,
        Some(&json!({ "provider": client.provider().as_str() })),
    )
    .await?;

    let result = async {
        let source = VerificationSource::Llm;
        let rows = businesses::eligible_for_verification(
            pool,
            source.verified_key(),
            Some(min_score),
            effective_limit,
        )
        .await?;

        let searx =
            SearxClient::new(&config.searxng_url).map_err(scout_clients::ClientError::from)?;
        let mut outcome = VerifyOutcome::default();
        let mut consecutive_rate_limits: u32 = 0;

        // Free-tier providers need different pacing.
        let pacing = match client.provider() {
            LlmProvider::Gemini => Duration::from_secs(2),
            _ => Duration::from_millis(500),
        };

        for row in &rows {
            let name = row.name.clone().unwrap_or_default();
            if name.trim().is_empty() {
                outcome.processed += 1;
                continue;
            }

            let context = fetch_context(&searx, &name, row.city_name.as_deref()).await;
            let analysis = analyze_with_retry(
                &client,
                &name,
                row.city_name.as_deref(),
                row.category.as_deref(),
                &context,
            )
            .await;

            match analysis {
                Ok(analysis) => {
                    consecutive_rate_limits = 0;
                    let verdict = match analysis.status.as_str() {
                        "has_website" => Verdict::HasWebsite,
                        "no_website" => Verdict::NoWebsite,
                        _ => Verdict::NotSure,
                    };
                    let mut write = VerdictWrite::new(row.id, verdict)
                        .extra("llm_reason", json!(analysis.reason))
                        .extra("llm_search_results_count", json!(context.len()));
                    if verdict == Verdict::HasWebsite {
                        if let Some(website) = analysis.website_url.clone() {
                            write = write
                                .with_website(website.clone())
                                .extra("llm_website", json!(website));
                        }
                    }
                    apply_verdict(pool, source, &write).await?;
                    outcome.record(verdict);
                }
                Err(e) => {
                    // Record the failure so the business is not retried
                    // forever against a broken provider.
                    let message: String = e.to_string().chars().take(200).collect();
                    let write = VerdictWrite::new(row.id, Verdict::Error)
                        .extra("llm_error", json!(message));
                    apply_verdict(pool, source, &write).await?;
                    outcome.record(Verdict::Error);

                    if e.is_rate_limited() {
                        consecutive_rate_limits += 1;
                        if consecutive_rate_limits >= MAX_CONSECUTIVE_RATE_LIMITS {
                            tracing::warn!(
                                processed = outcome.processed,
                                total = rows.len(),
                                "aborting LLM batch after {consecutive_rate_limits} consecutive rate limits"
                            );
                            break;
                        }
                    }
                }
            }

            tokio::time::sleep(pacing).await;
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
