//! Per-API verification and enrichment: Google Places (New) and
//! Foursquare Places v3.
//!
//! API data is the highest-quality evidence in the portfolio: when
//! Google says a business has a website, it almost always does. The
//! guard is match validation: at least half of the business's
//! significant name words must appear in the returned place name, or
//! the result is a `poor_match` and nothing is trusted from it.

use std::collections::BTreeSet;
use std::time::Duration;

use serde_json::json;
use sqlx::PgPool;

use scout_clients::places::{FoursquareClient, GooglePlacesClient, PlaceResult};
use scout_clients::{ClientError, Config};
use scout_core::{Verdict, VerificationSource};
use scout_store::contacts::NewBusinessContact;
use scout_store::models::BusinessWithCity;
use scout_store::{businesses, contacts, jobs};

use crate::common::{apply_verdict, VerdictWrite, VerifyOutcome};
use crate::error::VerifyError;

pub const PLACES_VERIFY_JOB: &str = "google_places_verify_websites";
pub const PLACES_ENRICH_JOB: &str = "google_places_enrich";
pub const FOURSQUARE_VERIFY_JOB: &str = "foursquare_verify_websites";
pub const FOURSQUARE_ENRICH_JOB: &str = "foursquare_enrich";

/// ~150 ms between calls keeps us well under free-tier QPS limits.
const CALL_PACING: Duration = Duration::from_millis(150);

/// Which Places backend a batch talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlacesProvider {
    Google,
    Foursquare,
}

impl PlacesProvider {
    fn source(self) -> VerificationSource {
        match self {
            Self::Google => VerificationSource::GooglePlaces,
            Self::Foursquare => VerificationSource::Foursquare,
        }
    }

    /// The `raw` key holding the enrichment blob (also the enrichment
    /// worker's exclusion predicate).
    fn enrich_key(self) -> &'static str {
        match self {
            Self::Google => "google_places",
            Self::Foursquare => "foursquare",
        }
    }

    fn contact_source(self) -> &'static str {
        match self {
            Self::Google => "google_places",
            Self::Foursquare => "foursquare",
        }
    }
}

enum PlacesBackend {
    Google(GooglePlacesClient),
    Foursquare(FoursquareClient),
}

impl PlacesBackend {
    fn build(provider: PlacesProvider, config: &Config) -> Result<Option<Self>, ClientError> {
        match provider {
            PlacesProvider::Google => match config.google_places_api_key.as_deref() {
                Some(key) => Ok(Some(Self::Google(GooglePlacesClient::new(key)?))),
                None => Ok(None),
            },
            PlacesProvider::Foursquare => match config.foursquare_api_key.as_deref() {
                Some(key) => Ok(Some(Self::Foursquare(FoursquareClient::new(key)?))),
                None => Ok(None),
            },
        }
    }

    async fn lookup(
        &self,
        query: &str,
        lat: Option<f64>,
        lon: Option<f64>,
    ) -> Result<Option<PlaceResult>, ClientError> {
        match self {
            Self::Google(client) => client.text_search(query, lat, lon).await,
            Self::Foursquare(client) => client.search(query, lat, lon).await,
        }
    }
}

/// Query text: name plus address (best disambiguator) or city.
pub fn build_place_query(row: &BusinessWithCity) -> String {
    let mut parts: Vec<&str> = Vec::new();
    if let Some(name) = row.name.as_deref() {
        parts.push(name);
    }
    if let Some(address) = row.address.as_deref() {
        parts.push(address);
    } else if let Some(city) = row.city_name.as_deref() {
        parts.push(city);
    }
    parts.join(" ")
}

/// Does the returned place plausibly match this business? At least 50%
/// of the business's significant name words must appear in the place
/// name, the guard against enriching business A with business B's data.
pub fn is_good_match(business_name: &str, place_name: &str) -> bool {
    const STOP_WORDS: &[&str] = &[
        "the", "a", "an", "and", "&", "of", "in", "at", "to", "for", "-", "le", "la", "les",
        "de", "du",
    ];
    let words = |name: &str| -> BTreeSet<String> {
        name.to_lowercase()
            .split_whitespace()
            .filter(|w| !STOP_WORDS.contains(w))
            .map(str::to_string)
            .collect()
    };

    let biz_words = words(business_name);
    if biz_words.is_empty() {
        return false;
    }
    let place_words = words(place_name);
    let overlap = biz_words.intersection(&place_words).count();
    overlap as f64 / biz_words.len() as f64 >= 0.5
}

fn enrichment_blob(place: &PlaceResult) -> serde_json::Value {
    json!({
        "provider_id": place.provider_id,
        "place_name": place.name,
        "phone": place.phone,
        "website": place.website,
        "rating": place.rating,
        "review_count": place.review_count,
        "maps_url": place.maps_url,
    })
}

async fn add_phone_contact(
    pool: &PgPool,
    business_id: uuid::Uuid,
    provider: PlacesProvider,
    phone: &str,
) -> Result<u64, sqlx::Error> {
    let mut conn = pool.acquire().await?;
    contacts::insert_many(
        &mut conn,
        &[NewBusinessContact {
            business_id,
            contact_type: "phone".to_string(),
            value: phone.to_string(),
            source: Some(provider.contact_source().to_string()),
        }],
    )
    .await
}

/// Verify websites for eligible leads through a Places backend.
pub async fn run_verify_batch(
    pool: &PgPool,
    config: &'static Config,
    provider: PlacesProvider,
    limit: Option<i64>,
    min_score: f64,
    scope: Option<&str>,
) -> Result<VerifyOutcome, VerifyError> {
    let Some(backend) =
        PlacesBackend::build(provider, config).map_err(scout_clients::ClientError::from)?
    else {
        tracing::debug!(?provider, "API key not configured, skipping verification");
        return Ok(VerifyOutcome::default());
    };

    let job_name = match provider {
        PlacesProvider::Google => PLACES_VERIFY_JOB,
        PlacesProvider::Foursquare => FOURSQUARE_VERIFY_JOB,
    };
    let run_id = jobs::start(pool, job_name, scope, None).await?;

    let result = async {
        let source = provider.source();
        let rows = businesses::eligible_for_verification(
            pool,
            source.verified_key(),
            Some(min_score),
            limit.unwrap_or(config.batch_size),
        )
        .await?;

        let mut outcome = VerifyOutcome::default();
        let name_key = format!("{}_verify_name", source.as_str());

        for row in &rows {
            let query = build_place_query(row);
            if query.trim().is_empty() {
                outcome.processed += 1;
                continue;
            }

            let place = match backend.lookup(&query, row.lat, row.lon).await {
                Ok(place) => place,
                Err(e) => {
                    tracing::warn!(business = ?row.name, error = %e, "places lookup failed");
                    let write = VerdictWrite::new(row.id, Verdict::Error);
                    apply_verdict(pool, source, &write).await?;
                    outcome.record(Verdict::Error);
                    tokio::time::sleep(CALL_PACING).await;
                    continue;
                }
            };

            let business_name = row.name.clone().unwrap_or_default();
            let write = match place {
                None => VerdictWrite::new(row.id, Verdict::NoMatch),
                Some(place) if !is_good_match(&business_name, &place.name) => {
                    VerdictWrite::new(row.id, Verdict::PoorMatch)
                        .extra(name_key.clone(), json!(place.name))
                }
                Some(place) => {
                    // Good match: enrich phone + store the blob either way.
                    if let Some(phone) = place.phone.as_deref() {
                        add_phone_contact(pool, row.id, provider, phone).await?;
                    }
                    let base = match place.website.clone() {
                        Some(website) => VerdictWrite::new(row.id, Verdict::HasWebsite)
                            .with_website(website.clone())
                            .extra(format!("{}_website", source.as_str()), json!(website)),
                        None => VerdictWrite::new(row.id, Verdict::NoWebsite),
                    };
                    base.extra(name_key.clone(), json!(place.name))
                        .extra(provider.enrich_key(), enrichment_blob(&place))
                }
            };

            let verdict = write.verdict;
            apply_verdict(pool, source, &write).await?;
            outcome.record(verdict);

            tokio::time::sleep(CALL_PACING).await;
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

/// Enrichment counters.
#[derive(Debug, Default, Clone)]
pub struct EnrichOutcome {
    pub processed: u64,
    pub enriched: u64,
    pub phones_added: u64,
}

/// Enrich businesses with phones/ratings from a Places backend,
/// prioritized by contact coverage (`no_contacts`, `no_phone`, `all`).
/// Does not set `website_url`; enrichment must not change lead
/// eligibility; discovered URLs live in the blob for reference.
pub async fn run_enrich_batch(
    pool: &PgPool,
    config: &'static Config,
    provider: PlacesProvider,
    limit: Option<i64>,
    priority: &str,
    scope: Option<&str>,
) -> Result<EnrichOutcome, VerifyError> {
    let Some(backend) =
        PlacesBackend::build(provider, config).map_err(scout_clients::ClientError::from)?
    else {
        tracing::debug!(?provider, "API key not configured, skipping enrichment");
        return Ok(EnrichOutcome::default());
    };

    let job_name = match provider {
        PlacesProvider::Google => PLACES_ENRICH_JOB,
        PlacesProvider::Foursquare => FOURSQUARE_ENRICH_JOB,
    };
    let run_id = jobs::start(
        pool,
        job_name,
        scope.or(Some(priority)),
        Some(&json!({ "priority": priority })),
    )
    .await?;

    let result = async {
        let rows = businesses::eligible_for_enrichment(
            pool,
            provider.enrich_key(),
            priority,
            limit.unwrap_or(config.batch_size),
        )
        .await?;

        let mut outcome = EnrichOutcome::default();
        for row in &rows {
            let query = build_place_query(row);
            if query.trim().is_empty() {
                outcome.processed += 1;
                continue;
            }

            let place = match backend.lookup(&query, row.lat, row.lon).await {
                Ok(place) => place,
                Err(e) => {
                    tracing::warn!(business = ?row.name, error = %e, "places lookup failed");
                    outcome.processed += 1;
                    tokio::time::sleep(CALL_PACING).await;
                    continue;
                }
            };

            outcome.processed += 1;
            let business_name = row.name.clone().unwrap_or_default();
            if let Some(place) = place {
                if is_good_match(&business_name, &place.name) {
                    if let Some(phone) = place.phone.as_deref() {
                        let added = add_phone_contact(pool, row.id, provider, phone).await?;
                        outcome.phones_added += added;
                    }
                    let patch = json!({ provider.enrich_key(): enrichment_blob(&place) });
                    let mut conn = pool.acquire().await?;
                    businesses::apply_verification(&mut conn, row.id, &patch, None).await?;
                    outcome.enriched += 1;
                } else {
                    tracing::debug!(
                        business = %business_name,
                        place = %place.name,
                        "skipping poor enrichment match"
                    );
                }
            }

            tokio::time::sleep(CALL_PACING).await;
        }

        Ok::<EnrichOutcome, VerifyError>(outcome)
    }
    .await;

    match result {
        Ok(outcome) => {
            jobs::complete(
                pool,
                run_id,
                outcome.processed as i64,
                Some(&json!({
                    "priority": priority,
                    "enriched": outcome.enriched,
                    "phones_added": outcome.phones_added,
                })),
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn match_requires_half_the_name_words() {
        assert!(is_good_match("Acme Plumbing", "Acme Plumbing Ltd"));
        assert!(is_good_match("The Village Cobbler", "Village Cobbler"));
        // 1 of 3 significant words — not enough.
        assert!(!is_good_match("Acme Plumbing Toronto", "Acme Bakery Ottawa"));
        assert!(!is_good_match("", "Anything"));
    }

    #[test]
    fn stop_words_do_not_count_toward_overlap() {
        // "the", "and", "of" never pad the overlap ratio.
        assert!(!is_good_match("The House of Kebab and Grill", "The House of Pizza"));
    }

    #[test]
    fn query_prefers_address_over_city() {
        let mut row = BusinessWithCity {
            id: uuid::Uuid::new_v4(),
            source: "osm".into(),
            source_id: "node/1".into(),
            name: Some("Acme".into()),
            category: None,
            website_url: None,
            address: Some("1 Main St".into()),
            lead_score: None,
            scored_at: None,
            lat: None,
            lon: None,
            raw: None,
            created_at: chrono::Utc::now(),
            city_name: Some("Toronto".into()),
            city_country: Some("CA".into()),
        };
        assert_eq!(build_place_query(&row), "Acme 1 Main St");
        row.address = None;
        assert_eq!(build_place_query(&row), "Acme Toronto");
    }
}
