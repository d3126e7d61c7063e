//! One full pipeline cycle.
//!
//! Phase order: optional OSM import → business↔domain sync → domain
//! classification → role-email enrichment → Places/Foursquare
//! enrichment → contact lead-scoring → contacts CSV export → business
//! scoring → the verifier layers → rescore if anything verified →
//! business export. Sources that need unconfigured API keys no-op
//! internally; hard failures propagate so the loop can record them and
//! sleep out the interval.

use std::path::Path;

use serde_json::{json, Value};
use sqlx::PgPool;

use scout_clients::Config;
use scout_export::leads::{export_business_leads, ExportParams};
use scout_verify::places::PlacesProvider;

use crate::settings::PipelineSettings;

/// Run every phase once. Returns the cycle's result map for the status
/// endpoint and notifications.
pub async fn run_once(
    pool: &PgPool,
    config: &'static Config,
    settings: &PipelineSettings,
) -> Result<Value, String> {
    let scope = settings.area.as_deref();

    // -- Optional OSM import --
    let mut imported: u64 = 0;
    if let Some(area_key) = &settings.area {
        let areas = scout_classify::osm::load_areas(Path::new(&settings.areas_file))
            .map_err(|e| e.to_string())?;
        let area = areas
            .get(area_key)
            .ok_or_else(|| format!("unknown area: {area_key}"))?;
        let categories =
            scout_classify::osm::load_categories(Path::new(&settings.categories_file))
                .map_err(|e| e.to_string())?;

        let selected: Vec<_> = if settings.categories == "all" {
            categories.values().cloned().collect()
        } else {
            let keys: Vec<&str> = settings
                .categories
                .split(',')
                .map(str::trim)
                .filter(|k| !k.is_empty())
                .collect();
            let missing: Vec<&&str> = keys.iter().filter(|k| !categories.contains_key(**k)).collect();
            if !missing.is_empty() {
                return Err(format!("unknown categories: {missing:?}"));
            }
            keys.iter().map(|k| categories[*k].clone()).collect()
        };

        imported = scout_classify::osm::import_area(pool, config, area, &selected)
            .await
            .map_err(|e| e.to_string())?;
    }

    // -- Sync + classify + enrich --
    let synced = scout_classify::sync::run_batch(
        pool,
        config.batch_size,
        settings.sync_limit,
        scope,
        false,
    )
    .await
    .map_err(|e| e.to_string())?;

    let classified = Box::pin(scout_classify::classifier::run_batch(
        pool,
        config,
        settings.classify_limit,
        scope,
        Some(settings.classify_statuses.clone()),
    ))
    .await
    .map_err(|e| e.to_string())?;

    let emails_processed =
        scout_classify::role_email::run_batch(pool, config.batch_size, settings.email_limit, scope)
            .await
            .map_err(|e| e.to_string())?;

    let places_enriched = scout_verify::places::run_enrich_batch(
        pool,
        config,
        PlacesProvider::Google,
        Some(200),
        "no_contacts",
        scope,
    )
    .await
    .map_err(|e| e.to_string())?;
    let foursquare_enriched = scout_verify::places::run_enrich_batch(
        pool,
        config,
        PlacesProvider::Foursquare,
        Some(200),
        "no_contacts",
        scope,
    )
    .await
    .map_err(|e| e.to_string())?;

    // -- Contact pipeline --
    let contacts_scored = scout_score::contact_scoring::run_batch(
        pool,
        config,
        settings.contact_score_limit,
        false,
    )
    .await
    .map_err(|e| e.to_string())?;

    let contacts_export_path = scout_export::contacts_csv::export_contacts_csv(
        pool,
        config,
        &settings.contact_platform,
        settings.contact_min_score,
    )
    .await
    .map_err(|e| e.to_string())?;

    // -- Business scoring --
    let mut business_scored = scout_score::score_businesses(
        pool,
        config,
        settings.business_score_limit,
        scope,
        false,
    )
    .await
    .map_err(|e| e.to_string())?
    .processed;

    // -- Verification layers, fast/free first --
    let domain_guess =
        Box::pin(scout_verify::name_guess::run_batch(pool, config, Some(200), 0.0, scope))
            .await
            .map_err(|e| e.to_string())?;
    let searxng = Box::pin(scout_verify::meta_search::run_batch(pool, config, Some(200), 0.0, scope))
        .await
        .map_err(|e| e.to_string())?;
    let llm = scout_verify::llm::run_batch(pool, config, Some(50), 30.0, scope)
        .await
        .map_err(|e| e.to_string())?;
    let ddg = scout_verify::web_search::run_ddg_batch(pool, config, Some(50), 30.0, scope)
        .await
        .map_err(|e| e.to_string())?;
    let google_search =
        scout_verify::web_search::run_google_batch(pool, config, Some(30), 30.0, scope)
            .await
            .map_err(|e| e.to_string())?;
    let places = scout_verify::places::run_verify_batch(
        pool,
        config,
        PlacesProvider::Google,
        Some(200),
        30.0,
        scope,
    )
    .await
    .map_err(|e| e.to_string())?;
    let foursquare = scout_verify::places::run_verify_batch(
        pool,
        config,
        PlacesProvider::Foursquare,
        Some(200),
        30.0,
        scope,
    )
    .await
    .map_err(|e| e.to_string())?;

    // -- Rescore after verification --
    let websites_discovered = domain_guess.websites_found
        + searxng.websites_found
        + llm.websites_found
        + ddg.websites_found
        + google_search.websites_found
        + places.websites_found
        + foursquare.websites_found;
    let any_verified = domain_guess.processed
        + searxng.processed
        + llm.processed
        + ddg.processed
        + google_search.processed
        + places.processed
        + foursquare.processed;
    if any_verified > 0 {
        // Rescore both to disqualify discovered websites and to lift
        // the confidence caps on confirmed no-website leads.
        business_scored +=
            scout_score::score_businesses(pool, config, None, scope, websites_discovered > 0)
                .await
                .map_err(|e| e.to_string())?
                .processed;
    }

    // -- Business export --
    let mut export_params = ExportParams::new(&settings.business_platform);
    export_params.min_score = settings.business_min_score;
    export_params.require_contact = settings.business_require_contact;
    export_params.require_unhosted_domain = settings.business_require_unhosted_domain;
    export_params.require_domain_qualification = settings.business_require_domain_qualification;
    let business_export_path = export_business_leads(pool, config, &export_params)
        .await
        .map_err(|e| e.to_string())?;

    Ok(json!({
        "imported": imported,
        "synced": {
            "processed": synced.processed,
            "domains_inserted": synced.domains_inserted,
            "links_inserted": synced.links_inserted,
        },
        "classified": classified.processed,
        "email_processed": emails_processed,
        "places_enriched": places_enriched.enriched,
        "places_phones_added": places_enriched.phones_added,
        "foursquare_enriched": foursquare_enriched.enriched,
        "foursquare_phones_added": foursquare_enriched.phones_added,
        "contacts_scored": contacts_scored,
        "contacts_export_path": contacts_export_path.map(|p| p.display().to_string()),
        "domain_guess_processed": domain_guess.processed,
        "domain_guess_websites_found": domain_guess.websites_found,
        "searxng_processed": searxng.processed,
        "searxng_websites_found": searxng.websites_found,
        "llm_verified": llm.processed,
        "llm_websites_found": llm.websites_found,
        "ddg_verified": ddg.processed,
        "ddg_websites_found": ddg.websites_found,
        "google_search_verified": google_search.processed,
        "google_search_websites_found": google_search.websites_found,
        "websites_verified": places.processed,
        "websites_found": websites_discovered,
        "no_website_confirmed": places.no_website_confirmed,
        "foursquare_verified": foursquare.processed,
        "business_scored": business_scored,
        "business_export_path": business_export_path.map(|p| p.display().to_string()),
    }))
}
