//! # webscout CLI entry point
//!
//! Parses command-line arguments and dispatches to subcommand handlers.
//! `serve` runs the API with both automation loops; the other
//! subcommands trigger individual workers once and print their result
//! as JSON.

use std::net::SocketAddr;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use scout_clients::Config;
use scout_export::daily_target::{ensure_daily_target, DailyTargetParams};
use scout_export::leads::{export_business_leads, ExportParams};
use scout_sched::AutomationController;
use scout_verify::places::PlacesProvider;

/// webscout — lead-generation pipeline over OSM business data.
///
/// Ingests businesses, classifies their domains' web presence, verifies
/// missing websites through a portfolio of sources, scores the
/// remaining candidates, and exports them as outreach leads.
#[derive(Parser, Debug)]
#[command(name = "webscout", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP API with the automation loops.
    Serve {
        /// Bind address.
        #[arg(long, default_value = "127.0.0.1:8000")]
        bind: SocketAddr,
    },

    /// Run one full pipeline cycle and exit.
    RunOnce,

    /// Sync candidate domains from business websites and emails.
    Sync {
        #[arg(long)]
        limit: Option<i64>,
        #[arg(long)]
        scope: Option<String>,
        /// Restart the scan from the beginning.
        #[arg(long)]
        reset_cursor: bool,
    },

    /// Classify a batch of domains (RDAP + DNS + HTTP probes).
    Classify {
        #[arg(long)]
        limit: Option<i64>,
        #[arg(long)]
        scope: Option<String>,
        /// Domain statuses to claim (default: new).
        #[arg(long, value_delimiter = ',')]
        statuses: Option<Vec<String>>,
    },

    /// Score businesses (and zero out those with websites).
    Score {
        #[arg(long)]
        limit: Option<i64>,
        #[arg(long)]
        scope: Option<String>,
        #[arg(long)]
        force: bool,
    },

    /// Run one verification source over eligible businesses.
    Verify {
        /// Source: domain-guess, searxng, llm, ddg, google-search,
        /// google-places, foursquare.
        source: String,
        #[arg(long)]
        limit: Option<i64>,
        #[arg(long, default_value_t = 0.0)]
        min_score: f64,
    },

    /// Export eligible leads to CSV.
    Export {
        #[arg(long, default_value = "csv_business")]
        platform: String,
        #[arg(long)]
        min_score: Option<f64>,
        #[arg(long)]
        limit: Option<i64>,
    },

    /// Top up today's daily-target export batch.
    DailyTarget,

    /// Import businesses for a configured area from Overpass.
    ImportOsm {
        /// Area key from the areas config file.
        area: String,
        /// Comma-separated category keys, or `all`.
        #[arg(long, default_value = "all")]
        categories: String,
        #[arg(long, default_value = "config/areas.json")]
        areas_file: String,
        #[arg(long, default_value = "config/categories.json")]
        categories_file: String,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("info"),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("failed to start runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli.command)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "command failed");
            ExitCode::FAILURE
        }
    }
}

fn print_result<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn run(command: Commands) -> anyhow::Result<()> {
    let config = Config::load();
    let pool = scout_store::init_pool(&config.database_url).await?;

    match command {
        Commands::Serve { bind } => {
            let controller = AutomationController::new(pool.clone(), config);
            let state = scout_api::AppState::new(pool, config, controller);
            scout_api::serve(state, bind).await?;
        }

        Commands::RunOnce => {
            let controller = AutomationController::new(pool, config);
            let result = controller.run_cycle("cli").await;
            print_result(&result)?;
        }

        Commands::Sync {
            limit,
            scope,
            reset_cursor,
        } => {
            let outcome = scout_classify::sync::run_batch(
                &pool,
                config.batch_size,
                limit,
                scope.as_deref(),
                reset_cursor,
            )
            .await?;
            print_result(&serde_json::json!({
                "processed": outcome.processed,
                "domains_inserted": outcome.domains_inserted,
                "links_inserted": outcome.links_inserted,
            }))?;
        }

        Commands::Classify {
            limit,
            scope,
            statuses,
        } => {
            let outcome = scout_classify::classifier::run_batch(
                &pool,
                config,
                limit,
                scope.as_deref(),
                statuses,
            )
            .await?;
            print_result(&serde_json::json!({ "processed": outcome.processed }))?;
        }

        Commands::Score {
            limit,
            scope,
            force,
        } => {
            let outcome =
                scout_score::score_businesses(&pool, config, limit, scope.as_deref(), force)
                    .await?;
            print_result(&serde_json::json!({ "scored": outcome.processed }))?;
        }

        Commands::Verify {
            source,
            limit,
            min_score,
        } => {
            let outcome = match source.as_str() {
                "domain-guess" | "domain_guess" => {
                    scout_verify::name_guess::run_batch(&pool, config, limit, min_score, None)
                        .await?
                }
                "searxng" => {
                    scout_verify::meta_search::run_batch(&pool, config, limit, min_score, None)
                        .await?
                }
                "llm" => scout_verify::llm::run_batch(&pool, config, limit, min_score, None).await?,
                "ddg" => {
                    scout_verify::web_search::run_ddg_batch(&pool, config, limit, min_score, None)
                        .await?
                }
                "google-search" | "google_search" => {
                    scout_verify::web_search::run_google_batch(
                        &pool, config, limit, min_score, None,
                    )
                    .await?
                }
                "google-places" | "google_places" => {
                    scout_verify::places::run_verify_batch(
                        &pool,
                        config,
                        PlacesProvider::Google,
                        limit,
                        min_score,
                        None,
                    )
                    .await?
                }
                "foursquare" => {
                    scout_verify::places::run_verify_batch(
                        &pool,
                        config,
                        PlacesProvider::Foursquare,
                        limit,
                        min_score,
                        None,
                    )
                    .await?
                }
                other => anyhow::bail!("unknown verification source: {other}"),
            };
            print_result(&serde_json::json!({
                "processed": outcome.processed,
                "websites_found": outcome.websites_found,
                "no_website_confirmed": outcome.no_website_confirmed,
                "inconclusive": outcome.inconclusive,
                "errors": outcome.errors,
            }))?;
        }

        Commands::Export {
            platform,
            min_score,
            limit,
        } => {
            let mut params = ExportParams::new(&platform);
            params.min_score = min_score;
            params.limit = limit;
            let path = export_business_leads(&pool, config, &params).await?;
            print_result(&serde_json::json!({
                "export_path": path.map(|p| p.display().to_string()),
            }))?;
        }

        Commands::DailyTarget => {
            let params = DailyTargetParams::from_config(config);
            let result =
                ensure_daily_target(&pool, config, &params, chrono::Utc::now().date_naive())
                    .await?;
            print_result(&result)?;
        }

        Commands::ImportOsm {
            area,
            categories,
            areas_file,
            categories_file,
        } => {
            let areas = scout_classify::osm::load_areas(std::path::Path::new(&areas_file))?;
            let area_config = areas
                .get(&area)
                .ok_or_else(|| anyhow::anyhow!("unknown area: {area}"))?;
            let all_categories =
                scout_classify::osm::load_categories(std::path::Path::new(&categories_file))?;
            let selected: Vec<_> = if categories == "all" {
                all_categories.values().cloned().collect()
            } else {
                categories
                    .split(',')
                    .map(str::trim)
                    .filter(|k| !k.is_empty())
                    .map(|k| {
                        all_categories
                            .get(k)
                            .cloned()
                            .ok_or_else(|| anyhow::anyhow!("unknown category: {k}"))
                    })
                    .collect::<Result<_, _>>()?
            };
            let imported =
                scout_classify::osm::import_area(&pool, config, area_config, &selected).await?;
            print_result(&serde_json::json!({ "imported": imported }))?;
        }
    }

    Ok(())
}
