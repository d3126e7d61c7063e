//! # scout-store — Postgres Persistence Layer
//!
//! All pipeline state lives in PostgreSQL via SQLx. This crate owns the
//! pool, the embedded migrations, the row types, and one query module per
//! table family. Query functions take an `Executor`-compatible handle
//! (`&PgPool` for single statements, `&mut PgConnection` inside a
//! transaction) so multi-row batch writes compose into a single
//! commit-or-rollback scope — partial batches never commit.
//!
//! ## Concurrency model
//!
//! Unique constraints plus `ON CONFLICT DO NOTHING` are the primary
//! concurrency-safety mechanism: two workers upserting the same domain or
//! link race harmlessly. Where two workers could claim the same *row for
//! mutation* (domain classification), `FOR UPDATE SKIP LOCKED` hands out
//! disjoint row-sets instead.
//!
//! ## Pool
//!
//! Long-running workers hold the pool for days, so connections are
//! liveness-probed before checkout and recycled after ~1 hour.

pub mod businesses;
pub mod cities;
pub mod contact_pipeline;
pub mod contacts;
pub mod domains;
pub mod exports;
pub mod jobs;
pub mod links;
pub mod models;

use std::time::Duration;

use sqlx::postgres::{PgPool, PgPoolOptions};

/// Connect to Postgres and run embedded migrations.
///
/// `test_before_acquire` probes liveness on checkout; `max_lifetime`
/// recycles connections hourly so server-side restarts and idle-timeout
/// proxies never hand a worker a dead session mid-batch.
pub async fn init_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(20)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(5))
        .max_lifetime(Duration::from_secs(3600))
        .test_before_acquire(true)
        .connect(database_url)
        .await?;

    tracing::info!("Connected to PostgreSQL");

    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::info!("Database migrations applied");

    Ok(pool)
}
