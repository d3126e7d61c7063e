//! Shared application state.

use std::sync::Arc;

use sqlx::PgPool;

use scout_clients::Config;
use scout_sched::AutomationController;

use crate::middleware::ApiMetrics;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: &'static Config,
    pub controller: Arc<AutomationController>,
    pub metrics: ApiMetrics,
}

impl AppState {
    pub fn new(pool: PgPool, config: &'static Config, controller: Arc<AutomationController>) -> Self {
        Self {
            pool,
            config,
            controller,
            metrics: ApiMetrics::new(),
        }
    }
}
