//! The automation controller: owns both loops, their settings, their
//! stop signals, and the shared run-lock.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use parking_lot::Mutex;
use serde_json::{json, Value};
use sqlx::PgPool;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use scout_clients::{notify::Notifier, Config};
use scout_export::daily_target::{ensure_daily_target, DailyTargetParams};
use scout_verify::VerifyOutcome;

use crate::pipeline::run_once;
use crate::settings::{
    PipelineSettings, PipelineSettingsUpdate, VerificationSettings, VerificationSettingsUpdate,
};

/// How long `stop()` waits for the pipeline loop to wind down.
const PIPELINE_STOP_TIMEOUT: Duration = Duration::from_secs(30);
/// How long `stop_verification()` waits; verification batches hold
/// in-flight HTTP calls that run to their own timeouts.
const VERIFY_STOP_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Default, Clone)]
struct LoopState {
    last_started_at: Option<String>,
    last_finished_at: Option<String>,
    last_error: Option<String>,
    last_result: Option<Value>,
    run_count: u64,
}

struct RunningLoop {
    stop: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

pub struct AutomationController {
    pool: PgPool,
    config: &'static Config,
    notifier: Notifier,

    settings: Mutex<PipelineSettings>,
    verify_settings: Mutex<VerificationSettings>,

    /// Shared between the scheduled cycle and user-triggered runs: only
    /// one pipeline cycle at a time, contenders answer `busy`.
    run_lock: tokio::sync::Mutex<()>,

    state: Mutex<LoopState>,
    verify_state: Mutex<LoopState>,
    verify_totals: Mutex<BTreeMap<String, u64>>,
    verify_batch_count: Mutex<u64>,

    pipeline_loop: Mutex<Option<RunningLoop>>,
    verify_loop: Mutex<Option<RunningLoop>>,
}

fn utc_now() -> String {
    Utc::now().to_rfc3339()
}

impl AutomationController {
    pub fn new(pool: PgPool, config: &'static Config) -> Arc<Self> {
        Arc::new(Self {
            pool,
            config,
            notifier: Notifier::new(&config.ntfy_server, config.ntfy_topic.as_deref()),
            settings: Mutex::new(PipelineSettings::from_config(config)),
            verify_settings: Mutex::new(VerificationSettings::default()),
            run_lock: tokio::sync::Mutex::new(()),
            state: Mutex::new(LoopState::default()),
            verify_state: Mutex::new(LoopState::default()),
            verify_totals: Mutex::new(BTreeMap::new()),
            verify_batch_count: Mutex::new(0),
            pipeline_loop: Mutex::new(None),
            verify_loop: Mutex::new(None),
        })
    }

    pub fn auto_start_enabled(&self) -> bool {
        self.config.auto_runner_enabled
    }

    pub fn pipeline_running(&self) -> bool {
        self.pipeline_loop
            .lock()
            .as_ref()
            .map(|l| !l.handle.is_finished())
            .unwrap_or(false)
    }

    pub fn verification_running(&self) -> bool {
        self.verify_loop
            .lock()
            .as_ref()
            .map(|l| !l.handle.is_finished())
            .unwrap_or(false)
    }

    // ── Settings ──────────────────────────────────────────────────────

    pub fn update_settings(&self, update: &PipelineSettingsUpdate) {
        self.settings.lock().apply(update);
    }

    pub fn update_verify_settings(&self, update: &VerificationSettingsUpdate) {
        self.verify_settings.lock().apply(update);
    }

    fn snapshot_settings(&self) -> PipelineSettings {
        self.settings.lock().clone()
    }

    fn snapshot_verify_settings(&self) -> VerificationSettings {
        self.verify_settings.lock().clone()
    }

    // ── One pipeline cycle ────────────────────────────────────────────

    /// Run one full cycle. Returns `{"busy": true}` without doing
    /// anything when another cycle holds the run-lock.
    pub async fn run_cycle(&self, trigger: &str) -> Value {
        let Ok(_guard) = self.run_lock.try_lock() else {
            return json!({ "trigger": trigger, "busy": true });
        };

        let settings = self.snapshot_settings();
        {
            let mut state = self.state.lock();
            state.last_started_at = Some(utc_now());
            state.last_error = None;
        }

        let pipeline_result = run_once(&self.pool, self.config, &settings).await;

        let result = match pipeline_result {
            Ok(pipeline) => {
                let daily = if settings.daily_target_enabled {
                    let params = DailyTargetParams {
                        target_count: settings.daily_target_count,
                        min_score: Some(settings.daily_target_min_score),
                        platform_prefix: settings.daily_target_platform_prefix.clone(),
                        require_contact: settings.daily_target_require_contact,
                        require_unhosted_domain: settings.daily_target_require_unhosted_domain,
                        require_domain_qualification: settings
                            .daily_target_require_domain_qualification,
                        exclude_hosted_email_domain: true,
                        allow_recycle: settings.daily_target_allow_recycle,
                    };
                    match ensure_daily_target(
                        &self.pool,
                        self.config,
                        &params,
                        Utc::now().date_naive(),
                    )
                    .await
                    {
                        Ok(result) => serde_json::to_value(result).ok(),
                        Err(e) => {
                            tracing::error!(error = %e, "daily target generation failed");
                            Some(json!({ "error": e.to_string() }))
                        }
                    }
                } else {
                    None
                };

                // Notifications are best-effort and never fail the run.
                self.notifier.pipeline_complete(&pipeline).await;

                let result = json!({
                    "trigger": trigger,
                    "busy": false,
                    "pipeline": pipeline,
                    "daily_target": daily,
                });
                let mut state = self.state.lock();
                state.last_result = Some(result.clone());
                state.last_finished_at = Some(utc_now());
                state.run_count += 1;
                result
            }
            Err(error) => {
                tracing::error!(%error, trigger, "pipeline cycle failed");
                self.notifier.job_error("pipeline_cycle", &error).await;
                let mut state = self.state.lock();
                state.last_error = Some(error.clone());
                state.last_finished_at = Some(utc_now());
                json!({ "trigger": trigger, "busy": false, "error": error })
            }
        };

        result
    }

    /// Run only the daily-target top-up, under the shared run-lock.
    pub async fn run_daily_target_now(&self) -> Value {
        let Ok(_guard) = self.run_lock.try_lock() else {
            return json!({ "trigger": "manual_daily_target", "busy": true });
        };

        let settings = self.snapshot_settings();
        {
            let mut state = self.state.lock();
            state.last_started_at = Some(utc_now());
            state.last_error = None;
        }

        let params = DailyTargetParams {
            target_count: settings.daily_target_count,
            min_score: Some(settings.daily_target_min_score),
            platform_prefix: settings.daily_target_platform_prefix.clone(),
            require_contact: settings.daily_target_require_contact,
            require_unhosted_domain: settings.daily_target_require_unhosted_domain,
            require_domain_qualification: settings.daily_target_require_domain_qualification,
            exclude_hosted_email_domain: true,
            allow_recycle: settings.daily_target_allow_recycle,
        };
        match ensure_daily_target(&self.pool, self.config, &params, Utc::now().date_naive()).await
        {
            Ok(result) => {
                let value = serde_json::to_value(&result).unwrap_or_default();
                let mut state = self.state.lock();
                state.last_result = Some(json!({
                    "trigger": "manual_daily_target",
                    "busy": false,
                    "daily_target": value,
                }));
                state.last_finished_at = Some(utc_now());
                state.run_count += 1;
                value
            }
            Err(e) => {
                let mut state = self.state.lock();
                state.last_error = Some(e.to_string());
                state.last_finished_at = Some(utc_now());
                json!({ "error": e.to_string() })
            }
        }
    }

    // ── Pipeline loop ─────────────────────────────────────────────────

    pub fn start(self: &Arc<Self>) -> Value {
        let mut slot = self.pipeline_loop.lock();
        if slot.as_ref().map(|l| !l.handle.is_finished()).unwrap_or(false) {
            drop(slot);
            return self.status();
        }

        let (stop_tx, mut stop_rx) = watch::channel(false);
        let controller = Arc::clone(self);
        let handle = tokio::spawn(async move {
            tracing::info!("pipeline loop started");
            loop {
                if *stop_rx.borrow() {
                    break;
                }
                Box::pin(controller.run_cycle("scheduled")).await;

                let wait = controller.snapshot_settings().interval_seconds;
                tokio::select! {
                    _ = stop_rx.changed() => {
                        if *stop_rx.borrow() {
                            break;
                        }
                    }
                    _ = tokio::time::sleep(Duration::from_secs(wait)) => {}
                }
            }
            tracing::info!("pipeline loop stopped");
        });

        *slot = Some(RunningLoop {
            stop: stop_tx,
            handle,
        });
        drop(slot);
        self.status()
    }

    pub async fn stop(&self) -> Value {
        let running = self.pipeline_loop.lock().take();
        if let Some(running) = running {
            let _ = running.stop.send(true);
            if tokio::time::timeout(PIPELINE_STOP_TIMEOUT, running.handle)
                .await
                .is_err()
            {
                tracing::warn!("pipeline loop did not stop within the timeout");
            }
        }
        self.status()
    }

    // ── Verification loop ─────────────────────────────────────────────

    fn add_total(&self, key: &str, amount: u64) {
        *self.verify_totals.lock().entry(key.to_string()).or_insert(0) += amount;
    }

    fn record_layer(&self, layer: &str, outcome: &VerifyOutcome) -> u64 {
        self.add_total(&format!("{layer}_processed"), outcome.processed);
        self.add_total(&format!("{layer}_websites"), outcome.websites_found);
        if outcome.processed > 0 {
            tracing::info!(
                layer,
                processed = outcome.processed,
                websites = outcome.websites_found,
                "verification layer batch done"
            );
        }
        outcome.processed
    }

    pub fn start_verification(self: &Arc<Self>) -> Value {
        let mut slot = self.verify_loop.lock();
        if slot.as_ref().map(|l| !l.handle.is_finished()).unwrap_or(false) {
            drop(slot);
            return self.status();
        }

        let (stop_tx, stop_rx) = watch::channel(false);
        let controller = Arc::clone(self);
        let handle = tokio::spawn(async move {
            controller.verification_loop(stop_rx).await;
        });

        *slot = Some(RunningLoop {
            stop: stop_tx,
            handle,
        });
        drop(slot);
        self.status()
    }

    pub async fn stop_verification(&self) -> Value {
        let running = self.verify_loop.lock().take();
        if let Some(running) = running {
            let _ = running.stop.send(true);
            if tokio::time::timeout(VERIFY_STOP_TIMEOUT, running.handle)
                .await
                .is_err()
            {
                tracing::warn!("verification loop did not stop within the timeout");
            }
        }
        self.status()
    }

    /// The continuous verification cycle: name-guess → meta-search →
    /// LLM → DDG → Google, each in its own catch-log-continue block so
    /// one failing source cannot stop the loop.
    async fn verification_loop(&self, mut stop_rx: watch::Receiver<bool>) {
        tracing::info!("continuous verification loop started");

        while !*stop_rx.borrow() {
            let settings = self.snapshot_verify_settings();
            let mut total_processed: u64 = 0;

            {
                let mut state = self.verify_state.lock();
                state.last_started_at = Some(utc_now());
                state.last_error = None;
            }

            macro_rules! layer {
                ($name:literal, $call:expr) => {
                    if *stop_rx.borrow() {
                        break;
                    }
                    match Box::pin($call).await {
                        Ok(outcome) => {
                            total_processed += self.record_layer($name, &outcome);
                        }
                        Err(e) => {
                            tracing::error!(layer = $name, error = %e, "verification layer failed");
                            self.verify_state.lock().last_error = Some(e.to_string());
                        }
                    }
                };
            }

            layer!(
                "domain_guess",
                scout_verify::name_guess::run_batch(
                    &self.pool,
                    self.config,
                    Some(settings.domain_guess_batch),
                    settings.domain_guess_min_score,
                    None,
                )
            );
            layer!(
                "searxng",
                scout_verify::meta_search::run_batch(
                    &self.pool,
                    self.config,
                    Some(settings.searxng_batch),
                    settings.searxng_min_score,
                    None,
                )
            );
            layer!(
                "llm",
                scout_verify::llm::run_batch(
                    &self.pool,
                    self.config,
                    Some(settings.llm_batch),
                    settings.llm_min_score,
                    None,
                )
            );
            layer!(
                "ddg",
                scout_verify::web_search::run_ddg_batch(
                    &self.pool,
                    self.config,
                    Some(settings.ddg_batch),
                    settings.ddg_min_score,
                    None,
                )
            );
            layer!(
                "google_search",
                scout_verify::web_search::run_google_batch(
                    &self.pool,
                    self.config,
                    Some(settings.google_search_batch),
                    settings.google_search_min_score,
                    None,
                )
            );

            if *stop_rx.borrow() {
                break;
            }
            if settings.rescore_after_batch && total_processed > 0 {
                match scout_score::score_businesses(&self.pool, self.config, None, None, false)
                    .await
                {
                    Ok(outcome) => {
                        self.add_total("rescored", outcome.processed);
                        tracing::info!(
                            rescored = outcome.processed,
                            total_processed,
                            "rescored businesses after verification batch"
                        );
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "rescore after verification failed");
                    }
                }
            }

            {
                let mut state = self.verify_state.lock();
                state.last_finished_at = Some(utc_now());
            }
            *self.verify_batch_count.lock() += 1;

            let wait = if total_processed == 0 {
                tracing::info!(seconds = settings.pause_when_idle, "no verification work, idling");
                settings.pause_when_idle
            } else {
                settings.pause_between_batches
            };

            tokio::select! {
                _ = stop_rx.changed() => {
                    if *stop_rx.borrow() {
                        break;
                    }
                }
                _ = tokio::time::sleep(Duration::from_secs(wait)) => {}
            }
        }

        tracing::info!("continuous verification loop stopped");
    }

    // ── Status ────────────────────────────────────────────────────────

    pub fn status(&self) -> Value {
        let settings = self.snapshot_settings();
        let verify_settings = self.snapshot_verify_settings();
        let state = self.state.lock().clone();
        let verify_state = self.verify_state.lock().clone();
        let totals = self.verify_totals.lock().clone();
        let batch_count = *self.verify_batch_count.lock();

        json!({
            "running": self.pipeline_running(),
            "busy": self.run_lock.try_lock().is_err(),
            "settings": settings,
            "last_run_started_at": state.last_started_at,
            "last_run_finished_at": state.last_finished_at,
            "last_error": state.last_error,
            "last_result": state.last_result,
            "run_count": state.run_count,
            "verification": {
                "running": self.verification_running(),
                "settings": verify_settings,
                "last_started_at": verify_state.last_started_at,
                "last_finished_at": verify_state.last_finished_at,
                "last_error": verify_state.last_error,
                "batch_count": batch_count,
                "totals": totals,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_controller() -> Arc<AutomationController> {
        // A lazy pool: nothing connects until a query runs, so
        // controller-surface tests need no live database.
        let pool = sqlx::postgres::PgPoolOptions::new()
            .connect_lazy("postgresql://localhost:5432/webscout_test")
            .expect("lazy pool");
        AutomationController::new(pool, Config::load())
    }

    #[tokio::test]
    async fn status_reports_stopped_loops() {
        let controller = test_controller().await;
        let status = controller.status();
        assert_eq!(status["running"], false);
        assert_eq!(status["verification"]["running"], false);
        assert_eq!(status["run_count"], 0);
        assert_eq!(status["busy"], false);
    }

    #[tokio::test]
    async fn settings_updates_apply_under_lock() {
        let controller = test_controller().await;
        controller.update_settings(&PipelineSettingsUpdate {
            interval_seconds: Some(120),
            ..Default::default()
        });
        let status = controller.status();
        assert_eq!(status["settings"]["interval_seconds"], 120);

        controller.update_verify_settings(&VerificationSettingsUpdate {
            ddg_batch: Some(25),
            ..Default::default()
        });
        let status = controller.status();
        assert_eq!(status["verification"]["settings"]["ddg_batch"], 25);
    }

    #[tokio::test]
    async fn run_lock_reports_busy_to_contenders() {
        let controller = test_controller().await;
        let _guard = controller.run_lock.lock().await;
        let result = controller.run_cycle("manual").await;
        assert_eq!(result["busy"], true);
        let daily = controller.run_daily_target_now().await;
        assert_eq!(daily["busy"], true);
    }

    #[tokio::test]
    async fn stop_without_start_is_a_no_op() {
        let controller = test_controller().await;
        let status = controller.stop().await;
        assert_eq!(status["running"], false);
        let status = controller.stop_verification().await;
        assert_eq!(status["verification"]["running"], false);
    }
}
