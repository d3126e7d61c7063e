//! # scout-sched — Pipeline Automation
//!
//! Two independent long-lived loops, each a tokio task with a watch
//! channel as its stop signal:
//!
//! - the **pipeline loop** runs the full cycle (import → sync →
//!   classify → enrich → score → verify → export) every
//!   `interval_seconds`;
//! - the **verification loop** runs the verifier layers in tight
//!   batches, backing off to `pause_when_idle` when a full cycle finds
//!   no work.
//!
//! Settings are snapshotted under a lock at the top of each cycle so
//! mid-cycle mutations cannot tear a run. A single run-lock is shared
//! between the scheduled cycle and the user-triggered `run_now` /
//! `run_daily_target_now` so only one pipeline cycle executes at a
//! time; contenders get an immediate `busy` answer instead of queueing.

pub mod controller;
pub mod pipeline;
pub mod settings;

pub use controller::AutomationController;
pub use settings::{PipelineSettings, VerificationSettings};
