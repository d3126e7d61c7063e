//! # scout-score — Lead Scoring
//!
//! Two scorers, both pure functions of their inputs (no clock, no
//! randomness, no I/O):
//!
//! - [`scorer`]: the business scorer: disqualifiers, additive
//!   contact/category signals, ordered quality caps, and the
//!   verification-confidence upper bound. Businesses that already have
//!   a website are forced to zero in the same pass.
//! - [`contact_scoring`]: the contact pipeline's per-contact scorer.
//!
//! Batch entry points handle selection (never-scored or stale rows),
//! feature loading, and persistence around the pure cores.

pub mod contact_scoring;
pub mod scorer;

pub use scorer::{score_business, score_businesses, ScoreOutcome};
