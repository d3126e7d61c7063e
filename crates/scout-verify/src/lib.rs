//! # scout-verify — The Website-Verification Portfolio
//!
//! Independent strategies that each answer one question: does this
//! business really lack an official website? Every source follows the
//! same contract:
//!
//! 1. Eligibility SQL filters on the absence of the source's
//!    `<source>_verified` key, so reruns never duplicate work.
//! 2. The source produces exactly one [`scout_core::Verdict`].
//! 3. `<source>_verified: true` and `<source>_result` are merged into
//!    the business's `raw` map, `scored_at` is cleared, and — on
//!    `has_website` — the URL is written to the business.
//!
//! Sources fail in isolation: one broken backend records `error` or
//! `blocked` verdicts and never takes the loop down with it.

pub mod common;
pub mod error;
pub mod llm;
pub mod matching;
pub mod meta_search;
pub mod name_guess;
pub mod places;
pub mod web_search;

pub use common::VerifyOutcome;
pub use error::VerifyError;
