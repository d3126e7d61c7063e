//! # scout-core — Foundational Types for the Webscout Pipeline
//!
//! The shared vocabulary of the lead-generation pipeline:
//!
//! - [`DomainStatus`]: the closed classification enum assigned by the
//!   domain classifier, with a documented mapping from legacy statuses.
//! - [`Verdict`] and [`VerificationSource`]: the verifier portfolio's
//!   result vocabulary and the fixed `raw` key-scheme each source writes.
//! - [`confidence`]: the pure weighted-confidence model over stored
//!   verifier results.
//! - [`domain`]: domain-string normalization (URL / email / bare host →
//!   canonical apex host) and the public-email-domain sets.
//! - [`data`]: spec data tables: parking indicators, directory/social
//!   domains, country TLD preferences.
//!
//! Nothing in this crate touches the network or the database; everything is
//! a pure function over its inputs so the scorer and the confidence model
//! stay deterministic and trivially testable.

pub mod confidence;
pub mod data;
pub mod domain;
pub mod status;
pub mod verdict;

pub use confidence::{verification_confidence, verification_weight, ConfidenceLevel};
pub use domain::{extract_domain_from_email, is_public_email_domain, normalize_domain};
pub use status::DomainStatus;
pub use verdict::{Verdict, VerificationSource};
