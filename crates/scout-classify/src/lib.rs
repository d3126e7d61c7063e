//! # scout-classify — Presence Classification and Domain Bookkeeping
//!
//! The pipeline's upstream half:
//!
//! - [`classifier`]: RDAP + authoritative DNS + concurrent HTTP(+TCP)
//!   probing, parking detection, and the status precedence rules.
//! - [`sync`]: derives candidate domains from business websites and
//!   non-public email addresses, with a durable `(created_at, id)`
//!   cursor checkpoint.
//! - [`features`]: uniform per-business feature bundles for the scorer
//!   and exporter.
//! - [`osm`] / [`osm_contacts`]: Overpass imports of named businesses
//!   into the store.
//! - [`role_email`]: role-address contact enrichment over qualified
//!   domains.

pub mod classifier;
pub mod error;
pub mod features;
pub mod osm;
pub mod osm_contacts;
pub mod role_email;
pub mod sync;

pub use error::ClassifyError;
