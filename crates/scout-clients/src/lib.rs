//! # scout-clients — External Service Clients
//!
//! Every network dependency of the pipeline behind one crate boundary:
//!
//! - [`rdap`]: registration data lookups.
//! - [`dns`]: authoritative record checks via hickory.
//! - [`probe`]: HTTP GET/HEAD probing, page fetching, TCP connects.
//! - [`search`]: SearXNG meta-search plus the DuckDuckGo and Google
//!   HTML scrapers.
//! - [`llm`]: OpenRouter / Gemini / Groq chat completions.
//! - [`places`]: Google Places (New) and Foursquare v3 lookups.
//! - [`overpass`]: OSM business imports.
//! - [`wikidata`]: the chain/franchise name snapshot.
//! - [`notify`]: best-effort ntfy.sh push notifications.
//!
//! ## Error handling
//!
//! Clients map failures to [`ClientError`] with enough context to decide
//! between retry, typed-verdict, and bail-out at the worker layer. Rate
//! limiting (HTTP 429) is its own variant because verifiers count
//! consecutive occurrences to abort a batch early.
//!
//! ## Timeouts & retry
//!
//! Each client carries its own per-request timeout. Retries are NOT built
//! into the clients — workers opt in via [`retry::retry_send`].

pub mod config;
pub mod dns;
pub mod error;
pub mod llm;
pub mod notify;
pub mod overpass;
pub mod places;
pub mod probe;
pub mod rdap;
pub mod retry;
pub mod search;
pub mod wikidata;

pub use config::Config;
pub use error::ClientError;
