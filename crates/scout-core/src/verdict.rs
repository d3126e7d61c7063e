//! # Verifier Verdicts and the `raw` Key-Scheme
//!
//! Every website-verification source writes exactly two bookkeeping keys
//! into the business's opaque `raw` map: `<key>_verified: true` and a
//! result key carrying a [`Verdict`] — plus source-specific extras
//! (`domain_guess_website`, `llm_reason`, `searxng_engines`, …). The
//! `_verified` key doubles as the source's exclusion predicate: eligibility
//! queries filter on its absence, so a second run never re-processes a
//! business.
//!
//! The result-key names are not uniform across sources (the `llm` and
//! `ddg` sources historically wrote `_verify_result`); the mapping is
//! frozen here so stored data stays readable.

use serde::{Deserialize, Serialize};

/// One website-verification strategy in the portfolio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationSource {
    /// Offline candidate generation + parallel HTTP probing.
    DomainGuess,
    /// SearXNG meta-search over multiple engines.
    Searxng,
    /// LLM analysis over meta-search context.
    Llm,
    /// DuckDuckGo HTML endpoint scraping.
    Ddg,
    /// Google HTML results scraping.
    GoogleSearch,
    /// Google Places API lookup.
    GooglePlaces,
    /// Foursquare Places API lookup.
    Foursquare,
}

/// All sources in portfolio order (fast/free first).
pub const ALL_SOURCES: [VerificationSource; 7] = [
    VerificationSource::DomainGuess,
    VerificationSource::Searxng,
    VerificationSource::Llm,
    VerificationSource::Ddg,
    VerificationSource::GoogleSearch,
    VerificationSource::GooglePlaces,
    VerificationSource::Foursquare,
];

impl VerificationSource {
    /// Short source name (`domain_guess`, `searxng`, …).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DomainGuess => "domain_guess",
            Self::Searxng => "searxng",
            Self::Llm => "llm",
            Self::Ddg => "ddg",
            Self::GoogleSearch => "google_search",
            Self::GooglePlaces => "google_places",
            Self::Foursquare => "foursquare",
        }
    }

    /// The `raw` key marking "this source has run", the exclusion
    /// predicate for eligibility queries.
    pub fn verified_key(&self) -> &'static str {
        match self {
            Self::DomainGuess => "domain_guess_verified",
            Self::Searxng => "searxng_verified",
            Self::Llm => "llm_verified",
            Self::Ddg => "ddg_verified",
            Self::GoogleSearch => "google_search_verified",
            Self::GooglePlaces => "google_places_verified",
            Self::Foursquare => "foursquare_verified",
        }
    }

    /// The `raw` key carrying this source's [`Verdict`]. Key names are
    /// frozen for compatibility with rows written by earlier releases.
    pub fn result_key(&self) -> &'static str {
        match self {
            Self::DomainGuess => "domain_guess_result",
            Self::Searxng => "searxng_result",
            Self::Llm => "llm_verify_result",
            Self::Ddg => "ddg_verify_result",
            Self::GoogleSearch => "google_search_result",
            Self::GooglePlaces => "google_places_verify_result",
            Self::Foursquare => "foursquare_verify_result",
        }
    }
}

impl std::fmt::Display for VerificationSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one verification attempt for one business.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// An official website was found (and set on the business).
    HasWebsite,
    /// The source produced real evidence and found only directories/social.
    NoWebsite,
    /// Candidates or results existed but none matched this business.
    NoMatch,
    /// A per-API source matched a place whose name overlap was too weak.
    PoorMatch,
    /// Name cleaning produced no probe candidates at all.
    NoCandidates,
    /// The search returned zero results: inconclusive, not a confirmation.
    NoResults,
    /// The LLM could not decide from the evidence.
    NotSure,
    /// The source observed sustained rate limiting and gave up.
    Blocked,
    /// Transport failure or malformed response.
    Error,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HasWebsite => "has_website",
            Self::NoWebsite => "no_website",
            Self::NoMatch => "no_match",
            Self::PoorMatch => "poor_match",
            Self::NoCandidates => "no_candidates",
            Self::NoResults => "no_results",
            Self::NotSure => "not_sure",
            Self::Blocked => "blocked",
            Self::Error => "error",
        }
    }

    /// Parse a stored verdict string, if recognized.
    pub fn parse(raw: &str) -> Option<Self> {
        Some(match raw {
            "has_website" => Self::HasWebsite,
            "no_website" => Self::NoWebsite,
            "no_match" => Self::NoMatch,
            "poor_match" => Self::PoorMatch,
            "no_candidates" => Self::NoCandidates,
            "no_results" => Self::NoResults,
            "not_sure" => Self::NotSure,
            "blocked" => Self::Blocked,
            "error" => Self::Error,
            _ => return None,
        })
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verified_keys_follow_the_source_name() {
        for source in ALL_SOURCES {
            assert_eq!(
                source.verified_key(),
                format!("{}_verified", source.as_str())
            );
        }
    }

    #[test]
    fn result_keys_match_frozen_wire_names() {
        assert_eq!(VerificationSource::DomainGuess.result_key(), "domain_guess_result");
        assert_eq!(VerificationSource::Searxng.result_key(), "searxng_result");
        assert_eq!(VerificationSource::Llm.result_key(), "llm_verify_result");
        assert_eq!(VerificationSource::Ddg.result_key(), "ddg_verify_result");
        assert_eq!(VerificationSource::GoogleSearch.result_key(), "google_search_result");
        assert_eq!(
            VerificationSource::GooglePlaces.result_key(),
            "google_places_verify_result"
        );
        assert_eq!(
            VerificationSource::Foursquare.result_key(),
            "foursquare_verify_result"
        );
    }

    #[test]
    fn verdict_round_trips() {
        for verdict in [
            Verdict::HasWebsite,
            Verdict::NoWebsite,
            Verdict::NoMatch,
            Verdict::PoorMatch,
            Verdict::NoCandidates,
            Verdict::NoResults,
            Verdict::NotSure,
            Verdict::Blocked,
            Verdict::Error,
        ] {
            assert_eq!(Verdict::parse(verdict.as_str()), Some(verdict));
        }
        assert_eq!(Verdict::parse("nope"), None);
    }
}
