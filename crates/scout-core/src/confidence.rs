//! # Weighted Verification Confidence
//!
//! Pure function over a business's `raw` map. Every `(source, verdict)`
//! pair carries a fixed weight reflecting how trustworthy that evidence
//! is; the weights sum and bucketize into a confidence level that caps the
//! lead score (see the scorer). Adding evidence can only raise the sum, so
//! confidence is monotone in evidence.

use serde_json::Value;

use crate::verdict::{VerificationSource, ALL_SOURCES};

/// Confidence that a business genuinely lacks a website.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ConfidenceLevel {
    /// No verification source has run.
    Unverified,
    /// Weight in (0, 0.7).
    Low,
    /// Weight in [0.7, 1.5).
    Medium,
    /// Weight ≥ 1.5.
    High,
}

impl ConfidenceLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unverified => "unverified",
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl std::fmt::Display for ConfidenceLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Weight recorded when a source has run but its result string is not in
/// the table (or is unparseable).
const UNKNOWN_RESULT_WEIGHT: f64 = 0.1;

/// Weight for legacy rows that carry `<source>_verified` but predate the
/// result key — medium-strength evidence of unknown kind.
const LEGACY_NO_RESULT_WEIGHT: f64 = 0.5;

/// The fixed `(source, verdict)` weight table.
///
/// Weights encode source reliability: an API-quality `no_website` from
/// Google Places (0.9) is worth far more than a DDG `no_results` (0.05 —
/// the scraper frequently returns nothing).
fn weight_for(source: VerificationSource, result: &str) -> Option<f64> {
    use VerificationSource::*;
    let w = match (source, result) {
        (DomainGuess, "no_match") => 0.7,
        (DomainGuess, "has_website") => 1.0,
        (DomainGuess, "no_candidates") => 0.1,

        (Searxng, "no_website") => 0.9,
        (Searxng, "has_website") => 1.0,
        (Searxng, "no_results") => 0.1,

        (Llm, "no_website") => 0.8,
        (Llm, "has_website") => 0.9,
        (Llm, "not_sure") => 0.2,
        (Llm, "no_results") => 0.1,

        (Ddg, "no_website") => 0.6,
        (Ddg, "has_website") => 0.8,
        (Ddg, "no_results") => 0.05,

        (GoogleSearch, "no_website") => 0.6,
        (GoogleSearch, "has_website") => 0.8,
        (GoogleSearch, "no_results") => 0.05,
        (GoogleSearch, "blocked") => 0.0,

        (GooglePlaces, "no_website") => 0.9,
        (GooglePlaces, "has_website") => 1.0,

        (Foursquare, "no_website") => 0.7,
        (Foursquare, "has_website") => 0.9,

        _ => return None,
    };
    Some(w)
}

fn source_has_run(raw: &Value, source: VerificationSource) -> bool {
    raw.get(source.verified_key())
        .map(|v| v.as_bool().unwrap_or(true))
        .unwrap_or(false)
}

/// Total weighted evidence across all verification sources. 0.0 when no
/// source has run.
pub fn verification_weight(raw: Option<&Value>) -> f64 {
    let Some(raw) = raw else { return 0.0 };

    let mut total = 0.0;
    for source in ALL_SOURCES {
        if !source_has_run(raw, source) {
            continue;
        }
        match raw.get(source.result_key()).and_then(Value::as_str) {
            Some(result) => {
                total += weight_for(source, result).unwrap_or(UNKNOWN_RESULT_WEIGHT);
            }
            None => total += LEGACY_NO_RESULT_WEIGHT,
        }
    }
    total
}

/// Bucketize the summed weight. `Unverified` is reserved for "no source
/// has run at all" — a recorded result always yields at least `Low`.
pub fn verification_confidence(raw: Option<&Value>) -> ConfidenceLevel {
    let Some(raw) = raw else {
        return ConfidenceLevel::Unverified;
    };
    if !ALL_SOURCES.iter().any(|s| source_has_run(raw, *s)) {
        return ConfidenceLevel::Unverified;
    }

    let weight = verification_weight(Some(raw));
    if weight >= 1.5 {
        ConfidenceLevel::High
    } else if weight >= 0.7 {
        ConfidenceLevel::Medium
    } else {
        ConfidenceLevel::Low
    }
}

/// Number of sources that have checked this business.
pub fn verification_count(raw: Option<&Value>) -> usize {
    match raw {
        Some(raw) => ALL_SOURCES
            .iter()
            .filter(|s| source_has_run(raw, **s))
            .count(),
        None => 0,
    }
}

/// Source names that have checked this business.
pub fn verification_sources(raw: Option<&Value>) -> Vec<&'static str> {
    match raw {
        Some(raw) => ALL_SOURCES
            .iter()
            .filter(|s| source_has_run(raw, **s))
            .map(|s| s.as_str())
            .collect(),
        None => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_raw_is_unverified() {
        assert_eq!(verification_confidence(None), ConfidenceLevel::Unverified);
        assert_eq!(
            verification_confidence(Some(&json!({}))),
            ConfidenceLevel::Unverified
        );
        assert_eq!(verification_weight(None), 0.0);
    }

    #[test]
    fn domain_guess_no_match_alone_is_medium() {
        let raw = json!({
            "domain_guess_verified": true,
            "domain_guess_result": "no_match",
        });
        assert!((verification_weight(Some(&raw)) - 0.7).abs() < f64::EPSILON);
        assert_eq!(verification_confidence(Some(&raw)), ConfidenceLevel::Medium);
    }

    #[test]
    fn domain_guess_plus_searxng_is_high() {
        // 0.7 + 0.9 = 1.6 ≥ 1.5
        let raw = json!({
            "domain_guess_verified": true,
            "domain_guess_result": "no_match",
            "searxng_verified": true,
            "searxng_result": "no_website",
        });
        assert_eq!(verification_confidence(Some(&raw)), ConfidenceLevel::High);
    }

    #[test]
    fn ddg_no_results_alone_is_low() {
        let raw = json!({
            "ddg_verified": true,
            "ddg_verify_result": "no_results",
        });
        let w = verification_weight(Some(&raw));
        assert!((w - 0.05).abs() < f64::EPSILON);
        assert_eq!(verification_confidence(Some(&raw)), ConfidenceLevel::Low);
    }

    #[test]
    fn llm_not_sure_keeps_domain_guess_at_medium() {
        // 0.7 + 0.2 = 0.9 → medium
        let raw = json!({
            "domain_guess_verified": true,
            "domain_guess_result": "no_match",
            "llm_verified": true,
            "llm_verify_result": "not_sure",
        });
        assert_eq!(verification_confidence(Some(&raw)), ConfidenceLevel::Medium);
    }

    #[test]
    fn unknown_result_counts_as_point_one() {
        let raw = json!({
            "searxng_verified": true,
            "searxng_result": "some_future_verdict",
        });
        assert!((verification_weight(Some(&raw)) - 0.1).abs() < f64::EPSILON);
    }

    #[test]
    fn legacy_row_without_result_key_counts_half() {
        let raw = json!({ "ddg_verified": true });
        assert!((verification_weight(Some(&raw)) - 0.5).abs() < f64::EPSILON);
        assert_eq!(verification_confidence(Some(&raw)), ConfidenceLevel::Low);
    }

    #[test]
    fn confidence_is_monotone_in_evidence() {
        // Adding any positive-weight result never lowers the level.
        let base = json!({
            "ddg_verified": true,
            "ddg_verify_result": "no_results",
        });
        let before = verification_confidence(Some(&base));

        let mut grown = base.clone();
        grown["google_places_verified"] = json!(true);
        grown["google_places_verify_result"] = json!("no_website");
        let after = verification_confidence(Some(&grown));

        assert!(after >= before, "{after:?} < {before:?}");
    }

    #[test]
    fn counts_and_sources_reflect_verified_keys() {
        let raw = json!({
            "domain_guess_verified": true,
            "domain_guess_result": "no_match",
            "llm_verified": true,
            "llm_verify_result": "no_website",
        });
        assert_eq!(verification_count(Some(&raw)), 2);
        assert_eq!(
            verification_sources(Some(&raw)),
            vec!["domain_guess", "llm"]
        );
    }
}
