//! # Domain Classification Status
//!
//! The closed enum the domain classifier assigns after its RDAP + DNS +
//! HTTP(+TCP) probe pass. The first eight variants are the canonical set a
//! fresh classification can produce; the remainder exist for backward
//! compatibility with rows written by older classifier and enrichment
//! paths and are never emitted by new runs.

use serde::{Deserialize, Serialize};

/// Classification of a domain's internet presence.
///
/// Precedence when classifying (first match wins): `Parked`, `Hosted`,
/// `RegisteredNoWeb`, `RegisteredDnsOnly`, `DnsError`,
/// `UnregisteredCandidate`, `RdapError`. DNS is the ground truth for
/// registration: an RDAP 404 alone never produces
/// `UnregisteredCandidate` (many ccTLDs have no public RDAP).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DomainStatus {
    /// Freshly synced, not yet classified.
    New,
    /// Something answers for this domain: A/AAAA/CNAME record, a live HTTP
    /// response, or an open TCP port.
    Hosted,
    /// Parking indicators detected in the final URL host, a CNAME target,
    /// or the response body.
    Parked,
    /// DNS records exist and MX is present: registered, mail-capable,
    /// but serving no web content.
    RegisteredNoWeb,
    /// DNS records exist but no MX: registered, DNS-only.
    RegisteredDnsOnly,
    /// No DNS records at all and no resolver errors: plausibly
    /// unregistered (still needs RDAP corroboration downstream).
    UnregisteredCandidate,
    /// No DNS records, but at least one resolver query failed with a
    /// server/transport error, so absence is not trustworthy.
    DnsError,
    /// Nothing conclusive from any probe, including RDAP.
    RdapError,

    // -- Legacy statuses (accepted on read, never emitted by new runs) --
    /// Old classifier's "registered but unhosted" verdict.
    VerifiedUnhosted,
    /// Old classifier's "registered, DNS present, no MX" verdict.
    MxMissing,
    /// Role-email enrichment produced contacts for this domain.
    Enriched,
    /// Role-email enrichment ran but produced nothing new.
    NoContacts,
    /// Oldest pipeline's generic "looked at it" marker.
    Checked,
    /// Operator-skipped.
    Skipped,
}

impl DomainStatus {
    /// Canonical string form, matching the persisted `domains.status` text.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Hosted => "hosted",
            Self::Parked => "parked",
            Self::RegisteredNoWeb => "registered_no_web",
            Self::RegisteredDnsOnly => "registered_dns_only",
            Self::UnregisteredCandidate => "unregistered_candidate",
            Self::DnsError => "dns_error",
            Self::RdapError => "rdap_error",
            Self::VerifiedUnhosted => "verified_unhosted",
            Self::MxMissing => "mx_missing",
            Self::Enriched => "enriched",
            Self::NoContacts => "no_contacts",
            Self::Checked => "checked",
            Self::Skipped => "skipped",
        }
    }

    /// Parse a persisted status string. Unknown strings map to `New` so a
    /// rolled-back deployment cannot wedge the classifier's claim query.
    pub fn parse(raw: &str) -> Self {
        match raw {
            "new" => Self::New,
            "hosted" => Self::Hosted,
            "parked" => Self::Parked,
            "registered_no_web" => Self::RegisteredNoWeb,
            "registered_dns_only" => Self::RegisteredDnsOnly,
            "unregistered_candidate" => Self::UnregisteredCandidate,
            "dns_error" => Self::DnsError,
            "rdap_error" => Self::RdapError,
            "verified_unhosted" => Self::VerifiedUnhosted,
            "mx_missing" => Self::MxMissing,
            "enriched" => Self::Enriched,
            "no_contacts" => Self::NoContacts,
            "checked" => Self::Checked,
            "skipped" => Self::Skipped,
            _ => Self::New,
        }
    }

    /// Migration mapping from the old classifier's vocabulary to the
    /// canonical set. Identity for statuses that did not change meaning.
    ///
    /// - `verified_unhosted` → `registered_no_web` (old runs only reached
    ///   it with MX present)
    /// - `mx_missing` → `registered_dns_only`
    /// - enrichment markers keep their identity; they are bucketed by the
    ///   feature loader rather than re-mapped.
    pub fn from_legacy(self) -> Self {
        match self {
            Self::VerifiedUnhosted => Self::RegisteredNoWeb,
            Self::MxMissing => Self::RegisteredDnsOnly,
            other => other,
        }
    }

    /// Whether a fresh classifier run may emit this status.
    pub fn is_canonical(&self) -> bool {
        matches!(
            self,
            Self::New
                | Self::Hosted
                | Self::Parked
                | Self::RegisteredNoWeb
                | Self::RegisteredDnsOnly
                | Self::UnregisteredCandidate
                | Self::DnsError
                | Self::RdapError
        )
    }
}

impl std::fmt::Display for DomainStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_canonical_statuses() {
        for status in [
            DomainStatus::New,
            DomainStatus::Hosted,
            DomainStatus::Parked,
            DomainStatus::RegisteredNoWeb,
            DomainStatus::RegisteredDnsOnly,
            DomainStatus::UnregisteredCandidate,
            DomainStatus::DnsError,
            DomainStatus::RdapError,
        ] {
            assert_eq!(DomainStatus::parse(status.as_str()), status);
            assert!(status.is_canonical());
        }
    }

    #[test]
    fn legacy_statuses_are_not_canonical() {
        for status in [
            DomainStatus::VerifiedUnhosted,
            DomainStatus::MxMissing,
            DomainStatus::Enriched,
            DomainStatus::NoContacts,
            DomainStatus::Checked,
            DomainStatus::Skipped,
        ] {
            assert!(!status.is_canonical(), "{status} should be legacy");
        }
    }

    #[test]
    fn legacy_mapping_targets_canonical_set() {
        assert_eq!(
            DomainStatus::VerifiedUnhosted.from_legacy(),
            DomainStatus::RegisteredNoWeb
        );
        assert_eq!(
            DomainStatus::MxMissing.from_legacy(),
            DomainStatus::RegisteredDnsOnly
        );
        // Identity for canonical inputs.
        assert_eq!(DomainStatus::Hosted.from_legacy(), DomainStatus::Hosted);
    }

    #[test]
    fn unknown_string_parses_as_new() {
        assert_eq!(DomainStatus::parse("definitely_not_a_status"), DomainStatus::New);
    }

    #[test]
    fn serde_uses_snake_case() {
        let json = serde_json::to_string(&DomainStatus::RegisteredNoWeb).unwrap();
        assert_eq!(json, "\"registered_no_web\"");
        let parsed: DomainStatus = serde_json::from_str("\"unregistered_candidate\"").unwrap();
        assert_eq!(parsed, DomainStatus::UnregisteredCandidate);
    }
}
