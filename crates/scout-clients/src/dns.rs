//! Authoritative DNS checks via hickory-resolver.
//!
//! A "record exists" is true iff the answer section is non-empty.
//! NXDOMAIN, NoAnswer, and timeouts are expected outcomes, not errors;
//! server/transport failures are recorded per `(host, record-type)` so
//! the classifier can distinguish "no records" from "could not look".

use std::time::Duration;

use hickory_resolver::config::{ResolverConfig, ResolverOpts};
use hickory_resolver::error::ResolveErrorKind;
use hickory_resolver::proto::rr::RecordType;
use hickory_resolver::TokioAsyncResolver;

/// Aggregated DNS picture for one domain (apex + optional `www.`).
#[derive(Debug, Clone, Default)]
pub struct DnsCheck {
    pub has_a: bool,
    pub has_aaaa: bool,
    pub has_cname: bool,
    pub has_mx: bool,
    pub has_ns: bool,
    /// Lowercased CNAME targets from apex and `www.`, for parking
    /// detection.
    pub cname_targets: Vec<String>,
    /// `host:rtype:error` strings for every failed query.
    pub errors: Vec<String>,
}

impl DnsCheck {
    /// Any record at all.
    pub fn any_record(&self) -> bool {
        self.has_a || self.has_aaaa || self.has_cname || self.has_mx || self.has_ns
    }
}

pub struct DnsProber {
    resolver: TokioAsyncResolver,
}

impl DnsProber {
    pub fn new(timeout_secs: u64) -> Self {
        let mut opts = ResolverOpts::default();
        opts.timeout = Duration::from_secs(timeout_secs.max(1));
        opts.attempts = 1;
        let resolver = TokioAsyncResolver::tokio(ResolverConfig::default(), opts);
        Self { resolver }
    }

    /// One record-type query. Returns `(has_record, values, error)`.
    async fn query(
        &self,
        host: &str,
        record_type: RecordType,
    ) -> (bool, Vec<String>, Option<String>) {
        match self.resolver.lookup(host, record_type).await {
            Ok(lookup) => {
                let values: Vec<String> = lookup
                    .iter()
                    .map(|rdata| {
                        rdata
                            .to_string()
                            .trim()
                            .trim_end_matches('.')
                            .to_lowercase()
                    })
                    .collect();
                (!values.is_empty(), values, None)
            }
            Err(e) => match e.kind() {
                // Expected absences, not errors.
                ResolveErrorKind::NoRecordsFound { .. } => (false, Vec::new(), None),
                ResolveErrorKind::Timeout => (false, Vec::new(), None),
                _ => (false, Vec::new(), Some(e.to_string())),
            },
        }
    }

    /// Full check: A/AAAA/CNAME/MX/NS on the apex, plus A/AAAA/CNAME on
    /// `www.` when `check_www` is set.
    pub async fn check(&self, domain: &str, check_www: bool) -> DnsCheck {
        let mut result = DnsCheck::default();

        for record_type in [
            RecordType::A,
            RecordType::AAAA,
            RecordType::CNAME,
            RecordType::MX,
            RecordType::NS,
        ] {
            let (has_record, values, error) = self.query(domain, record_type).await;
            if let Some(error) = error {
                result.errors.push(format!("apex:{record_type}:{error}"));
            }
            match record_type {
                RecordType::A => result.has_a |= has_record,
                RecordType::AAAA => result.has_aaaa |= has_record,
                RecordType::CNAME => {
                    result.has_cname |= has_record;
                    result.cname_targets.extend(values);
                }
                RecordType::MX => result.has_mx = has_record,
                RecordType::NS => result.has_ns = has_record,
                _ => {}
            }
        }

        if check_www {
            let www = format!("www.{domain}");
            for record_type in [RecordType::A, RecordType::AAAA, RecordType::CNAME] {
                let (has_record, values, error) = self.query(&www, record_type).await;
                if let Some(error) = error {
                    result.errors.push(format!("www:{record_type}:{error}"));
                }
                match record_type {
                    RecordType::A => result.has_a |= has_record,
                    RecordType::AAAA => result.has_aaaa |= has_record,
                    RecordType::CNAME => {
                        result.has_cname |= has_record;
                        result.cname_targets.extend(values);
                    }
                    _ => {}
                }
            }
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_check_has_no_records() {
        let check = DnsCheck::default();
        assert!(!check.any_record());
    }

    #[test]
    fn any_single_record_counts() {
        let check = DnsCheck {
            has_mx: true,
            ..Default::default()
        };
        assert!(check.any_record());

        let check = DnsCheck {
            has_ns: true,
            ..Default::default()
        };
        assert!(check.any_record());
    }
}
