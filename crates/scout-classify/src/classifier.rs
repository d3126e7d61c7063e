//! The domain-presence classifier.
//!
//! Four probes per domain (RDAP, authoritative DNS, a concurrent
//! multi-scheme HTTP GET, and an optional TCP connect) combined
//! deterministically by [`decide_status`]. DNS is the ground truth for
//! registration: an RDAP 404 alone never yields
//! `unregistered_candidate`, because many ccTLD registries run no public
//! RDAP service.
//!
//! Probe failures land in `raw.diagnostics` and never abort the batch.
//! Re-running the classifier writes a new `whois_checks` row and
//! overwrites the status with the fresh verdict.

use futures::stream::{self, StreamExt};
use serde_json::json;
use sqlx::PgPool;
use url::Url;
use uuid::Uuid;

use scout_clients::dns::{DnsCheck, DnsProber};
use scout_clients::probe::{tcp_probe, HttpProber};
use scout_clients::rdap::{extract_registrar, RdapClient};
use scout_clients::Config;
use scout_core::data::{PARKING_HOST_HINTS, PARKING_KEYWORDS};
use scout_core::DomainStatus;
use scout_store::models::NewWhoisCheck;
use scout_store::{domains, jobs};

use crate::error::ClassifyError;

/// How many domains are probed concurrently within one batch.
const CLASSIFY_CONCURRENCY: usize = 5;

pub const JOB_NAME: &str = "classify_domains";

/// Parking detection: final-URL host hint, CNAME-target hint, or body
/// keyword. All comparisons are lowercase substring.
pub fn detect_parked(body: Option<&str>, final_url: Option<&str>, cname_targets: &[String]) -> bool {
    if body.is_none() && final_url.is_none() && cname_targets.is_empty() {
        return false;
    }

    if let Some(final_url) = final_url {
        if let Ok(url) = Url::parse(final_url) {
            let host = url.host_str().unwrap_or("").to_lowercase();
            if PARKING_HOST_HINTS.iter().any(|hint| host.contains(hint)) {
                return true;
            }
        }
    }

    if cname_targets
        .iter()
        .any(|target| PARKING_HOST_HINTS.iter().any(|hint| target.contains(hint)))
    {
        return true;
    }

    if let Some(body) = body {
        let text = body.to_lowercase();
        if PARKING_KEYWORDS.iter().any(|keyword| text.contains(keyword)) {
            return true;
        }
    }

    false
}

/// The status precedence rules; first match wins.
pub fn decide_status(
    is_parked: bool,
    is_hosted: bool,
    dns: &DnsCheck,
) -> DomainStatus {
    if is_parked {
        DomainStatus::Parked
    } else if is_hosted {
        DomainStatus::Hosted
    } else if dns.any_record() && dns.has_mx {
        DomainStatus::RegisteredNoWeb
    } else if dns.any_record() {
        DomainStatus::RegisteredDnsOnly
    } else if !dns.errors.is_empty() {
        DomainStatus::DnsError
    } else if dns.errors.is_empty() {
        DomainStatus::UnregisteredCandidate
    } else {
        DomainStatus::RdapError
    }
}

/// One classification outcome, ready to persist.
#[derive(Debug)]
pub struct Classification {
    pub check: NewWhoisCheck,
    pub status: DomainStatus,
}

pub struct DomainClassifier {
    rdap: RdapClient,
    dns: DnsProber,
    http: HttpProber,
    config: &'static Config,
}

impl DomainClassifier {
    pub fn new(config: &'static Config) -> Result<Self, ClassifyError> {
        Ok(Self {
            rdap: RdapClient::new(
                &config.rdap_base_url,
                &config.http_user_agent,
                config.http_timeout_secs,
            )?,
            dns: DnsProber::new(config.dns_timeout_secs),
            http: HttpProber::new(&config.http_user_agent, config.http_timeout_secs)
                .map_err(scout_clients::ClientError::from)?,
            config,
        })
    }

    /// Classify one domain. Never fails — every probe failure degrades
    /// to diagnostics.
    pub async fn classify(&self, domain_id: Uuid, domain: &str) -> Classification {
        let rdap = self.rdap.fetch(domain).await;
        let is_registered = match rdap.status {
            None => None,
            Some(404) => Some(false),
            Some(_) => Some(true),
        };

        let dns = self.dns.check(domain, self.config.dns_check_www).await;
        let http = self.http.probe(domain, self.config.dns_check_www).await;

        let tcp_hit = if self.config.tcp_probe_enabled && !self.config.tcp_probe_ports.is_empty() {
            tcp_probe(
                domain,
                &self.config.tcp_probe_ports,
                self.config.tcp_probe_timeout_secs,
                self.config.dns_check_www,
            )
            .await
        } else {
            None
        };

        let is_parked = if http.success || !dns.cname_targets.is_empty() {
            detect_parked(http.body.as_deref(), http.final_url.as_deref(), &dns.cname_targets)
        } else {
            false
        };

        let is_hosted =
            dns.has_a || dns.has_aaaa || dns.has_cname || http.success || tcp_hit.is_some();
        let status = decide_status(is_parked, is_hosted, &dns);

        let registrar = extract_registrar(rdap.data.as_ref());
        let diagnostics = json!({
            "rdap_status_code": rdap.status,
            "http_final_url": http.final_url,
            "http_host_checked": http.host,
            "dns": {
                "has_a": dns.has_a,
                "has_aaaa": dns.has_aaaa,
                "has_cname": dns.has_cname,
                "has_mx": dns.has_mx,
                "has_ns": dns.has_ns,
                "cname_targets": dns.cname_targets,
                "dns_errors": dns.errors,
            },
            "tcp_probe": {
                "enabled": self.config.tcp_probe_enabled,
                "open": tcp_hit.is_some(),
                "host": tcp_hit.as_ref().map(|(host, _)| host.clone()),
                "port": tcp_hit.as_ref().map(|(_, port)| *port),
                "ports_checked": self.config.tcp_probe_ports,
            },
        });

        Classification {
            check: NewWhoisCheck {
                domain_id,
                is_registered,
                is_parked: Some(is_parked),
                has_a: Some(dns.has_a),
                has_aaaa: Some(dns.has_aaaa),
                has_cname: Some(dns.has_cname),
                has_mx: Some(dns.has_mx),
                has_http: Some(http.success),
                http_status: http.status.map(i32::from),
                registrar,
                raw: Some(json!({
                    "rdap": rdap.data,
                    "diagnostics": diagnostics,
                })),
            },
            status,
        }
    }
}

/// Outcome counters for one classifier batch.
#[derive(Debug, Default, Clone)]
pub struct ClassifyOutcome {
    pub processed: u64,
}

/// Claim and classify a batch of domains.
///
/// The claim runs `FOR UPDATE SKIP LOCKED` inside the batch transaction,
/// so parallel workers receive disjoint row-sets; probes fan out
/// [`CLASSIFY_CONCURRENCY`]-wide; all writes commit atomically with the
/// batch.
pub async fn run_batch(
    pool: &PgPool,
    config: &'static Config,
    limit: Option<i64>,
    scope: Option<&str>,
    statuses: Option<Vec<String>>,
) -> Result<ClassifyOutcome, ClassifyError> {
    let target_statuses = statuses.unwrap_or_else(|| vec!["new".to_string()]);
    let batch_size = match limit {
        Some(n) if n > 0 => n,
        Some(_) => i64::MAX,
        None => config.batch_size,
    };

    let run_id = jobs::start(
        pool,
        JOB_NAME,
        scope,
        Some(&json!({ "statuses": target_statuses })),
    )
    .await?;

    let classifier = match DomainClassifier::new(config) {
        Ok(classifier) => classifier,
        Err(e) => {
            jobs::fail(pool, run_id, &e.to_string(), None).await?;
            return Err(e);
        }
    };

    let result = async {
        let mut tx = pool.begin().await?;
        let claimed =
            domains::claim_for_classification(&mut tx, &target_statuses, batch_size).await?;

        let classifications: Vec<Classification> = stream::iter(claimed.iter())
            .map(|row| {
                Box::pin(classifier.classify(row.id, &row.domain))
                    as std::pin::Pin<Box<dyn std::future::Future<Output = _> + Send + '_>>
            })
            .buffer_unordered(CLASSIFY_CONCURRENCY)
            .collect()
            .await;

        for classification in &classifications {
            domains::record_classification(
                &mut tx,
                &classification.check,
                classification.status.as_str(),
            )
            .await?;
        }
        tx.commit().await?;

        Ok::<ClassifyOutcome, sqlx::Error>(ClassifyOutcome {
            processed: classifications.len() as u64,
        })
    }
    .await;

    match result {
        Ok(outcome) => {
            jobs::complete(
                pool,
                run_id,
                outcome.processed as i64,
                Some(&json!({ "statuses": target_statuses })),
            )
            .await?;
            Ok(outcome)
        }
        Err(e) => {
            jobs::fail(pool, run_id, &e.to_string(), None).await?;
            Err(e.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dns(any: bool, mx: bool, errors: bool) -> DnsCheck {
        DnsCheck {
            has_a: any,
            has_mx: mx,
            errors: if errors { vec!["apex:A:Io".into()] } else { vec![] },
            ..Default::default()
        }
    }

    #[test]
    fn parked_wins_over_everything() {
        let check = dns(true, true, false);
        assert_eq!(decide_status(true, true, &check), DomainStatus::Parked);
    }

    #[test]
    fn hosted_beats_registration_states() {
        let check = dns(true, true, false);
        assert_eq!(decide_status(false, true, &check), DomainStatus::Hosted);
    }

    #[test]
    fn dns_with_mx_is_registered_no_web() {
        // MX but no hosting signal.
        let check = DnsCheck {
            has_mx: true,
            ..Default::default()
        };
        assert_eq!(
            decide_status(false, false, &check),
            DomainStatus::RegisteredNoWeb
        );
    }

    #[test]
    fn dns_without_mx_is_registered_dns_only() {
        let check = DnsCheck {
            has_ns: true,
            ..Default::default()
        };
        assert_eq!(
            decide_status(false, false, &check),
            DomainStatus::RegisteredDnsOnly
        );
    }

    #[test]
    fn no_dns_with_errors_is_dns_error() {
        let check = dns(false, false, true);
        assert_eq!(decide_status(false, false, &check), DomainStatus::DnsError);
    }

    #[test]
    fn no_dns_without_errors_is_unregistered_candidate() {
        let check = dns(false, false, false);
        assert_eq!(
            decide_status(false, false, &check),
            DomainStatus::UnregisteredCandidate
        );
    }

    #[test]
    fn rdap_404_with_a_record_is_hosted() {
        // A `.ae` domain whose registry has no public RDAP: 404 from
        // RDAP, but the A record exists. The A record wins.
        let check = dns(true, false, false);
        let is_hosted = check.has_a;
        assert_eq!(decide_status(false, is_hosted, &check), DomainStatus::Hosted);
    }

    #[test]
    fn classification_is_deterministic() {
        let check = dns(true, true, false);
        let first = decide_status(false, false, &check);
        let second = decide_status(false, false, &check);
        assert_eq!(first, second);
        assert_eq!(first, DomainStatus::RegisteredNoWeb);
    }

    #[test]
    fn parking_by_final_url_host() {
        assert!(detect_parked(
            None,
            Some("https://pool.sedoparking.com/lander"),
            &[]
        ));
        assert!(!detect_parked(None, Some("https://acme.ca/"), &[]));
    }

    #[test]
    fn parking_by_cname_target() {
        assert!(detect_parked(
            None,
            None,
            &["park.bodis.net".to_string()]
        ));
    }

    #[test]
    fn parking_by_body_keyword() {
        assert!(detect_parked(
            Some("<html>This Domain Is For Sale — inquire today</html>"),
            Some("https://example.com/"),
            &[]
        ));
        assert!(!detect_parked(
            Some("<html>Acme Plumbing, serving Toronto</html>"),
            Some("https://acme.ca/"),
            &[]
        ));
    }

    #[test]
    fn nothing_to_inspect_is_not_parked() {
        assert!(!detect_parked(None, None, &[]));
    }
}
