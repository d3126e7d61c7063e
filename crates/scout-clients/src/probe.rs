//! HTTP and TCP probing.
//!
//! Three consumers with different needs share this module:
//!
//! - the domain classifier GETs both schemes on both hosts concurrently
//!   and keeps the first non-5xx response (plus up to 200 KB of text
//!   body for parking detection);
//! - the name-guess verifier HEADs candidate domains cheaply, then GETs
//!   only the live ones for validation;
//! - the optional TCP probe connects to configured ports to catch hosts
//!   that serve something other than HTTP.
//!
//! Probes use a short connect timeout so dead hosts fail fast, and a
//! realistic browser user-agent — bot UAs get blocked outright by many
//! servers.

use std::sync::OnceLock;
use std::time::Duration;

use futures::stream::{FuturesUnordered, StreamExt};
use regex::Regex;

/// Realistic browser user-agent for candidate probing.
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Cap on retained response body (parking detection needs the head of
/// the document, not megabytes of it).
const MAX_BODY_BYTES: usize = 200_000;

/// Result of the classifier's multi-scheme probe.
#[derive(Debug, Clone, Default)]
pub struct HttpProbe {
    pub success: bool,
    pub status: Option<u16>,
    pub final_url: Option<String>,
    /// Text/HTML body head, when the content type was textual.
    pub body: Option<String>,
    /// Which host answered (`example.com` or `www.example.com`).
    pub host: Option<String>,
}

/// A fetched page for validation. `status == 0` means the fetch failed.
#[derive(Debug, Clone, Default)]
pub struct FetchedPage {
    pub status: u16,
    pub body: String,
    pub final_url: String,
    /// Lowercased `<title>` contents, truncated to 200 chars.
    pub title: String,
}

fn title_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)<title[^>]*>(.*?)</title>").expect("static regex"))
}

/// Extract the lowercased page title from a body head.
pub fn extract_title(body: &str) -> String {
    let head = &body[..body.len().min(5000)];
    title_re()
        .captures(head)
        .and_then(|c| c.get(1))
        .map(|m| {
            let t = m.as_str().trim();
            t.chars().take(200).collect::<String>().to_lowercase()
        })
        .unwrap_or_default()
}

#[derive(Debug, Clone)]
pub struct HttpProber {
    client: reqwest::Client,
}

impl HttpProber {
    /// Build a prober. Invalid certificates are accepted: a business
    /// site behind a stale certificate is still a live website for
    /// classification purposes.
    pub fn new(user_agent: &str, timeout_secs: u64) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .connect_timeout(Duration::from_secs(2))
            .timeout(Duration::from_secs(timeout_secs.max(1)))
            .danger_accept_invalid_certs(true)
            .build()?;
        Ok(Self { client })
    }

    async fn try_get(&self, url: String, host: String) -> Option<HttpProbe> {
        let resp = self.client.get(&url).send().await.ok()?;
        let status = resp.status().as_u16();
        if status >= 500 {
            return None;
        }
        let final_url = resp.url().to_string();
        let content_type = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();
        let body = if content_type.contains("text") || content_type.contains("html") {
            let text = resp.text().await.ok()?;
            let mut end = text.len().min(MAX_BODY_BYTES);
            while !text.is_char_boundary(end) {
                end -= 1;
            }
            Some(text[..end].to_string())
        } else {
            None
        };
        Some(HttpProbe {
            success: true,
            status: Some(status),
            final_url: Some(final_url),
            body,
            host: Some(host),
        })
    }

    /// GET `{https,http} × {apex, www}` concurrently; the first non-5xx
    /// response wins.
    pub async fn probe(&self, domain: &str, check_www: bool) -> HttpProbe {
        let mut hosts = vec![domain.to_string()];
        if check_www {
            hosts.push(format!("www.{domain}"));
        }

        let mut futures = FuturesUnordered::new();
        for host in &hosts {
            for scheme in ["https", "http"] {
                futures.push(self.try_get(format!("{scheme}://{host}"), host.clone()));
            }
        }

        while let Some(outcome) = futures.next().await {
            if let Some(probe) = outcome {
                return probe;
            }
        }
        HttpProbe::default()
    }

    /// HEAD a candidate domain. 200–399 is alive; 403/405 means the
    /// server is alive but hostile to HEAD; anything else (or a network
    /// error on both schemes) is dead.
    pub async fn head_check(&self, domain: &str) -> (bool, Option<u16>) {
        for scheme in ["https", "http"] {
            let url = format!("{scheme}://{domain}");
            match self.client.head(&url).send().await {
                Ok(resp) => {
                    let status = resp.status().as_u16();
                    if (200..400).contains(&status) || status == 403 || status == 405 {
                        return (true, Some(status));
                    }
                }
                Err(_) => continue,
            }
        }
        (false, None)
    }

    /// GET a page for validation; failures collapse to
    /// `FetchedPage::default()`.
    pub async fn fetch_page(&self, url: &str) -> FetchedPage {
        let resp = match self.client.get(url).send().await {
            Ok(resp) => resp,
            Err(_) => return FetchedPage::default(),
        };
        let status = resp.status().as_u16();
        let final_url = resp.url().to_string();
        let body = resp.text().await.unwrap_or_default();
        let title = extract_title(&body);
        FetchedPage {
            status,
            body,
            final_url,
            title,
        }
    }
}

/// Try each configured port on each host until one connects. Returns the
/// first `(host, port)` that accepted.
pub async fn tcp_probe(
    domain: &str,
    ports: &[u16],
    timeout_secs: u64,
    check_www: bool,
) -> Option<(String, u16)> {
    let mut hosts = vec![domain.to_string()];
    if check_www {
        hosts.push(format!("www.{domain}"));
    }
    for host in hosts {
        for &port in ports {
            let attempt = tokio::time::timeout(
                Duration::from_secs(timeout_secs.max(1)),
                tokio::net::TcpStream::connect((host.as_str(), port)),
            )
            .await;
            if let Ok(Ok(_stream)) = attempt {
                return Some((host, port));
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_and_lowercases_title() {
        let body = "<html><head><TITLE> Acme Plumbing — Home </TITLE></head></html>";
        assert_eq!(extract_title(body), "acme plumbing — home");
    }

    #[test]
    fn missing_title_is_empty() {
        assert_eq!(extract_title("<html><body>no title</body></html>"), "");
        assert_eq!(extract_title(""), "");
    }

    #[test]
    fn title_spanning_lines_is_captured() {
        let body = "<title>\n  Morton\n  Motors\n</title>";
        assert!(extract_title(body).contains("morton"));
    }

    #[tokio::test]
    async fn probe_reports_failure_on_dead_host() {
        // Reserved TLD never resolves.
        let prober = HttpProber::new(BROWSER_USER_AGENT, 2).unwrap();
        let result = prober.probe("does-not-exist.invalid", false).await;
        assert!(!result.success);
        assert!(result.status.is_none());
    }

    #[tokio::test]
    async fn tcp_probe_fails_on_closed_port() {
        let hit = tcp_probe("127.0.0.1", &[1], 1, false).await;
        assert!(hit.is_none());
    }

    #[tokio::test]
    async fn probe_keeps_text_body_and_final_url() {
        use wiremock::matchers::method;
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/html")
                    .set_body_string("<html><title>hi</title></html>"),
            )
            .mount(&server)
            .await;

        let prober = HttpProber::new(BROWSER_USER_AGENT, 2).unwrap();
        let page = prober.fetch_page(&server.uri()).await;
        assert_eq!(page.status, 200);
        assert_eq!(page.title, "hi");
        assert!(page.body.contains("<title>"));
    }
}
