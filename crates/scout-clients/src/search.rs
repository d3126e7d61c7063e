//! Search backends: SearXNG meta-search JSON API plus the DuckDuckGo and
//! Google HTML scrapers.
//!
//! All three produce the same [`SearchResult`] shape so the matching
//! logic downstream is backend-agnostic. The HTML scrapers parse with
//! `scraper` selectors synchronously after the body has been read —
//! parsed documents never cross an await point.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use scraper::{Html, Selector};
use url::Url;

use crate::error::ClientError;

/// One search hit, normalized across backends.
#[derive(Debug, Clone, Default)]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    pub snippet: String,
    /// Engines that surfaced this hit (SearXNG only).
    pub engines: Vec<String>,
}

// ─── SearXNG ────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct SearxClient {
    client: reqwest::Client,
    url: String,
}

impl SearxClient {
    pub fn new(url: &str) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            url: url.to_string(),
        })
    }

    /// Run one meta-search query, returning up to `max_results` deduped
    /// hits. Zero hits is a typed outcome, not an error.
    pub async fn search(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<SearchResult>, ClientError> {
        let resp = self
            .client
            .get(&self.url)
            .query(&[("q", query), ("format", "json"), ("categories", "general")])
            .send()
            .await?;

        if resp.status().as_u16() == 429 {
            return Err(ClientError::RateLimited);
        }
        if !resp.status().is_success() {
            return Err(ClientError::Status {
                status: resp.status().as_u16(),
                body: String::new(),
            });
        }

        let data: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| ClientError::BadResponse(e.to_string()))?;

        let mut results = Vec::new();
        let mut seen = std::collections::HashSet::new();
        for item in data
            .get("results")
            .and_then(|r| r.as_array())
            .into_iter()
            .flatten()
            .take(max_results)
        {
            let url = item.get("url").and_then(|v| v.as_str()).unwrap_or("");
            if url.is_empty() || !seen.insert(url.to_string()) {
                continue;
            }
            let mut engines: Vec<String> = item
                .get("engines")
                .and_then(|v| v.as_array())
                .map(|a| {
                    a.iter()
                        .filter_map(|e| e.as_str().map(str::to_string))
                        .collect()
                })
                .unwrap_or_default();
            if let Some(engine) = item.get("engine").and_then(|v| v.as_str()) {
                if !engines.iter().any(|e| e == engine) {
                    engines.push(engine.to_string());
                }
            }
            results.push(SearchResult {
                title: item
                    .get("title")
                    .and_then(|v| v.as_str())
                    .unwrap_or("")
                    .to_string(),
                url: url.to_string(),
                snippet: item
                    .get("content")
                    .and_then(|v| v.as_str())
                    .unwrap_or("")
                    .to_string(),
                engines,
            });
        }
        Ok(results)
    }
}

// ─── DuckDuckGo HTML ────────────────────────────────────────────────────

const DDG_ENDPOINT: &str = "https://html.duckduckgo.com/html/";

#[derive(Debug, Clone)]
pub struct DdgClient {
    client: reqwest::Client,
    endpoint: String,
}

impl DdgClient {
    pub fn new() -> Result<Self, ClientError> {
        Self::with_endpoint(DDG_ENDPOINT)
    }

    pub fn with_endpoint(endpoint: &str) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .user_agent(crate::probe::BROWSER_USER_AGENT)
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
        })
    }

    pub async fn search(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<SearchResult>, ClientError> {
        let resp = self
            .client
            .get(&self.endpoint)
            .query(&[("q", query)])
            .send()
            .await?;

        if resp.status().as_u16() == 429 {
            return Err(ClientError::RateLimited);
        }
        if !resp.status().is_success() {
            tracing::warn!(status = resp.status().as_u16(), query, "DDG non-200");
            return Ok(Vec::new());
        }

        let body = resp.text().await?;
        Ok(parse_ddg_html(&body, max_results))
    }
}

/// DDG wraps result links in a redirect with the target in the `uddg`
/// query parameter.
fn unwrap_ddg_redirect(href: &str) -> String {
    // Relative redirect URLs need a base to parse.
    let absolute = if href.starts_with("//") {
        format!("https:{href}")
    } else if href.starts_with('/') {
        format!("https://duckduckgo.com{href}")
    } else {
        href.to_string()
    };
    if let Ok(url) = Url::parse(&absolute) {
        for (key, value) in url.query_pairs() {
            if key == "uddg" {
                return value.to_string();
            }
        }
    }
    href.to_string()
}

fn parse_ddg_html(body: &str, max_results: usize) -> Vec<SearchResult> {
    let document = Html::parse_document(body);
    let result_sel = Selector::parse("div.result").expect("static selector");
    let link_sel = Selector::parse("a.result__a").expect("static selector");
    let snippet_sel = Selector::parse("a.result__snippet").expect("static selector");

    let mut results = Vec::new();
    for div in document.select(&result_sel).take(max_results) {
        let Some(link) = div.select(&link_sel).next() else {
            continue;
        };
        let href = link.value().attr("href").unwrap_or("");
        if href.is_empty() {
            continue;
        }
        let snippet = div
            .select(&snippet_sel)
            .next()
            .map(|el| el.text().collect::<String>().trim().to_string())
            .unwrap_or_default();
        results.push(SearchResult {
            title: link.text().collect::<String>().trim().to_string(),
            url: unwrap_ddg_redirect(href),
            snippet,
            engines: Vec::new(),
        });
    }
    results
}

// ─── Google HTML ────────────────────────────────────────────────────────

const GOOGLE_USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) \
     Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) \
     Chrome/121.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) \
     Chrome/119.0.0.0 Safari/537.36",
];

fn google_domain(country: Option<&str>) -> &'static str {
    match country.map(str::to_ascii_uppercase).as_deref() {
        Some("CA") => "www.google.ca",
        Some("AE") => "www.google.ae",
        _ => "www.google.com",
    }
}

#[derive(Debug)]
pub struct GoogleHtmlClient {
    client: reqwest::Client,
    ua_cursor: AtomicUsize,
}

impl GoogleHtmlClient {
    pub fn new() -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(15))
            .build()?;
        Ok(Self {
            client,
            ua_cursor: AtomicUsize::new(0),
        })
    }

    fn next_user_agent(&self) -> &'static str {
        let idx = self.ua_cursor.fetch_add(1, Ordering::Relaxed);
        GOOGLE_USER_AGENTS[idx % GOOGLE_USER_AGENTS.len()]
    }

    /// Scrape one Google results page. CAPTCHA/403/429 map to
    /// `RateLimited` so the caller can record `blocked` and back off.
    pub async fn search(
        &self,
        query: &str,
        country: Option<&str>,
        max_results: usize,
    ) -> Result<Vec<SearchResult>, ClientError> {
        let domain = google_domain(country);
        let num = max_results.to_string();
        let resp = self
            .client
            .get(format!("https://{domain}/search"))
            .header(reqwest::header::USER_AGENT, self.next_user_agent())
            .header(reqwest::header::ACCEPT, "text/html,application/xhtml+xml")
            .header(reqwest::header::ACCEPT_LANGUAGE, "en-US,en;q=0.9")
            .query(&[("q", query), ("num", num.as_str()), ("hl", "en")])
            .send()
            .await?;

        let status = resp.status().as_u16();
        if status == 429 || status == 403 {
            tracing::warn!(status, query, "Google blocked the request");
            return Err(ClientError::RateLimited);
        }
        if status != 200 {
            tracing::warn!(status, query, "Google non-200");
            return Ok(Vec::new());
        }

        let body = resp.text().await?;
        let lowered = body.to_lowercase();
        if lowered.contains("captcha") || lowered.contains("unusual traffic") {
            tracing::warn!(query, "Google CAPTCHA detected");
            return Err(ClientError::RateLimited);
        }

        Ok(parse_google_html(&body, max_results))
    }
}

fn parse_google_html(body: &str, max_results: usize) -> Vec<SearchResult> {
    let document = Html::parse_document(body);
    let g_sel = Selector::parse("div.g").expect("static selector");
    let a_sel = Selector::parse("a[href]").expect("static selector");
    let h3_sel = Selector::parse("h3").expect("static selector");
    let snippet_sel = Selector::parse("div.VwiC3b, span.aCOpRe").expect("static selector");

    let mut results = Vec::new();
    for div in document.select(&g_sel) {
        let Some(link) = div.select(&a_sel).next() else {
            continue;
        };
        let href = link.value().attr("href").unwrap_or("");
        if !href.starts_with("http") || href.contains("google.") {
            continue;
        }
        let title = div
            .select(&h3_sel)
            .next()
            .map(|el| el.text().collect::<String>().trim().to_string())
            .unwrap_or_default();
        let snippet = div
            .select(&snippet_sel)
            .next()
            .map(|el| el.text().collect::<String>().trim().to_string())
            .unwrap_or_default();
        results.push(SearchResult {
            title,
            url: href.to_string(),
            snippet,
            engines: Vec::new(),
        });
        if results.len() >= max_results {
            return results;
        }
    }

    // Fallback for layout changes: any external link with a real label.
    if results.is_empty() {
        for a in document.select(&a_sel) {
            let href = a.value().attr("href").unwrap_or("");
            if !href.starts_with("http") || href.contains("google.") {
                continue;
            }
            let title = a.text().collect::<String>().trim().to_string();
            if title.len() < 3 {
                continue;
            }
            results.push(SearchResult {
                title,
                url: href.to_string(),
                snippet: String::new(),
                engines: Vec::new(),
            });
            if results.len() >= max_results {
                break;
            }
        }
    }
    results
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unwraps_ddg_redirect_urls() {
        let href = "//duckduckgo.com/l/?uddg=https%3A%2F%2Fexample.com%2Fabout&rut=abc";
        assert_eq!(unwrap_ddg_redirect(href), "https://example.com/about");
        // Plain URLs pass through.
        assert_eq!(
            unwrap_ddg_redirect("https://example.com/"),
            "https://example.com/"
        );
    }

    #[test]
    fn parses_ddg_result_markup() {
        let body = r##"
            <html><body>
            <div class="result">
              <a class="result__a" href="//duckduckgo.com/l/?uddg=https%3A%2F%2Facme.ca%2F">Acme Plumbing</a>
              <a class="result__snippet" href="#">Plumbing in Toronto since 1980</a>
            </div>
            <div class="result">
              <a class="result__a" href="https://yelp.com/biz/acme">Acme — Yelp</a>
            </div>
            </body></html>"##;
        let results = parse_ddg_html(body, 10);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].url, "https://acme.ca/");
        assert_eq!(results[0].title, "Acme Plumbing");
        assert!(results[0].snippet.contains("Toronto"));
    }

    #[test]
    fn parses_google_result_markup() {
        let body = r#"
            <html><body>
            <div class="g">
              <a href="https://acme.ca/"><h3>Acme Plumbing</h3></a>
              <div class="VwiC3b">Plumbing in Toronto</div>
            </div>
            <div class="g">
              <a href="https://www.google.com/maps/place/x"><h3>Maps</h3></a>
            </div>
            </body></html>"#;
        let results = parse_google_html(body, 10);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].url, "https://acme.ca/");
        assert_eq!(results[0].title, "Acme Plumbing");
    }

    #[test]
    fn google_fallback_picks_external_links() {
        let body = r#"<html><body>
            <a href="https://acme.ca/">Acme Plumbing Toronto</a>
            <a href="https://accounts.google.com/">Sign in</a>
            <a href="/relative">rel</a>
        </body></html>"#;
        let results = parse_google_html(body, 10);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].url, "https://acme.ca/");
    }

    #[test]
    fn google_domain_by_country() {
        assert_eq!(google_domain(Some("CA")), "www.google.ca");
        assert_eq!(google_domain(Some("ae")), "www.google.ae");
        assert_eq!(google_domain(None), "www.google.com");
    }

    #[tokio::test]
    async fn searx_parses_results_and_engines() {
        use wiremock::matchers::method;
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "results": [
                    {"title": "Acme", "url": "https://acme.ca/", "content": "plumbers",
                     "engine": "brave", "engines": ["duckduckgo", "brave"]},
                    {"title": "Dup", "url": "https://acme.ca/", "content": ""},
                    {"title": "Other", "url": "https://other.ca/", "content": ""}
                ]
            })))
            .mount(&server)
            .await;

        let client = SearxClient::new(&server.uri()).unwrap();
        let results = client.search("acme plumbing toronto", 20).await.unwrap();
        assert_eq!(results.len(), 2, "duplicate URLs are dropped");
        assert_eq!(results[0].engines, vec!["duckduckgo", "brave"]);
    }

    #[tokio::test]
    async fn searx_429_is_rate_limited() {
        use wiremock::matchers::method;
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let client = SearxClient::new(&server.uri()).unwrap();
        let err = client.search("anything", 20).await.unwrap_err();
        assert!(err.is_rate_limited());
    }
}
