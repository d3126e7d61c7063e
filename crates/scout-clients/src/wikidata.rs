//! Wikidata chain/franchise snapshot.
//!
//! One SPARQL query for everything that is an instance of "chain store"
//! or "franchise", loaded lazily at most once per process and immutable
//! after load. A failed load caches the empty set — the scorer degrades
//! to tag-based chain detection rather than hammering the endpoint.

use std::collections::HashSet;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::OnceCell;

const WIKIDATA_SPARQL_URL: &str = "https://query.wikidata.org/sparql";

/// Chain stores (Q507619) and franchises (Q126793), English labels.
const CHAIN_QUERY: &str = r#"
SELECT DISTINCT ?label WHERE {
  { ?item wdt:P31 wd:Q507619 . }
  UNION
  { ?item wdt:P31 wd:Q126793 . }
  ?item rdfs:label ?label .
  FILTER(LANG(?label) = "en")
}
"#;

static CHAIN_CACHE: OnceCell<HashSet<String>> = OnceCell::const_new();

async fn fetch_chains(user_agent: &str) -> HashSet<String> {
    let client = match reqwest::Client::builder()
        .user_agent(user_agent)
        .timeout(Duration::from_secs(30))
        .build()
    {
        Ok(client) => client,
        Err(_) => return HashSet::new(),
    };

    let resp = client
        .get(WIKIDATA_SPARQL_URL)
        .query(&[("query", CHAIN_QUERY), ("format", "json")])
        .send()
        .await;

    let Ok(resp) = resp else {
        tracing::warn!("Wikidata chain query failed (transport)");
        return HashSet::new();
    };
    if !resp.status().is_success() {
        tracing::warn!(status = resp.status().as_u16(), "Wikidata chain query failed");
        return HashSet::new();
    }

    let Ok(data) = resp.json::<Value>().await else {
        tracing::warn!("Wikidata chain response was not JSON");
        return HashSet::new();
    };

    let names = parse_chain_labels(&data);
    tracing::info!(count = names.len(), "Loaded chain names from Wikidata");
    names
}

/// Extract lowercase labels from a SPARQL JSON response.
pub fn parse_chain_labels(data: &Value) -> HashSet<String> {
    data.get("results")
        .and_then(|r| r.get("bindings"))
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|binding| {
            binding
                .get("label")
                .and_then(|l| l.get("value"))
                .and_then(Value::as_str)
        })
        .map(|label| label.trim().to_lowercase())
        .filter(|label| !label.is_empty())
        .collect()
}

/// The process-wide chain snapshot; first caller triggers the load.
pub async fn chain_names(user_agent: &str) -> &'static HashSet<String> {
    CHAIN_CACHE
        .get_or_init(|| fetch_chains(user_agent))
        .await
}

/// Whether a business name matches a known chain: exact, or the chain
/// name (≥4 chars) appears inside it ("Tim Hortons #1234").
pub fn matches_chain(chains: &HashSet<String>, business_name: &str) -> bool {
    if chains.is_empty() {
        return false;
    }
    let normalized = business_name.trim().to_lowercase();
    if normalized.is_empty() {
        return false;
    }
    if chains.contains(&normalized) {
        return true;
    }
    chains
        .iter()
        .any(|chain| chain.len() >= 4 && normalized.contains(chain.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_sparql_labels() {
        let data = serde_json::json!({
            "results": { "bindings": [
                {"label": {"value": "Tim Hortons"}},
                {"label": {"value": "  Subway "}},
                {"label": {"value": ""}}
            ]}
        });
        let labels = parse_chain_labels(&data);
        assert!(labels.contains("tim hortons"));
        assert!(labels.contains("subway"));
        assert_eq!(labels.len(), 2);
    }

    #[test]
    fn chain_matching_is_exact_or_substring() {
        let chains: HashSet<String> =
            ["tim hortons".to_string(), "kfc".to_string()].into_iter().collect();
        assert!(matches_chain(&chains, "Tim Hortons"));
        assert!(matches_chain(&chains, "Tim Hortons #1234"));
        // 3-char chains never substring-match (too collision-prone).
        assert!(!matches_chain(&chains, "Awkward KFC-adjacent Shawarma"));
        assert!(!matches_chain(&chains, "The Village Cobbler"));
        assert!(!matches_chain(&HashSet::new(), "Tim Hortons"));
    }
}
