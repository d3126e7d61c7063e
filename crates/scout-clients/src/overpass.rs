//! Overpass API client for OSM business imports.

use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;

use crate::error::ClientError;

/// One OSM element (node/way/relation) with its tags and a resolved
/// location (ways and relations carry a `center`).
#[derive(Debug, Clone, Deserialize)]
pub struct OsmElement {
    #[serde(rename = "type")]
    pub element_type: String,
    pub id: i64,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lon: Option<f64>,
    #[serde(default)]
    pub center: Option<OsmCenter>,
    #[serde(default)]
    pub tags: serde_json::Map<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OsmCenter {
    pub lat: f64,
    pub lon: f64,
}

impl OsmElement {
    /// Best-effort location: own coordinates for nodes, `center` for
    /// ways/relations.
    pub fn location(&self) -> (Option<f64>, Option<f64>) {
        match (self.lat, self.lon) {
            (Some(lat), Some(lon)) => (Some(lat), Some(lon)),
            _ => match &self.center {
                Some(center) => (Some(center.lat), Some(center.lon)),
                None => (None, None),
            },
        }
    }

    /// Source identifier, stable across re-imports.
    pub fn source_id(&self) -> String {
        format!("{}/{}", self.element_type, self.id)
    }

    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).and_then(Value::as_str)
    }
}

#[derive(Debug, Deserialize)]
struct OverpassResponse {
    #[serde(default)]
    elements: Vec<OsmElement>,
}

#[derive(Debug, Clone)]
pub struct OverpassClient {
    client: reqwest::Client,
    endpoint: String,
}

impl OverpassClient {
    pub fn new(endpoint: &str, timeout_secs: u64) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs.max(30)))
            .build()?;
        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
        })
    }

    /// Run an Overpass QL query and return the elements.
    pub async fn run(&self, query: &str) -> Result<Vec<OsmElement>, ClientError> {
        let resp = self
            .client
            .post(&self.endpoint)
            .form(&[("data", query)])
            .send()
            .await?;

        if resp.status().as_u16() == 429 {
            return Err(ClientError::RateLimited);
        }
        if !resp.status().is_success() {
            return Err(ClientError::Status {
                status: resp.status().as_u16(),
                body: resp.text().await.unwrap_or_default().chars().take(200).collect(),
            });
        }

        let parsed: OverpassResponse = resp
            .json()
            .await
            .map_err(|e| ClientError::BadResponse(e.to_string()))?;
        Ok(parsed.elements)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_location_uses_own_coordinates() {
        let element: OsmElement = serde_json::from_value(serde_json::json!({
            "type": "node", "id": 42, "lat": 43.6, "lon": -79.4,
            "tags": {"name": "Acme"}
        }))
        .unwrap();
        assert_eq!(element.location(), (Some(43.6), Some(-79.4)));
        assert_eq!(element.source_id(), "node/42");
        assert_eq!(element.tag("name"), Some("Acme"));
    }

    #[test]
    fn way_location_uses_center() {
        let element: OsmElement = serde_json::from_value(serde_json::json!({
            "type": "way", "id": 7, "center": {"lat": 25.2, "lon": 55.3}
        }))
        .unwrap();
        assert_eq!(element.location(), (Some(25.2), Some(55.3)));
        assert_eq!(element.source_id(), "way/7");
        assert_eq!(element.tag("name"), None);
    }
}
