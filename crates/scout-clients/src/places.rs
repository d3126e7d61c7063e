//! Places API clients: Google Places (New) Text Search and Foursquare
//! Places v3. Both normalize their top hit into [`PlaceResult`] so the
//! enrichment/verification workers share one match-validation path.

use std::time::Duration;

use serde_json::{json, Value};

use crate::error::ClientError;

const PLACES_TEXT_SEARCH_URL: &str = "https://places.googleapis.com/v1/places:searchText";
const FOURSQUARE_SEARCH_URL: &str = "https://api.foursquare.com/v3/places/search";

/// Field masks control Places pricing — Essentials-tier fields only.
const SEARCH_FIELD_MASK: &str = "places.id,places.displayName,places.formattedAddress,\
places.nationalPhoneNumber,places.internationalPhoneNumber,places.websiteUri,places.rating,\
places.userRatingCount,places.googleMapsUri,places.location";

/// A matched place, normalized across providers.
#[derive(Debug, Clone, Default)]
pub struct PlaceResult {
    pub provider_id: Option<String>,
    pub name: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub rating: Option<f64>,
    pub review_count: Option<i64>,
    pub maps_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct GooglePlacesClient {
    client: reqwest::Client,
    api_key: String,
    endpoint: String,
}

impl GooglePlacesClient {
    pub fn new(api_key: &str) -> Result<Self, ClientError> {
        Self::with_endpoint(api_key, PLACES_TEXT_SEARCH_URL)
    }

    pub fn with_endpoint(api_key: &str, endpoint: &str) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            api_key: api_key.to_string(),
            endpoint: endpoint.to_string(),
        })
    }

    /// Text-search for a place, with a 2 km location bias when
    /// coordinates are known. Returns the top result, if any.
    pub async fn text_search(
        &self,
        query: &str,
        lat: Option<f64>,
        lon: Option<f64>,
    ) -> Result<Option<PlaceResult>, ClientError> {
        let mut body = json!({
            "textQuery": query,
            "maxResultCount": 1,
        });
        if let (Some(lat), Some(lon)) = (lat, lon) {
            body["locationBias"] = json!({
                "circle": {
                    "center": { "latitude": lat, "longitude": lon },
                    "radius": 2000.0,
                }
            });
        }

        let resp = crate::retry::retry_send(|| {
            self.client
                .post(&self.endpoint)
                .header("X-Goog-Api-Key", &self.api_key)
                .header("X-Goog-FieldMask", SEARCH_FIELD_MASK)
                .json(&body)
                .send()
        })
        .await?;

        if resp.status().as_u16() == 429 {
            return Err(ClientError::RateLimited);
        }
        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body: String = resp.text().await.unwrap_or_default().chars().take(200).collect();
            tracing::warn!(status, %body, "Google Places API error");
            return Ok(None);
        }

        let data: Value = resp
            .json()
            .await
            .map_err(|e| ClientError::BadResponse(e.to_string()))?;
        Ok(data
            .get("places")
            .and_then(|p| p.as_array())
            .and_then(|a| a.first())
            .map(parse_google_place))
    }
}

fn parse_google_place(place: &Value) -> PlaceResult {
    let string = |v: &Value| v.as_str().map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
    PlaceResult {
        provider_id: place.get("id").and_then(|v| string(v)),
        name: place
            .get("displayName")
            .and_then(|d| d.get("text"))
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_string(),
        address: place.get("formattedAddress").and_then(|v| string(v)),
        phone: place
            .get("nationalPhoneNumber")
            .and_then(|v| string(v))
            .or_else(|| place.get("internationalPhoneNumber").and_then(|v| string(v))),
        website: place.get("websiteUri").and_then(|v| string(v)),
        rating: place.get("rating").and_then(Value::as_f64),
        review_count: place.get("userRatingCount").and_then(Value::as_i64),
        maps_url: place.get("googleMapsUri").and_then(|v| string(v)),
    }
}

#[derive(Debug, Clone)]
pub struct FoursquareClient {
    client: reqwest::Client,
    api_key: String,
    endpoint: String,
}

impl FoursquareClient {
    pub fn new(api_key: &str) -> Result<Self, ClientError> {
        Self::with_endpoint(api_key, FOURSQUARE_SEARCH_URL)
    }

    pub fn with_endpoint(api_key: &str, endpoint: &str) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            api_key: api_key.to_string(),
            endpoint: endpoint.to_string(),
        })
    }

    /// Search for a place near optional coordinates. Returns the top
    /// result, if any.
    pub async fn search(
        &self,
        query: &str,
        lat: Option<f64>,
        lon: Option<f64>,
    ) -> Result<Option<PlaceResult>, ClientError> {
        let build_request = || {
            let mut request = self
                .client
                .get(&self.endpoint)
                .header(reqwest::header::AUTHORIZATION, &self.api_key)
                .header(reqwest::header::ACCEPT, "application/json")
                .query(&[
                    ("query", query),
                    ("limit", "1"),
                    ("fields", "fsq_id,name,location,tel,website,categories,rating"),
                ]);
            if let (Some(lat), Some(lon)) = (lat, lon) {
                request =
                    request.query(&[("ll", format!("{lat},{lon}")), ("radius", "2000".into())]);
            }
            request.send()
        };

        let resp = crate::retry::retry_send(build_request).await?;
        if resp.status().as_u16() == 429 {
            return Err(ClientError::RateLimited);
        }
        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body: String = resp.text().await.unwrap_or_default().chars().take(200).collect();
            tracing::warn!(status, %body, "Foursquare API error");
            return Ok(None);
        }

        let data: Value = resp
            .json()
            .await
            .map_err(|e| ClientError::BadResponse(e.to_string()))?;
        Ok(data
            .get("results")
            .and_then(|r| r.as_array())
            .and_then(|a| a.first())
            .map(parse_foursquare_place))
    }
}

fn parse_foursquare_place(place: &Value) -> PlaceResult {
    let string = |v: &Value| v.as_str().map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
    PlaceResult {
        provider_id: place.get("fsq_id").and_then(|v| string(v)),
        name: place.get("name").and_then(Value::as_str).unwrap_or("").to_string(),
        address: place
            .get("location")
            .and_then(|l| l.get("formatted_address"))
            .and_then(|v| string(v)),
        phone: place.get("tel").and_then(|v| string(v)),
        website: place.get("website").and_then(|v| string(v)),
        rating: place.get("rating").and_then(Value::as_f64),
        review_count: None,
        maps_url: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_google_place_fields() {
        let place = json!({
            "id": "abc",
            "displayName": {"text": "Acme Plumbing"},
            "formattedAddress": "1 Main St, Toronto",
            "nationalPhoneNumber": "(416) 555-0100",
            "websiteUri": "https://acme.ca/ ",
            "rating": 4.5,
            "userRatingCount": 32
        });
        let parsed = parse_google_place(&place);
        assert_eq!(parsed.name, "Acme Plumbing");
        assert_eq!(parsed.phone.as_deref(), Some("(416) 555-0100"));
        assert_eq!(parsed.website.as_deref(), Some("https://acme.ca/"));
        assert_eq!(parsed.review_count, Some(32));
    }

    #[test]
    fn parses_foursquare_place_fields() {
        let place = json!({
            "fsq_id": "xyz",
            "name": "Al Zowar",
            "tel": "+971 4 555 0100",
            "website": "",
            "location": {"formatted_address": "Deira, Dubai"}
        });
        let parsed = parse_foursquare_place(&place);
        assert_eq!(parsed.name, "Al Zowar");
        assert_eq!(parsed.website, None, "empty strings collapse to None");
        assert_eq!(parsed.address.as_deref(), Some("Deira, Dubai"));
    }

    #[tokio::test]
    async fn google_places_maps_top_hit() {
        use wiremock::matchers::method;
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "places": [{"displayName": {"text": "Acme"}, "websiteUri": "https://acme.ca"}]
            })))
            .mount(&server)
            .await;

        let client = GooglePlacesClient::with_endpoint("key", &server.uri()).unwrap();
        let place = client.text_search("acme", None, None).await.unwrap().unwrap();
        assert_eq!(place.website.as_deref(), Some("https://acme.ca"));
    }

    #[tokio::test]
    async fn foursquare_429_is_rate_limited() {
        use wiremock::matchers::method;
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let client = FoursquareClient::with_endpoint("key", &server.uri()).unwrap();
        let err = client.search("acme", None, None).await.unwrap_err();
        assert!(err.is_rate_limited());
    }
}
