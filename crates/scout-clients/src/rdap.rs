//! RDAP registration-data client.
//!
//! `GET {base_url}/{domain}` and parse JSON on 2xx. Non-2xx statuses are
//! recorded, never treated as registration signals by themselves — many
//! ccTLD registries run no public RDAP at all, so a 404 is weak evidence.

use serde_json::Value;

use crate::error::ClientError;

/// Outcome of one RDAP fetch.
#[derive(Debug, Clone, Default)]
pub struct RdapResult {
    /// Parsed JSON body, present only on a 2xx JSON response.
    pub data: Option<Value>,
    /// HTTP status code, `None` when the request itself failed.
    pub status: Option<u16>,
}

#[derive(Debug, Clone)]
pub struct RdapClient {
    client: reqwest::Client,
    base_url: String,
}

impl RdapClient {
    pub fn new(base_url: &str, user_agent: &str, timeout_secs: u64) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Fetch RDAP data for a domain. Transport failures yield
    /// `RdapResult::default()` — the classifier records the absence and
    /// moves on.
    pub async fn fetch(&self, domain: &str) -> RdapResult {
        let url = format!("{}/{domain}", self.base_url);
        let resp = match self.client.get(&url).send().await {
            Ok(resp) => resp,
            Err(e) => {
                tracing::debug!(domain, error = %e, "RDAP request failed");
                return RdapResult::default();
            }
        };

        let status = resp.status().as_u16();
        if !resp.status().is_success() {
            return RdapResult {
                data: None,
                status: Some(status),
            };
        }

        match resp.json::<Value>().await {
            Ok(data) => RdapResult {
                data: Some(data),
                status: Some(status),
            },
            Err(e) => {
                tracing::debug!(domain, error = %e, "RDAP body was not JSON");
                RdapResult {
                    data: None,
                    status: Some(status),
                }
            }
        }
    }
}

/// Pull the registrar name out of an RDAP document: the `fn` field of the
/// first vcard on an entity whose roles include `registrar`.
pub fn extract_registrar(data: Option<&Value>) -> Option<String> {
    let entities = data?.get("entities")?.as_array()?;
    for entity in entities {
        let roles = entity.get("roles").and_then(Value::as_array);
        let is_registrar = roles
            .map(|r| r.iter().any(|v| v.as_str() == Some("registrar")))
            .unwrap_or(false);
        if !is_registrar {
            continue;
        }
        let vcard = entity.get("vcardArray").and_then(Value::as_array)?;
        // vcardArray = ["vcard", [["fn", {}, "text", "Registrar Inc"], …]]
        let items = vcard.get(1).and_then(Value::as_array)?;
        for item in items {
            let item = item.as_array()?;
            if item.first().and_then(Value::as_str) == Some("fn") {
                if let Some(name) = item.get(3).and_then(Value::as_str) {
                    return Some(name.to_string());
                }
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn extracts_registrar_from_vcard() {
        let data = json!({
            "entities": [
                { "roles": ["registrant"], "vcardArray": ["vcard", [["fn", {}, "text", "Owner"]]] },
                { "roles": ["registrar"], "vcardArray": ["vcard", [
                    ["version", {}, "text", "4.0"],
                    ["fn", {}, "text", "Tucows Domains Inc."]
                ]] }
            ]
        });
        assert_eq!(
            extract_registrar(Some(&data)).as_deref(),
            Some("Tucows Domains Inc.")
        );
    }

    #[test]
    fn missing_registrar_entity_yields_none() {
        let data = json!({ "entities": [ { "roles": ["registrant"] } ] });
        assert_eq!(extract_registrar(Some(&data)), None);
        assert_eq!(extract_registrar(None), None);
        assert_eq!(extract_registrar(Some(&json!({}))), None);
    }

    #[tokio::test]
    async fn records_status_without_treating_404_as_signal() {
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/example.ae"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = RdapClient::new(&server.uri(), "test-agent", 5).unwrap();
        let result = client.fetch("example.ae").await;
        assert_eq!(result.status, Some(404));
        assert!(result.data.is_none());
    }

    #[tokio::test]
    async fn parses_json_on_success() {
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/example.com"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"handle": "X"})))
            .mount(&server)
            .await;

        let client = RdapClient::new(&server.uri(), "test-agent", 5).unwrap();
        let result = client.fetch("example.com").await;
        assert_eq!(result.status, Some(200));
        assert_eq!(result.data.unwrap()["handle"], "X");
    }
}
