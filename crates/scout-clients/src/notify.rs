//! Best-effort push notifications via ntfy.sh.
//!
//! Unconfigured or failing notifications return `false`; they never fail
//! the caller.

use std::time::Duration;

use serde_json::Value;

#[derive(Debug, Clone)]
pub struct Notifier {
    client: reqwest::Client,
    url: Option<String>,
}

impl Notifier {
    /// `topic == None` produces a disabled notifier.
    pub fn new(server: &str, topic: Option<&str>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();
        Self {
            client,
            url: topic.map(|t| format!("{}/{t}", server.trim_end_matches('/'))),
        }
    }

    /// Send one notification. Returns whether it was delivered.
    pub async fn send(&self, title: &str, message: &str, priority: &str, tags: &[&str]) -> bool {
        let Some(url) = &self.url else {
            return false;
        };

        let mut request = self
            .client
            .post(url)
            .header("Title", title)
            .header("Priority", priority)
            .body(message.to_string());
        if !tags.is_empty() {
            request = request.header("Tags", tags.join(","));
        }

        match request.send().await {
            Ok(resp) if resp.status().is_success() => {
                tracing::debug!(title, "notification sent");
                true
            }
            Ok(resp) => {
                tracing::warn!(status = resp.status().as_u16(), "ntfy rejected notification");
                false
            }
            Err(e) => {
                tracing::warn!(error = %e, "ntfy notification failed");
                false
            }
        }
    }

    /// Pipeline-cycle summary notification.
    pub async fn pipeline_complete(&self, result: &Value) -> bool {
        let imported = result.get("imported").and_then(Value::as_i64).unwrap_or(0);
        let scored = result.get("business_scored").and_then(Value::as_i64).unwrap_or(0);
        let websites = result.get("websites_found").and_then(Value::as_i64).unwrap_or(0);
        let export = result
            .get("business_export_path")
            .and_then(Value::as_str)
            .unwrap_or("none");

        let message = format!(
            "Imported: {imported}, Scored: {scored}\nWebsites found: {websites}\nExport: {export}"
        );
        self.send(
            "Pipeline Complete",
            &message,
            "default",
            &["white_check_mark", "chart_with_upwards_trend"],
        )
        .await
    }

    /// Error notification for a failed job.
    pub async fn job_error(&self, job_name: &str, error: &str) -> bool {
        let truncated: String = error.chars().take(500).collect();
        self.send(
            &format!("Pipeline Error: {job_name}"),
            &truncated,
            "high",
            &["warning", "x"],
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn disabled_notifier_returns_false() {
        let notifier = Notifier::new("https://ntfy.sh", None);
        assert!(!notifier.send("t", "m", "default", &[]).await);
        assert!(!notifier.pipeline_complete(&serde_json::json!({})).await);
    }

    #[tokio::test]
    async fn sends_headers_and_body() {
        use wiremock::matchers::{header, method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/leads"))
            .and(header("Title", "Pipeline Error: sync"))
            .and(header("Priority", "high"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let notifier = Notifier::new(&server.uri(), Some("leads"));
        assert!(notifier.job_error("sync", "boom").await);
    }
}
