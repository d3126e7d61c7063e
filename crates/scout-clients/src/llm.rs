//! LLM website-analysis client.
//!
//! Providers are tried in a fixed preference order (OpenRouter → Gemini
//! → Groq) based on which API keys are configured. The prompt is
//! deterministic and the response contract is a strict JSON object
//! `{status, website_url?, reason}`; anything malformed degrades to a
//! `BadResponse` that the verifier records as an `error` verdict.

use std::time::Duration;

use serde::Deserialize;
use serde_json::json;

use crate::error::ClientError;
use crate::search::SearchResult;

/// Which hosted API serves the completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmProvider {
    OpenRouter,
    Gemini,
    Groq,
}

impl LlmProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenRouter => "openrouter",
            Self::Gemini => "gemini",
            Self::Groq => "groq",
        }
    }
}

/// The LLM's structured answer.
#[derive(Debug, Clone, Deserialize)]
pub struct LlmAnalysis {
    pub status: String,
    #[serde(default)]
    pub website_url: Option<String>,
    #[serde(default)]
    pub reason: String,
}

#[derive(Debug, Clone)]
pub struct LlmClient {
    client: reqwest::Client,
    provider: LlmProvider,
    api_key: String,
}

const SYSTEM_PROMPT: &str = "You are an expert web researcher analyzing search engine results to \
determine if a specific business has its own official website.\n\n\
RULES:\n\
- A real website is a domain the business owns (e.g. joespizza.com, villagecobbler.ca)\n\
- Directory listings (Yelp, Facebook, YellowPages, Google Maps, TripAdvisor, etc.) are NOT real websites\n\
- Social media pages (instagram.com/business, facebook.com/business) are NOT real websites\n\
- If a search result URL contains the business name and is NOT a directory, it's likely their website\n\
- Chain/franchise businesses (McDonald's, Subway, etc.) should be marked 'has_website'\n\n\
Return ONLY a JSON object with:\n\
- status: 'has_website' if search results show they have an official site, \
'no_website' if results clearly show no official site exists, \
or 'not_sure' if evidence is insufficient\n\
- website_url: the official website URL if found, otherwise null\n\
- reason: brief explanation (1 sentence)";

impl LlmClient {
    /// Pick the first configured provider, if any.
    pub fn from_keys(
        openrouter: Option<&str>,
        gemini: Option<&str>,
        groq: Option<&str>,
    ) -> Option<Self> {
        let (provider, api_key) = if let Some(key) = openrouter {
            (LlmProvider::OpenRouter, key)
        } else if let Some(key) = gemini {
            (LlmProvider::Gemini, key)
        } else if let Some(key) = groq {
            (LlmProvider::Groq, key)
        } else {
            return None;
        };

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .ok()?;
        Some(Self {
            client,
            provider,
            api_key: api_key.to_string(),
        })
    }

    pub fn provider(&self) -> LlmProvider {
        self.provider
    }

    /// Format search results into the prompt's evidence block.
    fn format_results(results: &[SearchResult]) -> String {
        if results.is_empty() {
            return "No search results found.".to_string();
        }
        let mut lines = Vec::new();
        for (i, r) in results.iter().enumerate() {
            lines.push(format!("{}. [{}]({})", i + 1, r.title, r.url));
            if !r.snippet.is_empty() {
                let snippet: String = r.snippet.chars().take(200).collect();
                lines.push(format!("   {snippet}"));
            }
        }
        lines.join("\n")
    }

    fn user_prompt(
        business_name: &str,
        city: Option<&str>,
        category: Option<&str>,
        results: &[SearchResult],
    ) -> String {
        format!(
            "Business: {business_name}\nLocation: {}\nCategory: {}\n\nSearch Results:\n{}",
            city.unwrap_or("unknown location"),
            category.unwrap_or("business"),
            Self::format_results(results)
        )
    }

    async fn chat(&self, user_prompt: &str) -> Result<String, ClientError> {
        match self.provider {
            LlmProvider::OpenRouter | LlmProvider::Groq => {
                let (url, model) = match self.provider {
                    LlmProvider::OpenRouter => (
                        "https://openrouter.ai/api/v1/chat/completions",
                        "google/gemini-2.5-flash",
                    ),
                    _ => (
                        "https://api.groq.com/openai/v1/chat/completions",
                        "llama-3.3-70b-versatile",
                    ),
                };
                let payload = json!({
                    "model": model,
                    "response_format": {"type": "json_object"},
                    "messages": [
                        {"role": "system", "content": SYSTEM_PROMPT},
                        {"role": "user", "content": user_prompt},
                    ],
                    "temperature": 0.1,
                });
                let resp = self
                    .client
                    .post(url)
                    .bearer_auth(&self.api_key)
                    .json(&payload)
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
                let data: serde_json::Value = resp
                    .json()
                    .await
                    .map_err(|e| ClientError::BadResponse(e.to_string()))?;
                data["choices"][0]["message"]["content"]
                    .as_str()
                    .map(str::to_string)
                    .ok_or_else(|| ClientError::BadResponse("missing message content".into()))
            }
            LlmProvider::Gemini => {
                let url = format!(
                    "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-flash:generateContent?key={}",
                    self.api_key
                );
                let payload = json!({
                    "system_instruction": {"parts": [{"text": SYSTEM_PROMPT}]},
                    "contents": [{"parts": [{"text": user_prompt}]}],
                    "generationConfig": {
                        "temperature": 0.1,
                        "responseMimeType": "application/json",
                    },
                });
                let resp = self.client.post(&url).json(&payload).send().await?;
                if resp.status().as_u16() == 429 {
                    return Err(ClientError::RateLimited);
                }
                if !resp.status().is_success() {
                    return Err(ClientError::Status {
                        status: resp.status().as_u16(),
                        body: resp.text().await.unwrap_or_default().chars().take(200).collect(),
                    });
                }
                let data: serde_json::Value = resp
                    .json()
                    .await
                    .map_err(|e| ClientError::BadResponse(e.to_string()))?;
                data["candidates"][0]["content"]["parts"][0]["text"]
                    .as_str()
                    .map(str::to_string)
                    .ok_or_else(|| ClientError::BadResponse("missing candidate text".into()))
            }
        }
    }

    /// Ask the provider whether this business has an official website,
    /// given the search evidence.
    pub async fn analyze(
        &self,
        business_name: &str,
        city: Option<&str>,
        category: Option<&str>,
        results: &[SearchResult],
    ) -> Result<LlmAnalysis, ClientError> {
        let prompt = Self::user_prompt(business_name, city, category, results);
        let content = self.chat(&prompt).await?;
        parse_analysis(&content)
    }
}

/// Parse and sanitize the model's JSON answer. Unknown statuses collapse
/// to `not_sure` rather than being trusted.
fn parse_analysis(content: &str) -> Result<LlmAnalysis, ClientError> {
    let mut analysis: LlmAnalysis = serde_json::from_str(content.trim())
        .map_err(|e| ClientError::BadResponse(format!("LLM returned non-JSON: {e}")))?;
    if !matches!(
        analysis.status.as_str(),
        "has_website" | "no_website" | "not_sure"
    ) {
        analysis.status = "not_sure".to_string();
    }
    Ok(analysis)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_well_formed_answer() {
        let analysis = parse_analysis(
            r#"{"status": "has_website", "website_url": "https://acme.ca", "reason": "domain matches"}"#,
        )
        .unwrap();
        assert_eq!(analysis.status, "has_website");
        assert_eq!(analysis.website_url.as_deref(), Some("https://acme.ca"));
    }

    #[test]
    fn unknown_status_degrades_to_not_sure() {
        let analysis =
            parse_analysis(r#"{"status": "maybe?", "reason": "hmm"}"#).unwrap();
        assert_eq!(analysis.status, "not_sure");
    }

    #[test]
    fn non_json_is_bad_response() {
        let err = parse_analysis("I think they have a website.").unwrap_err();
        assert!(matches!(err, ClientError::BadResponse(_)));
    }

    #[test]
    fn provider_preference_order() {
        let client = LlmClient::from_keys(Some("a"), Some("b"), Some("c")).unwrap();
        assert_eq!(client.provider(), LlmProvider::OpenRouter);
        let client = LlmClient::from_keys(None, Some("b"), Some("c")).unwrap();
        assert_eq!(client.provider(), LlmProvider::Gemini);
        let client = LlmClient::from_keys(None, None, Some("c")).unwrap();
        assert_eq!(client.provider(), LlmProvider::Groq);
        assert!(LlmClient::from_keys(None, None, None).is_none());
    }

    #[test]
    fn prompt_includes_numbered_evidence() {
        let results = vec![SearchResult {
            title: "Acme".into(),
            url: "https://acme.ca/".into(),
            snippet: "plumbers".into(),
            engines: vec![],
        }];
        let prompt = LlmClient::user_prompt("Acme Plumbing", Some("Toronto"), None, &results);
        assert!(prompt.contains("1. [Acme](https://acme.ca/)"));
        assert!(prompt.contains("Location: Toronto"));
        assert!(prompt.contains("Category: business"));
    }
}
