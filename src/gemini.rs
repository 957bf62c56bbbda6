//! Gemini generation adapter
//!
//! Single-attempt `complete(prompt)` over the Gemini REST API.
//! Uses a long-lived reqwest::Client for connection pooling.

use crate::error::GenerationError;
use crate::models::GenerationOutcome;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{error, info, warn};

pub const DEFAULT_MODEL: &str = "gemini-1.5-flash-latest";
const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";
const API_KEY_HEADER: &str = "x-goog-api-key";

const SAFETY_CATEGORIES: &[&str] = &[
    "HARM_CATEGORY_HARASSMENT",
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
    "HARM_CATEGORY_DANGEROUS_CONTENT",
];

/// Generation adapter: one prompt in, one outcome out.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn complete(&self, prompt: &str) -> GenerationOutcome;
}

/// Reusable Gemini client (connection-pooled)
pub struct GeminiClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    timeout: Duration,
}

impl GeminiClient {
    pub fn new(api_key: String, model: String, timeout: Duration) -> Result<Self, GenerationError> {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(8)
            .build()?;

        Ok(Self {
            client,
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            model,
            timeout,
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Call the API once, bounded by the configured timeout.
    pub async fn generate(&self, prompt: &str) -> Result<GenerationOutcome, GenerationError> {
        if self.api_key.is_empty() {
            return Err(GenerationError::MissingApiKey);
        }

        match tokio::time::timeout(self.timeout, self.send(prompt)).await {
            Ok(result) => result,
            Err(_) => Err(GenerationError::Timeout(self.timeout.as_secs())),
        }
    }

    async fn send(&self, prompt: &str) -> Result<GenerationOutcome, GenerationError> {
        let url = format!("{}/{}:generateContent", self.base_url, self.model);

        let request = GeminiRequest::new(prompt);

        info!(model = %self.model, "Calling Gemini API");

        let response = self
            .client
            .post(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("Gemini API error response: {}", body);
            return Err(GenerationError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let gemini_response: GeminiResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::Parse(e.without_url().to_string()))?;

        Ok(outcome_from_response(gemini_response))
    }
}

#[async_trait]
impl Generator for GeminiClient {
    async fn complete(&self, prompt: &str) -> GenerationOutcome {
        match self.generate(prompt).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("Gemini call failed: {}", e);
                GenerationOutcome::Failed(e.to_string())
            }
        }
    }
}

/// Map a parsed response onto the outcome taxonomy.
fn outcome_from_response(response: GeminiResponse) -> GenerationOutcome {
    let Some(candidate) = response.candidates.into_iter().next() else {
        return match response.prompt_feedback.and_then(|f| f.block_reason) {
            Some(reason) => {
                warn!("Gemini blocked the prompt: {}", reason);
                GenerationOutcome::Blocked(reason)
            }
            None => GenerationOutcome::Empty,
        };
    };

    match candidate.finish_reason.as_deref() {
        Some("STOP") | None => {
            let text: String = candidate
                .content
                .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
                .unwrap_or_default();

            if text.trim().is_empty() {
                GenerationOutcome::Empty
            } else {
                info!("Gemini response received ({} chars)", text.len());
                GenerationOutcome::Delivered(text)
            }
        }
        Some(reason) => {
            let blocked: Vec<String> = candidate
                .safety_ratings
                .iter()
                .filter(|r| r.blocked)
                .map(|r| {
                    format!(
                        "{}: {}",
                        r.category.trim_start_matches("HARM_CATEGORY_"),
                        r.probability.as_deref().unwrap_or("UNKNOWN")
                    )
                })
                .collect();

            let detail = if reason == "SAFETY" && !blocked.is_empty() {
                blocked.join(", ")
            } else {
                reason.to_string()
            };

            warn!("Gemini did not produce content. Reason: {}", detail);
            GenerationOutcome::Blocked(detail)
        }
    }
}

#[derive(Debug, Serialize)]
struct GeminiRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
    safety_settings: Vec<SafetySetting>,
}

impl GeminiRequest {
    fn new(prompt: &str) -> Self {
        Self {
            contents: vec![Content {
                parts: vec![Part {
                    text: Some(prompt.to_string()),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: 0.7,
                top_p: 1.0,
                top_k: 1,
                max_output_tokens: 2048,
            },
            safety_settings: SAFETY_CATEGORIES
                .iter()
                .map(|category| SafetySetting {
                    category: *category,
                    threshold: "BLOCK_ONLY_HIGH",
                })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
    top_p: f32,
    top_k: i32,
    max_output_tokens: i32,
}

#[derive(Debug, Serialize)]
struct SafetySetting {
    category: &'static str,
    threshold: &'static str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
    finish_reason: Option<String>,
    #[serde(default)]
    safety_ratings: Vec<SafetyRating>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SafetyRating {
    category: String,
    probability: Option<String>,
    #[serde(default)]
    blocked: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: serde_json::Value) -> GenerationOutcome {
        outcome_from_response(serde_json::from_value(json).unwrap())
    }

    #[test]
    fn test_request_serialization() {
        let json = serde_json::to_string(&GeminiRequest::new("¿Qué tarjetas ofrecen?")).unwrap();
        assert!(json.contains("¿Qué tarjetas ofrecen?"));
        assert!(json.contains("\"max_output_tokens\":2048"));
        assert!(json.contains("HARM_CATEGORY_HATE_SPEECH"));
        assert!(json.contains("BLOCK_ONLY_HIGH"));
    }

    #[test]
    fn test_delivered_joins_parts() {
        let outcome = parse(serde_json::json!({
            "candidates": [{
                "content": {"parts": [{"text": "Hola "}, {"text": "Ana"}]},
                "finishReason": "STOP"
            }]
        }));
        assert_eq!(outcome, GenerationOutcome::Delivered("Hola Ana".to_string()));
    }

    #[test]
    fn test_safety_block_lists_categories() {
        let outcome = parse(serde_json::json!({
            "candidates": [{
                "finishReason": "SAFETY",
                "safetyRatings": [
                    {"category": "HARM_CATEGORY_HATE_SPEECH", "probability": "HIGH", "blocked": true},
                    {"category": "HARM_CATEGORY_HARASSMENT", "probability": "LOW"}
                ]
            }]
        }));
        assert_eq!(outcome, GenerationOutcome::Blocked("HATE_SPEECH: HIGH".to_string()));
    }

    #[test]
    fn test_other_finish_reason_is_blocked() {
        let outcome = parse(serde_json::json!({
            "candidates": [{"finishReason": "RECITATION", "content": {"parts": []}}]
        }));
        assert_eq!(outcome, GenerationOutcome::Blocked("RECITATION".to_string()));
    }

    #[test]
    fn test_empty_and_prompt_block() {
        assert_eq!(
            parse(serde_json::json!({"candidates": []})),
            GenerationOutcome::Empty
        );
        assert_eq!(
            parse(serde_json::json!({
                "candidates": [{"content": {"parts": [{"text": "  "}]}, "finishReason": "STOP"}]
            })),
            GenerationOutcome::Empty
        );
        assert_eq!(
            parse(serde_json::json!({"promptFeedback": {"blockReason": "SAFETY"}})),
            GenerationOutcome::Blocked("SAFETY".to_string())
        );
    }

    #[tokio::test]
    async fn test_transport_failure_does_not_leak_key() {
        let client = GeminiClient::new(
            "SECRETKEY123".to_string(),
            DEFAULT_MODEL.to_string(),
            Duration::from_secs(5),
        )
        .unwrap()
        .with_base_url("http://127.0.0.1:1");

        match client.complete("hola").await {
            GenerationOutcome::Failed(msg) => assert!(!msg.contains("SECRETKEY123"), "{}", msg),
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_timeout_is_failure() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        // accept and hold the connection without ever answering
        let server = tokio::spawn(async move {
            let (_socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(30)).await;
        });

        let client = GeminiClient::new(
            "k".to_string(),
            DEFAULT_MODEL.to_string(),
            Duration::from_secs(1),
        )
        .unwrap()
        .with_base_url(format!("http://{}", addr));

        assert_eq!(
            client.complete("hola").await,
            GenerationOutcome::Failed("Generation timed out after 1s".to_string())
        );
        server.abort();
    }

    #[tokio::test]
    async fn test_missing_api_key_fails() {
        let client = GeminiClient::new(
            String::new(),
            DEFAULT_MODEL.to_string(),
            Duration::from_secs(1),
        )
        .unwrap();

        match client.complete("hola").await {
            GenerationOutcome::Failed(msg) => assert!(msg.to_lowercase().contains("api key")),
            other => panic!("unexpected outcome: {:?}", other),
        }
    }
}
