//! LLM client trait and the Gemini implementation

use crate::config::LlmConfig;
use crate::error::{Error, Result};
use crate::llm::types::{GenerateRequest, GenerateResponse, LlmTool, UrlRetrieval};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// LLM client used by the processing pipeline
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Run a single-turn generation
    async fn generate(&self, request: GenerateRequest) -> Result<GenerateResponse>;

    /// Model identifier
    fn model(&self) -> &str;
}

/// Google Gemini client
pub struct GeminiClient {
    http: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl GeminiClient {
    const DEFAULT_BASE_URL: &'static str = "https://generativelanguage.googleapis.com";

    pub fn new(config: &LlmConfig, api_key: impl Into<String>) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            api_key: api_key.into(),
            base_url: config
                .base_url
                .clone()
                .unwrap_or_else(|| Self::DEFAULT_BASE_URL.to_string()),
            model: config.model.clone(),
        })
    }
}

// Gemini API types

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GeminiGenerationConfig>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(default)]
    role: String,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiPart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_k: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    #[serde(default)]
    content: GeminiContent,
    finish_reason: Option<String>,
    url_context_metadata: Option<GeminiUrlContextMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiUrlContextMetadata {
    #[serde(default)]
    url_metadata: Vec<GeminiUrlMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiUrlMetadata {
    #[serde(default)]
    retrieved_url: String,
    #[serde(default)]
    url_retrieval_status: String,
}

#[derive(Debug, Deserialize)]
struct GeminiError {
    error: GeminiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorDetail {
    message: String,
    status: Option<String>,
}

fn tool_spec(tool: LlmTool) -> serde_json::Value {
    match tool {
        LlmTool::UrlContext => serde_json::json!({ "url_context": {} }),
        LlmTool::GoogleSearch => serde_json::json!({ "google_search": {} }),
    }
}

/// Map a failed Gemini response to an error, recognising quota exhaustion
fn api_error(status: StatusCode, body: &str) -> Error {
    let parsed = serde_json::from_str::<GeminiError>(body).ok();

    let message = parsed
        .as_ref()
        .map(|e| e.error.message.clone())
        .unwrap_or_else(|| format!("({}) {}", status, body));

    let exhausted = status == StatusCode::TOO_MANY_REQUESTS
        || parsed
            .as_ref()
            .and_then(|e| e.error.status.as_deref())
            .map(|s| s == "RESOURCE_EXHAUSTED")
            .unwrap_or(false)
        || message.to_lowercase().contains("quota");

    if exhausted {
        Error::Quota(message)
    } else {
        Error::Llm(format!("Gemini API error: {}", message))
    }
}

#[async_trait]
impl LlmClient for GeminiClient {
    async fn generate(&self, request: GenerateRequest) -> Result<GenerateResponse> {
        let generation_config = Some(GeminiGenerationConfig {
            temperature: request.temperature,
            top_k: request.top_k,
            top_p: request.top_p,
            max_output_tokens: request.max_output_tokens,
        });

        let api_request = GeminiRequest {
            contents: vec![GeminiContent {
                role: "user".to_string(),
                parts: vec![GeminiPart {
                    text: Some(request.prompt),
                }],
            }],
            tools: request.tools.iter().copied().map(tool_spec).collect(),
            generation_config,
        };

        let url = format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            self.base_url.trim_end_matches('/'),
            self.model,
            self.api_key
        );

        let response = self
            .http
            .post(&url)
            .json(&api_request)
            .send()
            .await
            .map_err(|e| Error::Llm(format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::Llm(format!("Failed to read response: {}", e)))?;

        if !status.is_success() {
            return Err(api_error(status, &body));
        }

        let api_response: GeminiResponse = serde_json::from_str(&body)
            .map_err(|e| Error::Llm(format!("Failed to parse response: {}", e)))?;

        let candidate = api_response
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| Error::Llm("No candidates in response".to_string()))?;

        let text = candidate
            .content
            .parts
            .into_iter()
            .filter_map(|p| p.text)
            .collect::<Vec<_>>()
            .join("");

        let url_retrievals = candidate
            .url_context_metadata
            .map(|meta| {
                meta.url_metadata
                    .into_iter()
                    .map(|m| UrlRetrieval {
                        url: m.retrieved_url,
                        status: m.url_retrieval_status,
                    })
                    .collect()
            })
            .unwrap_or_default();

        tracing::debug!(
            model = %self.model,
            chars = text.len(),
            finish_reason = ?candidate.finish_reason,
            "Gemini generation complete"
        );

        Ok(GenerateResponse {
            text,
            finish_reason: candidate.finish_reason,
            url_retrievals,
        })
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{extract::Path, http::StatusCode, routing::post, Json, Router};

    async fn spawn_api(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn client_for(base_url: String) -> GeminiClient {
        let config = LlmConfig {
            base_url: Some(base_url),
            model: "gemini-test".to_string(),
            ..Default::default()
        };
        GeminiClient::new(&config, "test-key").unwrap()
    }

    #[tokio::test]
    async fn test_generate_with_url_context() {
        let app = Router::new().route(
            "/v1beta/models/:model",
            post(
                |Path(model): Path<String>, Json(body): Json<serde_json::Value>| async move {
                    assert_eq!(model, "gemini-test:generateContent");
                    assert_eq!(body["tools"][0], serde_json::json!({"url_context": {}}));
                    assert_eq!(body["generationConfig"]["maxOutputTokens"], 512);
                    Json(serde_json::json!({
                        "candidates": [{
                            "content": {"role": "model", "parts": [{"text": "Title: A"}, {"text": "\nbody"}]},
                            "finishReason": "STOP",
                            "urlContextMetadata": {"urlMetadata": [{
                                "retrievedUrl": "https://example.com",
                                "urlRetrievalStatus": "URL_RETRIEVAL_STATUS_SUCCESS"
                            }]}
                        }]
                    }))
                },
            ),
        );
        let client = client_for(spawn_api(app).await);

        let response = client
            .generate(
                GenerateRequest::new("Read https://example.com")
                    .with_tool(LlmTool::UrlContext)
                    .with_max_output_tokens(512),
            )
            .await
            .unwrap();

        assert_eq!(response.text, "Title: A\nbody");
        assert_eq!(response.finish_reason.as_deref(), Some("STOP"));
        assert_eq!(response.url_retrievals.len(), 1);
        assert!(response.url_retrievals[0].succeeded());
        assert_eq!(client.model(), "gemini-test");
    }

    #[tokio::test]
    async fn test_generate_quota_error() {
        let app = Router::new().route(
            "/v1beta/models/:model",
            post(|| async {
                (
                    StatusCode::TOO_MANY_REQUESTS,
                    Json(serde_json::json!({
                        "error": {"code": 429, "message": "Resource has been exhausted", "status": "RESOURCE_EXHAUSTED"}
                    })),
                )
            }),
        );
        let client = client_for(spawn_api(app).await);

        let err = client
            .generate(GenerateRequest::new("hi"))
            .await
            .unwrap_err();
        assert!(err.is_quota());
    }

    #[tokio::test]
    async fn test_generate_no_candidates() {
        let app = Router::new().route(
            "/v1beta/models/:model",
            post(|| async { Json(serde_json::json!({"candidates": []})) }),
        );
        let client = client_for(spawn_api(app).await);

        let err = client
            .generate(GenerateRequest::new("hi"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Llm(_)));
    }

    #[test]
    fn test_api_error_mapping() {
        let err = api_error(
            reqwest::StatusCode::BAD_REQUEST,
            r#"{"error": {"message": "API key not valid", "status": "INVALID_ARGUMENT"}}"#,
        );
        assert!(matches!(err, Error::Llm(ref m) if m.contains("API key not valid")));

        let err = api_error(
            reqwest::StatusCode::FORBIDDEN,
            r#"{"error": {"message": "You exceeded your current quota"}}"#,
        );
        assert!(err.is_quota());

        let err = api_error(reqwest::StatusCode::INTERNAL_SERVER_ERROR, "upstream down");
        assert!(matches!(err, Error::Llm(ref m) if m.contains("upstream down")));
    }
}
