//! Gemini client implementation

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use mythos_core::{
    EmbeddingProvider, Error, GenerationConfig, GenerationResult, LLMProvider, Result, Vector,
};

use crate::config::{normalize_model_id, GeminiConfig};

/// Gemini client serving both embeddings and text generation
pub struct GeminiClient {
    config: GeminiConfig,
    client: Client,
}

#[derive(Debug, Serialize)]
pub(crate) struct Part<'a> {
    pub text: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<&'static str>,
    pub parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
pub(crate) struct EmbedRequest<'a> {
    pub model: String,
    pub content: Content<'a>,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embedding: Option<EmbeddingValues>,
}

#[derive(Deserialize)]
struct EmbeddingValues {
    #[serde(default)]
    values: Vec<f32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GenerationParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub stop_sequences: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GenerateRequest<'a> {
    pub contents: Vec<Content<'a>>,
    pub generation_config: GenerationParams,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    total_token_count: Option<u32>,
}

impl GeminiClient {
    /// Create a new Gemini client from configuration
    pub fn new(config: GeminiConfig) -> Result<Self> {
        config.validate()?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::Configuration(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    /// Create a new Gemini client from environment variables
    pub fn from_env() -> Result<Self> {
        let config = GeminiConfig::from_env()?;
        Self::new(config)
    }

    pub fn config(&self) -> &GeminiConfig {
        &self.config
    }

    fn endpoint(&self, model: &str, method: &str) -> String {
        format!(
            "{}/v1beta/models/{}:{}",
            self.config.api_url.trim_end_matches('/'),
            model,
            method
        )
    }

    /// POST a JSON body and return the raw response text of a successful call.
    ///
    /// Transport errors and non-success statuses are handed to `fail` so the
    /// caller decides which error kind they become.
    async fn post_json<B: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &B,
        fail: fn(String) -> Error,
    ) -> Result<String> {
        let response = self
            .client
            .post(url)
            .header("Content-Type", "application/json")
            .header("x-goog-api-key", &self.config.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| fail(format!("request failed: {}", e)))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| fail(format!("failed to read response body: {}", e)))?;

        if !status.is_success() {
            return Err(fail(format!(
                "Gemini API request failed with status {}: {}",
                status, text
            )));
        }

        Ok(text)
    }
}

/// Build the `embedContent` request body for one text
pub(crate) fn embed_request<'a>(model: &str, text: &'a str) -> EmbedRequest<'a> {
    EmbedRequest {
        model: format!("models/{}", model),
        content: Content {
            role: None,
            parts: vec![Part { text }],
        },
    }
}

/// Build the `generateContent` request body for one prompt
pub(crate) fn generate_request<'a>(
    prompt: &'a str,
    config: &GenerationConfig,
) -> GenerateRequest<'a> {
    GenerateRequest {
        contents: vec![Content {
            role: Some("user"),
            parts: vec![Part { text: prompt }],
        }],
        generation_config: GenerationParams {
            max_output_tokens: config.max_output_tokens,
            temperature: config.temperature,
            top_p: config.top_p,
            top_k: config.top_k,
            stop_sequences: config.stop_sequences.clone(),
        },
    }
}

/// Extract the embedding vector from an `embedContent` response body
pub(crate) fn parse_embedding(body: &str) -> Result<Vector> {
    let parsed: EmbedResponse = serde_json::from_str(body)
        .map_err(|e| Error::EmbeddingUnavailable(format!("malformed embedding response: {}", e)))?;

    let values = parsed
        .embedding
        .map(|e| e.values)
        .unwrap_or_default();

    if values.is_empty() {
        return Err(Error::EmbeddingUnavailable(
            "embedding response contained no values".to_string(),
        ));
    }

    if values.iter().any(|v| !v.is_finite()) {
        return Err(Error::EmbeddingUnavailable(
            "embedding response contained non-finite values".to_string(),
        ));
    }

    Ok(values)
}

/// Extract the answer text and token usage from a `generateContent` response body
pub(crate) fn parse_generation(body: &str) -> Result<(String, Option<u32>)> {
    let parsed: GenerateResponse = serde_json::from_str(body).map_err(|e| {
        Error::GenerationUnavailable(format!("malformed generation response: {}", e))
    })?;

    let text: String = parsed
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|p| p.text)
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(Error::GenerationUnavailable(
            "empty response from Gemini API".to_string(),
        ));
    }

    let tokens = parsed.usage_metadata.and_then(|u| u.total_token_count);
    Ok((text, tokens))
}

#[async_trait]
impl EmbeddingProvider for GeminiClient {
    async fn embed(&self, text: &str) -> Result<Vector> {
        let url = self.endpoint(&self.config.embed_model, "embedContent");
        let body = embed_request(&self.config.embed_model, text);

        tracing::debug!(model = %self.config.embed_model, chars = text.len(), "embedding text");

        let response = self
            .post_json(&url, &body, Error::EmbeddingUnavailable)
            .await?;
        parse_embedding(&response)
    }

    fn model_id(&self) -> &str {
        &self.config.embed_model
    }
}

#[async_trait]
impl LLMProvider for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<GenerationResult> {
        let config = GenerationConfig {
            model_id: self.config.generation_model.clone(),
            ..Default::default()
        };
        self.generate_with_config(prompt, &config).await
    }

    async fn generate_with_config(
        &self,
        prompt: &str,
        config: &GenerationConfig,
    ) -> Result<GenerationResult> {
        let model = normalize_model_id(&config.model_id);
        let url = self.endpoint(&model, "generateContent");
        let body = generate_request(prompt, config);

        tracing::debug!(model = %model, chars = prompt.len(), "generating answer");

        let response = self
            .post_json(&url, &body, Error::GenerationUnavailable)
            .await?;
        let (text, tokens_used) = parse_generation(&response)?;

        Ok(GenerationResult {
            text: text.trim().to_string(),
            model_id: model,
            tokens_used,
        })
    }

    fn model_id(&self) -> &str {
        &self.config.generation_model
    }
}
