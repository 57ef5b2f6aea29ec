//! Gemini text-generation provider
//!
//! Calls the `generateContent` REST endpoint with the system instruction in
//! `systemInstruction` and the user's prompt as the single user turn.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::ingest::{
    DEFAULT_TIMEOUT, GenerationRequest, GenerationResponse, IngestionPipeline, TextGenerator,
    UpstreamError,
};

pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Provider settings, usually read from the environment
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub timeout: Duration,
}

impl GeminiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Load from `GEMINI_API_KEY`, `GEMINI_MODEL`, `GEMINI_BASE_URL` and
    /// `ERDSYNC_TIMEOUT_SECS`
    pub fn from_env() -> Result<Self, UpstreamError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, UpstreamError> {
        let api_key = lookup("GEMINI_API_KEY")
            .filter(|key| !key.is_empty())
            .ok_or_else(|| UpstreamError::Config("GEMINI_API_KEY is not set".to_string()))?;

        let mut config = Self::new(api_key);
        if let Some(model) = lookup("GEMINI_MODEL") {
            config.model = model;
        }
        if let Some(base_url) = lookup("GEMINI_BASE_URL") {
            config.base_url = base_url.trim_end_matches('/').to_string();
        }
        if let Some(secs) = lookup("ERDSYNC_TIMEOUT_SECS") {
            let secs: u64 = secs.parse().map_err(|_| {
                UpstreamError::Config(format!("ERDSYNC_TIMEOUT_SECS is not a number: {secs}"))
            })?;
            config.timeout = Duration::from_secs(secs);
        }
        Ok(config)
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    system_instruction: Content<'a>,
    contents: [Content<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
    parts: [Part<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

impl<'a> GenerateContentRequest<'a> {
    fn new(request: &'a GenerationRequest) -> Self {
        Self {
            system_instruction: Content {
                role: None,
                parts: [Part {
                    text: &request.system_instruction,
                }],
            },
            contents: [Content {
                role: Some("user"),
                parts: [Part {
                    text: &request.prompt,
                }],
            }],
        }
    }
}

impl GenerateContentResponse {
    /// Concatenated text parts of the first candidate
    fn into_text(self) -> Result<String, UpstreamError> {
        let content = self
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .ok_or_else(|| UpstreamError::InvalidResponse("no candidates returned".to_string()))?;
        Ok(content.parts.into_iter().map(|p| p.text).collect())
    }
}

pub struct GeminiClient {
    client: Client,
    config: GeminiConfig,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> Result<Self, UpstreamError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| UpstreamError::Config(e.to_string()))?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &GeminiConfig {
        &self.config
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationResponse, UpstreamError> {
        let response = self
            .client
            .post(self.config.endpoint())
            .header("x-goog-api-key", &self.config.api_key)
            .json(&GenerateContentRequest::new(request))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    UpstreamError::Timeout(self.config.timeout)
                } else {
                    UpstreamError::Network(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(UpstreamError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| UpstreamError::InvalidResponse(e.to_string()))?;
        Ok(GenerationResponse {
            text: body.into_text()?,
        })
    }

    fn name(&self) -> &str {
        &self.config.model
    }
}

/// Stands in for the provider when it cannot be configured; every request
/// fails with the configuration error
pub struct Unconfigured {
    reason: String,
}

impl Unconfigured {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl TextGenerator for Unconfigured {
    async fn generate(
        &self,
        _request: &GenerationRequest,
    ) -> Result<GenerationResponse, UpstreamError> {
        Err(UpstreamError::Config(self.reason.clone()))
    }

    fn name(&self) -> &str {
        "unconfigured"
    }
}

/// Pipeline backed by Gemini when the environment configures it, otherwise
/// by [`Unconfigured`]. The pipeline deadline matches the client timeout.
pub fn pipeline_from_env() -> IngestionPipeline {
    pipeline_from_lookup(|key| std::env::var(key).ok())
}

fn pipeline_from_lookup(lookup: impl Fn(&str) -> Option<String>) -> IngestionPipeline {
    match GeminiConfig::from_lookup(lookup).and_then(GeminiClient::new) {
        Ok(client) => {
            let timeout = client.config().timeout;
            tracing::info!(model = %client.config().model, ?timeout, "text generation enabled");
            IngestionPipeline::new(Arc::new(client)).with_timeout(timeout)
        }
        Err(e) => {
            tracing::warn!(error = %e, "text generation disabled");
            IngestionPipeline::new(Arc::new(Unconfigured::new(e.to_string())))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn config_requires_api_key() {
        let result = GeminiConfig::from_lookup(lookup(&[]));
        assert!(matches!(result, Err(UpstreamError::Config(_))));

        let result = GeminiConfig::from_lookup(lookup(&[("GEMINI_API_KEY", "")]));
        assert!(matches!(result, Err(UpstreamError::Config(_))));
    }

    #[test]
    fn config_defaults() {
        let config = GeminiConfig::from_lookup(lookup(&[("GEMINI_API_KEY", "k")])).unwrap();
        assert_eq!(config.model, "gemini-2.0-flash");
        assert_eq!(config.timeout, Duration::from_secs(60));
        assert_eq!(
            config.endpoint(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash:generateContent"
        );
    }

    #[test]
    fn config_overrides() {
        let config = GeminiConfig::from_lookup(lookup(&[
            ("GEMINI_API_KEY", "k"),
            ("GEMINI_MODEL", "gemini-1.5-pro"),
            ("GEMINI_BASE_URL", "http://localhost:9999/v1beta/"),
            ("ERDSYNC_TIMEOUT_SECS", "5"),
        ]))
        .unwrap();
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(
            config.endpoint(),
            "http://localhost:9999/v1beta/models/gemini-1.5-pro:generateContent"
        );
    }

    #[test]
    fn config_rejects_bad_timeout() {
        let result = GeminiConfig::from_lookup(lookup(&[
            ("GEMINI_API_KEY", "k"),
            ("ERDSYNC_TIMEOUT_SECS", "soon"),
        ]));
        assert!(matches!(result, Err(UpstreamError::Config(_))));
    }

    #[test]
    fn pipeline_uses_configured_timeout() {
        let pipeline = pipeline_from_lookup(lookup(&[
            ("GEMINI_API_KEY", "k"),
            ("ERDSYNC_TIMEOUT_SECS", "120"),
        ]));
        assert_eq!(pipeline.timeout(), Duration::from_secs(120));
        assert_eq!(pipeline.generator_name(), "gemini-2.0-flash");
    }

    #[test]
    fn pipeline_without_key_is_unconfigured() {
        let pipeline = pipeline_from_lookup(lookup(&[("ERDSYNC_TIMEOUT_SECS", "120")]));
        assert_eq!(pipeline.timeout(), DEFAULT_TIMEOUT);
        assert_eq!(pipeline.generator_name(), "unconfigured");
    }

    #[test]
    fn request_body_shape() {
        let request = GenerationRequest {
            prompt: "a library".to_string(),
            system_instruction: "be terse".to_string(),
        };
        let body = serde_json::to_value(GenerateContentRequest::new(&request)).unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "systemInstruction": { "parts": [{ "text": "be terse" }] },
                "contents": [{ "role": "user", "parts": [{ "text": "a library" }] }]
            })
        );
    }

    #[test]
    fn response_text_joins_parts() {
        let body: GenerateContentResponse = serde_json::from_value(serde_json::json!({
            "candidates": [{
                "content": { "role": "model", "parts": [{ "text": "Sure! " }, { "text": "{}" }] }
            }]
        }))
        .unwrap();
        assert_eq!(body.into_text().unwrap(), "Sure! {}");
    }

    #[test]
    fn response_without_candidates_is_invalid() {
        let body: GenerateContentResponse = serde_json::from_value(serde_json::json!({})).unwrap();
        assert!(matches!(
            body.into_text(),
            Err(UpstreamError::InvalidResponse(_))
        ));
    }

    #[tokio::test]
    async fn unconfigured_generator_reports_config_error() {
        let generator = Unconfigured::new("GEMINI_API_KEY is not set");
        let request = GenerationRequest {
            prompt: "library".to_string(),
            system_instruction: String::new(),
        };
        match generator.generate(&request).await {
            Err(UpstreamError::Config(reason)) => assert_eq!(reason, "GEMINI_API_KEY is not set"),
            other => panic!("Expected Config error, got {other:?}"),
        }
    }
}
