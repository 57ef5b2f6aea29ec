//! Natural-language ingestion
//!
//! Sends a prompt to a [`TextGenerator`], pulls the JSON region out of the
//! free-text reply and parses it into a [`DocumentShape`]. The pipeline never
//! touches the live graph; callers apply the result themselves, so manual
//! edits keep flowing while a request is outstanding.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::parser::{self, DocumentShape, SchemaError};
use crate::prompt;

/// Default upper bound on one generation round trip
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Request sent to the text-generation collaborator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    pub prompt: String,
    pub system_instruction: String,
}

/// Raw reply of the text-generation collaborator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationResponse {
    pub text: String,
}

/// Failures of the collaborator call itself
#[derive(Error, Debug)]
pub enum UpstreamError {
    #[error("network error: {0}")]
    Network(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("configuration error: {0}")]
    Config(String),
}

/// Everything that can go wrong turning a prompt into a document
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("prompt is empty")]
    EmptyPrompt,

    #[error("a generation request is already in flight")]
    Busy,

    #[error("no JSON object found in the generated text")]
    Extraction,

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error("upstream error: {0}")]
    Upstream(#[from] UpstreamError),

    #[error("template error: {0}")]
    Template(#[from] askama::Error),
}

/// A service that completes a prompt under a system instruction
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, request: &GenerationRequest)
    -> Result<GenerationResponse, UpstreamError>;

    /// Identifier for logs (e.g., the model name)
    fn name(&self) -> &str;
}

/// The slice from the first `{` to the last `}` of `text`.
///
/// Greedy, not brace-balanced: stray braces in trailing prose are swallowed
/// and left for the parser to reject.
pub fn extract_json_region(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

/// Prompt-to-document pipeline with a single in-flight request
pub struct IngestionPipeline {
    generator: Arc<dyn TextGenerator>,
    timeout: Duration,
    in_flight: AtomicBool,
}

/// Clears the in-flight flag however the request ends
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl IngestionPipeline {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self {
            generator,
            timeout: DEFAULT_TIMEOUT,
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Deadline applied to each generation request
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Provider behind this pipeline
    pub fn generator_name(&self) -> &str {
        self.generator.name()
    }

    /// Whether a request is outstanding (input should be disabled)
    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Ask the generator for a schema describing `prompt`.
    ///
    /// Fails with [`IngestError::Busy`] while another request is outstanding.
    pub async fn generate_from_prompt(&self, prompt: &str) -> Result<DocumentShape, IngestError> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(IngestError::EmptyPrompt);
        }
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(IngestError::Busy);
        }
        let _guard = InFlight(&self.in_flight);

        let request = GenerationRequest {
            prompt: prompt.to_string(),
            system_instruction: prompt::system_instruction()?,
        };

        tracing::info!(generator = self.generator.name(), "requesting schema generation");
        let response = tokio::time::timeout(self.timeout, self.generator.generate(&request))
            .await
            .map_err(|_| UpstreamError::Timeout(self.timeout))??;

        let region = extract_json_region(&response.text).ok_or(IngestError::Extraction)?;
        let shape = parser::parse(region)?;
        tracing::debug!(shape = shape.kind(), "generated document parsed");
        Ok(shape)
    }
}
