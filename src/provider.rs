//! Generation Capabilities
//!
//! Uniform async interfaces for the completion, media and summarization backends, plus an
//! OpenAI-compatible client implementing the first two. Chain workers and the aggregator only
//! see the traits; the concrete client is chosen by the binary.

use crate::chain::history::{HistoryRecord, Role};
use crate::error::ServiceError;
use crate::http::{build_http_client, check_status, map_http_error};
use crate::record::Media;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, warn};

/// Conversational completion backend
#[async_trait]
pub trait GenerationService: Send + Sync {
    /// Complete `prompt` given the chain's transcript so far.
    async fn complete(
        &self,
        history: &[HistoryRecord],
        prompt: &str,
    ) -> Result<String, ServiceError>;
}

/// Image generation backend
#[async_trait]
pub trait MediaService: Send + Sync {
    async fn generate(&self, prompt: &str, size: &MediaSize) -> Result<Media, ServiceError>;
}

/// Produces a short title for a forecast
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, text: &str) -> Result<String, ServiceError>;
}

/// Image dimensions, written `WIDTHxHEIGHT`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MediaSize {
    pub width: u32,
    pub height: u32,
}

impl Default for MediaSize {
    fn default() -> Self {
        Self {
            width: 512,
            height: 512,
        }
    }
}

impl fmt::Display for MediaSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl FromStr for MediaSize {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (width, height) = s
            .split_once('x')
            .ok_or_else(|| format!("Invalid media size '{}' (expected WIDTHxHEIGHT)", s))?;
        let parse = |v: &str| {
            v.trim()
                .parse::<u32>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| format!("Invalid media size '{}' (expected WIDTHxHEIGHT)", s))
        };
        Ok(Self {
            width: parse(width)?,
            height: parse(height)?,
        })
    }
}

impl TryFrom<String> for MediaSize {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<MediaSize> for String {
    fn from(size: MediaSize) -> Self {
        size.to_string()
    }
}

// OpenAI-compatible request/response structures
#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<OpenAIMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Serialize)]
struct OpenAIMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Serialize)]
struct ImageRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    n: u32,
    size: String,
    response_format: &'static str,
}

#[derive(Deserialize)]
struct ImageResponse {
    data: Vec<ImageData>,
}

#[derive(Deserialize)]
struct ImageData {
    url: Option<String>,
}

fn role_to_string(role: Role) -> &'static str {
    match role {
        Role::User => "user",
        Role::System => "system",
    }
}

/// OpenAI-compatible client for chat completions and image generation
pub struct OpenAiClient {
    client: Client,
    model: String,
    api_key: String,
    base_url: String,
    max_tokens: Option<u32>,
    temperature: Option<f32>,
}

impl OpenAiClient {
    pub const DEFAULT_BASE_URL: &'static str = "https://api.openai.com/v1";

    pub fn new(
        model: impl Into<String>,
        api_key: impl Into<String>,
        base_url: Option<String>,
    ) -> Result<Self, ServiceError> {
        Ok(Self {
            client: build_http_client(ServiceError::GenerationFailed)?,
            model: model.into(),
            api_key: api_key.into(),
            base_url: base_url.unwrap_or_else(|| Self::DEFAULT_BASE_URL.to_string()),
            max_tokens: None,
            temperature: None,
        })
    }

    /// Cap the length of every completion.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn model_name(&self) -> &str {
        &self.model
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>, ServiceError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| map_http_error(e, ServiceError::MediaGenerationFailed))?;
        let response = check_status(response, ServiceError::MediaGenerationFailed).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| map_http_error(e, ServiceError::MediaGenerationFailed))?;
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl GenerationService for OpenAiClient {
    async fn complete(
        &self,
        history: &[HistoryRecord],
        prompt: &str,
    ) -> Result<String, ServiceError> {
        let mut messages: Vec<OpenAIMessage<'_>> = history
            .iter()
            .map(|record| OpenAIMessage {
                role: role_to_string(record.role),
                content: &record.content,
            })
            .collect();
        messages.push(OpenAIMessage {
            role: "user",
            content: prompt,
        });

        let request = ChatCompletionRequest {
            model: &self.model,
            messages,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };

        let url = format!("{}/chat/completions", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| map_http_error(e, ServiceError::GenerationFailed))?;
        let response = check_status(response, ServiceError::GenerationFailed).await?;

        let completion: ChatCompletionResponse = response.json().await.map_err(|e| {
            ServiceError::GenerationFailed(format!("Failed to parse response: {}", e))
        })?;

        let content = completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| ServiceError::GenerationFailed("No content in response".to_string()))?;

        debug!(model = %self.model, chars = content.len(), "Completion received");
        Ok(content)
    }
}

#[async_trait]
impl MediaService for OpenAiClient {
    async fn generate(&self, prompt: &str, size: &MediaSize) -> Result<Media, ServiceError> {
        let request = ImageRequest {
            model: &self.model,
            prompt,
            n: 1,
            size: size.to_string(),
            response_format: "url",
        };

        let url = format!("{}/images/generations", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| map_http_error(e, ServiceError::MediaGenerationFailed))?;
        let response = check_status(response, ServiceError::MediaGenerationFailed).await?;

        let images: ImageResponse = response.json().await.map_err(|e| {
            ServiceError::MediaGenerationFailed(format!("Failed to parse response: {}", e))
        })?;
        let image_url = images
            .data
            .into_iter()
            .find_map(|image| image.url)
            .ok_or_else(|| {
                ServiceError::MediaGenerationFailed("No image in response".to_string())
            })?;

        // Store the bytes; the URL is only kept when the download fails.
        match self.download(&image_url).await {
            Ok(bytes) => Ok(Media::Bytes(bytes)),
            Err(err) => {
                warn!(error = %err, "Failed to download generated image, keeping its URL");
                Ok(Media::Url(image_url))
            }
        }
    }
}

/// Summarizer that asks a completion backend for a bounded-length summary.
pub struct CompletionSummarizer {
    generation: Arc<dyn GenerationService>,
    token_budget: u32,
}

impl CompletionSummarizer {
    pub fn new(generation: Arc<dyn GenerationService>, token_budget: u32) -> Self {
        Self {
            generation,
            token_budget,
        }
    }
}

#[async_trait]
impl Summarizer for CompletionSummarizer {
    async fn summarize(&self, text: &str) -> Result<String, ServiceError> {
        if text.trim().is_empty() || self.token_budget == 0 {
            return Ok(String::new());
        }

        let instruction = [HistoryRecord {
            role: Role::System,
            content: format!(
                "You analyze texts and provide summaries of up to {} tokens.",
                self.token_budget
            ),
        }];
        let prompt = format!("Generate a summary for the provided text.\n\n{}", text);
        let summary = self.generation.complete(&instruction, &prompt).await?;
        Ok(clean_title(&summary))
    }
}

/// Trim whitespace and the quotes models like to wrap titles in.
fn clean_title(raw: &str) -> String {
    raw.trim()
        .trim_matches(|c| c == '"' || c == '\'')
        .trim()
        .to_string()
}
