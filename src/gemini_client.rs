// src/gemini_client.rs
use crate::config::Config;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const API_KEY_HEADER: &str = "x-goog-api-key";

/// Everything that can go wrong talking to the hosted model.
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("request to Gemini failed: {0}")]
    Transport(reqwest::Error),
    #[error("Gemini API error ({status}): {message}")]
    Api { status: StatusCode, message: String },
    #[error("error decoding Gemini response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("Gemini returned no content{}", .0.as_deref().map(|r| format!(" (blocked: {})", r)).unwrap_or_default())]
    EmptyResponse(Option<String>),
}

// Request URLs never carry the key, but strip them anyway so nothing
// request-specific reaches logs or clients.
impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        GatewayError::Transport(err.without_url())
    }
}

impl GatewayError {
    /// Text safe to hand to an anonymous browser.
    pub fn public_message(&self) -> String {
        match self {
            GatewayError::Transport(_) => "the model service could not be reached".to_string(),
            GatewayError::Api { status, .. } => format!("the model service rejected the request ({})", status),
            GatewayError::Decode(_) => "the model service sent an unreadable response".to_string(),
            GatewayError::EmptyResponse(_) => self.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: String,
    base_url: String,
    chat_model: String,
    vision_model: String,
    embedding_model: String,
    embedding_dimensions: u32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Content {
    #[serde(default)]
    pub parts: Vec<Part>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(untagged)]
pub enum Part {
    Text { text: String },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct InlineData {
    #[serde(rename = "mimeType")]
    pub mime_type: String,
    pub data: String, // base64 encoded data
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    #[serde(rename = "usageMetadata")]
    pub usage_metadata: Option<UsageMetadata>,
    #[serde(rename = "promptFeedback")]
    pub prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Candidate {
    pub content: Option<Content>,
    #[serde(rename = "finishReason")]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PromptFeedback {
    #[serde(rename = "blockReason")]
    pub block_reason: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UsageMetadata {
    #[serde(rename = "promptTokenCount", default)]
    pub prompt_token_count: u32,
    #[serde(rename = "candidatesTokenCount", default)]
    pub candidates_token_count: u32,
    #[serde(rename = "totalTokenCount", default)]
    pub total_token_count: u32,
}

impl GenerateContentResponse {
    /// Joins the text parts of the first candidate.
    pub fn text(&self) -> Result<String, GatewayError> {
        let text: String = self
            .candidates
            .first()
            .and_then(|candidate| candidate.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|part| match part {
                        Part::Text { text } => Some(text.as_str()),
                        _ => None,
                    })
                    .collect()
            })
            .unwrap_or_default();

        if text.is_empty() {
            let reason = self
                .prompt_feedback
                .as_ref()
                .and_then(|feedback| feedback.block_reason.clone())
                .or_else(|| self.candidates.first().and_then(|c| c.finish_reason.clone()));
            return Err(GatewayError::EmptyResponse(reason));
        }
        Ok(text)
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EmbedContentRequest {
    pub model: String,
    pub content: EmbedContent,
    #[serde(rename = "taskType")]
    pub task_type: String,
    #[serde(rename = "outputDimensionality")]
    pub output_dimensionality: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EmbedContent {
    pub parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EmbedContentResponse {
    pub embedding: Embedding,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Embedding {
    pub values: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

impl GeminiClient {
    pub fn new(config: &Config) -> Self {
        Self {
            client: Client::new(),
            api_key: config.api_key.clone(),
            base_url: config.base_url.clone(),
            chat_model: config.chat_model.clone(),
            vision_model: config.vision_model.clone(),
            embedding_model: config.embedding_model.clone(),
            embedding_dimensions: config.embedding_dimensions,
        }
    }

    /// Text-and-image generation against the chat model.
    pub async fn generate_content(
        &self,
        request: GenerateContentRequest,
    ) -> Result<GenerateContentResponse, GatewayError> {
        self.generate_with_model(&self.chat_model, request).await
    }

    /// Same as [`generate_content`](Self::generate_content) but on the vision model.
    pub async fn generate_vision_content(
        &self,
        request: GenerateContentRequest,
    ) -> Result<GenerateContentResponse, GatewayError> {
        self.generate_with_model(&self.vision_model, request).await
    }

    async fn generate_with_model(
        &self,
        model: &str,
        request: GenerateContentRequest,
    ) -> Result<GenerateContentResponse, GatewayError> {
        let url = format!("{}/models/{}:generateContent", self.base_url, model);

        tracing::debug!("Gemini request: model={}, contents={}", model, request.contents.len());

        let response = self
            .client
            .post(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let response_text = response.text().await?;

        if !status.is_success() {
            return Err(api_error(status, &response_text));
        }

        tracing::debug!(
            "Gemini response (truncated): {}...",
            truncate(&response_text, 500)
        );

        match serde_json::from_str::<GenerateContentResponse>(&response_text) {
            Ok(result) => {
                if let Some(ref usage) = result.usage_metadata {
                    tracing::debug!(
                        "Gemini usage: prompt={} completion={} total={}",
                        usage.prompt_token_count,
                        usage.candidates_token_count,
                        usage.total_token_count
                    );
                }
                Ok(result)
            }
            Err(parse_error) => {
                tracing::error!("Failed to parse Gemini response: {}", parse_error);
                Err(parse_error.into())
            }
        }
    }

    pub async fn embed_content(&self, text: &str) -> Result<Vec<f32>, GatewayError> {
        let url = format!(
            "{}/models/{}:embedContent",
            self.base_url, self.embedding_model
        );

        let request = EmbedContentRequest {
            model: format!("models/{}", self.embedding_model),
            content: EmbedContent {
                parts: vec![Part::Text {
                    text: text.to_string(),
                }],
            },
            task_type: "RETRIEVAL_DOCUMENT".to_string(),
            output_dimensionality: Some(self.embedding_dimensions),
        };

        let response = self
            .client
            .post(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let response_text = response.text().await?;

        if status.is_success() {
            let result: EmbedContentResponse = serde_json::from_str(&response_text)?;
            tracing::debug!("Gemini embedding: {} dimensions", result.embedding.values.len());
            Ok(result.embedding.values)
        } else {
            Err(api_error(status, &response_text))
        }
    }
}

/// Prefers the structured `error.message` over the raw body.
fn api_error(status: StatusCode, body: &str) -> GatewayError {
    let message = serde_json::from_str::<ApiErrorEnvelope>(body)
        .map(|envelope| envelope.error.message)
        .unwrap_or_else(|_| body.to_string());
    tracing::error!("Gemini API error ({}): {}", status, message);
    GatewayError::Api { status, message }
}

fn truncate(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
