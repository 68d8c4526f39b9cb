// src/gateway.rs
//! The narrow boundary between the dispatcher and the hosted model.

use crate::gemini_client::{Content, GatewayError, GeminiClient, GenerateContentRequest, InlineData, Part};
use crate::session::{ChatSession, Turn};
use async_trait::async_trait;
use base64::prelude::*;

/// Image bytes as uploaded, plus the mime type the model is told about.
#[derive(Debug, Clone)]
pub struct ImageInput {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

impl ImageInput {
    pub const SUPPORTED_TYPES: [&'static str; 2] = ["image/jpeg", "image/png"];

    pub fn new(bytes: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            bytes,
            mime_type: mime_type.into(),
        }
    }

    pub fn is_supported(&self) -> bool {
        Self::SUPPORTED_TYPES.contains(&self.mime_type.as_str())
    }
}

/// Remote model operations. Implementations make exactly one remote call per
/// method and never retry.
#[async_trait]
pub trait ModelGateway: Send + Sync {
    /// Sends the whole history and returns the model's reply.
    async fn chat(&self, history: &[Turn]) -> Result<String, GatewayError>;
    async fn caption(&self, image: &ImageInput, prompt: &str) -> Result<String, GatewayError>;
    async fn embed(&self, text: &str) -> Result<Vec<f32>, GatewayError>;
    /// Single-shot generation without history.
    async fn respond(&self, prompt: &str) -> Result<String, GatewayError>;
}

/// One chat exchange. The user turn and the reply are committed together only
/// after the remote call succeeds; on failure the session is left untouched.
pub async fn converse(
    gateway: &dyn ModelGateway,
    session: &mut ChatSession,
    user_message: &str,
) -> Result<String, GatewayError> {
    let user_turn = Turn::user(user_message);

    let mut history = Vec::with_capacity(session.len() + 1);
    history.extend_from_slice(session.turns());
    history.push(user_turn.clone());

    let reply = gateway.chat(&history).await?;

    session.push(user_turn);
    session.push(Turn::model(reply.clone()));
    Ok(reply)
}

fn text_content(role: &str, text: &str) -> Content {
    Content {
        role: Some(role.to_string()),
        parts: vec![Part::Text {
            text: text.to_string(),
        }],
    }
}

#[async_trait]
impl ModelGateway for GeminiClient {
    async fn chat(&self, history: &[Turn]) -> Result<String, GatewayError> {
        let contents = history
            .iter()
            .map(|turn| text_content(turn.role.as_str(), &turn.content))
            .collect();

        let response = self.generate_content(GenerateContentRequest { contents }).await?;
        response.text()
    }

    async fn caption(&self, image: &ImageInput, prompt: &str) -> Result<String, GatewayError> {
        let contents = vec![Content {
            role: Some("user".to_string()),
            parts: vec![
                Part::Text {
                    text: prompt.to_string(),
                },
                Part::InlineData {
                    inline_data: InlineData {
                        mime_type: image.mime_type.clone(),
                        data: BASE64_STANDARD.encode(&image.bytes),
                    },
                },
            ],
        }];

        tracing::debug!("Caption request: {} bytes ({})", image.bytes.len(), image.mime_type);
        let response = self
            .generate_vision_content(GenerateContentRequest { contents })
            .await?;
        response.text()
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, GatewayError> {
        self.embed_content(text).await
    }

    async fn respond(&self, prompt: &str) -> Result<String, GatewayError> {
        let response = self
            .generate_content(GenerateContentRequest {
                contents: vec![text_content("user", prompt)],
            })
            .await?;
        response.text()
    }
}
