// src/dispatch.rs
//! Routes one user interaction to exactly one gateway call, or to none.

use crate::gateway::{converse, ImageInput};
use crate::gemini_client::GatewayError;
use crate::session::{SessionId, Turn};
use crate::state::AppState;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const MISSING_IMAGE_WARNING: &str = "Please upload an image first.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Mode {
    #[serde(rename = "chat")]
    ChatBot,
    ImageInsight,
    EmbedText,
    #[serde(rename = "ask")]
    AskAnything,
}

impl Mode {
    pub const ALL: [Mode; 4] = [Mode::ChatBot, Mode::ImageInsight, Mode::EmbedText, Mode::AskAnything];

    pub fn slug(&self) -> &'static str {
        match self {
            Mode::ChatBot => "chat",
            Mode::ImageInsight => "image-insight",
            Mode::EmbedText => "embed-text",
            Mode::AskAnything => "ask",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Mode::ChatBot => "ChatBot",
            Mode::ImageInsight => "Image Insight",
            Mode::EmbedText => "Embed Text",
            Mode::AskAnything => "Ask me anything",
        }
    }
}

/// Input collected by one view of the page.
#[derive(Debug, Clone)]
pub enum ModeInput {
    ChatBot { session_id: SessionId, message: String },
    ImageInsight { image: Option<ImageInput>, prompt: Option<String> },
    EmbedText { text: String },
    AskAnything { prompt: String },
}

impl ModeInput {
    pub fn mode(&self) -> Mode {
        match self {
            ModeInput::ChatBot { .. } => Mode::ChatBot,
            ModeInput::ImageInsight { .. } => Mode::ImageInsight,
            ModeInput::EmbedText { .. } => Mode::EmbedText,
            ModeInput::AskAnything { .. } => Mode::AskAnything,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Outcome {
    Reply { reply: String, turns: Vec<Turn> },
    Caption { caption: String },
    Embedding { dimensions: usize, values: Vec<f32> },
    Answer { answer: String },
    /// Non-fatal, shown to the user; no remote call was made.
    Warning { message: String },
    /// Nothing was submitted.
    Idle,
}

#[derive(Error, Debug)]
pub enum DispatchError {
    #[error(transparent)]
    Remote(#[from] GatewayError),
    #[error("unsupported image type '{0}', expected a JPEG or PNG")]
    UnsupportedImage(String),
    #[error("invalid upload: {0}")]
    InvalidUpload(String),
    #[error("upload exceeds the {0} byte limit")]
    UploadTooLarge(usize),
}

impl DispatchError {
    fn kind(&self) -> &'static str {
        match self {
            DispatchError::Remote(_) => "remote_service",
            DispatchError::UnsupportedImage(_) => "unsupported_image",
            DispatchError::InvalidUpload(_) => "invalid_upload",
            DispatchError::UploadTooLarge(_) => "upload_too_large",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            DispatchError::Remote(_) => StatusCode::BAD_GATEWAY,
            DispatchError::UnsupportedImage(_) | DispatchError::InvalidUpload(_) => StatusCode::BAD_REQUEST,
            DispatchError::UploadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
        }
    }
}

impl IntoResponse for DispatchError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("❌ {}", self);
        } else {
            tracing::warn!("⚠️ {}", self);
        }
        let message = match &self {
            DispatchError::Remote(err) => err.public_message(),
            other => other.to_string(),
        };
        let body = serde_json::json!({
            "error": self.kind(),
            "message": message,
        });
        (status, Json(body)).into_response()
    }
}

pub async fn dispatch(state: &AppState, input: ModeInput) -> Result<Outcome, DispatchError> {
    let mode = input.mode();
    tracing::debug!("Dispatching {} request", mode.slug());

    match input {
        ModeInput::ChatBot { session_id, message } => {
            if message.trim().is_empty() {
                return Ok(Outcome::Idle);
            }

            let session = state.sessions.get_or_create(session_id).await;
            let mut session = session.lock().await;
            let reply = converse(state.gateway.as_ref(), &mut session, &message).await?;

            tracing::info!("💬 Session {} now has {} turns", session_id, session.len());
            Ok(Outcome::Reply {
                reply,
                turns: session.turns().to_vec(),
            })
        }
        ModeInput::ImageInsight { image, prompt } => {
            let Some(image) = image else {
                return Ok(Outcome::Warning {
                    message: MISSING_IMAGE_WARNING.to_string(),
                });
            };
            if !image.is_supported() {
                return Err(DispatchError::UnsupportedImage(image.mime_type));
            }

            let prompt = prompt
                .filter(|p| !p.trim().is_empty())
                .unwrap_or_else(|| state.config.caption_prompt.clone());
            let caption = state.gateway.caption(&image, &prompt).await?;
            Ok(Outcome::Caption { caption })
        }
        ModeInput::EmbedText { text } => {
            let values = state.gateway.embed(&text).await?;
            if values.len() != state.config.embedding_dimensions as usize {
                tracing::warn!(
                    "Embedding has {} dimensions, expected {}",
                    values.len(),
                    state.config.embedding_dimensions
                );
            }
            Ok(Outcome::Embedding {
                dimensions: values.len(),
                values,
            })
        }
        ModeInput::AskAnything { prompt } => {
            let answer = state.gateway.respond(&prompt).await?;
            Ok(Outcome::Answer { answer })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::gateway::ModelGateway;
    use crate::session::Role;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;
    use uuid::Uuid;

    #[derive(Default)]
    struct StubGateway {
        calls: AtomicUsize,
        fail: AtomicBool,
    }

    impl StubGateway {
        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn record(&self) -> Result<(), GatewayError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail.load(Ordering::SeqCst) {
                return Err(GatewayError::EmptyResponse(Some("stubbed failure".to_string())));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl ModelGateway for StubGateway {
        async fn chat(&self, history: &[Turn]) -> Result<String, GatewayError> {
            self.record()?;
            Ok(format!("reply to {}", history.last().map(|t| t.content.as_str()).unwrap_or("")))
        }
        async fn caption(&self, _: &ImageInput, prompt: &str) -> Result<String, GatewayError> {
            self.record()?;
            Ok(format!("caption for '{}'", prompt))
        }
        async fn embed(&self, _: &str) -> Result<Vec<f32>, GatewayError> {
            self.record()?;
            Ok(vec![0.5; 768])
        }
        async fn respond(&self, prompt: &str) -> Result<String, GatewayError> {
            self.record()?;
            Ok(format!("answer to {}", prompt))
        }
    }

    fn state_with(gateway: Arc<StubGateway>) -> AppState {
        let config = Config::from_lookup(|key| (key == "GEMINI_API_KEY").then(|| "k".to_string())).unwrap();
        AppState::new(gateway, config)
    }

    fn chat(session_id: SessionId, message: &str) -> ModeInput {
        ModeInput::ChatBot {
            session_id,
            message: message.to_string(),
        }
    }

    #[tokio::test]
    async fn test_n_exchanges_give_2n_alternating_turns() {
        let gateway = Arc::new(StubGateway::default());
        let state = state_with(gateway.clone());
        let id = Uuid::new_v4();

        for n in 1..=4 {
            let outcome = dispatch(&state, chat(id, &format!("message {n}"))).await.unwrap();
            let Outcome::Reply { reply, turns } = outcome else {
                panic!("expected a reply");
            };
            assert_eq!(reply, format!("reply to message {n}"));
            assert_eq!(turns.len(), 2 * n);
        }

        let session = state.sessions.get(id).await.unwrap();
        let session = session.lock().await;
        for (i, turn) in session.turns().iter().enumerate() {
            let expected = if i % 2 == 0 { Role::User } else { Role::Model };
            assert_eq!(turn.role, expected);
        }
        assert_eq!(gateway.calls(), 4);
    }

    #[tokio::test]
    async fn test_empty_chat_message_is_a_no_op() {
        let gateway = Arc::new(StubGateway::default());
        let state = state_with(gateway.clone());
        let id = Uuid::new_v4();

        assert!(matches!(dispatch(&state, chat(id, "")).await.unwrap(), Outcome::Idle));
        assert!(matches!(dispatch(&state, chat(id, "   \n")).await.unwrap(), Outcome::Idle));

        assert_eq!(gateway.calls(), 0);
        assert!(state.sessions.get(id).await.is_none());
    }

    #[tokio::test]
    async fn test_chat_stores_message_as_typed() {
        let gateway = Arc::new(StubGateway::default());
        let state = state_with(gateway.clone());
        let id = Uuid::new_v4();

        let Outcome::Reply { reply, turns } = dispatch(&state, chat(id, "  hello there \n")).await.unwrap() else {
            panic!("expected a reply");
        };

        assert_eq!(turns[0].content, "  hello there \n");
        assert_eq!(reply, "reply to   hello there \n");
    }

    #[tokio::test]
    async fn test_caption_without_image_warns_without_remote_call() {
        let gateway = Arc::new(StubGateway::default());
        let state = state_with(gateway.clone());

        let outcome = dispatch(&state, ModeInput::ImageInsight { image: None, prompt: None })
            .await
            .unwrap();

        match outcome {
            Outcome::Warning { message } => assert_eq!(message, MISSING_IMAGE_WARNING),
            other => panic!("expected a warning, got {other:?}"),
        }
        assert_eq!(gateway.calls(), 0);
    }

    #[tokio::test]
    async fn test_caption_uses_default_prompt_and_rejects_other_types() {
        let gateway = Arc::new(StubGateway::default());
        let state = state_with(gateway.clone());

        let outcome = dispatch(
            &state,
            ModeInput::ImageInsight {
                image: Some(ImageInput::new(vec![1, 2, 3], "image/jpeg")),
                prompt: Some(" ".to_string()),
            },
        )
        .await
        .unwrap();
        assert!(matches!(
            outcome,
            Outcome::Caption { ref caption } if caption == "caption for 'Describe this image in a few words.'"
        ));

        let err = dispatch(
            &state,
            ModeInput::ImageInsight {
                image: Some(ImageInput::new(vec![1], "image/gif")),
                prompt: None,
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, DispatchError::UnsupportedImage(_)));
        assert_eq!(gateway.calls(), 1);
    }

    #[tokio::test]
    async fn test_embed_makes_one_call_per_request() {
        let gateway = Arc::new(StubGateway::default());
        let state = state_with(gateway.clone());

        for (i, text) in ["", "hello"].into_iter().enumerate() {
            let outcome = dispatch(&state, ModeInput::EmbedText { text: text.to_string() })
                .await
                .unwrap();
            let Outcome::Embedding { dimensions, values } = outcome else {
                panic!("expected an embedding");
            };
            assert_eq!(dimensions, 768);
            assert_eq!(values.len(), 768);
            assert_eq!(gateway.calls(), i + 1);
        }
    }

    #[tokio::test]
    async fn test_failed_exchange_leaves_session_unchanged() {
        let gateway = Arc::new(StubGateway::default());
        let state = state_with(gateway.clone());
        let id = Uuid::new_v4();

        dispatch(&state, chat(id, "first")).await.unwrap();
        gateway.fail.store(true, Ordering::SeqCst);

        let err = dispatch(&state, chat(id, "second")).await.unwrap_err();
        assert!(matches!(err, DispatchError::Remote(_)));

        let session = state.sessions.get(id).await.unwrap();
        assert_eq!(session.lock().await.len(), 2);

        gateway.fail.store(false, Ordering::SeqCst);
        let Outcome::Reply { turns, .. } = dispatch(&state, chat(id, "third")).await.unwrap() else {
            panic!("expected a reply");
        };
        assert_eq!(turns.len(), 4);
        assert_eq!(turns[2].content, "third");
    }

    #[tokio::test]
    async fn test_other_modes_leave_chat_session_alone() {
        let gateway = Arc::new(StubGateway::default());
        let state = state_with(gateway.clone());
        let id = Uuid::new_v4();

        dispatch(&state, chat(id, "remember me")).await.unwrap();
        dispatch(&state, ModeInput::AskAnything { prompt: "what?".to_string() }).await.unwrap();
        dispatch(&state, ModeInput::EmbedText { text: "vec".to_string() }).await.unwrap();
        dispatch(&state, ModeInput::ImageInsight { image: None, prompt: None }).await.unwrap();

        let session = state.sessions.get(id).await.unwrap();
        let session = session.lock().await;
        assert_eq!(session.len(), 2);
        assert_eq!(session.turns()[0].content, "remember me");
        assert_eq!(state.sessions.len().await, 1);
    }

    #[test]
    fn test_mode_slugs_match_serde_names() {
        for mode in Mode::ALL {
            assert_eq!(serde_json::to_value(mode).unwrap(), mode.slug());
        }
    }
}
