// src/handlers/modes.rs
//! JSON and multipart endpoints, one per mode.

use crate::dispatch::{dispatch, DispatchError, Mode, ModeInput, Outcome};
use crate::gateway::ImageInput;
use crate::session::{SessionId, Turn};
use crate::state::SharedState;
use axum::{
    extract::{multipart::Multipart, DefaultBodyLimit, Extension, Path},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

#[derive(Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: String,
}

#[derive(Deserialize)]
pub struct EmbedRequest {
    #[serde(default)]
    pub text: String,
}

#[derive(Deserialize)]
pub struct AskRequest {
    #[serde(default)]
    pub prompt: String,
}

#[derive(Serialize)]
pub struct HistoryResponse {
    pub session_id: SessionId,
    pub started_at: Option<DateTime<Utc>>,
    pub turns: Vec<Turn>,
}

pub fn mode_routes(max_upload_bytes: usize) -> Router {
    let caption_routes = Router::new()
        .route("/api/caption", post(caption))
        .layer(DefaultBodyLimit::max(max_upload_bytes));

    Router::new()
        .route("/api/modes", get(list_modes))
        .route("/api/chat/:session_id", post(chat))
        .route("/api/chat/:session_id/history", get(chat_history))
        .route("/api/embed", post(embed))
        .route("/api/ask", post(ask))
        .route("/api/status", get(status))
        .merge(caption_routes)
}

/// GET /api/modes - navigation entries for the page
pub async fn list_modes() -> Json<Value> {
    let modes: Vec<Value> = Mode::ALL
        .iter()
        .map(|mode| json!({ "slug": mode.slug(), "label": mode.label() }))
        .collect();
    Json(json!({ "modes": modes }))
}

/// POST /api/chat/:session_id - one chat exchange
pub async fn chat(
    Path(session_id): Path<SessionId>,
    Extension(state): Extension<SharedState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<Outcome>, DispatchError> {
    let input = ModeInput::ChatBot {
        session_id,
        message: request.message,
    };
    Ok(Json(dispatch(&state, input).await?))
}

/// GET /api/chat/:session_id/history - transcript, empty if the session never started
pub async fn chat_history(
    Path(session_id): Path<SessionId>,
    Extension(state): Extension<SharedState>,
) -> Json<HistoryResponse> {
    let (started_at, turns) = match state.sessions.get(session_id).await {
        Some(session) => {
            let session = session.lock().await;
            (Some(session.created_at()), session.turns().to_vec())
        }
        None => (None, Vec::new()),
    };
    Json(HistoryResponse {
        session_id,
        started_at,
        turns,
    })
}

/// POST /api/caption - multipart with an `image` file and an optional `prompt`
pub async fn caption(
    Extension(state): Extension<SharedState>,
    mut multipart: Multipart,
) -> Result<Json<Outcome>, DispatchError> {
    let mut image = None;
    let mut prompt = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => return Err(upload_error(e, state.config.max_upload_bytes)),
        };

        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some("image") => {
                let file_name = field.file_name().map(str::to_owned);
                let content_type = field.content_type().map(str::to_owned);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| upload_error(e, state.config.max_upload_bytes))?;

                // An untouched file input still submits an empty part.
                if bytes.is_empty() {
                    continue;
                }
                let mime_type = image_mime_type(content_type.as_deref(), file_name.as_deref());
                tracing::info!(
                    "📷 Received image {} ({} bytes, {})",
                    file_name.as_deref().unwrap_or("<unnamed>"),
                    bytes.len(),
                    mime_type
                );
                image = Some(ImageInput::new(bytes.to_vec(), mime_type));
            }
            Some("prompt") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| upload_error(e, state.config.max_upload_bytes))?;
                prompt = Some(text);
            }
            other => {
                tracing::debug!("Ignoring multipart field {:?}", other);
            }
        }
    }

    Ok(Json(dispatch(&state, ModeInput::ImageInsight { image, prompt }).await?))
}

/// POST /api/embed - embedding vector for a text
pub async fn embed(
    Extension(state): Extension<SharedState>,
    Json(request): Json<EmbedRequest>,
) -> Result<Json<Outcome>, DispatchError> {
    Ok(Json(dispatch(&state, ModeInput::EmbedText { text: request.text }).await?))
}

/// POST /api/ask - single-shot question
pub async fn ask(
    Extension(state): Extension<SharedState>,
    Json(request): Json<AskRequest>,
) -> Result<Json<Outcome>, DispatchError> {
    Ok(Json(dispatch(&state, ModeInput::AskAnything { prompt: request.prompt }).await?))
}

/// GET /api/status
pub async fn status(Extension(state): Extension<SharedState>) -> (StatusCode, Json<Value>) {
    let body = json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "chat_model": state.config.chat_model,
        "vision_model": state.config.vision_model,
        "embedding_model": state.config.embedding_model,
        "embedding_dimensions": state.config.embedding_dimensions,
        "active_sessions": state.sessions.len().await,
    });
    (StatusCode::OK, Json(body))
}

fn upload_error(err: axum::extract::multipart::MultipartError, limit: usize) -> DispatchError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        DispatchError::UploadTooLarge(limit)
    } else {
        DispatchError::InvalidUpload(err.body_text())
    }
}

/// Trusts the part's declared type unless it is missing or generic, then
/// falls back to the file extension.
fn image_mime_type(content_type: Option<&str>, file_name: Option<&str>) -> String {
    let declared = content_type.filter(|ct| !ct.is_empty() && *ct != "application/octet-stream");
    let mime = match declared {
        Some(ct) => ct.to_ascii_lowercase(),
        None => file_name
            .and_then(|name| mime_guess::from_path(name).first_raw())
            .unwrap_or("application/octet-stream")
            .to_string(),
    };

    if mime == "image/jpg" || mime == "image/pjpeg" {
        "image/jpeg".to_string()
    } else {
        mime
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_mime_type_resolution() {
        assert_eq!(image_mime_type(Some("image/png"), Some("a.jpg")), "image/png");
        assert_eq!(image_mime_type(Some("image/jpg"), None), "image/jpeg");
        assert_eq!(image_mime_type(Some("application/octet-stream"), Some("photo.JPEG")), "image/jpeg");
        assert_eq!(image_mime_type(None, Some("scan.png")), "image/png");
        assert_eq!(image_mime_type(None, None), "application/octet-stream");
    }
}
