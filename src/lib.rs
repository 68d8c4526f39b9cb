// lib.rs - LankaMate AI: a single-page front-end over the Gemini API
pub mod config;
pub mod dispatch;
pub mod gateway;
pub mod gemini_client;
pub mod handlers;
pub mod middleware;
pub mod session;
pub mod state;

pub use config::{Config, ConfigError};
pub use dispatch::{dispatch, DispatchError, Mode, ModeInput, Outcome};
pub use gateway::{converse, ImageInput, ModelGateway};
pub use gemini_client::{GatewayError, GeminiClient};
pub use session::{ChatSession, Role, SessionId, SessionStore, Turn};
pub use state::{AppState, SharedState};
