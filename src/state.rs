// src/state.rs
use crate::config::Config;
use crate::gateway::ModelGateway;
use crate::session::SessionStore;
use std::sync::Arc;

/// Shared application state handed to every handler through an `Extension`.
pub struct AppState {
    pub gateway: Arc<dyn ModelGateway>,
    pub sessions: SessionStore,
    pub config: Config,
}

impl AppState {
    pub fn new(gateway: Arc<dyn ModelGateway>, config: Config) -> Self {
        Self {
            gateway,
            sessions: SessionStore::new(),
            config,
        }
    }
}

pub type SharedState = Arc<AppState>;
