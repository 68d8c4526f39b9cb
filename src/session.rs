// src/session.rs
//! In-memory chat sessions keyed by an opaque browser session id.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

/// Session ids are generated by the page and kept in `sessionStorage`.
pub type SessionId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

impl Role {
    /// Role name on the Gemini wire format.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Model => "model",
        }
    }
}

/// One message of a conversation. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            created_at: Utc::now(),
        }
    }

    pub fn model(content: impl Into<String>) -> Self {
        Self {
            role: Role::Model,
            content: content.into(),
            created_at: Utc::now(),
        }
    }
}

/// Append-only transcript for one chat session.
#[derive(Debug, Clone)]
pub struct ChatSession {
    id: SessionId,
    turns: Vec<Turn>,
    created_at: DateTime<Utc>,
    last_active: DateTime<Utc>,
}

impl ChatSession {
    pub fn new(id: SessionId) -> Self {
        let now = Utc::now();
        Self {
            id,
            turns: Vec::new(),
            created_at: now,
            last_active: now,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn last_active(&self) -> DateTime<Utc> {
        self.last_active
    }

    pub fn touch(&mut self) {
        self.last_active = Utc::now();
    }

    pub(crate) fn push(&mut self, turn: Turn) {
        self.turns.push(turn);
        self.touch();
    }
}

pub type SharedSession = Arc<Mutex<ChatSession>>;

/// Owns every live chat session. Each session has its own lock so one
/// session's exchanges are serialized without blocking the others.
#[derive(Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<SessionId, SharedSession>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the session for `id`, creating an empty one on first use.
    pub async fn get_or_create(&self, id: SessionId) -> SharedSession {
        if let Some(session) = self.sessions.read().await.get(&id) {
            // Refreshed while the sweep is held off by the read lock. A locked
            // session is mid-exchange and never expired.
            if let Ok(mut guard) = session.try_lock() {
                guard.touch();
            }
            return session.clone();
        }

        let mut sessions = self.sessions.write().await;
        sessions
            .entry(id)
            .or_insert_with(|| {
                tracing::info!("💬 Started chat session: {}", id);
                Arc::new(Mutex::new(ChatSession::new(id)))
            })
            .clone()
    }

    /// Looks up a session without creating it.
    pub async fn get(&self, id: SessionId) -> Option<SharedSession> {
        self.sessions.read().await.get(&id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    /// Drops sessions idle for longer than `max_idle`. Sessions locked by an
    /// in-flight exchange are busy by definition and are kept.
    pub async fn expire_idle(&self, max_idle: Duration) -> usize {
        let cutoff = match chrono::Duration::from_std(max_idle)
            .ok()
            .and_then(|age| Utc::now().checked_sub_signed(age))
        {
            Some(cutoff) => cutoff,
            None => return 0,
        };

        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|id, session| match session.try_lock() {
            Ok(session) if session.last_active() < cutoff => {
                tracing::debug!("🗑️ Expired idle chat session: {}", id);
                false
            }
            _ => true,
        });
        before - sessions.len()
    }
}
