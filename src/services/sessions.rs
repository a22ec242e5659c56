use crate::models::SessionData;
use chrono::{DateTime, Duration, Utc};
use rand::{distributions::Alphanumeric, Rng};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// How long a session lives before it is replaced with a blank one.
const SESSION_EXPIRY_HOURS: i64 = 24;
const SESSION_TOKEN_LENGTH: usize = 64;

/// Cookie sessions, kept in memory only.
#[derive(Clone, Default)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<String, SessionData>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_token() -> String {
        rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(SESSION_TOKEN_LENGTH)
            .map(char::from)
            .collect()
    }

    /// Session for `token`, starting a fresh one if it is unknown or expired.
    pub async fn get(&self, token: &str) -> SessionData {
        self.get_at(token, Utc::now()).await
    }

    pub async fn get_at(&self, token: &str, now: DateTime<Utc>) -> SessionData {
        if let Some(session) = self.sessions.read().await.get(token) {
            if session.expires_at > now {
                return session.clone();
            }
        }

        let session = SessionData::new(now + Duration::hours(SESSION_EXPIRY_HOURS));
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, s| s.expires_at > now);
        tracing::debug!(
            "Starting new session, pruned {} expired",
            before - sessions.len()
        );
        sessions.insert(token.to_string(), session.clone());
        session
    }

    pub async fn save(&self, token: &str, session: SessionData) {
        self.sessions.write().await.insert(token.to_string(), session);
    }
}
