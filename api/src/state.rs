use crate::error::ApiError;
use axum::http::StatusCode;
use chatbot::{ChatSession, Config, GeminiService};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use uuid::Uuid;

struct SessionEntry {
    session: Arc<ChatSession>,
    last_used: Instant,
}

/// Shared by every handler: one Gemini client and the open chat sessions.
pub struct AppState {
    pub config: Config,
    gemini: Arc<GeminiService>,
    sessions: RwLock<HashMap<Uuid, SessionEntry>>,
}

impl AppState {
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let gemini = Arc::new(GeminiService::new(&config)?);
        Ok(Self {
            config,
            gemini,
            sessions: RwLock::new(HashMap::new()),
        })
    }

    pub async fn create_session(&self) -> Uuid {
        self.create_session_at(Instant::now()).await
    }

    /// Looks a session up and marks it as used; idle sessions count as gone.
    pub async fn session(&self, id: Uuid) -> Result<Arc<ChatSession>, ApiError> {
        self.session_at(id, Instant::now()).await
    }

    /// Drops every session idle for longer than the configured timeout. Returns how many went.
    pub async fn evict_idle(&self) -> usize {
        self.evict_idle_at(Instant::now()).await
    }

    /// Runs `evict_idle` forever, checking a few times per idle period.
    pub async fn sweep_idle_sessions(self: Arc<Self>) {
        let period = (self.config.session_idle_timeout / 4).max(Duration::from_secs(1));
        let mut ticker = tokio::time::interval(period);
        loop {
            ticker.tick().await;
            let evicted = self.evict_idle().await;
            if evicted > 0 {
                log::info!("Closed {evicted} idle chat sessions");
            }
        }
    }

    async fn create_session_at(&self, now: Instant) -> Uuid {
        let id = Uuid::new_v4();
        let session = Arc::new(ChatSession::new(self.gemini.clone()));

        let mut sessions = self.sessions.write().await;
        self.evict_locked(&mut sessions, now);

        while sessions.len() >= self.config.max_sessions {
            let oldest = sessions
                .iter()
                .min_by_key(|(_, entry)| entry.last_used)
                .map(|(id, _)| *id);
            match oldest {
                Some(oldest) => {
                    sessions.remove(&oldest);
                    log::warn!("Session cap reached, closed least recently used session {oldest}");
                }
                None => break,
            }
        }

        sessions.insert(
            id,
            SessionEntry {
                session,
                last_used: now,
            },
        );
        log::info!("Opened chat session {} ({} open)", id, sessions.len());
        id
    }

    async fn session_at(&self, id: Uuid, now: Instant) -> Result<Arc<ChatSession>, ApiError> {
        let mut sessions = self.sessions.write().await;
        if sessions
            .get(&id)
            .is_some_and(|entry| self.is_expired(entry, now))
        {
            sessions.remove(&id);
        }

        let entry = sessions
            .get_mut(&id)
            .ok_or_else(|| ApiError::new(StatusCode::NOT_FOUND, format!("unknown session {id}")))?;
        entry.last_used = entry.last_used.max(now);
        Ok(entry.session.clone())
    }

    async fn evict_idle_at(&self, now: Instant) -> usize {
        let mut sessions = self.sessions.write().await;
        self.evict_locked(&mut sessions, now)
    }

    fn evict_locked(&self, sessions: &mut HashMap<Uuid, SessionEntry>, now: Instant) -> usize {
        let before = sessions.len();
        sessions.retain(|_, entry| !self.is_expired(entry, now));
        before - sessions.len()
    }

    // A session waiting on Gemini is never idle, whatever its timestamp says.
    fn is_expired(&self, entry: &SessionEntry, now: Instant) -> bool {
        !entry.session.is_typing()
            && now.saturating_duration_since(entry.last_used) > self.config.session_idle_timeout
    }

    #[cfg(test)]
    async fn open_sessions(&self) -> usize {
        self.sessions.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatbot::test_support::test_config;

    fn state_with(idle: Duration, max_sessions: usize) -> AppState {
        let mut config = test_config("http://127.0.0.1:1");
        config.session_idle_timeout = idle;
        config.max_sessions = max_sessions;
        AppState::new(config).unwrap()
    }

    #[tokio::test]
    async fn idle_sessions_are_swept() {
        let state = state_with(Duration::from_secs(60), 10);
        let start = Instant::now();
        let stale = state.create_session_at(start).await;
        let fresh = state.create_session_at(start + Duration::from_secs(50)).await;

        let evicted = state.evict_idle_at(start + Duration::from_secs(90)).await;
        assert_eq!(evicted, 1);
        assert_eq!(state.open_sessions().await, 1);

        let err = state
            .session_at(stale, start + Duration::from_secs(90))
            .await
            .err().unwrap();
        assert_eq!(err.status, StatusCode::NOT_FOUND);
        assert!(state
            .session_at(fresh, start + Duration::from_secs(90))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn lookup_refreshes_and_expires_sessions() {
        let state = state_with(Duration::from_secs(60), 10);
        let start = Instant::now();
        let id = state.create_session_at(start).await;

        // Touching the session keeps it alive past the original deadline.
        assert!(state.session_at(id, start + Duration::from_secs(50)).await.is_ok());
        assert!(state.session_at(id, start + Duration::from_secs(100)).await.is_ok());

        let err = state
            .session_at(id, start + Duration::from_secs(200))
            .await
            .err().unwrap();
        assert_eq!(err.status, StatusCode::NOT_FOUND);
        assert_eq!(state.open_sessions().await, 0);
    }

    #[tokio::test]
    async fn cap_closes_least_recently_used_session() {
        let state = state_with(Duration::from_secs(3600), 2);
        let start = Instant::now();
        let first = state.create_session_at(start).await;
        let second = state.create_session_at(start + Duration::from_secs(1)).await;

        // `first` becomes the most recently used one.
        state
            .session_at(first, start + Duration::from_secs(2))
            .await
            .unwrap();

        let third = state.create_session_at(start + Duration::from_secs(3)).await;
        assert_eq!(state.open_sessions().await, 2);

        let now = start + Duration::from_secs(4);
        assert!(state.session_at(first, now).await.is_ok());
        assert!(state.session_at(third, now).await.is_ok());
        assert!(state.session_at(second, now).await.is_err());
    }
}
