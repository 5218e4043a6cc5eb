use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::{Duration, Utc};
use tokio::sync::Mutex;
use tracing::{info, warn};

use dustline_core::{BotError, UserSession};

/// Sessions idle for longer than this are dropped on reload.
const SESSION_TIMEOUT_HOURS: i64 = 24;

/// In-memory session map with whole-file JSON snapshot persistence.
///
/// Every mutating call rewrites the full snapshot. Write failures are logged
/// and swallowed — the in-memory map stays authoritative for the rest of the
/// process lifetime. Load failures start the store empty.
pub struct SessionStore {
    path: PathBuf,
    sessions: Mutex<HashMap<String, UserSession>>,
}

impl SessionStore {
    /// Open the store, loading any non-expired sessions from `path`.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self::open_with_timeout(path, Duration::hours(SESSION_TIMEOUT_HOURS))
    }

    pub fn open_with_timeout(path: impl Into<PathBuf>, timeout: Duration) -> Self {
        let path = path.into();
        let sessions = load_snapshot(&path, timeout);
        Self {
            path,
            sessions: Mutex::new(sessions),
        }
    }

    /// Get the session for `user_id`, creating (and persisting) a fresh one
    /// if none exists. The activity timestamp is refreshed either way.
    pub async fn session(&self, user_id: &str) -> UserSession {
        let mut sessions = self.sessions.lock().await;
        let session = sessions
            .entry(user_id.to_string())
            .or_insert_with(|| UserSession::new(user_id));
        session.touch();
        let snapshot = session.clone();
        self.persist(&sessions);
        snapshot
    }

    /// Replace and persist a session.
    pub async fn update(&self, mut session: UserSession) {
        session.touch();
        let mut sessions = self.sessions.lock().await;
        sessions.insert(session.user_id.clone(), session);
        self.persist(&sessions);
    }

    /// Reset `user_id`'s session back to idle defaults and persist.
    pub async fn reset(&self, user_id: &str) {
        let mut sessions = self.sessions.lock().await;
        if let Some(session) = sessions.get_mut(user_id) {
            session.reset();
            self.persist(&sessions);
        }
    }

    /// Record an answer for `user_id` and recompute the total score.
    ///
    /// Re-answering the same question overwrites the previous score; the
    /// total always reflects the sum of current values only.
    pub async fn record_answer(&self, user_id: &str, question_id: &str, score: i32) {
        let mut sessions = self.sessions.lock().await;
        let session = sessions
            .entry(user_id.to_string())
            .or_insert_with(|| UserSession::new(user_id));
        session.answers.insert(question_id.to_string(), score);
        session.recompute_score();
        session.touch();
        self.persist(&sessions);
    }

    /// Number of live sessions (test/diagnostic helper).
    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.lock().await.is_empty()
    }

    fn persist(&self, sessions: &HashMap<String, UserSession>) {
        if let Err(e) = write_snapshot(&self.path, sessions) {
            warn!(path = %self.path.display(), error = %e, "Failed to persist sessions");
        }
    }
}

fn load_snapshot(path: &Path, timeout: Duration) -> HashMap<String, UserSession> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            info!(path = %path.display(), "No session snapshot, starting empty");
            return HashMap::new();
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Failed to read session snapshot, starting empty");
            return HashMap::new();
        }
    };

    let parsed: HashMap<String, UserSession> = match serde_json::from_str(&raw) {
        Ok(parsed) => parsed,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Malformed session snapshot, starting empty");
            return HashMap::new();
        }
    };

    let now = Utc::now();
    let total = parsed.len();
    let live: HashMap<String, UserSession> = parsed
        .into_iter()
        .filter(|(_, session)| now - session.last_activity < timeout)
        .collect();
    if live.len() < total {
        info!(
            loaded = live.len(),
            expired = total - live.len(),
            "Loaded session snapshot"
        );
    }
    live
}

fn write_snapshot(path: &Path, sessions: &HashMap<String, UserSession>) -> Result<(), BotError> {
    let json = serde_json::to_string_pretty(sessions)
        .map_err(|e| BotError::Persistence(e.to_string()))?;
    // Write-then-rename so a crash mid-write never truncates the snapshot.
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, json).map_err(|e| BotError::Persistence(e.to_string()))?;
    std::fs::rename(&tmp, path).map_err(|e| BotError::Persistence(e.to_string()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use dustline_core::ConversationState;

    fn store_at(dir: &tempfile::TempDir) -> SessionStore {
        SessionStore::open(dir.path().join("user_states.json"))
    }

    #[tokio::test]
    async fn test_creates_and_persists_new_session() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_at(&dir);
        let session = store.session("U1").await;
        assert_eq!(session.state, ConversationState::Idle);

        // A second store over the same file sees the session.
        let reopened = store_at(&dir);
        assert_eq!(reopened.len().await, 1);
    }

    #[tokio::test]
    async fn test_record_answer_overwrites_and_recomputes() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_at(&dir);
        store.record_answer("U1", "cough", 2).await;
        store.record_answer("U1", "eyes", 1).await;
        store.record_answer("U1", "cough", 0).await;

        let session = store.session("U1").await;
        assert_eq!(session.answers.len(), 2);
        assert_eq!(session.total_score, 1);
    }

    #[tokio::test]
    async fn test_reset_clears_state() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_at(&dir);
        store.record_answer("U1", "cough", 2).await;
        let mut session = store.session("U1").await;
        session.state = ConversationState::Assessment;
        session.current_question_index = 3;
        store.update(session).await;

        store.reset("U1").await;
        let session = store.session("U1").await;
        assert_eq!(session.state, ConversationState::Idle);
        assert_eq!(session.current_question_index, 0);
        assert!(session.answers.is_empty());
        assert_eq!(session.total_score, 0);
    }

    #[tokio::test]
    async fn test_expired_sessions_skipped_on_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("user_states.json");

        let mut stale = UserSession::new("U_stale");
        stale.last_activity = Utc::now() - Duration::hours(25);
        let mut fresh = UserSession::new("U_fresh");
        fresh.last_activity = Utc::now() - Duration::hours(23);

        let mut map = HashMap::new();
        map.insert(stale.user_id.clone(), stale);
        map.insert(fresh.user_id.clone(), fresh);
        std::fs::write(&path, serde_json::to_string(&map).unwrap()).unwrap();

        let store = SessionStore::open(&path);
        assert_eq!(store.len().await, 1);
        let session = store.session("U_fresh").await;
        assert_eq!(session.user_id, "U_fresh");
    }

    #[tokio::test]
    async fn test_corrupt_snapshot_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("user_states.json");
        std::fs::write(&path, "{not json").unwrap();

        let store = SessionStore::open(&path);
        assert!(store.is_empty().await);
    }
}
