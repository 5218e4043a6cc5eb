use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// States in the conversation flow.
///
/// `WaitingConfirm` and `FaqMenu` are reserved: no transition currently
/// produces them, but persisted snapshots containing them must round-trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationState {
    /// Initial state, waiting for user input.
    Idle,
    /// In the symptom assessment questionnaire.
    Assessment,
    /// Waiting for assessment start confirmation (reserved).
    WaitingConfirm,
    /// Showing the FAQ menu (reserved).
    FaqMenu,
    /// Waiting for the user to share a location.
    AwaitingLocation,
}

impl Default for ConversationState {
    fn default() -> Self {
        ConversationState::Idle
    }
}

/// Per-user conversation session.
///
/// `total_score` is derived state: it always equals the sum of `answers`
/// values and is recomputed whenever an answer is recorded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserSession {
    pub user_id: String,
    pub state: ConversationState,
    pub current_question_index: usize,
    /// question id -> score of the selected option (last write wins).
    pub answers: BTreeMap<String, i32>,
    pub total_score: i32,
    pub last_activity: DateTime<Utc>,
}

impl UserSession {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            state: ConversationState::Idle,
            current_question_index: 0,
            answers: BTreeMap::new(),
            total_score: 0,
            last_activity: Utc::now(),
        }
    }

    /// Reset back to idle for a fresh assessment. Clears answers and score.
    pub fn reset(&mut self) {
        self.state = ConversationState::Idle;
        self.current_question_index = 0;
        self.answers.clear();
        self.total_score = 0;
        self.last_activity = Utc::now();
    }

    /// Refresh the activity timestamp.
    pub fn touch(&mut self) {
        self.last_activity = Utc::now();
    }

    /// Recompute `total_score` from the current answer set.
    pub fn recompute_score(&mut self) {
        self.total_score = self.answers.values().sum();
    }
}
