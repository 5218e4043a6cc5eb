use std::sync::Arc;

use tracing::{info, warn};

use dustline_airquality::{report, StationProvider};
use dustline_assessment::Assessment;
use dustline_core::ConversationState;
use dustline_session::SessionStore;

use crate::texts;

// Intent keyword classes, checked in table order. Containment matching:
// keep start keywords specific so FAQ queries never collide with them.
const START_KEYWORDS: &[&str] =
    &["ประเมินอาการ", "เริ่มประเมิน", "ตรวจอาการ", "start", "assess", "วินิจฉัย"];
const CANCEL_KEYWORDS: &[&str] = &["ยกเลิก", "cancel", "หยุด", "เลิก", "ออก"];
const GREETING_KEYWORDS: &[&str] = &["สวัสดี", "hello", "hi", "หวัดดี", "ดีครับ", "ดีค่ะ"];
const HELP_KEYWORDS: &[&str] = &["help", "ช่วย", "วิธี", "ใช้งาน", "menu", "เมนู"];
const CHECK_DUST_KEYWORDS: &[&str] = &[
    "ตรวจสอบค่าฝุ่น",
    "เช็คค่าฝุ่น",
    "ค่าฝุ่นวันนี้",
    "ดูค่าฝุ่น",
    "pm2.5 วันนี้",
    "ค่าฝุ่นตอนนี้",
    "aqi",
];

/// Decides, per inbound message and session state, which action runs.
pub struct MessageRouter {
    store: Arc<SessionStore>,
    assessment: Arc<Assessment>,
    stations: Arc<dyn StationProvider>,
}

impl MessageRouter {
    pub fn new(
        store: Arc<SessionStore>,
        assessment: Arc<Assessment>,
        stations: Arc<dyn StationProvider>,
    ) -> Self {
        Self {
            store,
            assessment,
            stations,
        }
    }

    /// Handle one inbound text message and produce the reply text.
    pub async fn handle_text(&self, user_id: &str, text: &str) -> String {
        let lowered = text.trim().to_lowercase();
        let session = self.store.session(user_id).await;

        // Cancel wins over everything while a flow is active.
        if matches!(
            session.state,
            ConversationState::Assessment | ConversationState::AwaitingLocation
        ) && matches_any(&lowered, CANCEL_KEYWORDS)
        {
            if session.state == ConversationState::Assessment {
                return self.assessment.cancel(user_id).await;
            }
            let mut session = session;
            session.state = ConversationState::Idle;
            self.store.update(session).await;
            return texts::dust_check_cancelled().to_string();
        }

        // Mid-assessment, every other text is an answer.
        if session.state == ConversationState::Assessment {
            let (reply, _complete) = self.assessment.submit_answer(user_id, text).await;
            if let Some(reply) = reply {
                return reply;
            }
        }

        // Waiting on a location share: remind until they share or cancel.
        if session.state == ConversationState::AwaitingLocation {
            return texts::location_request().to_string();
        }

        if matches_any(&lowered, GREETING_KEYWORDS) {
            return texts::welcome().to_string();
        }

        if matches_any(&lowered, HELP_KEYWORDS) {
            return texts::help().to_string();
        }

        if matches_any(&lowered, CHECK_DUST_KEYWORDS) {
            let mut session = session;
            session.state = ConversationState::AwaitingLocation;
            self.store.update(session).await;
            info!(user = %user_id, "Awaiting location for dust check");
            return texts::location_request().to_string();
        }

        if matches_any(&lowered, START_KEYWORDS) {
            return self.assessment.start(user_id).await;
        }

        if let Some(answer) = self.assessment.faq_lookup(text) {
            return answer;
        }

        texts::not_understood().to_string()
    }

    /// Handle a shared location: whatever was in flight is silently
    /// abandoned (state drops to idle, recorded answers linger until the
    /// next start or cancel), and the nearest-station report is sent.
    pub async fn handle_location(&self, user_id: &str, lat: f64, lng: f64) -> String {
        let mut session = self.store.session(user_id).await;
        session.state = ConversationState::Idle;
        self.store.update(session).await;

        match self.stations.nearest_station(lat, lng).await {
            Ok(Some(station)) => report::nearest_report(&station),
            Ok(None) => report::no_station_text().to_string(),
            Err(e) => {
                warn!(user = %user_id, error = %e, "Nearest-station lookup failed");
                report::unavailable_text().to_string()
            }
        }
    }
}

fn matches_any(text: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|kw| text.contains(kw))
}
