use std::sync::Arc;

use tracing::info;

use dustline_core::ConversationState;
use dustline_session::SessionStore;

use crate::{faq, questions, scoring};

/// Runs the fixed question sequence against a user's session.
pub struct Assessment {
    store: Arc<SessionStore>,
}

impl Assessment {
    pub fn new(store: Arc<SessionStore>) -> Self {
        Self { store }
    }

    /// Start a fresh assessment: reset the session, enter `Assessment`, and
    /// return the first formatted question.
    pub async fn start(&self, user_id: &str) -> String {
        let mut session = self.store.session(user_id).await;
        session.reset();
        session.state = ConversationState::Assessment;
        session.current_question_index = 0;
        self.store.update(session).await;
        info!(user = %user_id, "Assessment started");

        format_question(0).unwrap_or_default()
    }

    /// Process one raw answer.
    ///
    /// Returns `(None, false)` when the session is not in an assessment.
    /// Otherwise the reply is the re-prompt, the next question, or the final
    /// recommendation; the bool is true exactly when the assessment just
    /// completed.
    pub async fn submit_answer(&self, user_id: &str, raw: &str) -> (Option<String>, bool) {
        let session = self.store.session(user_id).await;
        if session.state != ConversationState::Assessment {
            return (None, false);
        }

        let Some(question) = questions::question(session.current_question_index) else {
            // Index ran past the table (stale snapshot); finish gracefully.
            return (Some(self.complete(user_id).await), true);
        };

        let Some(choice) = parse_answer(raw, question.options.len()) else {
            let reprompt = format!("กรุณาตอบเป็นตัวเลข 1-{} ค่ะ", question.options.len());
            return (Some(reprompt), false);
        };

        let option = &question.options[choice - 1];
        self.store
            .record_answer(user_id, question.id, option.score)
            .await;

        let mut session = self.store.session(user_id).await;
        session.current_question_index += 1;

        if session.current_question_index >= questions::total_questions() {
            (Some(self.complete(user_id).await), true)
        } else {
            let next = format_question(session.current_question_index).unwrap_or_default();
            self.store.update(session).await;
            (Some(next), false)
        }
    }

    /// Cancel the current assessment and reset the session.
    pub async fn cancel(&self, user_id: &str) -> String {
        let mut session = self.store.session(user_id).await;
        session.reset();
        self.store.update(session).await;
        info!(user = %user_id, "Assessment cancelled");

        "ยกเลิกการประเมินแล้วค่ะ\n\nพิมพ์ 'ประเมินอาการ' เพื่อเริ่มใหม่ หรือถามคำถามเกี่ยวกับ PM2.5 ได้เลยค่ะ"
            .to_string()
    }

    /// Answer an FAQ query: an all-digit query is a menu number, anything
    /// else goes through keyword matching.
    pub fn faq_lookup(&self, query: &str) -> Option<String> {
        if let Ok(number) = query.trim().parse::<usize>() {
            return faq::faq_by_number(number).map(|entry| entry.answer.to_string());
        }
        faq::find_faq(query).map(|entry| entry.answer.to_string())
    }

    async fn complete(&self, user_id: &str) -> String {
        let mut session = self.store.session(user_id).await;
        let total_score = session.total_score;
        session.reset();
        self.store.update(session).await;
        info!(user = %user_id, score = total_score, "Assessment completed");

        scoring::recommend(total_score)
    }
}

/// Format one question: progress header, prompt, option labels, numeric
/// answer instruction.
fn format_question(index: usize) -> Option<String> {
    let question = questions::question(index)?;
    let labels: Vec<&str> = question.options.iter().map(|opt| opt.label).collect();
    Some(format!(
        "📝 คำถามที่ {}/{}\n\n{}\n\n{}\n\nกรุณาตอบเป็นตัวเลขค่ะ",
        index + 1,
        questions::total_questions(),
        question.prompt,
        labels.join("\n"),
    ))
}

/// Scan the raw text for its first digit and accept it as a 1-based option
/// index when it falls within `1..=max_options`.
fn parse_answer(raw: &str, max_options: usize) -> Option<usize> {
    let digit = raw.trim().chars().find_map(|c| c.to_digit(10))? as usize;
    (1..=max_options).contains(&digit).then_some(digit)
}
