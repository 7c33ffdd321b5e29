//! Chat session state
//!
//! Ordered list of turns owned by the presentation layer. The pipeline only
//! appends turns and updates the single active streaming turn through the
//! stream callbacks; the proxy itself stays stateless and reconstructs
//! continuity from the history this session supplies on every request.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::llm::{ChatMessage, MessageRole};
use crate::thinking::ThinkingSplitter;

/// One entry of the conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurn {
    /// Unique turn id
    pub id: Uuid,
    /// Who produced the turn
    pub sender: MessageRole,
    /// Answer text (thinking segment removed)
    pub text: String,
    /// Thinking segment, empty when the model emitted none
    pub thinking: String,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// True while chunks are still arriving for this turn
    pub is_streaming: bool,
}

impl ChatTurn {
    fn new(sender: MessageRole, text: impl Into<String>, is_streaming: bool) -> Self {
        ChatTurn {
            id: Uuid::new_v4(),
            sender,
            text: text.into(),
            thinking: String::new(),
            created_at: Utc::now(),
            is_streaming,
        }
    }
}

/// In-memory conversation state
#[derive(Debug)]
pub struct ChatSession {
    turns: Vec<ChatTurn>,
    greeting: String,
    splitter: ThinkingSplitter,
    /// Raw accumulated text of the active streaming turn, markers included;
    /// the split is recomputed from it on every chunk
    active_raw: String,
}

impl ChatSession {
    /// Create a session seeded with the assistant greeting for a role
    pub fn new(role_display_name: &str, role_description: &str) -> Self {
        let greeting = format!(
            "您好！我是 {}，{}。请问有什么可以为您服务的吗？",
            role_display_name, role_description
        );
        let mut session = ChatSession {
            turns: Vec::new(),
            greeting,
            splitter: ThinkingSplitter::default(),
            active_raw: String::new(),
        };
        session.seed_greeting();
        session
    }

    fn seed_greeting(&mut self) {
        self.turns
            .push(ChatTurn::new(MessageRole::Assistant, self.greeting.clone(), false));
    }

    /// All turns in chronological order
    pub fn turns(&self) -> &[ChatTurn] {
        &self.turns
    }

    /// Completed turns as upstream history, oldest first
    pub fn history(&self) -> Vec<ChatMessage> {
        self.turns
            .iter()
            .filter(|t| !t.is_streaming)
            .map(|t| ChatMessage {
                role: t.sender,
                content: t.text.clone(),
            })
            .collect()
    }

    /// Append a completed user turn
    pub fn push_user(&mut self, text: impl Into<String>) -> Uuid {
        let turn = ChatTurn::new(MessageRole::User, text, false);
        let id = turn.id;
        self.turns.push(turn);
        id
    }

    /// Append a completed assistant turn (canned replies, error notices)
    pub fn push_assistant(&mut self, text: impl Into<String>) -> Uuid {
        let turn = ChatTurn::new(MessageRole::Assistant, text, false);
        let id = turn.id;
        self.turns.push(turn);
        id
    }

    /// Start the assistant's streaming turn.
    ///
    /// At most one turn streams at a time; a still-open previous turn is
    /// closed first so the invariant holds even on out-of-order callbacks.
    pub fn begin_assistant_turn(&mut self) -> Uuid {
        self.complete_active_turn();
        let turn = ChatTurn::new(MessageRole::Assistant, "", true);
        let id = turn.id;
        self.turns.push(turn);
        id
    }

    /// Apply one content delta to the active streaming turn, re-running the
    /// thinking/answer split over the full accumulated text
    pub fn apply_chunk(&mut self, delta: &str) {
        self.active_raw.push_str(delta);
        let split = self.splitter.split(&self.active_raw);
        if let Some(turn) = self.turns.iter_mut().rev().find(|t| t.is_streaming) {
            turn.text = split.answer;
            turn.thinking = split.thinking;
        }
    }

    /// Mark the active streaming turn as finished
    pub fn complete_active_turn(&mut self) {
        self.active_raw.clear();
        if let Some(turn) = self.turns.iter_mut().rev().find(|t| t.is_streaming) {
            turn.is_streaming = false;
        }
    }

    /// Replace the active streaming turn with a readable error notice
    pub fn fail_active_turn(&mut self, error: &str) {
        self.active_raw.clear();
        self.turns.retain(|t| !t.is_streaming);
        self.push_assistant(format!(
            "抱歉，发生了错误：{}\n\n请您：\n\
             • 检查网络连接是否正常\n\
             • 稍后重试您的问题\n\
             • 如果问题持续存在，请联系技术支持",
            error
        ));
    }

    /// Discard all turns and reseed the greeting
    pub fn clear(&mut self) {
        self.turns.clear();
        self.active_raw.clear();
        self.seed_greeting();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> ChatSession {
        ChatSession::new("獬豸 Themis AI", "覆盖各领域的通用法律咨询")
    }

    #[test]
    fn test_new_session_has_greeting() {
        let s = session();
        assert_eq!(s.turns().len(), 1);
        assert_eq!(s.turns()[0].sender, MessageRole::Assistant);
        assert!(s.turns()[0].text.contains("獬豸 Themis AI"));
        assert!(!s.turns()[0].is_streaming);
    }

    #[test]
    fn test_streaming_turn_lifecycle() {
        let mut s = session();
        s.push_user("合同违约怎么办？");
        let id = s.begin_assistant_turn();

        s.apply_chunk("<thinking>查");
        s.apply_chunk("合同法</thinking>建议");
        s.apply_chunk("先协商。");

        let turn = s.turns().iter().find(|t| t.id == id).unwrap();
        assert!(turn.is_streaming);
        assert_eq!(turn.thinking, "查合同法");
        assert_eq!(turn.text, "建议先协商。");

        s.complete_active_turn();
        let turn = s.turns().iter().find(|t| t.id == id).unwrap();
        assert!(!turn.is_streaming);
    }

    #[test]
    fn test_only_one_streaming_turn() {
        let mut s = session();
        s.begin_assistant_turn();
        s.begin_assistant_turn();
        assert_eq!(s.turns().iter().filter(|t| t.is_streaming).count(), 1);
    }

    #[test]
    fn test_history_excludes_streaming_turn() {
        let mut s = session();
        s.push_user("问题");
        s.begin_assistant_turn();
        s.apply_chunk("部分回答");

        let history = s.history();
        assert_eq!(history.len(), 2); // greeting + user
        assert_eq!(history[1].content, "问题");
    }

    #[test]
    fn test_fail_active_turn_replaces_with_notice() {
        let mut s = session();
        s.push_user("问题");
        s.begin_assistant_turn();
        s.apply_chunk("半截回");
        s.fail_active_turn("请求超时，请尝试提出更简洁的问题，或稍后重试。");

        assert!(s.turns().iter().all(|t| !t.is_streaming));
        let last = s.turns().last().unwrap();
        assert!(last.text.contains("抱歉，发生了错误"));
        assert!(last.text.contains("稍后重试"));
        assert!(!s.turns().iter().any(|t| t.text.contains("半截回")));
    }

    #[test]
    fn test_clear_reseeds_greeting() {
        let mut s = session();
        s.push_user("一");
        s.push_assistant("二");
        s.clear();
        assert_eq!(s.turns().len(), 1);
        assert!(s.turns()[0].text.contains("请问有什么可以为您服务的吗"));
    }
}
