//! Chat message types for upstream communication
//!
//! Defines the message structures for the OpenAI-compatible chat-completion
//! API used by SiliconFlow, in both buffered and streaming form.

use serde::{Deserialize, Serialize};

/// Role of the message sender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// System message (persona instructions for the model)
    System,
    /// User message
    User,
    /// Assistant message (model response)
    Assistant,
}

/// A single message in a conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Role of the message sender
    pub role: MessageRole,
    /// Content of the message
    pub content: String,
}

impl ChatMessage {
    /// Create a new user message
    pub fn user(content: impl Into<String>) -> Self {
        ChatMessage {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    /// Create a new system message
    pub fn system(content: impl Into<String>) -> Self {
        ChatMessage {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    /// Create a new assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        ChatMessage {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }
}

/// Request body for chat completion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    /// ID of the model to use
    pub model: String,
    /// List of messages in the conversation
    pub messages: Vec<ChatMessage>,
    /// Maximum tokens to generate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Temperature for sampling (0-2)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// Nucleus sampling cutoff
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    /// Whether to stream the response
    #[serde(default)]
    pub stream: bool,
    /// Qwen3 thinking mode (SiliconFlow extension)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_thinking: Option<bool>,
}

impl ChatRequest {
    /// Create a new chat request
    pub fn new(model: impl Into<String>, messages: Vec<ChatMessage>) -> Self {
        ChatRequest {
            model: model.into(),
            messages,
            max_tokens: None,
            temperature: None,
            top_p: None,
            stream: false,
            enable_thinking: None,
        }
    }

    /// Build the canonical message sequence: system prompt, then the
    /// caller-supplied history, then the new user message. Order is
    /// chronological and must be preserved.
    pub fn conversation(
        model: impl Into<String>,
        system_prompt: impl Into<String>,
        history: Vec<ChatMessage>,
        user_message: impl Into<String>,
    ) -> Self {
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(ChatMessage::system(system_prompt));
        messages.extend(history);
        messages.push(ChatMessage::user(user_message));
        ChatRequest::new(model, messages)
    }

    /// Set max tokens
    pub fn with_max_tokens(mut self, tokens: u32) -> Self {
        self.max_tokens = Some(tokens);
        self
    }

    /// Set temperature
    pub fn with_temperature(mut self, temp: f32) -> Self {
        self.temperature = Some(temp.clamp(0.0, 2.0));
        self
    }

    /// Set nucleus sampling cutoff
    pub fn with_top_p(mut self, top_p: f32) -> Self {
        self.top_p = Some(top_p.clamp(0.0, 1.0));
        self
    }

    /// Enable streaming
    pub fn with_streaming(mut self, stream: bool) -> Self {
        self.stream = stream;
        self
    }

    /// Toggle the model's thinking mode
    pub fn with_thinking(mut self, enabled: bool) -> Self {
        self.enable_thinking = Some(enabled);
        self
    }
}

/// Response from a buffered chat completion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    /// List of generated completions
    pub choices: Vec<Choice>,
    /// Usage statistics
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

impl ChatResponse {
    /// Content of the first choice, empty when the upstream returned none
    pub fn content(&self) -> &str {
        self.choices
            .first()
            .map(|c| c.message.content.as_str())
            .unwrap_or_default()
    }
}

/// A single completion choice
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Choice {
    /// The generated message
    pub message: ChatMessage,
    /// Reason for stopping
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
}

/// Token usage statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Usage {
    /// Tokens in the prompt
    pub prompt_tokens: u32,
    /// Tokens in the completion
    pub completion_tokens: u32,
    /// Total tokens used
    pub total_tokens: u32,
}

/// One line of the upstream's SSE stream (`choices[].delta` shape)
#[derive(Debug, Clone, Deserialize)]
pub struct StreamResponse {
    /// Incremental choices
    #[serde(default)]
    pub choices: Vec<StreamChoice>,
}

/// A single streamed choice delta
#[derive(Debug, Clone, Deserialize)]
pub struct StreamChoice {
    /// The incremental payload
    #[serde(default)]
    pub delta: StreamDelta,
    /// Set on the final delta of the stream
    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// Incremental message fragment
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StreamDelta {
    /// New content tokens, absent on role-only deltas
    #[serde(default)]
    pub content: Option<String>,
}

/// The frame payload the proxy re-emits to its own callers:
/// `data: {"content": <delta>}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamChunk {
    /// Incremental answer text
    pub content: String,
}

/// Stream event types for streaming responses
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// Content chunk received
    Content(String),
    /// Streaming is complete
    Done,
}

impl StreamEvent {
    /// Check if this is a content event
    pub fn is_content(&self) -> bool {
        matches!(self, StreamEvent::Content(_))
    }

    /// Check if streaming is done
    pub fn is_done(&self) -> bool {
        matches!(self, StreamEvent::Done)
    }

    /// Get content if available
    pub fn content(&self) -> Option<&str> {
        match self {
            StreamEvent::Content(s) => Some(s),
            StreamEvent::Done => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_message_creation() {
        let user_msg = ChatMessage::user("你好");
        assert_eq!(user_msg.role, MessageRole::User);
        assert_eq!(user_msg.content, "你好");

        let system_msg = ChatMessage::system("你是法律助手");
        assert_eq!(system_msg.role, MessageRole::System);
    }

    #[test]
    fn test_conversation_preserves_order() {
        let history = vec![
            ChatMessage::user("第一个问题"),
            ChatMessage::assistant("第一个回答"),
        ];
        let request =
            ChatRequest::conversation("Qwen/Qwen3-235B-A22B", "系统提示", history, "新问题");

        assert_eq!(request.messages.len(), 4);
        assert_eq!(request.messages[0].role, MessageRole::System);
        assert_eq!(request.messages[0].content, "系统提示");
        assert_eq!(request.messages[1].content, "第一个问题");
        assert_eq!(request.messages[2].content, "第一个回答");
        assert_eq!(request.messages[3].role, MessageRole::User);
        assert_eq!(request.messages[3].content, "新问题");
    }

    #[test]
    fn test_chat_request_builder() {
        let request = ChatRequest::new("Qwen/Qwen3-235B-A22B", vec![])
            .with_max_tokens(8192)
            .with_temperature(0.7)
            .with_top_p(0.9)
            .with_streaming(true)
            .with_thinking(true);

        assert_eq!(request.max_tokens, Some(8192));
        assert_eq!(request.temperature, Some(0.7));
        assert_eq!(request.top_p, Some(0.9));
        assert!(request.stream);
        assert_eq!(request.enable_thinking, Some(true));
    }

    #[test]
    fn test_temperature_clamping() {
        let request = ChatRequest::new("m", vec![]).with_temperature(3.0);
        assert_eq!(request.temperature, Some(2.0));
    }

    #[test]
    fn test_request_serializes_without_absent_options() {
        let request = ChatRequest::new("m", vec![ChatMessage::user("hi")]);
        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("max_tokens").is_none());
        assert!(json.get("enable_thinking").is_none());
        assert_eq!(json["stream"], serde_json::json!(false));
    }

    #[test]
    fn test_stream_delta_parsing() {
        let line = r#"{"choices":[{"delta":{"content":"您好"},"finish_reason":null}]}"#;
        let parsed: StreamResponse = serde_json::from_str(line).unwrap();
        assert_eq!(parsed.choices[0].delta.content.as_deref(), Some("您好"));
        assert!(parsed.choices[0].finish_reason.is_none());

        let done = r#"{"choices":[{"delta":{},"finish_reason":"stop"}]}"#;
        let parsed: StreamResponse = serde_json::from_str(done).unwrap();
        assert!(parsed.choices[0].delta.content.is_none());
        assert_eq!(parsed.choices[0].finish_reason.as_deref(), Some("stop"));
    }
}
