//! Upstream LLM module
//!
//! Chat-completion types and the client for the OpenAI-compatible
//! SiliconFlow endpoint, in buffered and streaming form.

pub mod chat;
pub mod client;

pub use chat::{
    ChatMessage, ChatRequest, ChatResponse, Choice, MessageRole, StreamChunk, StreamEvent, Usage,
};
pub use client::LlmClient;
