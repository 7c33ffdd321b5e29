//! Themis core: the streaming completion pipeline behind a legal-advice
//! chat assistant.
//!
//! The proxy side ([`server`]) validates one request per user turn, injects
//! a role-specific system prompt and relays the upstream completion either
//! buffered or as SSE. The client side ([`client`], [`session`]) consumes
//! that stream, reassembles frames, splits the thinking preamble from the
//! answer and updates the conversation state.

pub mod client;
pub mod config;
pub mod error;
pub mod filter;
pub mod llm;
pub mod roles;
pub mod server;
pub mod session;
pub mod sse;
pub mod thinking;

// Re-exports for convenience
pub use config::Config;
pub use error::{Result, ThemisError};
pub use roles::{get_role_by_id, list_roles, RoleProfile};
pub use session::{ChatSession, ChatTurn};
