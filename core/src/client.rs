//! Proxy client and stream reassembly
//!
//! Consumes the proxy's response: posts one turn, reads the SSE body as
//! byte chunks, reassembles `data:` frames across chunk boundaries, and
//! drives the caller's callbacks. `on_chunk` fires per content delta in
//! arrival order; `on_error` fires at most once, after which no further
//! callbacks run; `on_complete` fires exactly once on a clean end.

use bytes::Bytes;
use futures::Stream;
use futures_util::StreamExt;
use serde::Deserialize;

use crate::error::{Result, ThemisError};
use crate::llm::chat::StreamChunk;
use crate::llm::{ChatMessage, ChatResponse, Usage};
use crate::sse::{parse_data_line, LineScanner, SseData};

/// Error body shape returned by the proxy
#[derive(Debug, Deserialize)]
struct ProxyErrorBody {
    #[serde(default)]
    error: Option<String>,
}

/// Outcome of a buffered send
#[derive(Debug, Clone)]
pub struct ChatOutcome {
    /// Full answer text (thinking markers still embedded)
    pub message: String,
    /// Token usage when the proxy ran in buffered mode
    pub usage: Option<Usage>,
    /// Whether the turn completed
    pub success: bool,
    /// Readable failure description when it did not
    pub error: Option<String>,
}

/// Client for the completion proxy
pub struct ChatClient {
    endpoint: String,
    http_client: reqwest::Client,
}

impl ChatClient {
    /// Create a client for the given proxy chat endpoint
    /// (e.g. `http://127.0.0.1:8080/chat`)
    pub fn new(endpoint: impl Into<String>) -> Result<Self> {
        let http_client = reqwest::Client::builder().build().map_err(|e| {
            ThemisError::Configuration {
                message: format!("failed to build HTTP client: {}", e),
            }
        })?;
        Ok(ChatClient {
            endpoint: endpoint.into(),
            http_client,
        })
    }

    /// Send one turn and stream the reply through callbacks.
    ///
    /// Handles both proxy modes: an SSE body is reassembled frame by frame;
    /// a buffered JSON body is delivered as a single chunk.
    pub async fn send_message_stream<FC, FE, FD>(
        &self,
        message: &str,
        history: &[ChatMessage],
        role_id: &str,
        on_chunk: FC,
        on_error: FE,
        on_complete: FD,
    ) where
        FC: FnMut(&str),
        FE: FnOnce(String),
        FD: FnOnce(),
    {
        if message.trim().is_empty() {
            on_error("消息内容不能为空".to_string());
            return;
        }

        let body = serde_json::json!({
            "message": message,
            "history": history,
            "roleId": role_id,
        });

        let response = match self
            .http_client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(error = %e, "failed to reach proxy");
                on_error("网络连接错误，请检查您的网络连接后重试。".to_string());
                return;
            }
        };

        let status = response.status();
        if !status.is_success() {
            on_error(error_message_for_status(status.as_u16(), response).await);
            return;
        }

        let is_event_stream = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.starts_with("text/event-stream"))
            .unwrap_or(false);

        if is_event_stream {
            consume_sse_stream(response.bytes_stream(), on_chunk, on_error, on_complete).await;
        } else {
            // Buffered proxy mode: one JSON body, delivered as one chunk.
            let mut on_chunk = on_chunk;
            match response.json::<ChatResponse>().await {
                Ok(parsed) => {
                    let content = parsed.content();
                    if !content.is_empty() {
                        on_chunk(content);
                    }
                    on_complete();
                }
                Err(e) => {
                    tracing::warn!(error = %e, "failed to parse buffered proxy response");
                    on_error("服务器返回了无法解析的响应，请稍后重试。".to_string());
                }
            }
        }
    }

    /// Send one turn and wait for the whole reply
    pub async fn send_message(
        &self,
        message: &str,
        history: &[ChatMessage],
        role_id: &str,
    ) -> ChatOutcome {
        let mut full = String::new();
        let mut failure: Option<String> = None;
        let mut completed = false;

        self.send_message_stream(
            message,
            history,
            role_id,
            |chunk| full.push_str(chunk),
            |error| failure = Some(error),
            || completed = true,
        )
        .await;

        match failure {
            Some(error) => ChatOutcome {
                message: String::new(),
                usage: None,
                success: false,
                error: Some(error),
            },
            None => ChatOutcome {
                message: full,
                usage: None,
                success: completed,
                error: None,
            },
        }
    }
}

/// Map a non-success proxy status to the remedy text shown to the user
async fn error_message_for_status(status: u16, response: reqwest::Response) -> String {
    match status {
        408 => "请求超时，请尝试提出更简洁的问题，或稍后重试。".to_string(),
        502 => "服务暂时不可用，这可能是因为问题过于复杂。请尝试：\n\
                1. 简化您的问题\n\
                2. 分步骤提问\n\
                3. 稍后重试"
            .to_string(),
        503 => "AI服务暂时不可用，请稍后重试。".to_string(),
        _ => {
            let body: Option<ProxyErrorBody> = response.json().await.ok();
            body.and_then(|b| b.error)
                .unwrap_or_else(|| format!("服务错误 ({})，请稍后重试", status))
        }
    }
}

/// Reassemble an SSE byte-chunk stream and drive the callbacks.
///
/// Only `data: ` lines are meaningful; `[DONE]` ends consumption with
/// `on_complete`. Unparsable payload lines are skipped. A transport failure
/// invokes `on_error` once and stops; a stream that ends without the
/// sentinel still completes cleanly.
pub async fn consume_sse_stream<S, E, FC, FE, FD>(
    mut body: S,
    mut on_chunk: FC,
    on_error: FE,
    on_complete: FD,
) where
    S: Stream<Item = std::result::Result<Bytes, E>> + Unpin,
    E: std::fmt::Display,
    FC: FnMut(&str),
    FE: FnOnce(String),
    FD: FnOnce(),
{
    let mut scanner = LineScanner::new();

    while let Some(chunk) = body.next().await {
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(e) => {
                tracing::warn!(error = %e, "stream transport failed");
                on_error("网络连接错误，请检查您的网络连接后重试。".to_string());
                return;
            }
        };

        for line in scanner.push(&chunk) {
            match parse_data_line(&line) {
                Some(SseData::Done) => {
                    on_complete();
                    return;
                }
                Some(SseData::Payload(payload)) => {
                    match serde_json::from_str::<StreamChunk>(&payload) {
                        Ok(parsed) => {
                            if !parsed.content.is_empty() {
                                on_chunk(&parsed.content);
                            }
                        }
                        Err(e) => {
                            // One malformed line never aborts the stream.
                            tracing::debug!(error = %e, "skipping unparsable frame");
                        }
                    }
                }
                None => {}
            }
        }
    }

    on_complete();
}
