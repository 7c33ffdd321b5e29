//! Upstream completion client
//!
//! Talks to the OpenAI-compatible SiliconFlow chat-completion endpoint in
//! buffered or streaming form. The client is stateless; every call builds
//! its request from scratch and enforces the configured timeout so a stuck
//! upstream is converted into a clean timeout error instead of a platform
//! cutoff.

use std::pin::Pin;
use std::time::Duration;

use futures::Stream;
use futures_util::StreamExt;
use reqwest::{header, Client as HttpClient, StatusCode};

use crate::config::UpstreamConfig;
use crate::error::{Result, ThemisError};
use crate::llm::chat::{ChatRequest, StreamEvent, StreamResponse};
use crate::sse::{parse_data_line, LineScanner, SseData};

/// Client for the upstream completion API
pub struct LlmClient {
    config: UpstreamConfig,
    http_client: HttpClient,
}

impl LlmClient {
    /// Create a new client from upstream configuration
    pub fn new(config: UpstreamConfig) -> Result<Self> {
        let http_client = HttpClient::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| ThemisError::Configuration {
                message: format!("failed to build HTTP client: {}", e),
            })?;

        Ok(LlmClient {
            config,
            http_client,
        })
    }

    /// Completion endpoint URL
    fn completions_url(&self) -> String {
        format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        )
    }

    /// Bearer credential; absence is a configuration error, not a
    /// per-request validation failure
    fn bearer_token(&self) -> Result<&str> {
        match self.config.api_key.as_deref() {
            Some(key) if !key.trim().is_empty() => Ok(key),
            _ => Err(ThemisError::Configuration {
                message: "upstream API key is not configured".to_string(),
            }),
        }
    }

    /// Configured per-call bound
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.config.timeout_seconds)
    }

    /// Buffered chat completion.
    ///
    /// Returns the upstream body verbatim as JSON so the proxy can pass the
    /// exact `choices` / `usage` shape through to its caller.
    pub async fn chat(&self, request: &ChatRequest) -> Result<serde_json::Value> {
        let token = self.bearer_token()?.to_string();
        let timeout = self.timeout();

        // One deadline covers both sending the request and reading the
        // body; the configured bound is the worst-case wall time.
        let call = async {
            let response = self
                .http_client
                .post(self.completions_url())
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .header(header::CONTENT_TYPE, "application/json")
                .json(request)
                .send()
                .await?;

            let status = response.status();
            if status != StatusCode::OK {
                let detail = response.text().await.unwrap_or_default();
                tracing::warn!(status = status.as_u16(), "upstream returned an error");
                return Err(ThemisError::UpstreamStatus {
                    status: status.as_u16(),
                    detail,
                });
            }

            Ok(response.json::<serde_json::Value>().await?)
        };

        match tokio::time::timeout(timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(ThemisError::Timeout { duration: timeout }),
        }
    }

    /// Streaming chat completion.
    ///
    /// Emits `StreamEvent::Content` per upstream delta, in arrival order,
    /// then exactly one `StreamEvent::Done`. Individual unparsable SSE
    /// lines are logged and skipped; they never abort the stream. The
    /// timeout bounds the time to the upstream's response headers; after
    /// that the stream is considered live.
    pub fn chat_stream(
        &self,
        request: &ChatRequest,
    ) -> Pin<Box<dyn Stream<Item = Result<StreamEvent>> + Send + 'static>> {
        let token = self.bearer_token().map(str::to_string);
        let timeout = self.timeout();
        let url = self.completions_url();
        let http_client = self.http_client.clone();
        let body = ChatRequest {
            stream: true,
            ..request.clone()
        };

        Box::pin(async_stream::try_stream! {
            let token = token?;
            let send = http_client
                .post(&url)
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .header(header::CONTENT_TYPE, "application/json")
                .json(&body)
                .send();

            let response = match tokio::time::timeout(timeout, send).await {
                Ok(result) => result?,
                Err(_) => Err(ThemisError::Timeout { duration: timeout })?,
            };

            let status = response.status();
            if status != StatusCode::OK {
                let detail = response.text().await.unwrap_or_default();
                Err(ThemisError::UpstreamStatus {
                    status: status.as_u16(),
                    detail,
                })?;
                return;
            }

            let mut bytes = response.bytes_stream();
            let mut scanner = LineScanner::new();

            while let Some(chunk) = bytes.next().await {
                let chunk = chunk.map_err(|e| ThemisError::StreamDisconnected {
                    reason: e.to_string(),
                })?;

                for line in scanner.push(&chunk) {
                    match parse_data_line(&line) {
                        Some(SseData::Done) => {
                            yield StreamEvent::Done;
                            return;
                        }
                        Some(SseData::Payload(payload)) => {
                            match serde_json::from_str::<StreamResponse>(&payload) {
                                Ok(parsed) => {
                                    let choice = parsed.choices.first();
                                    if let Some(content) =
                                        choice.and_then(|c| c.delta.content.clone())
                                    {
                                        yield StreamEvent::Content(content);
                                    }
                                    if choice.and_then(|c| c.finish_reason.as_deref()).is_some() {
                                        yield StreamEvent::Done;
                                        return;
                                    }
                                }
                                Err(e) => {
                                    // One bad line must not kill the stream.
                                    tracing::debug!(error = %e, "skipping unparsable stream line");
                                }
                            }
                        }
                        None => {}
                    }
                }
            }

            yield StreamEvent::Done;
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::UpstreamConfig;

    fn config_without_key() -> UpstreamConfig {
        UpstreamConfig {
            api_key: None,
            ..UpstreamConfig::default()
        }
    }

    #[test]
    fn test_completions_url_handles_trailing_slash() {
        let config = UpstreamConfig {
            base_url: "https://api.siliconflow.cn/v1/".to_string(),
            ..UpstreamConfig::default()
        };
        let client = LlmClient::new(config).unwrap();
        assert_eq!(
            client.completions_url(),
            "https://api.siliconflow.cn/v1/chat/completions"
        );
    }

    #[test]
    fn test_missing_key_is_configuration_error() {
        let client = LlmClient::new(config_without_key()).unwrap();
        let err = client.bearer_token().unwrap_err();
        assert_eq!(err.status_code(), 500);
        assert_eq!(err.kind(), "configuration");
    }

    #[tokio::test]
    async fn test_buffered_call_fails_fast_without_key() {
        let client = LlmClient::new(config_without_key()).unwrap();
        let request = ChatRequest::new("m", vec![]);
        let err = client.chat(&request).await.unwrap_err();
        assert!(matches!(err, ThemisError::Configuration { .. }));
    }
}
