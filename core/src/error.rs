//! Structured error types for Themis
//!
//! Maps every failure of the completion pipeline to an HTTP status and a
//! user-facing message. The upstream credential never appears in any
//! rendered message.

use std::time::Duration;
use thiserror::Error;

/// Primary error type for Themis operations
#[derive(Error, Debug)]
pub enum ThemisError {
    /// Request body failed validation (empty message, bad history, empty role id)
    #[error("invalid input: {message}")]
    InvalidInput { message: String },

    /// Request body was not valid JSON
    #[error("malformed request body: {detail}")]
    MalformedBody { detail: String },

    /// Upstream call exceeded the configured bound and was aborted
    #[error("upstream request timed out after {duration:?}")]
    Timeout { duration: Duration },

    /// Upstream returned a non-success status
    #[error("upstream service error: {status}")]
    UpstreamStatus { status: u16, detail: String },

    /// Network failure reaching the upstream
    #[error("failed to reach upstream: {message}")]
    UpstreamUnreachable { message: String },

    /// Missing or unusable process configuration (e.g. no API key)
    #[error("configuration error: {message}")]
    Configuration { message: String },

    /// A single stream line could not be parsed; never aborts the stream
    #[error("unparsable stream line: {line}")]
    StreamParse { line: String },

    /// The response body stream broke mid-transfer
    #[error("stream disconnected: {reason}")]
    StreamDisconnected { reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ThemisError {
    /// HTTP status this error maps to at the proxy boundary
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidInput { .. } | Self::MalformedBody { .. } => 400,
            Self::Timeout { .. } => 408,
            Self::UpstreamStatus { status, .. } => {
                // 5xx from the model service surfaces as a bad gateway;
                // anything else (401, 429...) as service unavailable.
                if *status >= 500 {
                    502
                } else {
                    503
                }
            }
            Self::UpstreamUnreachable { .. } => 503,
            Self::Configuration { .. } | Self::Io(_) => 500,
            Self::StreamParse { .. } | Self::StreamDisconnected { .. } => 500,
        }
    }

    /// Check if error is retryable (transient)
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Timeout { .. }
                | Self::UpstreamStatus { .. }
                | Self::UpstreamUnreachable { .. }
                | Self::StreamDisconnected { .. }
        )
    }

    /// Short machine-readable kind, carried in error response bodies
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidInput { .. } => "invalid_input",
            Self::MalformedBody { .. } => "malformed_body",
            Self::Timeout { .. } => "timeout",
            Self::UpstreamStatus { .. } | Self::UpstreamUnreachable { .. } => {
                "upstream_unavailable"
            }
            Self::Configuration { .. } => "configuration",
            Self::StreamParse { .. } => "stream_parse",
            Self::StreamDisconnected { .. } => "stream_disconnected",
            Self::Io(_) => "io",
        }
    }

    /// Get a user-friendly error message
    ///
    /// Validation errors echo their own message; everything else is rendered
    /// as generic guidance so internal detail (and the credential) stays out
    /// of responses.
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidInput { message } => message.clone(),
            Self::MalformedBody { .. } => "请求格式错误".to_string(),
            Self::Timeout { .. } => "请求超时，请尝试提出更简洁的问题，或稍后重试。".to_string(),
            Self::UpstreamStatus { .. } | Self::UpstreamUnreachable { .. } => {
                "抱歉，AI 服务暂时不可用，请稍后再试。".to_string()
            }
            Self::StreamDisconnected { .. } => {
                "网络连接错误，请检查您的网络连接后重试。".to_string()
            }
            _ => "服务器内部错误，请稍后再试。".to_string(),
        }
    }
}

/// Result type alias using ThemisError
pub type Result<T> = std::result::Result<T, ThemisError>;

impl From<reqwest::Error> for ThemisError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            // The concrete bound lives in the client; reqwest only reports
            // that the deadline elapsed.
            Self::Timeout {
                duration: Duration::ZERO,
            }
        } else if let Some(status) = err.status() {
            Self::UpstreamStatus {
                status: status.as_u16(),
                detail: err.to_string(),
            }
        } else {
            Self::UpstreamUnreachable {
                message: err.to_string(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let err = ThemisError::InvalidInput {
            message: "消息内容不能为空".to_string(),
        };
        assert_eq!(err.status_code(), 400);

        let err = ThemisError::Timeout {
            duration: Duration::from_secs(15),
        };
        assert_eq!(err.status_code(), 408);
        assert!(err.is_retryable());

        let err = ThemisError::UpstreamStatus {
            status: 500,
            detail: "internal".to_string(),
        };
        assert_eq!(err.status_code(), 502);

        let err = ThemisError::UpstreamStatus {
            status: 429,
            detail: "rate limited".to_string(),
        };
        assert_eq!(err.status_code(), 503);
    }

    #[test]
    fn test_user_message_hides_internal_detail() {
        let err = ThemisError::Configuration {
            message: "SILICONFLOW_API_KEY not set".to_string(),
        };
        assert!(!err.user_message().contains("SILICONFLOW_API_KEY"));
    }

    #[test]
    fn test_timeout_message_suggests_retry() {
        let err = ThemisError::Timeout {
            duration: Duration::from_secs(15),
        };
        assert!(err.user_message().contains("重试"));
    }
}
