//! Completion proxy server
//!
//! `POST /chat`: validate the JSON body, resolve the role's system prompt,
//! call the upstream completion endpoint and relay the answer, either as one
//! buffered JSON body or as a forwarded SSE stream of
//! `data: {"content": <delta>}` frames ending in `data: [DONE]`.
//!
//! The handler is stateless: conversational continuity comes entirely from
//! the caller-supplied history, and concurrent requests share nothing but
//! the HTTP client. Every response, error paths included, carries
//! permissive cross-origin headers so a browser client on another origin
//! can read it.

use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use axum::{
    body::{Body, Bytes},
    extract::State,
    http::{header, HeaderValue, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;

use crate::config::{Config, ResponseMode};
use crate::error::ThemisError;
use crate::llm::{ChatMessage, ChatRequest, LlmClient, StreamEvent};
use crate::roles::get_role_by_id;
use crate::sse::{format_frame, DONE_SENTINEL};

/// Request body for POST /chat
#[derive(Debug, Deserialize)]
pub struct ChatApiRequest {
    /// New user message
    pub message: String,
    /// Prior turns, oldest first
    #[serde(default)]
    pub history: Vec<ChatMessage>,
    /// Selected role; unknown ids fall back to the general role
    #[serde(default = "default_role_id", rename = "roleId")]
    pub role_id: String,
}

fn default_role_id() -> String {
    crate::roles::DEFAULT_ROLE_ID.to_string()
}

/// Error body shape: `{error, message?, type?}`
#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(rename = "type")]
    kind: &'static str,
}

/// Response-side wrapper mapping pipeline errors to HTTP
pub struct ApiError(pub ThemisError);

impl From<ThemisError> for ApiError {
    fn from(err: ThemisError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let err = self.0;
        let status =
            StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let detail = match &err {
            ThemisError::UpstreamStatus { status, .. } => Some(format!("API Error: {}", status)),
            ThemisError::InvalidInput { .. } | ThemisError::MalformedBody { .. } => None,
            // Never echo internal detail (or the credential) to the caller.
            _ => None,
        };
        tracing::warn!(kind = err.kind(), status = status.as_u16(), error = %err, "request failed");
        let body = ErrorBody {
            error: err.user_message(),
            message: detail,
            kind: err.kind(),
        };
        (status, Json(body)).into_response()
    }
}

/// Shared state: configuration plus the upstream client
#[derive(Clone)]
pub struct ProxyState {
    config: Arc<Config>,
    client: Arc<LlmClient>,
}

impl ProxyState {
    /// Build state from configuration
    pub fn new(config: Config) -> crate::error::Result<Self> {
        let client = LlmClient::new(config.upstream.clone())?;
        Ok(ProxyState {
            config: Arc::new(config),
            client: Arc::new(client),
        })
    }
}

/// Validate the request body; returns the trimmed message and role id.
///
/// Validation failures never reach the upstream call.
pub fn validate_chat_request(body: &ChatApiRequest) -> Result<(String, String), ThemisError> {
    let message = body.message.trim().to_string();
    if message.is_empty() {
        return Err(ThemisError::InvalidInput {
            message: "消息内容不能为空".to_string(),
        });
    }
    let role_id = body.role_id.trim().to_string();
    if role_id.is_empty() {
        return Err(ThemisError::InvalidInput {
            message: "角色ID不能为空".to_string(),
        });
    }
    Ok((message, role_id))
}

/// Build the upstream request for one turn:
/// `[system prompt] ++ history ++ [user message]`
fn build_upstream_request(
    state: &ProxyState,
    message: String,
    history: Vec<ChatMessage>,
    role_id: &str,
) -> ChatRequest {
    let upstream = &state.config.upstream;
    let role = get_role_by_id(role_id);
    ChatRequest::conversation(&upstream.model, &role.system_prompt, history, message)
        .with_max_tokens(upstream.max_tokens)
        .with_temperature(upstream.temperature)
        .with_top_p(upstream.top_p)
        .with_thinking(upstream.enable_thinking)
}

async fn handle_chat(
    State(state): State<ProxyState>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let body: ChatApiRequest =
        serde_json::from_slice(&body).map_err(|e| ThemisError::MalformedBody {
            detail: e.to_string(),
        })?;
    let (message, role_id) = validate_chat_request(&body)?;

    let history_len = body.history.len();
    let request = build_upstream_request(&state, message, body.history, &role_id);
    tracing::info!(
        role = %role_id,
        history = history_len,
        mode = ?state.config.server.response_mode,
        "chat request"
    );

    match state.config.server.response_mode {
        ResponseMode::Buffered => handle_buffered(&state, &request).await,
        ResponseMode::Streaming => handle_streaming(&state, &request).await,
    }
}

/// Wait for the full completion and pass the upstream JSON body through
async fn handle_buffered(state: &ProxyState, request: &ChatRequest) -> Result<Response, ApiError> {
    let started = Instant::now();
    let upstream_body = state.client.chat(request).await?;
    tracing::info!(elapsed_ms = started.elapsed().as_millis() as u64, "upstream answered");
    Ok(Json(upstream_body).into_response())
}

/// Forward the upstream event stream as SSE frames
async fn handle_streaming(state: &ProxyState, request: &ChatRequest) -> Result<Response, ApiError> {
    let mut events = state.client.chat_stream(request);

    // Resolve the first event before committing to a 200: configuration and
    // upstream failures that happen before any delta still get their proper
    // status code.
    let first = match events.next().await {
        Some(Err(err)) => return Err(ApiError(err)),
        other => other,
    };

    let frames = futures::stream::iter(first)
        .chain(events)
        .filter_map(|event| async move {
            match event {
                Ok(StreamEvent::Content(delta)) => {
                    let payload = serde_json::json!({ "content": delta }).to_string();
                    Some(Ok(Bytes::from(format_frame(&payload))))
                }
                Ok(StreamEvent::Done) => Some(Ok(Bytes::from(format_frame(DONE_SENTINEL)))),
                Err(err) => {
                    // Headers are already out; abort the transport so the
                    // client sees a broken stream instead of a fake DONE.
                    tracing::warn!(error = %err, "stream relay failed mid-transfer");
                    Some(Err(std::io::Error::other(err.to_string())))
                }
            }
        });

    let response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/event-stream")
        .header(header::CACHE_CONTROL, "no-cache")
        .header(header::CONNECTION, "keep-alive")
        .body(Body::from_stream(frames))
        .map_err(|e| ThemisError::Configuration {
            message: format!("failed to build stream response: {}", e),
        })?;
    Ok(response)
}

/// CORS pre-flight: 200 with empty body; headers come from the middleware
async fn handle_preflight() -> StatusCode {
    StatusCode::OK
}

/// Health probe body
#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    mode: ResponseMode,
    model: String,
}

async fn handle_health(State(state): State<ProxyState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        mode: state.config.server.response_mode,
        model: state.config.upstream.model.clone(),
    })
}

/// Attach permissive cross-origin headers to every response, error paths
/// and 405s included
async fn apply_cors(request: axum::extract::Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("POST, OPTIONS"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type"),
    );
    response
}

/// Build the proxy router
pub fn router(state: ProxyState) -> Router {
    Router::new()
        .route("/chat", post(handle_chat).options(handle_preflight))
        .route("/health", get(handle_health))
        .layer(middleware::from_fn(apply_cors))
        .with_state(state)
}

/// Run the proxy; binds to `bind_addr` (e.g. `127.0.0.1:8080`).
/// Graceful shutdown on Ctrl+C (SIGINT) and SIGTERM (Unix).
pub async fn run(config: Config, bind_addr: &str) -> Result<()> {
    let mode = config.server.response_mode;
    let timeout = config.upstream.timeout_seconds;
    let state = ProxyState::new(config).context("failed to initialize proxy state")?;
    let app = router(state);
    let listener = TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;
    tracing::info!(
        "proxy listening on {} (mode={:?}, upstream_timeout={}s, Ctrl+C/SIGTERM to stop)",
        bind_addr,
        mode,
        timeout
    );
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("proxy stopped");
    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let ctrl_c = tokio::signal::ctrl_c();
        let mut sigterm = signal(SignalKind::terminate()).expect("failed to listen for SIGTERM");
        tokio::select! {
            _ = ctrl_c => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to listen for Ctrl+C");
    }
}
