//! End-to-end pipeline: mock upstream -> proxy -> client reassembly ->
//! session state with thinking/answer splitting.

use axum::body::Body;
use axum::http::{header, StatusCode};
use axum::response::Response;
use axum::routing::post;
use axum::Router;

use themis_core::client::ChatClient;
use themis_core::config::{Config, ResponseMode};
use themis_core::server::{router, ProxyState};
use themis_core::ChatSession;

async fn upstream_sse() -> Response {
    // Thinking markers split across deltas on purpose: the closing tag
    // arrives in pieces.
    let deltas = [
        "<think",
        "ing>这是劳动",
        "争议</think",
        "ing>建议先与",
        "用人单位协商。",
    ];
    let mut body = String::new();
    for delta in deltas {
        body.push_str(&format!(
            "data: {}\n\n",
            serde_json::json!({"choices": [{"delta": {"content": delta}, "finish_reason": null}]})
        ));
    }
    body.push_str("data: {\"choices\":[{\"delta\":{},\"finish_reason\":\"stop\"}]}\n\n");
    body.push_str("data: [DONE]\n\n");

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/event-stream")
        .body(Body::from(body))
        .unwrap()
}

async fn spawn(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

#[tokio::test]
async fn streamed_reply_reaches_session_with_thinking_split() {
    let upstream = Router::new().route("/chat/completions", post(upstream_sse));
    let upstream_url = spawn(upstream).await;

    let mut config = Config::default();
    config.server.response_mode = ResponseMode::Streaming;
    config.upstream.base_url = upstream_url;
    config.upstream.api_key = Some("test-key".to_string());
    let proxy_url = spawn(router(ProxyState::new(config).unwrap())).await;

    let client = ChatClient::new(format!("{}/chat", proxy_url)).unwrap();
    let session = std::cell::RefCell::new(ChatSession::new("獬豸 Themis AI", "通用法律咨询"));
    session.borrow_mut().push_user("劳动合同纠纷怎么解决？");
    session.borrow_mut().begin_assistant_turn();

    let mut chunk_count = 0usize;
    let mut failed = false;
    let mut completed = false;

    client
        .send_message_stream(
            "劳动合同纠纷怎么解决？",
            &[],
            "labor",
            |chunk| {
                chunk_count += 1;
                session.borrow_mut().apply_chunk(chunk);
            },
            |_| failed = true,
            || {
                completed = true;
                session.borrow_mut().complete_active_turn();
            },
        )
        .await;

    assert!(!failed);
    assert!(completed);
    assert_eq!(chunk_count, 5);

    let session = session.into_inner();
    let turn = session.turns().last().unwrap();
    assert!(!turn.is_streaming);
    assert_eq!(turn.thinking, "这是劳动争议");
    assert_eq!(turn.text, "建议先与用人单位协商。");
}

#[tokio::test]
async fn buffered_reply_arrives_as_single_chunk() {
    async fn upstream_buffered() -> axum::Json<serde_json::Value> {
        axum::Json(serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": "可以申请劳动仲裁。"}}],
            "usage": {"prompt_tokens": 12, "completion_tokens": 8, "total_tokens": 20}
        }))
    }

    let upstream = Router::new().route("/chat/completions", post(upstream_buffered));
    let upstream_url = spawn(upstream).await;

    let mut config = Config::default();
    config.server.response_mode = ResponseMode::Buffered;
    config.upstream.base_url = upstream_url;
    config.upstream.api_key = Some("test-key".to_string());
    let proxy_url = spawn(router(ProxyState::new(config).unwrap())).await;

    let client = ChatClient::new(format!("{}/chat", proxy_url)).unwrap();
    let outcome = client.send_message("被拖欠工资怎么办", &[], "labor").await;

    assert!(outcome.success);
    assert_eq!(outcome.message, "可以申请劳动仲裁。");
    assert!(outcome.error.is_none());
}

#[tokio::test]
async fn proxy_error_surfaces_as_readable_message() {
    // No upstream at all: the proxy reports 503 and the client renders the
    // remedy text rather than a raw status code.
    let mut config = Config::default();
    config.server.response_mode = ResponseMode::Buffered;
    config.upstream.base_url = "http://127.0.0.1:9".to_string();
    config.upstream.api_key = Some("test-key".to_string());
    let proxy_url = spawn(router(ProxyState::new(config).unwrap())).await;

    let client = ChatClient::new(format!("{}/chat", proxy_url)).unwrap();
    let outcome = client.send_message("合同问题", &[], "general").await;

    assert!(!outcome.success);
    let error = outcome.error.unwrap();
    assert!(error.contains("稍后重试"));
    assert!(!error.contains("503"));
}
