//! Gemini HTTP contract tests against a local mock server

use compass_agent::{
    AiGateway, BackendError, ContentRequest, GatewayConfig, GeminiBackend, GenerationError,
    GenerativeBackend, Schema,
};
use futures::StreamExt;
use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn backend(server: &MockServer) -> GeminiBackend {
    GeminiBackend::new(format!("{}/v1beta", server.uri()), "test-key", None).unwrap()
}

fn text_reply(text: &str) -> serde_json::Value {
    json!({
        "candidates": [{
            "content": {"role": "model", "parts": [{"text": text}]},
            "finishReason": "STOP"
        }],
        "usageMetadata": {"promptTokenCount": 12, "candidatesTokenCount": 5}
    })
}

#[tokio::test]
async fn test_generate_content_request_and_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-3-pro-preview:generateContent"))
        .and(header("x-goog-api-key", "test-key"))
        .and(body_partial_json(json!({
            "contents": [{"role": "user", "parts": [{"text": "Hello"}]}],
            "generationConfig": {"responseMimeType": "application/json"}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(text_reply("{\"ok\": true}")))
        .expect(1)
        .mount(&server)
        .await;

    let request = ContentRequest::user("gemini-3-pro-preview", "Hello")
        .with_json_schema(Schema::object().required("ok", Schema::boolean()).to_wire());
    let response = backend(&server).generate(request).await.unwrap();

    assert_eq!(response.text, "{\"ok\": true}");
    assert_eq!(response.usage.total(), 17);
}

#[tokio::test]
async fn test_rate_limit_with_retry_after() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(429)
                .insert_header("retry-after", "7")
                .set_body_json(json!({
                    "error": {"code": 429, "message": "Quota exceeded", "status": "RESOURCE_EXHAUSTED"}
                })),
        )
        .mount(&server)
        .await;

    let err = backend(&server)
        .generate(ContentRequest::user("m", "x"))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        BackendError::RateLimited {
            retry_after_ms: Some(7000)
        }
    );
}

#[tokio::test]
async fn test_server_error_is_request_failed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let err = backend(&server)
        .generate(ContentRequest::user("m", "x"))
        .await
        .unwrap_err();
    match err {
        BackendError::RequestFailed(msg) => assert!(msg.contains("500")),
        other => panic!("unexpected {other:?}"),
    }
}

#[tokio::test]
async fn test_undecodable_body_is_parse_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
        .mount(&server)
        .await;

    let err = backend(&server)
        .generate(ContentRequest::user("m", "x"))
        .await
        .unwrap_err();
    assert!(matches!(err, BackendError::ParseError(_)));
}

#[tokio::test]
async fn test_stream_generate_content_sse() {
    let server = MockServer::start().await;
    let body = [
        format!("data: {}\r\n\r\n", text_reply("Pick ")),
        format!("data: {}\r\n\r\n", text_reply("one topic")),
        format!("data: {}\r\n\r\n", text_reply(" today.")),
    ]
    .concat();

    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-3-flash-preview:streamGenerateContent"))
        .and(query_param("alt", "sse"))
        .and(header("x-goog-api-key", "test-key"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/event-stream")
                .set_body_string(body),
        )
        .expect(1)
        .mount(&server)
        .await;

    let mut stream = backend(&server)
        .generate_stream(ContentRequest::user("gemini-3-flash-preview", "What now?"))
        .await
        .unwrap();

    let mut fragments = Vec::new();
    while let Some(fragment) = stream.next().await {
        let fragment = fragment.unwrap();
        if !fragment.content.is_empty() {
            fragments.push(fragment.content);
        }
    }

    assert_eq!(fragments, vec!["Pick ", "one topic", " today."]);
    assert_eq!(stream.accumulated(), "Pick one topic today.");
    assert!(stream.is_complete());
}

#[tokio::test]
async fn test_gateway_over_http_reports_malformed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(text_reply("{\"a\": \"x\"}")))
        .mount(&server)
        .await;

    let mut config = GatewayConfig::new("test-key");
    config.base_url = format!("{}/v1beta", server.uri());
    let gateway = AiGateway::new(Arc::new(config.build_backend().unwrap()), config);

    let schema = Schema::object()
        .required("a", Schema::string())
        .required("b", Schema::string());
    let err = gateway
        .generate_structured::<serde_json::Value>("m", "pair", &schema)
        .await
        .unwrap_err();
    assert!(matches!(err, GenerationError::MalformedResponse(_)));
}

#[tokio::test]
async fn test_timeout_bounds_generate_but_not_streams() {
    let server = MockServer::start().await;
    let slow = || {
        ResponseTemplate::new(200)
            .set_body_json(text_reply("late"))
            .set_delay(std::time::Duration::from_millis(300))
    };
    Mock::given(method("POST"))
        .and(path("/v1beta/models/m:generateContent"))
        .respond_with(slow())
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1beta/models/m:streamGenerateContent"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/event-stream")
                .set_body_string(format!("data: {}\r\n\r\n", text_reply("late")))
                .set_delay(std::time::Duration::from_millis(300)),
        )
        .mount(&server)
        .await;

    let backend = GeminiBackend::new(
        format!("{}/v1beta", server.uri()),
        "test-key",
        Some(std::time::Duration::from_millis(100)),
    )
    .unwrap();

    let err = backend
        .generate(ContentRequest::user("m", "x"))
        .await
        .unwrap_err();
    assert!(matches!(err, BackendError::NetworkError(_)), "{err:?}");

    let reply = backend
        .generate_stream(ContentRequest::user("m", "x"))
        .await
        .unwrap()
        .collect()
        .await
        .unwrap();
    assert_eq!(reply.text, "late");
}
