use final_answer_batch::{
    ChatRequest, ChatTransport, Config, InferenceService, LlmClient, Question, RetryPolicy,
    TransportError,
};
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config_for(server: &MockServer) -> Config {
    Config {
        llm_api_key: "sk-test".to_string(),
        llm_api_base_url: server.uri(),
        llm_model_name: "bens_model".to_string(),
        ..Config::default()
    }
}

fn completion(content: &str) -> serde_json::Value {
    json!({
        "id": "chatcmpl-test",
        "object": "chat.completion",
        "created": 1_700_000_000,
        "model": "bens_model",
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": content },
            "finish_reason": "stop",
            "logprobs": null
        }],
        "usage": { "prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15 }
    })
}

fn request() -> ChatRequest {
    InferenceService::<LlmClient>::build_request("What is 6*7?")
}

#[tokio::test]
async fn test_llm_client_returns_raw_content() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_partial_json(json!({ "model": "bens_model", "max_tokens": 256 })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(completion("6*7=42\nFINAL ANSWER: 42.")),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = LlmClient::new(&config_for(&server));
    let raw = client.complete(&request()).await.unwrap();

    assert_eq!(raw, "6*7=42\nFINAL ANSWER: 42.");
}

#[tokio::test]
async fn test_llm_client_sends_system_and_user_messages() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("FINAL ANSWER: 1")))
        .mount(&server)
        .await;

    let client = LlmClient::new(&config_for(&server));
    client.complete(&request()).await.unwrap();

    let received = server.received_requests().await.unwrap();
    assert_eq!(received.len(), 1);
    let body: serde_json::Value = serde_json::from_slice(&received[0].body).unwrap();
    let messages = body["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0]["role"], "system");
    assert!(messages[0]["content"]
        .as_str()
        .unwrap()
        .contains("FINAL ANSWER: <value>"));
    assert_eq!(messages[1]["role"], "user");
    assert!(messages[1]["content"].as_str().unwrap().contains("What is 6*7?"));
}

#[tokio::test]
async fn test_llm_client_maps_error_status() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": {
                "message": "bad request",
                "type": "invalid_request_error",
                "param": null,
                "code": null
            }
        })))
        .mount(&server)
        .await;

    let client = LlmClient::new(&config_for(&server));
    let err = client.complete(&request()).await.unwrap_err();

    assert!(
        matches!(err, TransportError::Status { status: 400, .. }),
        "got: {err}"
    );
}

#[tokio::test]
async fn test_llm_client_empty_content_is_an_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("   ")))
        .mount(&server)
        .await;

    let client = LlmClient::new(&config_for(&server));
    let err = client.complete(&request()).await.unwrap_err();

    assert!(matches!(err, TransportError::EmptyContent { .. }));
}

#[tokio::test]
async fn test_inference_service_over_http_retries_unparseable_answers() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("I don't know.")))
        .expect(3)
        .mount(&server)
        .await;

    let service = InferenceService::new(
        LlmClient::new(&config_for(&server)),
        RetryPolicy::immediate(3),
    );

    let answer = service.answer(&Question::new("0", "What is 6*7?")).await;
    assert_eq!(answer, None);
}

#[tokio::test]
async fn test_llm_client_server_error_fails_after_one_request() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .expect(1)
        .mount(&server)
        .await;

    let client = LlmClient::new(&config_for(&server));
    let err = client.complete(&request()).await.unwrap_err();

    match err {
        TransportError::Status { status, body, .. } => {
            assert_eq!(status, 503);
            assert_eq!(body, "overloaded");
        }
        other => panic!("unexpected error: {other}"),
    }
}

/// 5xx / 429 每次尝试只发一个请求，总请求数等于尝试次数
#[tokio::test]
async fn test_inference_service_counts_each_server_error_as_one_attempt() {
    for status in [503u16, 429] {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(status))
            .expect(3)
            .mount(&server)
            .await;

        let service = InferenceService::new(
            LlmClient::new(&config_for(&server)),
            RetryPolicy {
                max_attempts: 3,
                delays: Vec::new(),
                attempt_timeout: Duration::from_secs(5),
            },
        );

        let started = std::time::Instant::now();
        let answer = service.answer(&Question::new("0", "What is 6*7?")).await;

        assert_eq!(answer, None);
        assert_eq!(server.received_requests().await.unwrap().len(), 3);
        assert!(
            started.elapsed() < Duration::from_secs(5),
            "status {status} took {:?}",
            started.elapsed()
        );
    }
}
