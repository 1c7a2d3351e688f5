use gemini_adapter::{GeminiClient, GeminiConfig};
use promptlog_core::error::GenerationError;
use promptlog_core::ports::TextGenerator;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn generate(
    server: &MockServer,
    instruction: Option<&'static str>,
    input: &'static str,
) -> Result<String, GenerationError> {
    let mut config = GeminiConfig::new("test-key");
    config.base_url = server.uri();
    config.model = "test-model".to_string();
    tokio::task::spawn_blocking(move || -> Result<String, GenerationError> {
        let client = GeminiClient::new(config).unwrap();
        client.generate(instruction, input)
    })
    .await
    .unwrap()
}

#[tokio::test]
async fn test_generate_sends_combined_prompt() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1beta/models/test-model:generateContent"))
        .and(header("x-goog-api-key", "test-key"))
        .and(body_json(json!({
            "contents": [{"role": "user", "parts": [{"text": "Be kind.\n\nUser input: hi"}]}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{"content": {"parts": [{"text": "hello"}]}, "finishReason": "STOP"}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let text = generate(&server, Some("Be kind."), "hi").await.unwrap();
    assert_eq!(text, "hello");
}

#[tokio::test]
async fn test_generate_reports_api_error_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({
            "error": {"code": 429, "message": "Resource has been exhausted"}
        })))
        .mount(&server)
        .await;

    let err = generate(&server, None, "hi").await.unwrap_err();
    assert_eq!(err.message(), "Gemini API error: Resource has been exhausted");
}

#[tokio::test]
async fn test_generate_rejects_unparseable_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let err = generate(&server, None, "hi").await.unwrap_err();
    assert!(err.message().starts_with("Failed to parse response JSON"));
}
