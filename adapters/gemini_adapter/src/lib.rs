//! Gemini `generateContent` client.

use std::time::Duration;

use promptlog_core::domain::build_prompt;
use promptlog_core::error::GenerationError;
use promptlog_core::ports::TextGenerator;
use reqwest::blocking::Client;
use serde_json::{json, Value};
use tracing::debug;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Connection settings for the Gemini API.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    /// Overall request timeout; `None` keeps the HTTP client's default.
    pub timeout: Option<Duration>,
}

impl GeminiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: None,
        }
    }
}

pub struct GeminiClient {
    config: GeminiConfig,
    client: Client,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> Result<Self, reqwest::Error> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build()?;
        Ok(Self { config, client })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        )
    }
}

/// Request body carrying the combined prompt as a single user turn.
pub fn make_request_payload(prompt: &str) -> Value {
    json!({
        "contents": [{
            "role": "user",
            "parts": [{"text": prompt}]
        }]
    })
}

/// Pulls the generated text out of a `generateContent` response.
///
/// Text parts of the first candidate are concatenated. A blocked prompt, a
/// missing candidate or a candidate stopped with no content is an error.
pub fn parse_response_text(v: &Value) -> Result<String, GenerationError> {
    if let Some(error) = v.get("error") {
        let message = error["message"].as_str().unwrap_or("Unknown error");
        return Err(GenerationError::new(format!("Gemini API error: {}", message)));
    }

    if let Some(reason) = v["promptFeedback"]["blockReason"].as_str() {
        return Err(GenerationError::new(format!("prompt blocked: {}", reason)));
    }

    let candidate = v["candidates"]
        .as_array()
        .and_then(|c| c.first())
        .ok_or_else(|| GenerationError::new("response contained no candidates"))?;

    match candidate["content"]["parts"].as_array() {
        Some(parts) => Ok(parts
            .iter()
            .filter_map(|part| part["text"].as_str())
            .collect::<String>()),
        None => {
            let reason = candidate["finishReason"].as_str().unwrap_or("UNKNOWN");
            if reason == "STOP" {
                Ok(String::new())
            } else {
                Err(GenerationError::new(format!(
                    "response stopped without content (finish reason {})",
                    reason
                )))
            }
        }
    }
}

fn error_message(status: reqwest::StatusCode, body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(|s| s.to_string()))
        .unwrap_or_else(|| format!("HTTP {}: {}", status, body))
}

impl TextGenerator for GeminiClient {
    fn generate(
        &self,
        system_instruction: Option<&str>,
        user_input: &str,
    ) -> Result<String, GenerationError> {
        let prompt = build_prompt(system_instruction, user_input);
        let payload = make_request_payload(&prompt);

        debug!(model = %self.config.model, prompt_len = prompt.len(), "gemini request");
        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.config.api_key)
            .json(&payload)
            .send()
            .map_err(|e| GenerationError::new(format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .map_err(|e| GenerationError::new(format!("Failed to read response: {}", e)))?;
        debug!(%status, body_len = body.len(), "gemini response");

        if !status.is_success() {
            return Err(GenerationError::new(format!(
                "Gemini API error: {}",
                error_message(status, &body)
            )));
        }

        let v: Value = serde_json::from_str(&body)
            .map_err(|e| GenerationError::new(format!("Failed to parse response JSON: {}", e)))?;
        parse_response_text(&v)
    }
}
