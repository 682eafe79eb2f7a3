//! Text-generation boundary.
//!
//! [`Generator`] is the only outbound dependency of the session. The concrete
//! [`GeminiClient`] performs exactly one blocking `generateContent` request per
//! call, never retries, and only times out when the caller configured it to.

use std::time::Duration;

use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";
pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GenerationError {
    #[error("request failed: {0}")]
    Transport(String),

    #[error("service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("failed to parse response: {0}")]
    Decode(String),

    #[error("response contained no text")]
    Empty,
}

pub trait Generator {
    fn generate(&self, prompt: &str) -> Result<String, GenerationError>;
}

/// Client for the Gemini REST API.
pub struct GeminiClient {
    client: Client,
    api_base: String,
    api_key: String,
    model: String,
}

impl GeminiClient {
    pub fn new(
        api_base: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        timeout: Option<Duration>,
    ) -> Result<Self, GenerationError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GenerationError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!("{}/{}:generateContent", self.api_base, self.model)
    }
}

impl Generator for GeminiClient {
    fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        let body = GenerateContentRequest {
            contents: vec![Content {
                role: "user".to_string(),
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
        };
        debug!(model = %self.model, prompt_chars = prompt.len(), "sending generateContent");

        let response = self
            .client
            .post(self.endpoint())
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .map_err(|e| {
                warn!(error = %e, "generation request failed");
                GenerationError::Transport(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .unwrap_or_else(|_| "failed to read error body".to_string());
            warn!(status = status.as_u16(), "generation service rejected request");
            return Err(GenerationError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let raw = response
            .text()
            .map_err(|e| GenerationError::Transport(e.to_string()))?;
        let parsed: GenerateContentResponse =
            serde_json::from_str(&raw).map_err(|e| GenerationError::Decode(e.to_string()))?;
        extract_text(parsed)
    }
}

fn extract_text(response: GenerateContentResponse) -> Result<String, GenerationError> {
    let text: String = response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|p| p.text)
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default();

    if text.trim().is_empty() {
        Err(GenerationError::Empty)
    } else {
        Ok(text)
    }
}

#[derive(Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
}

#[derive(Serialize)]
struct Content {
    role: String,
    parts: Vec<Part>,
}

#[derive(Serialize)]
struct Part {
    text: String,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    fn client_for(server: &MockServer) -> GeminiClient {
        GeminiClient::new(server.base_url(), "test-key", "gemini-test", None).unwrap()
    }

    #[test]
    fn returns_joined_text_of_first_candidate() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/gemini-test:generateContent")
                .query_param("key", "test-key")
                .json_body(json!({
                    "contents": [{"role": "user", "parts": [{"text": "hello"}]}]
                }));
            then.status(200).json_body(json!({
                "candidates": [
                    {"content": {"parts": [{"text": "## Nutrition\n"}, {"text": "Eat greens"}]}},
                    {"content": {"parts": [{"text": "ignored"}]}}
                ]
            }));
        });

        let text = client_for(&server).generate("hello").unwrap();
        assert_eq!(text, "## Nutrition\nEat greens");
        mock.assert_hits(1);
    }

    #[test]
    fn non_success_status_carries_body() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/gemini-test:generateContent");
            then.status(429).body("quota exhausted");
        });

        let err = client_for(&server).generate("hi").unwrap_err();
        assert_eq!(
            err,
            GenerationError::Status {
                status: 429,
                body: "quota exhausted".into()
            }
        );
    }

    #[test]
    fn missing_text_is_an_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/gemini-test:generateContent");
            then.status(200).json_body(json!({"candidates": []}));
        });

        assert_eq!(client_for(&server).generate("hi").unwrap_err(), GenerationError::Empty);
    }

    #[test]
    fn garbage_body_is_a_decode_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/gemini-test:generateContent");
            then.status(200).body("<html>not json</html>");
        });

        assert!(matches!(
            client_for(&server).generate("hi"),
            Err(GenerationError::Decode(_))
        ));
    }

    #[test]
    fn unreachable_service_is_a_transport_error() {
        let client = GeminiClient::new("http://127.0.0.1:1", "k", "m", Some(Duration::from_secs(2))).unwrap();
        assert!(matches!(client.generate("hi"), Err(GenerationError::Transport(_))));
    }
}
