//! OpenAI chat-completion client (POST /v1/chat/completions, non-streaming).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const SYSTEM_INSTRUCTION: &str = "You are a helpful assistant.";

/// One completion call failed. Exactly one kind per failure; the caller logs
/// it and drops the event (no reply is sent).
#[derive(Debug, thiserror::Error)]
pub enum CompletionError {
    #[error("completion request failed: {0}")]
    Network(reqwest::Error),
    #[error("completion request timed out")]
    Timeout,
    #[error("completion api error: {status} {body}")]
    Upstream {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("completion response missing choices[0].message.content")]
    Malformed,
}

impl From<reqwest::Error> for CompletionError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            CompletionError::Timeout
        } else {
            CompletionError::Network(e)
        }
    }
}

/// Seam for the router: turns a prompt into generated text or a typed failure.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError>;
}

/// Client for the OpenAI chat-completion API.
#[derive(Clone)]
pub struct OpenAiClient {
    base_url: String,
    api_key: String,
    model: String,
    timeout: Duration,
    client: reqwest::Client,
}

impl OpenAiClient {
    pub fn new(api_key: String, model: String, timeout: Duration, base_url: Option<String>) -> Self {
        let base_url = base_url
            .map(|u| u.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        Self {
            base_url,
            api_key,
            model,
            timeout,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl CompletionBackend for OpenAiClient {
    /// POST /chat/completions with a fixed system instruction and the prompt
    /// as the single user message. Hard per-request timeout: LINE reply tokens
    /// expire, so a slow completion is as useless as a failed one.
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatRequestMessage {
                    role: "system",
                    content: SYSTEM_INSTRUCTION,
                },
                ChatRequestMessage {
                    role: "user",
                    content: prompt,
                },
            ],
        };
        let res = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(CompletionError::Upstream { status, body });
        }
        let data: ChatResponse = res.json().await.map_err(|_| CompletionError::Malformed)?;
        data.first_content().ok_or(CompletionError::Malformed)
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatRequestMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatRequestMessage<'a> {
    role: &'static str,
    content: &'a str,
}

// Response shape is decoded once into optional fields; any gap in the
// expected nesting is a single Malformed outcome.

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Option<Vec<Choice>>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    #[serde(default)]
    message: Option<ResponseMessage>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

impl ChatResponse {
    /// `choices[0].message.content`, if the response carries that shape.
    fn first_content(self) -> Option<String> {
        self.choices?
            .into_iter()
            .next()?
            .message?
            .content
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(body: &str) -> Option<String> {
        serde_json::from_str::<ChatResponse>(body)
            .ok()
            .and_then(ChatResponse::first_content)
    }

    #[test]
    fn well_formed_response_yields_content() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"Hi there"}}]}"#;
        assert_eq!(decode(body).as_deref(), Some("Hi there"));
    }

    #[test]
    fn extra_choices_use_the_first() {
        let body = r#"{"choices":[
            {"message":{"content":"first"}},
            {"message":{"content":"second"}}
        ]}"#;
        assert_eq!(decode(body).as_deref(), Some("first"));
    }

    #[test]
    fn missing_choices_is_malformed() {
        assert_eq!(decode(r#"{}"#), None);
        assert_eq!(decode(r#"{"choices":null}"#), None);
    }

    #[test]
    fn empty_choices_is_malformed() {
        assert_eq!(decode(r#"{"choices":[]}"#), None);
    }

    #[test]
    fn missing_message_or_content_is_malformed() {
        assert_eq!(decode(r#"{"choices":[{}]}"#), None);
        assert_eq!(decode(r#"{"choices":[{"message":{}}]}"#), None);
        assert_eq!(decode(r#"{"choices":[{"message":{"content":null}}]}"#), None);
    }

    #[test]
    fn wrong_typed_choices_fails_decode() {
        assert!(serde_json::from_str::<ChatResponse>(r#"{"choices":"nope"}"#).is_err());
    }
}
