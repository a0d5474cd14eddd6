//! Chat completion client for OpenAI-compatible endpoints

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Sampling temperature used for every completion request
const TEMPERATURE: f32 = 0.7;

/// Narrow contract the turn pipeline depends on: one request, one reply
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Request a completion with the rendered context as the system message
    /// and the live prompt as the user message.
    ///
    /// # Errors
    ///
    /// Returns `Error::Completion` on transport failure or a malformed
    /// response (missing choices).
    async fn complete(&self, system: &str, user: &str) -> Result<String>;
}

/// Client for an OpenAI-compatible `/chat/completions` endpoint
pub struct OpenAiChatClient {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAiChatClient {
    /// Create a new chat client
    #[must_use]
    pub fn new(base_url: &str, api_key: String, model: String) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            model,
        }
    }
}

#[async_trait]
impl CompletionClient for OpenAiChatClient {
    async fn complete(&self, system: &str, user: &str) -> Result<String> {
        let request = ChatCompletionRequest {
            model: &self.model,
            messages: vec![
                Message {
                    role: "system",
                    content: system,
                },
                Message {
                    role: "user",
                    content: user,
                },
            ],
            temperature: TEMPERATURE,
        };

        let url = format!("{}/chat/completions", self.base_url);
        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Completion(format!("request to {url} failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Completion(format!(
                "endpoint returned {status}: {body}"
            )));
        }

        let result: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| Error::Completion(format!("failed to parse response: {e}")))?;

        extract_reply(result)
    }
}

/// Pull the first choice's content out of a completion response
fn extract_reply(response: ChatCompletionResponse) -> Result<String> {
    response
        .choices
        .into_iter()
        .next()
        .map(|c| c.message.content.unwrap_or_default())
        .ok_or_else(|| Error::Completion("response contained no choices".to_string()))
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    temperature: f32,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_first_choice_content() {
        let response: ChatCompletionResponse = serde_json::from_str(
            r#"{"choices": [{"message": {"content": "The Treaty of Westphalia."}}]}"#,
        )
        .unwrap();
        assert_eq!(
            extract_reply(response).unwrap(),
            "The Treaty of Westphalia."
        );
    }

    #[test]
    fn missing_choices_is_a_completion_error() {
        let response: ChatCompletionResponse = serde_json::from_str(r#"{"choices": []}"#).unwrap();
        let err = extract_reply(response).unwrap_err();
        assert!(matches!(err, Error::Completion(_)));

        // Field absent entirely
        let response: ChatCompletionResponse = serde_json::from_str("{}").unwrap();
        assert!(extract_reply(response).is_err());
    }

    #[test]
    fn null_content_becomes_empty_reply() {
        let response: ChatCompletionResponse =
            serde_json::from_str(r#"{"choices": [{"message": {"content": null}}]}"#).unwrap();
        assert_eq!(extract_reply(response).unwrap(), "");
    }

    #[test]
    fn base_url_trailing_slash_is_normalized() {
        let client = OpenAiChatClient::new(
            "http://localhost:1234/v1/",
            "key".to_string(),
            "model".to_string(),
        );
        assert_eq!(client.base_url, "http://localhost:1234/v1");
    }
}
