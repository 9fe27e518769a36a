use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::EndpointConfig;
use crate::error::{InferenceError, InferenceResult};
use crate::providers::{HttpEndpoint, TextGenerator};

const SERVICE: &str = "text-generation";

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// HTTP client for an OpenAI-compatible `/v1/chat/completions` endpoint.
pub struct HttpTextGenerator {
    endpoint: HttpEndpoint,
}

impl HttpTextGenerator {
    pub fn new(config: EndpointConfig, timeout: Duration) -> InferenceResult<Self> {
        Ok(Self {
            endpoint: HttpEndpoint::new(SERVICE, config, timeout)?,
        })
    }
}

fn first_content(response: ChatResponse) -> InferenceResult<String> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .ok_or_else(|| InferenceError::invalid(SERVICE, "no completion text"))
}

#[async_trait]
impl TextGenerator for HttpTextGenerator {
    fn is_configured(&self) -> bool {
        self.endpoint.is_configured()
    }

    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> InferenceResult<String> {
        let body = ChatRequest {
            model: &self.endpoint.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: user_prompt,
                },
            ],
            temperature: 0.2,
        };
        let builder = self.endpoint.post("/v1/chat/completions")?.json(&body);
        let response = self.endpoint.send(builder).await?;
        let parsed: ChatResponse = self.endpoint.json(response).await?;
        first_content(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_first_choice() {
        let response: ChatResponse = serde_json::from_value(serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": "  Subjective: ... "}}]
        }))
        .unwrap();
        assert_eq!(first_content(response).unwrap(), "Subjective: ...");
    }

    #[test]
    fn empty_completion_is_invalid() {
        let response: ChatResponse =
            serde_json::from_value(serde_json::json!({"choices": []})).unwrap();
        assert!(matches!(
            first_content(response),
            Err(InferenceError::InvalidResponse { .. })
        ));
    }

    #[test]
    fn request_shape() {
        let body = ChatRequest {
            model: "m",
            messages: [
                ChatMessage { role: "system", content: "s" },
                ChatMessage { role: "user", content: "u" },
            ],
            temperature: 0.2,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["messages"][1]["role"], "user");
        assert_eq!(json["model"], "m");
    }
}
