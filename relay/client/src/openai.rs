use crate::{http_client, send_json, Responder, ResponderError};

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::time::Duration;
use tracing::instrument;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4";
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant.";
const COMPLETIONS_PATH: &str = "/chat/completions";

#[derive(Clone)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub system_prompt: String,
    pub timeout: Option<Duration>,
}

impl OpenAiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            timeout: None,
        }
    }
}

impl Debug for OpenAiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiConfig")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("system_prompt", &self.system_prompt)
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: [ChatTurn<'a>; 2],
}

#[derive(Serialize)]
struct ChatTurn<'a> {
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
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// Hosted chat-completion provider speaking the OpenAI wire format.
///
/// Every call sends the configured system turn followed by the user's raw
/// message and returns the first choice's content untouched.
pub struct OpenAiResponder {
    client: reqwest::Client,
    url: String,
    api_key: String,
    model: String,
    system_prompt: String,
}

impl Debug for OpenAiResponder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiResponder")
            .field("url", &self.url)
            .field("model", &self.model)
            .finish()
    }
}

impl OpenAiResponder {
    pub fn new(config: OpenAiConfig) -> Result<Self> {
        let url = format!(
            "{}{}",
            config.base_url.trim_end_matches('/'),
            COMPLETIONS_PATH
        );

        Ok(Self {
            client: http_client(config.timeout)?,
            url,
            api_key: config.api_key,
            model: config.model,
            system_prompt: config.system_prompt,
        })
    }
}

#[async_trait]
impl Responder for OpenAiResponder {
    fn name(&self) -> &'static str {
        "openai"
    }

    #[instrument(skip_all, fields(model = %self.model))]
    async fn respond(&self, message: &str) -> Result<String, ResponderError> {
        let body = ChatCompletionRequest {
            model: &self.model,
            messages: [
                ChatTurn {
                    role: "system",
                    content: &self.system_prompt,
                },
                ChatTurn {
                    role: "user",
                    content: message,
                },
            ],
        };

        let request = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&body);
        let response: ChatCompletionResponse = send_json(self.name(), request).await?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| {
                ResponderError::MalformedResponse("completion contained no message content".into())
            })
    }
}
