use crate::{http_client, send_json, Responder, ResponderError};

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::instrument;

pub const DEFAULT_URL: &str = "http://localhost:8000/completion";
const MAX_TOKENS: u32 = 500;
const TEMPERATURE: f32 = 0.7;
const TOP_P: f32 = 0.9;
const STOP: [&str; 3] = ["\n\n", "Human:", "Assistant:"];
const ANSWER_LABEL: &str = "answer:";

#[derive(Debug, Clone)]
pub struct LocalCompletionConfig {
    pub url: String,
    pub timeout: Option<Duration>,
}

impl Default for LocalCompletionConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            timeout: None,
        }
    }
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    prompt: &'a str,
    max_tokens: u32,
    temperature: f32,
    top_p: f32,
    stop: &'a [&'a str],
}

// llama.cpp answers with `content`; OpenAI-style and ollama-style servers
// use `choices[].text` and `response`.
#[derive(Deserialize)]
struct CompletionResponse {
    content: Option<String>,
    #[serde(default)]
    choices: Vec<TextChoice>,
    response: Option<String>,
}

#[derive(Deserialize)]
struct TextChoice {
    text: Option<String>,
}

impl CompletionResponse {
    fn into_text(self) -> Option<String> {
        self.content
            .or_else(|| self.choices.into_iter().next().and_then(|c| c.text))
            .or(self.response)
    }
}

/// Local completion server, e.g. llama.cpp's `/completion` endpoint.
#[derive(Debug)]
pub struct LocalCompletionResponder {
    client: reqwest::Client,
    url: String,
}

impl LocalCompletionResponder {
    pub fn new(config: LocalCompletionConfig) -> Result<Self> {
        Ok(Self {
            client: http_client(config.timeout)?,
            url: config.url,
        })
    }
}

#[async_trait]
impl Responder for LocalCompletionResponder {
    fn name(&self) -> &'static str {
        "local"
    }

    #[instrument(skip_all, fields(url = %self.url))]
    async fn respond(&self, message: &str) -> Result<String, ResponderError> {
        let body = CompletionRequest {
            prompt: message,
            max_tokens: MAX_TOKENS,
            temperature: TEMPERATURE,
            top_p: TOP_P,
            stop: &STOP,
        };

        let request = self.client.post(&self.url).json(&body);
        let response: CompletionResponse = send_json(self.name(), request).await?;

        response.into_text().map(|text| clean(&text)).ok_or_else(|| {
            ResponderError::MalformedResponse("completion contained no text".into())
        })
    }
}

/// Trims the completion and drops a leading `Answer:` label.
fn clean(text: &str) -> String {
    let text = text.trim();
    match text.get(..ANSWER_LABEL.len()) {
        Some(label) if label.eq_ignore_ascii_case(ANSWER_LABEL) => {
            text[ANSWER_LABEL.len()..].trim_start().to_string()
        }
        _ => text.to_string(),
    }
}
