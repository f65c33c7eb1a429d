mod echo;
mod error;
pub mod local;
pub mod openai;

pub use echo::EchoResponder;
pub use error::{ErrorKind, ResponderError};
pub use local::{LocalCompletionConfig, LocalCompletionResponder};
pub use openai::{OpenAiConfig, OpenAiResponder};

use anyhow::Result;
use async_trait::async_trait;
use reqwest::RequestBuilder;
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Something that turns a user message into reply text.
///
/// The relay holds exactly one responder for the lifetime of the process and
/// calls it once per incoming message.
#[async_trait]
pub trait Responder: Send + Sync {
    /// Short name used in logs and in the service info endpoint.
    fn name(&self) -> &'static str;

    async fn respond(&self, message: &str) -> Result<String, ResponderError>;
}

/// Builds the shared HTTP client. Without a timeout reqwest waits indefinitely.
fn http_client(timeout: Option<Duration>) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder();
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }
    Ok(builder.build()?)
}

/// Sends a prepared request and decodes a successful JSON body.
async fn send_json<R: DeserializeOwned>(
    responder: &'static str,
    request: RequestBuilder,
) -> Result<R, ResponderError> {
    let response = request.send().await.map_err(ResponderError::from_transport)?;
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(ResponderError::from_transport)?;

    if !status.is_success() {
        tracing::warn!("{responder} returned {status}: {body}");
        return Err(ResponderError::from_status(status, &body));
    }

    serde_json::from_str(&body).map_err(|e| ResponderError::MalformedResponse(e.to_string()))
}
