use crate::{Responder, ResponderError};

use async_trait::async_trait;

/// Replies with the incoming message, optionally behind a fixed prefix.
#[derive(Debug, Clone, Default)]
pub struct EchoResponder {
    prefix: String,
}

impl EchoResponder {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

#[async_trait]
impl Responder for EchoResponder {
    fn name(&self) -> &'static str {
        "echo"
    }

    async fn respond(&self, message: &str) -> Result<String, ResponderError> {
        Ok(format!("{}{}", self.prefix, message))
    }
}
