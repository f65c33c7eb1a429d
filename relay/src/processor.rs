use crate::ChatRequest;
use responder_client::{Responder, ResponderError};

use std::sync::Arc;
use std::time::Instant;
use tracing::{instrument, Span};

/// Forwards each request to the responder chosen at startup.
#[derive(Clone)]
pub struct Processor {
    responder: Arc<dyn Responder>,
}

impl Processor {
    pub fn new(responder: Arc<dyn Responder>) -> Self {
        Self { responder }
    }

    pub fn responder_name(&self) -> &'static str {
        self.responder.name()
    }

    #[instrument(skip_all, fields(responder = self.responder.name(), elapsed_ms))]
    pub async fn process_request(&self, request: ChatRequest) -> Result<String, ResponderError> {
        let span = Span::current();
        let start_time = Instant::now();

        let result = self.responder.respond(&request.message).await;

        span.record("elapsed_ms", start_time.elapsed().as_millis() as u64);
        result
    }
}
