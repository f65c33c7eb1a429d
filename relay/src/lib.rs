pub mod config;
pub mod processor;
pub mod server;

#[derive(serde::Deserialize, Debug, Clone)]
pub struct ChatRequest {
    pub message: String,
}

/// Body of every `/chat` response: `{"reply": ...}` or `{"error": ...}`.
#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChatResponse {
    Reply(String),
    Error(String),
}
