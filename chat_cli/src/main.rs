use anyhow::{bail, Result};
use clap::Parser;
use std::fmt::Debug;
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::instrument;

#[derive(Parser, Debug)]
#[clap(
    author = "Alex Markov",
    version = "0.1.0",
    about = "Terminal client for the chat relay"
)]
struct Args {
    #[clap(short, long, env = "RELAY_ADDRESS", default_value = "127.0.0.1:8080")]
    relay_address: String,
    /// Send a single message and exit instead of reading stdin.
    #[clap(short, long)]
    message: Option<String>,
}

#[derive(serde::Deserialize, Debug, PartialEq)]
#[serde(rename_all = "lowercase")]
enum RelayResponse {
    Reply(String),
    Error(String),
}

struct HttpClient {
    client: reqwest::Client,
    url: String,
}
impl Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("url", &self.url)
            .finish()
    }
}

impl HttpClient {
    fn new(address: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: chat_url(address),
        }
    }

    // The relay answers failures with a JSON body too, so the status is not checked.
    async fn send_request(&self, json_data: serde_json::Value) -> Result<RelayResponse> {
        let text_response = self.client.post(&self.url).json(&json_data).send().await?;

        let response = text_response.json().await?;
        Ok(response)
    }
}

fn chat_url(address: &str) -> String {
    let address = address.trim_end_matches('/');
    if address.starts_with("http://") || address.starts_with("https://") {
        format!("{}/chat", address)
    } else {
        format!("http://{}/chat", address)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(tracing::Level::WARN)
        .init();

    let args = Args::parse();
    let client = HttpClient::new(&args.relay_address);

    if let Some(message) = args.message {
        return match msg_handler(&client, &message).await? {
            RelayResponse::Reply(reply) => {
                println!("{}", reply);
                Ok(())
            }
            RelayResponse::Error(error) => bail!("relay error: {}", error),
        };
    }

    eprintln!("Connected to {}. Type a message, Ctrl-D to quit.", client.url);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    prompt()?;
    while let Some(line) = lines.next_line().await? {
        let text = line.trim();
        if !text.is_empty() {
            match msg_handler(&client, text).await {
                Ok(RelayResponse::Reply(reply)) => println!("{}", reply),
                Ok(RelayResponse::Error(error)) => eprintln!("relay error: {}", error),
                Err(e) => tracing::error!("Error sending message: {:?}", e),
            }
        }
        prompt()?;
    }
    Ok(())
}

fn prompt() -> Result<()> {
    print!("> ");
    std::io::stdout().flush()?;
    Ok(())
}

#[instrument(skip_all, fields(user_text, reply_kind))]
async fn msg_handler(client: &HttpClient, text: &str) -> Result<RelayResponse> {
    let span = tracing::Span::current();
    span.record("user_text", text);

    let response = client
        .send_request(serde_json::json!({"message": text}))
        .await?;

    let kind = match &response {
        RelayResponse::Reply(_) => "reply",
        RelayResponse::Error(_) => "error",
    };
    span.record("reply_kind", kind);

    tracing::debug!("SUCCESS");
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_reply_and_error_bodies() {
        let reply: RelayResponse = serde_json::from_str(r#"{"reply": "hi"}"#).unwrap();
        assert_eq!(reply, RelayResponse::Reply("hi".to_string()));

        let error: RelayResponse =
            serde_json::from_str(r#"{"error": "connection error: refused"}"#).unwrap();
        assert_eq!(
            error,
            RelayResponse::Error("connection error: refused".to_string())
        );
    }

    #[test]
    fn rejects_body_without_known_key() {
        assert!(serde_json::from_str::<RelayResponse>(r#"{"answer": "hi"}"#).is_err());
    }

    #[test]
    fn builds_chat_url_from_address() {
        assert_eq!(chat_url("127.0.0.1:8080"), "http://127.0.0.1:8080/chat");
        assert_eq!(
            chat_url("https://relay.example.com/"),
            "https://relay.example.com/chat"
        );
    }
}
