use crate::server::ServerConfig;
use responder_client::{
    local, openai, EchoResponder, LocalCompletionConfig, LocalCompletionResponder, OpenAiConfig,
    OpenAiResponder, Responder,
};

use axum::http::HeaderValue;
use clap::{Parser, ValueEnum};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Value shipped in sample `.env` files; treated the same as a missing key.
const PLACEHOLDER_API_KEY: &str = "YOUR_API_KEY";

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponderKind {
    /// Hosted OpenAI-compatible chat completions.
    Openai,
    /// Local completion server such as llama.cpp.
    Local,
    /// Replies with the message itself.
    Echo,
}

#[derive(Parser, Debug)]
#[clap(version, about = "Relays chat messages to a completion responder")]
pub struct Args {
    #[clap(short, long, env = "RELAY_ADDRESS", default_value = "127.0.0.1:8080")]
    pub address: String,
    #[clap(short, long, env = "RELAY_RESPONDER", value_enum, default_value = "openai")]
    pub responder: ResponderKind,
    #[clap(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub openai_api_key: Option<String>,
    #[clap(long, env = "OPENAI_BASE_URL", default_value = openai::DEFAULT_BASE_URL)]
    pub openai_base_url: String,
    #[clap(short, long, env = "OPENAI_MODEL", default_value = openai::DEFAULT_MODEL)]
    pub model: String,
    #[clap(long, env = "RELAY_SYSTEM_PROMPT", default_value = openai::DEFAULT_SYSTEM_PROMPT)]
    pub system_prompt: String,
    #[clap(long, env = "LLAMA_CPP_URL", default_value = local::DEFAULT_URL)]
    pub local_url: String,
    #[clap(long, env = "RELAY_ECHO_PREFIX", default_value = "")]
    pub echo_prefix: String,
    #[clap(
        long,
        env = "CORS_ALLOWED_ORIGINS",
        value_delimiter = ',',
        default_value = "http://localhost:3000"
    )]
    pub allowed_origins: Vec<String>,
    #[clap(long, env = "RELAY_REQUEST_TIMEOUT")]
    pub request_timeout_secs: Option<u64>,
    /// Answer responder failures with 200 instead of 502/504.
    #[clap(long, env = "RELAY_LEGACY_ERROR_STATUS")]
    pub legacy_error_status: bool,
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("OPENAI_API_KEY is not set; the openai responder requires a provider credential")]
    MissingCredential,
    #[error("invalid CORS origin {0:?}")]
    InvalidOrigin(String),
}

#[derive(Debug, Clone)]
pub enum ResponderConfig {
    OpenAi(OpenAiConfig),
    Local(LocalCompletionConfig),
    Echo { prefix: String },
}

impl ResponderConfig {
    pub fn build(self) -> anyhow::Result<Arc<dyn Responder>> {
        let responder: Arc<dyn Responder> = match self {
            ResponderConfig::OpenAi(config) => Arc::new(OpenAiResponder::new(config)?),
            ResponderConfig::Local(config) => Arc::new(LocalCompletionResponder::new(config)?),
            ResponderConfig::Echo { prefix } => Arc::new(EchoResponder::new(prefix)),
        };
        Ok(responder)
    }
}

/// Validated startup configuration, built once and handed to the server.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub address: String,
    pub responder: ResponderConfig,
    pub server: ServerConfig,
}

impl Args {
    pub fn into_config(self) -> Result<RelayConfig, ConfigError> {
        let timeout = self.request_timeout_secs.map(Duration::from_secs);

        let responder = match self.responder {
            ResponderKind::Openai => {
                let api_key = self
                    .openai_api_key
                    .map(|key| key.trim().to_string())
                    .filter(|key| !key.is_empty() && key != PLACEHOLDER_API_KEY)
                    .ok_or(ConfigError::MissingCredential)?;
                ResponderConfig::OpenAi(OpenAiConfig {
                    api_key,
                    base_url: self.openai_base_url,
                    model: self.model,
                    system_prompt: self.system_prompt,
                    timeout,
                })
            }
            ResponderKind::Local => ResponderConfig::Local(LocalCompletionConfig {
                url: self.local_url,
                timeout,
            }),
            ResponderKind::Echo => ResponderConfig::Echo {
                prefix: self.echo_prefix,
            },
        };

        let allowed_origins = self
            .allowed_origins
            .iter()
            .map(|origin| origin.trim())
            .filter(|origin| !origin.is_empty())
            .map(parse_origin)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(RelayConfig {
            address: self.address,
            responder,
            server: ServerConfig {
                allowed_origins,
                legacy_error_status: self.legacy_error_status,
            },
        })
    }
}

fn parse_origin(origin: &str) -> Result<HeaderValue, ConfigError> {
    // A wildcard cannot be combined with credentialed CORS.
    if origin == "*" {
        return Err(ConfigError::InvalidOrigin(origin.to_string()));
    }
    HeaderValue::from_str(origin).map_err(|_| ConfigError::InvalidOrigin(origin.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(responder: ResponderKind, api_key: Option<&str>) -> Args {
        Args {
            address: "127.0.0.1:8080".to_string(),
            responder,
            openai_api_key: api_key.map(str::to_string),
            openai_base_url: openai::DEFAULT_BASE_URL.to_string(),
            model: openai::DEFAULT_MODEL.to_string(),
            system_prompt: openai::DEFAULT_SYSTEM_PROMPT.to_string(),
            local_url: local::DEFAULT_URL.to_string(),
            echo_prefix: String::new(),
            allowed_origins: vec!["http://localhost:3000".to_string()],
            request_timeout_secs: None,
            legacy_error_status: false,
        }
    }

    #[test]
    fn openai_without_credential_is_rejected() {
        let err = args(ResponderKind::Openai, None).into_config().unwrap_err();
        assert_eq!(err, ConfigError::MissingCredential);
    }

    #[test]
    fn blank_or_placeholder_credential_is_rejected() {
        for key in ["", "   ", "YOUR_API_KEY"] {
            let err = args(ResponderKind::Openai, Some(key))
                .into_config()
                .unwrap_err();
            assert_eq!(err, ConfigError::MissingCredential, "key {key:?}");
        }
    }

    #[test]
    fn openai_config_carries_credential_and_timeout() {
        let mut args = args(ResponderKind::Openai, Some("sk-live"));
        args.request_timeout_secs = Some(30);

        let config = args.into_config().unwrap();

        match config.responder {
            ResponderConfig::OpenAi(openai) => {
                assert_eq!(openai.api_key, "sk-live");
                assert_eq!(openai.model, "gpt-4");
                assert_eq!(openai.timeout, Some(Duration::from_secs(30)));
            }
            other => panic!("unexpected responder config: {other:?}"),
        }
    }

    #[test]
    fn local_and_echo_start_without_credential() {
        let config = args(ResponderKind::Local, None).into_config().unwrap();
        assert!(matches!(config.responder, ResponderConfig::Local(_)));

        let config = args(ResponderKind::Echo, None).into_config().unwrap();
        assert!(matches!(config.responder, ResponderConfig::Echo { .. }));
    }

    #[test]
    fn origins_are_parsed_and_wildcard_refused() {
        let mut ok = args(ResponderKind::Echo, None);
        ok.allowed_origins = vec![
            "http://localhost:3000".to_string(),
            " https://chat.example.com ".to_string(),
            "".to_string(),
        ];
        let config = ok.into_config().unwrap();
        assert_eq!(
            config.server.allowed_origins,
            vec![
                HeaderValue::from_static("http://localhost:3000"),
                HeaderValue::from_static("https://chat.example.com"),
            ]
        );

        let mut wildcard = args(ResponderKind::Echo, None);
        wildcard.allowed_origins = vec!["*".to_string()];
        assert_eq!(
            wildcard.into_config().unwrap_err(),
            ConfigError::InvalidOrigin("*".to_string())
        );
    }

    #[test]
    fn cli_flags_select_responder() {
        let args = Args::try_parse_from([
            "relay",
            "--responder",
            "echo",
            "--echo-prefix",
            "Echo: ",
            "--allowed-origins",
            "http://a.test,http://b.test",
        ])
        .unwrap();

        assert_eq!(args.responder, ResponderKind::Echo);
        assert_eq!(args.echo_prefix, "Echo: ");
        assert_eq!(args.allowed_origins, vec!["http://a.test", "http://b.test"]);
    }
}
