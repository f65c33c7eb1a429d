use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Network,
    Timeout,
    Authentication,
    Upstream,
    MalformedResponse,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Network => "network",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Authentication => "authentication",
            ErrorKind::Upstream => "upstream",
            ErrorKind::MalformedResponse => "malformed_response",
        }
    }
}

/// A failed responder call. The `Display` text is what callers get to see.
#[derive(Error, Debug)]
pub enum ResponderError {
    #[error("connection error: {0}")]
    Network(String),

    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("authentication failed: {0}")]
    Authentication(String),

    #[error("responder returned {status}: {message}")]
    Upstream { status: u16, message: String },

    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

impl ResponderError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ResponderError::Network(_) => ErrorKind::Network,
            ResponderError::Timeout(_) => ErrorKind::Timeout,
            ResponderError::Authentication(_) => ErrorKind::Authentication,
            ResponderError::Upstream { .. } => ErrorKind::Upstream,
            ResponderError::MalformedResponse(_) => ErrorKind::MalformedResponse,
        }
    }

    pub(crate) fn from_transport(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            ResponderError::Timeout(error.to_string())
        } else if error.is_decode() {
            ResponderError::MalformedResponse(error.to_string())
        } else {
            ResponderError::Network(error.to_string())
        }
    }

    pub(crate) fn from_status(status: StatusCode, body: &str) -> Self {
        let message = error_message(body).unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("unknown status")
                .to_string()
        });

        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                ResponderError::Authentication(message)
            }
            _ => ResponderError::Upstream {
                status: status.as_u16(),
                message,
            },
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ErrorBody {
    Nested { error: NestedError },
    Flat { error: String },
}

#[derive(Deserialize)]
struct NestedError {
    message: String,
}

/// Pulls a readable message out of an error body, falling back to the raw text.
fn error_message(body: &str) -> Option<String> {
    if let Ok(parsed) = serde_json::from_str::<ErrorBody>(body) {
        return Some(match parsed {
            ErrorBody::Nested { error } => error.message,
            ErrorBody::Flat { error } => error,
        });
    }

    let body = body.trim();
    if body.is_empty() {
        None
    } else {
        Some(body.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unauthorized_maps_to_authentication() {
        let body = r#"{"error": {"message": "Incorrect API key provided", "type": "invalid_request_error"}}"#;
        let err = ResponderError::from_status(StatusCode::UNAUTHORIZED, body);

        assert_eq!(err.kind(), ErrorKind::Authentication);
        assert_eq!(
            err.to_string(),
            "authentication failed: Incorrect API key provided"
        );
    }

    #[test]
    fn server_error_keeps_status_and_flat_message() {
        let err = ResponderError::from_status(
            StatusCode::SERVICE_UNAVAILABLE,
            r#"{"error": "model is loading"}"#,
        );

        assert_eq!(err.kind(), ErrorKind::Upstream);
        assert_eq!(err.to_string(), "responder returned 503: model is loading");
    }

    #[test]
    fn empty_body_falls_back_to_reason_phrase() {
        let err = ResponderError::from_status(StatusCode::BAD_GATEWAY, "  ");
        assert_eq!(err.to_string(), "responder returned 502: Bad Gateway");
    }

    #[test]
    fn plain_text_body_is_kept() {
        let err = ResponderError::from_status(StatusCode::NOT_FOUND, "no such route\n");
        assert_eq!(err.to_string(), "responder returned 404: no such route");
    }
}
