use crate::processor::Processor;
use crate::{ChatRequest, ChatResponse};
use responder_client::ErrorKind;

use anyhow::Result;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::{HeaderValue, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tokio::net::TcpListener;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

pub const DEFAULT_ALLOWED_ORIGIN: &str = "http://localhost:3000";

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Origins allowed to call the relay from a browser.
    pub allowed_origins: Vec<HeaderValue>,
    /// Report responder failures with 200, as older callers expect.
    pub legacy_error_status: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec![HeaderValue::from_static(DEFAULT_ALLOWED_ORIGIN)],
            legacy_error_status: false,
        }
    }
}

#[derive(Clone)]
struct AppState {
    processor: Processor,
    legacy_error_status: bool,
}

#[derive(Serialize)]
struct EndpointInfo {
    method: &'static str,
    path: &'static str,
    description: &'static str,
}

#[derive(Serialize)]
struct ServiceInfo {
    name: &'static str,
    version: &'static str,
    description: &'static str,
    responder: &'static str,
    endpoints: [EndpointInfo; 3],
}

pub fn app(processor: Processor, config: &ServerConfig) -> Router {
    let state = AppState {
        processor,
        legacy_error_status: config.legacy_error_status,
    };

    Router::new()
        .route("/chat", post(message_handler))
        .route("/up", get(health_handler))
        .route("/", get(info_handler))
        .with_state(state)
        .layer(cors_layer(config.allowed_origins.clone()))
        .layer(TraceLayer::new_for_http())
}

/// Serves `app` until Ctrl-C or SIGTERM.
pub async fn serve(listener: TcpListener, app: Router) -> Result<()> {
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

fn cors_layer(allowed_origins: Vec<HeaderValue>) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed_origins))
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

async fn message_handler(
    State(state): State<AppState>,
    request: Result<Json<ChatRequest>, JsonRejection>,
) -> (StatusCode, Json<ChatResponse>) {
    let request = match request {
        Ok(Json(request)) => request,
        Err(rejection) => {
            tracing::warn!("Rejected chat request: {}", rejection.body_text());
            return (
                rejection.status(),
                Json(ChatResponse::Error(rejection.body_text())),
            );
        }
    };

    tracing::info!("Processing request: {:?}", &request);

    match state.processor.process_request(request).await {
        Ok(reply) => (StatusCode::OK, Json(ChatResponse::Reply(reply))),
        Err(e) => {
            tracing::error!(kind = e.kind().as_str(), "Error: {}", e);
            let status = if state.legacy_error_status {
                StatusCode::OK
            } else {
                failure_status(e.kind())
            };
            (status, Json(ChatResponse::Error(e.to_string())))
        }
    }
}

fn failure_status(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Timeout => StatusCode::GATEWAY_TIMEOUT,
        ErrorKind::Network
        | ErrorKind::Authentication
        | ErrorKind::Upstream
        | ErrorKind::MalformedResponse => StatusCode::BAD_GATEWAY,
    }
}

async fn health_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn info_handler(State(state): State<AppState>) -> Json<ServiceInfo> {
    Json(ServiceInfo {
        name: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        description: env!("CARGO_PKG_DESCRIPTION"),
        responder: state.processor.responder_name(),
        endpoints: [
            EndpointInfo {
                method: "POST",
                path: "/chat",
                description: "Relay {\"message\": ...} and answer {\"reply\": ...} or {\"error\": ...}",
            },
            EndpointInfo {
                method: "GET",
                path: "/up",
                description: "Health check",
            },
            EndpointInfo {
                method: "GET",
                path: "/",
                description: "Service information",
            },
        ],
    })
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {:?}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {:?}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    tracing::info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeouts_map_to_gateway_timeout() {
        assert_eq!(failure_status(ErrorKind::Timeout), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(failure_status(ErrorKind::Authentication), StatusCode::BAD_GATEWAY);
        assert_eq!(failure_status(ErrorKind::MalformedResponse), StatusCode::BAD_GATEWAY);
    }
}
