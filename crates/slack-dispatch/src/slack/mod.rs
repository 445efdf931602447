//! HTTP surface: the event and interaction webhooks plus a health check.

pub mod api;

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::dispatcher::Dispatcher;
use crate::error::DispatchError;
use crate::finalizer::Ack;
use crate::types::RequestSignature;

pub use api::SlackApiClient;

const TIMESTAMP_HEADER: &str = "x-slack-request-timestamp";
const SIGNATURE_HEADER: &str = "x-slack-signature";

impl IntoResponse for Ack {
    fn into_response(self) -> Response {
        match self {
            Ack::Challenge(challenge) => (StatusCode::OK, challenge).into_response(),
            Ack::Empty => StatusCode::OK.into_response(),
            Ack::BadRequest => StatusCode::BAD_REQUEST.into_response(),
        }
    }
}

/// Build the router for both webhook paths.
pub fn router(dispatcher: Arc<Dispatcher>) -> Router {
    let config = dispatcher.config();
    let event_path = config.event_path.clone();
    let interaction_path = config.interaction_path.clone();
    let limit = config.max_body_bytes;

    Router::new()
        .route(&event_path, post(handle_event))
        .route(&interaction_path, post(handle_interaction))
        .route("/health", get(health_check))
        .layer(DefaultBodyLimit::max(limit))
        .layer(TraceLayer::new_for_http())
        .with_state(dispatcher)
}

/// Bind the configured address and serve until Ctrl-C.
pub async fn serve(dispatcher: Arc<Dispatcher>) -> Result<(), DispatchError> {
    let addr = dispatcher.config().listen_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| DispatchError::Config(format!("bind {} failed: {}", addr, e)))?;

    tracing::info!(
        addr = %addr,
        event_path = %dispatcher.config().event_path,
        interaction_path = %dispatcher.config().interaction_path,
        "Webhook server listening"
    );

    axum::serve(listener, router(dispatcher))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| DispatchError::Internal(format!("server error: {}", e)))?;

    tracing::info!("Webhook server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

fn request_signature(headers: &HeaderMap) -> RequestSignature {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    RequestSignature {
        timestamp: header(TIMESTAMP_HEADER),
        signature: header(SIGNATURE_HEADER),
    }
}

async fn handle_event(
    State(dispatcher): State<Arc<Dispatcher>>,
    headers: HeaderMap,
    body: Bytes,
) -> Ack {
    dispatcher
        .handle_event(&request_signature(&headers), &body)
        .await
}

async fn handle_interaction(
    State(dispatcher): State<Arc<Dispatcher>>,
    headers: HeaderMap,
    body: Bytes,
) -> Ack {
    dispatcher
        .handle_interaction(&request_signature(&headers), &body)
        .await
}

async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}
