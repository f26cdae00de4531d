//! Webhook HTTP server: parses signed LINE callbacks, routes events, and
//! dispatches replies.

use crate::channels::{parse_events, LineChannel};
use crate::config::{Config, Credentials};
use crate::llm::OpenAiClient;
use crate::routing::Router;
use anyhow::{Context, Result};
use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Router as AxumRouter,
};
use std::sync::Arc;
use std::time::Duration;

/// Greeting served at the root path (doubles as a liveness probe).
pub const GREETING: &str = "Hello, This is a chatGPT line bot!";

/// Shared state for the webhook server. Built once at startup; everything in
/// it is read-only per request.
#[derive(Clone)]
struct GatewayState {
    channel_secret: Arc<String>,
    router: Router,
    line: Arc<LineChannel>,
}

/// Run the webhook gateway until SIGINT/SIGTERM. Credentials come resolved
/// from the caller so business logic never touches the environment.
pub async fn run_gateway(config: Config, credentials: Credentials) -> Result<()> {
    let openai = OpenAiClient::new(
        credentials.openai_api_key,
        config.openai.model.clone(),
        Duration::from_secs(config.openai.timeout_secs),
        config.openai.api_base.clone(),
    );
    let line = LineChannel::new(
        credentials.channel_access_token,
        config.line.api_base.clone(),
    );
    let state = GatewayState {
        channel_secret: Arc::new(credentials.channel_secret),
        router: Router::new(Arc::new(openai)),
        line: Arc::new(line),
    };

    let app = AxumRouter::new()
        .route("/", get(health_http))
        .route("/callback", post(callback))
        .with_state(state);

    let bind_addr = format!("{}:{}", config.gateway.bind, config.gateway.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("binding to {}", bind_addr))?;
    log::info!("gateway listening on {}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("gateway server exited")?;
    log::info!("gateway stopped");
    Ok(())
}

/// Future that completes when the process should shut down (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    log::info!("shutdown signal received, draining connections");
}

/// GET / returns a greeting (for probes and a quick sanity check in a browser).
async fn health_http() -> &'static str {
    GREETING
}

/// POST /callback — the LINE webhook. Signature or payload failure is 400 and
/// nothing is routed. Once parsing succeeds the response is 200 no matter what
/// happens downstream: a non-2xx here would only trigger LINE's redelivery
/// storm for events we already decided to drop.
async fn callback(State(state): State<GatewayState>, headers: HeaderMap, body: Bytes) -> StatusCode {
    let signature = headers
        .get("X-Line-Signature")
        .and_then(|v| v.to_str().ok());
    let events = match parse_events(&state.channel_secret, signature, &body) {
        Ok(events) => events,
        Err(e) => {
            log::warn!("rejecting webhook request: {}", e);
            return StatusCode::BAD_REQUEST;
        }
    };
    log::debug!("webhook parsed: {} event(s)", events.len());

    for event in &events {
        let Some(reply) = state.router.route_event(event).await else {
            continue;
        };
        if let Err(e) = state.line.reply(&reply.reply_token, &reply.text).await {
            log::warn!("reply dispatch failed: {}", e);
        }
    }
    StatusCode::OK
}
