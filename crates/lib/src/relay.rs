//! HTTP relay: streamed chat and single-shot analysis over the gateway client.
//!
//! Two endpoints, both stateless: POST /api/chat forwards a conversation and
//! relays the upstream chunk stream as server-sent events; POST /api/analyze
//! forwards one analysis request and relays the structured JSON result. Every
//! other path serves the embedded single-page shell.

use crate::analysis::{self, AnalysisRequest};
use crate::config::{self, Config};
use crate::llm::{Content, GeminiClient, GenerationConfig};
use anyhow::{Context, Result};
use axum::{
    extract::State,
    http::StatusCode,
    response::{
        sse::{Event, Sse},
        Html, IntoResponse, Response,
    },
    routing::{get, post},
    Json, Router,
};
use futures_util::StreamExt;
use serde_json::json;
use std::sync::Arc;

const SHELL_HTML: &str = include_str!("../static/index.html");

/// Shared state for the relay (config + gateway client). Cloned per request;
/// holds nothing mutable.
#[derive(Clone)]
pub struct RelayState {
    pub config: Arc<Config>,
    pub gemini: GeminiClient,
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

/// Submitted history must start from the first user turn and include the most
/// recent message exactly once. When no user turn exists, only the most
/// recent message is submitted.
fn normalize_history(history: &[Content]) -> Vec<Content> {
    match history.iter().position(|m| m.role == "user") {
        Some(first_user) => history[first_user..].to_vec(),
        None => history.last().cloned().into_iter().collect(),
    }
}

/// POST /api/chat — body {history: [{role, parts: [{text}]}]}.
/// Responds with text/event-stream of `data: {"text": ...}` records. Errors
/// before the first chunk are JSON; a mid-stream failure truncates the stream.
async fn chat(State(state): State<RelayState>, Json(body): Json<serde_json::Value>) -> Response {
    let entries = match body.get("history").and_then(|h| h.as_array()) {
        Some(entries) if !entries.is_empty() => entries,
        _ => return error_response(StatusCode::BAD_REQUEST, "invalid history provided"),
    };
    let history: Vec<Content> = match entries
        .iter()
        .cloned()
        .map(serde_json::from_value)
        .collect::<Result<_, _>>()
    {
        Ok(history) => history,
        Err(_) => return error_response(StatusCode::BAD_REQUEST, "invalid history provided"),
    };
    let contents = normalize_history(&history);

    match state
        .gemini
        .stream_generate(&state.config.model.name, contents)
        .await
    {
        Ok(stream) => {
            let events = stream.map(|item| match item {
                Ok(chunk) => Event::default().json_data(&chunk),
                Err(e) => {
                    log::warn!("chat upstream failed mid-stream: {}", e);
                    Err(axum::Error::new(e))
                }
            });
            Sse::new(events).into_response()
        }
        Err(e) => {
            log::warn!("chat upstream failed before streaming: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "server error during chat")
        }
    }
}

/// POST /api/analyze — body {competitorContent, subject}. Responds with the
/// structured analysis JSON; unparseable upstream output is a 500, never a
/// partial result.
async fn analyze(State(state): State<RelayState>, Json(body): Json<serde_json::Value>) -> Response {
    let request: AnalysisRequest = match serde_json::from_value(body) {
        Ok(request) => request,
        Err(_) => {
            return error_response(StatusCode::BAD_REQUEST, "missing competitorContent or subject")
        }
    };
    if let Err(message) = request.validate() {
        return error_response(StatusCode::BAD_REQUEST, message);
    }

    let prompt = analysis::build_prompt(&request);
    let generation_config = GenerationConfig::json(analysis::response_schema());
    let text = match state
        .gemini
        .generate(
            &state.config.model.name,
            vec![Content::user(prompt)],
            Some(generation_config),
        )
        .await
    {
        Ok(text) => text,
        Err(e) => {
            log::warn!("analyze upstream failed: {}", e);
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "error processing analysis");
        }
    };
    match serde_json::from_str::<analysis::AnalysisResult>(&text) {
        Ok(result) => Json(result).into_response(),
        Err(e) => {
            log::warn!("analysis result did not parse: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "error processing analysis")
        }
    }
}

/// GET /health returns a simple health JSON (for probes).
async fn health(State(state): State<RelayState>) -> Json<serde_json::Value> {
    Json(json!({
        "runtime": "running",
        "port": state.config.server.port,
    }))
}

/// Any unmatched path serves the single-page shell, so client-side routes
/// resolve to the application.
async fn shell() -> Html<&'static str> {
    Html(SHELL_HTML)
}

/// Router over the given state; separated from [`run_relay`] for tests.
pub fn router(state: RelayState) -> Router {
    Router::new()
        .route("/api/chat", post(chat))
        .route("/api/analyze", post(analyze))
        .route("/health", get(health))
        .fallback(shell)
        .with_state(state)
}

/// Run the relay; binds to config.server.bind:config.server.port.
/// Requires an API credential (config.model.apiKey or the API_KEY env).
/// Blocks until shutdown (e.g. Ctrl+C).
pub async fn run_relay(config: Config) -> Result<()> {
    let api_key = config::resolve_api_key(&config)
        .context("no API credential (set API_KEY or model.apiKey in config)")?;
    let gemini = GeminiClient::new(api_key, config.model.base_url.clone());
    let bind_addr = format!("{}:{}", config.server.bind, config.server.port);
    let state = RelayState {
        config: Arc::new(config),
        gemini,
    };

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("binding to {}", bind_addr))?;
    log::info!("relay listening on {}", bind_addr);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("relay server exited")?;
    log::info!("relay stopped");
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

#[cfg(test)]
mod tests {
    use super::*;

    fn turn(role: &str, text: &str) -> Content {
        Content {
            role: role.to_string(),
            parts: vec![crate::llm::ContentPart::text(text)],
        }
    }

    #[test]
    fn history_starting_with_user_is_unchanged() {
        let history = vec![turn("user", "salut"), turn("model", "bonjour")];
        let normalized = normalize_history(&history);
        assert_eq!(normalized.len(), 2);
        assert_eq!(normalized[0].text(), "salut");
    }

    #[test]
    fn leading_model_turns_are_stripped() {
        let history = vec![
            turn("model", "intro parasite"),
            turn("user", "salut"),
            turn("model", "bonjour"),
            turn("user", "ça va ?"),
        ];
        let normalized = normalize_history(&history);
        assert_eq!(normalized.len(), 3);
        assert_eq!(normalized[0].role, "user");
        assert_eq!(normalized[0].text(), "salut");
        // The most recent message appears exactly once.
        let last_count = normalized.iter().filter(|c| c.text() == "ça va ?").count();
        assert_eq!(last_count, 1);
    }

    #[test]
    fn history_without_user_turn_keeps_only_the_most_recent() {
        let history = vec![turn("model", "a"), turn("model", "b")];
        let normalized = normalize_history(&history);
        assert_eq!(normalized.len(), 1);
        assert_eq!(normalized[0].text(), "b");
    }
}
