//! Integration test: start the relay on a free port and exercise the paths
//! that never reach the upstream (health, input validation, shell fallback).
//! The upstream base URL points at an unroutable port, so a 400 here also
//! proves no upstream call was attempted.

use lib::config::Config;
use lib::relay;
use std::time::Duration;

fn free_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind free port");
    listener.local_addr().expect("local_addr").port()
}

async fn start_relay() -> String {
    let port = free_port();
    let mut config = Config::default();
    config.server.port = port;
    config.model.api_key = Some("test-key".to_string());
    config.model.base_url = Some("http://127.0.0.1:1".to_string());

    tokio::spawn(async move {
        let _ = relay::run_relay(config).await;
    });

    let base = format!("http://127.0.0.1:{}", port);
    let client = reqwest::Client::new();
    for _ in 0..100 {
        if let Ok(resp) = client.get(format!("{}/health", base)).send().await {
            if resp.status().is_success() {
                return base;
            }
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    panic!("relay did not become healthy on {} within 5s", base);
}

#[tokio::test]
async fn health_responds_with_running() {
    let base = start_relay().await;
    let json: serde_json::Value = reqwest::get(format!("{}/health", base))
        .await
        .expect("GET /health")
        .json()
        .await
        .expect("parse JSON");
    assert_eq!(json.get("runtime").and_then(|v| v.as_str()), Some("running"));
}

#[tokio::test]
async fn chat_rejects_missing_or_empty_history() {
    let base = start_relay().await;
    let client = reqwest::Client::new();

    for body in [
        serde_json::json!({}),
        serde_json::json!({ "history": [] }),
        serde_json::json!({ "history": "pas une liste" }),
    ] {
        let resp = client
            .post(format!("{}/api/chat", base))
            .json(&body)
            .send()
            .await
            .expect("POST /api/chat");
        assert_eq!(resp.status().as_u16(), 400);
        let json: serde_json::Value = resp.json().await.expect("error body");
        assert!(json.get("error").is_some());
    }
}

#[tokio::test]
async fn analyze_rejects_empty_fields_without_calling_upstream() {
    let base = start_relay().await;
    let client = reqwest::Client::new();

    for body in [
        serde_json::json!({ "competitorContent": "du contenu", "subject": "" }),
        serde_json::json!({ "competitorContent": "", "subject": "seo" }),
        serde_json::json!({ "subject": "seo" }),
    ] {
        let resp = client
            .post(format!("{}/api/analyze", base))
            .json(&body)
            .send()
            .await
            .expect("POST /api/analyze");
        assert_eq!(resp.status().as_u16(), 400);
        let json: serde_json::Value = resp.json().await.expect("error body");
        assert!(json.get("error").is_some());
    }
}

#[tokio::test]
async fn unknown_paths_serve_the_shell() {
    let base = start_relay().await;
    let resp = reqwest::get(format!("{}/une/route/cliente", base))
        .await
        .expect("GET shell");
    assert!(resp.status().is_success());
    let body = resp.text().await.expect("shell body");
    assert!(body.contains("Lynn"));
}
