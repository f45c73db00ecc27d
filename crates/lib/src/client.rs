//! Relay client for native front ends.
//!
//! Talks to the relay's two endpoints: streamed chat (SSE) and single-shot
//! analysis (JSON). SSE decoding keeps its partial-record state across read
//! boundaries, so a record split between two network reads is re-merged
//! instead of dropped or duplicated.

use crate::analysis::{AnalysisRequest, AnalysisResult};
use crate::llm::{Content, StreamChunk};
use async_stream::stream;
use eventsource_stream::Eventsource;
use futures_util::{Stream, StreamExt};
use serde::Serialize;

/// Client for the relay HTTP API.
#[derive(Clone)]
pub struct RelayClient {
    base_url: String,
    client: reqwest::Client,
}

#[derive(Debug, thiserror::Error)]
pub enum RelayClientError {
    #[error("relay request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("{0}")]
    Server(String),
    #[error("stream interrupted: {0}")]
    Transport(String),
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    history: &'a [Content],
}

impl RelayClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            client: reqwest::Client::new(),
        }
    }

    /// POST /api/chat — submit the conversation, receive a chunk stream.
    /// A non-success response is returned as an error before any chunk.
    pub async fn stream_chat(
        &self,
        history: &[Content],
    ) -> Result<impl Stream<Item = Result<StreamChunk, RelayClientError>>, RelayClientError> {
        let url = format!("{}/api/chat", self.base_url);
        let res = self
            .client
            .post(&url)
            .json(&ChatRequest { history })
            .send()
            .await?;
        if !res.status().is_success() {
            return Err(server_error(res).await);
        }
        Ok(chunk_stream(res.bytes_stream()))
    }

    /// POST /api/analyze — submit an analysis request, receive the result.
    pub async fn analyze(
        &self,
        request: &AnalysisRequest,
    ) -> Result<AnalysisResult, RelayClientError> {
        let url = format!("{}/api/analyze", self.base_url);
        let res = self.client.post(&url).json(request).send().await?;
        if !res.status().is_success() {
            return Err(server_error(res).await);
        }
        Ok(res.json().await?)
    }
}

/// Error for a non-success relay response: the JSON `{error}` body when
/// present, the status line otherwise.
async fn server_error(res: reqwest::Response) -> RelayClientError {
    let status = res.status();
    let body = res.text().await.unwrap_or_default();
    let message = serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_string))
        .unwrap_or_else(|| format!("HTTP {}", status));
    RelayClientError::Server(message)
}

/// Decode an SSE byte stream into chunks. Records that do not parse as a
/// chunk payload are skipped; they are transient partial reads, and the
/// decoder re-merges split records on the following read.
fn chunk_stream<S, B, E>(bytes: S) -> impl Stream<Item = Result<StreamChunk, RelayClientError>>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: std::fmt::Display,
{
    stream! {
        let mut events = Box::pin(bytes.eventsource());
        while let Some(event) = events.next().await {
            match event {
                Ok(event) => {
                    let chunk: StreamChunk = match serde_json::from_str(&event.data) {
                        Ok(c) => c,
                        Err(_) => continue,
                    };
                    if !chunk.text.is_empty() {
                        yield Ok(chunk);
                    }
                }
                Err(e) => {
                    yield Err(RelayClientError::Transport(e.to_string()));
                    break;
                }
            }
        }
    }
}
