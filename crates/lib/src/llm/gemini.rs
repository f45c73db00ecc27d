//! Gemini API client (generativelanguage.googleapis.com).
//! Supports single-shot generateContent and streaming streamGenerateContent (SSE).

use async_stream::stream;
use eventsource_stream::Eventsource;
use futures_util::{Stream, StreamExt};
use serde::{Deserialize, Serialize};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Client for the Gemini HTTP API.
#[derive(Clone)]
pub struct GeminiClient {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

#[derive(Debug, thiserror::Error)]
pub enum GeminiError {
    #[error("gemini request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("gemini api error: {0}")]
    Api(String),
    #[error("gemini stream failed: {0}")]
    Stream(String),
    #[error("gemini returned no content")]
    Empty,
}

/// One message in a multi-turn request, producer is "user" or "model".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Content {
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub parts: Vec<ContentPart>,
}

impl Content {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            parts: vec![ContentPart::text(text)],
        }
    }

    /// Concatenated text of all parts.
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentPart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl ContentPart {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
        }
    }
}

/// Optional generation parameters; used to request structured JSON output.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_schema: Option<serde_json::Value>,
}

impl GenerationConfig {
    /// Request `application/json` output conforming to the given schema.
    pub fn json(schema: serde_json::Value) -> Self {
        Self {
            response_mime_type: Some("application/json".to_string()),
            response_schema: Some(schema),
        }
    }
}

/// One incremental unit of streamed model output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamChunk {
    pub text: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
}

impl GenerateContentResponse {
    /// Text of the first candidate, if any part carries text.
    fn text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        let text = content.text();
        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>, base_url: Option<String>) -> Self {
        let base_url = base_url
            .map(|u| u.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        Self {
            base_url,
            api_key: api_key.into(),
            client: reqwest::Client::new(),
        }
    }

    /// POST models/{model}:generateContent — single-shot generation.
    /// Returns the first candidate's text.
    pub async fn generate(
        &self,
        model: &str,
        contents: Vec<Content>,
        generation_config: Option<GenerationConfig>,
    ) -> Result<String, GeminiError> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, model, self.api_key
        );
        let body = GenerateContentRequest {
            contents,
            generation_config,
        };
        let res = self.client.post(&url).json(&body).send().await?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(GeminiError::Api(format!("{} {}", status, body)));
        }
        let data: GenerateContentResponse = res.json().await?;
        data.text().ok_or(GeminiError::Empty)
    }

    /// POST models/{model}:streamGenerateContent?alt=sse — streaming generation.
    ///
    /// Returns a lazy, in-order sequence of text chunks. A non-success status
    /// is reported as an error return before any chunk is produced; transport
    /// failures after that surface as an error item ending the stream. Events
    /// that do not parse or carry no text are skipped.
    pub async fn stream_generate(
        &self,
        model: &str,
        contents: Vec<Content>,
    ) -> Result<impl Stream<Item = Result<StreamChunk, GeminiError>>, GeminiError> {
        let url = format!(
            "{}/models/{}:streamGenerateContent?alt=sse&key={}",
            self.base_url, model, self.api_key
        );
        let body = GenerateContentRequest {
            contents,
            generation_config: None,
        };
        let res = self.client.post(&url).json(&body).send().await?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(GeminiError::Api(format!("{} {}", status, body)));
        }
        let mut events = Box::pin(res.bytes_stream().eventsource());
        Ok(stream! {
            while let Some(event) = events.next().await {
                match event {
                    Ok(event) => {
                        let data: GenerateContentResponse =
                            match serde_json::from_str(&event.data) {
                                Ok(d) => d,
                                Err(_) => continue,
                            };
                        if let Some(text) = data.text() {
                            yield Ok(StreamChunk { text });
                        }
                    }
                    Err(e) => {
                        yield Err(GeminiError::Stream(e.to_string()));
                        break;
                    }
                }
            }
        })
    }
}
