//! Model gateway client for the generative-language API.
//!
//! Supports streamed chat generation (SSE) and single-shot generation with a
//! constrained JSON output schema.

mod gemini;

pub use gemini::{
    Content, ContentPart, GeminiClient, GeminiError, GenerationConfig, StreamChunk,
};
