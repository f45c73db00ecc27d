//! One chat exchange: submit the conversation, consume the chunk stream,
//! re-render the growing reply, and commit the pair once it settles.
//!
//! The exchange is transactional with respect to the session store: the user
//! turn and the model turn are committed together after the stream completes,
//! so a failure at any point leaves the conversation exactly as it was.

use crate::client::{RelayClient, RelayClientError};
use crate::llm::StreamChunk;
use crate::markdown;
use crate::session::{SessionStore, Turn};
use anyhow::{Context, Result};
use futures_util::{Stream, StreamExt};

/// Appended to each intermediate render while more output is expected.
pub const PENDING_MARKER: char = '…';

/// Where an exchange draws itself. Implemented by the terminal in the CLI;
/// tests record the calls.
pub trait RenderSurface {
    /// The submitted user turn, shown immediately.
    fn user_turn(&mut self, text: &str);
    /// Placeholder for the model turn while awaiting the first byte.
    fn pending(&mut self);
    /// Re-render of the accumulated reply plus the pending marker.
    fn partial(&mut self, rendered: &str);
    /// Final render of the settled reply, marker removed.
    fn settled(&mut self, rendered: &str);
    /// Visible error message replacing the placeholder.
    fn failed(&mut self, message: &str);
}

/// Run one exchange against the relay. Stream and transport failures are
/// rendered on the surface, not returned; only a local history-write failure
/// propagates as an error.
pub async fn run_exchange<S: RenderSurface>(
    client: &RelayClient,
    store: &mut SessionStore,
    surface: &mut S,
    input: &str,
) -> Result<()> {
    surface.user_turn(input);
    let mut history = store.to_history();
    history.push(Turn::user(input).to_content());

    surface.pending();
    let stream = match client.stream_chat(&history).await {
        Ok(stream) => stream,
        Err(e) => {
            surface.failed(&error_message(&e));
            return Ok(());
        }
    };

    match consume_stream(stream, surface).await {
        Ok(text) => store
            .commit_exchange(input, &text)
            .context("saving chat history")?,
        Err(e) => surface.failed(&error_message(&e)),
    }
    Ok(())
}

/// Accumulate chunks into the reply, re-rendering after each one. Returns the
/// assembled text once the stream completes; an error item aborts without a
/// final render.
async fn consume_stream<S: RenderSurface>(
    stream: impl Stream<Item = Result<StreamChunk, RelayClientError>>,
    surface: &mut S,
) -> Result<String, RelayClientError> {
    let mut stream = Box::pin(stream);
    let mut accumulated = String::new();
    while let Some(item) = stream.next().await {
        let chunk = item?;
        accumulated.push_str(&chunk.text);
        let mut provisional = accumulated.clone();
        provisional.push(PENDING_MARKER);
        surface.partial(&markdown::render(&provisional));
    }
    surface.settled(&markdown::render(&accumulated));
    Ok(accumulated)
}

fn error_message(e: &RelayClientError) -> String {
    format!("Désolé, une erreur est survenue: {}", e)
}
