//! Lynn core library — configuration, the gateway client, the HTTP relay,
//! and the native chat client (session store, streaming exchange, markdown).

pub mod analysis;
pub mod client;
pub mod config;
pub mod exchange;
pub mod llm;
pub mod markdown;
pub mod relay;
pub mod session;
