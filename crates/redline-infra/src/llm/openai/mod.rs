//! OpenAI-compatible Chat Completions client.
//!
//! Works against any endpoint that speaks the `/chat/completions` wire
//! format (OpenAI, Azure-style proxies, local gateways).

pub mod client;
pub mod types;

pub use client::OpenAiClient;
