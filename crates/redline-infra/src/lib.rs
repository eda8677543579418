//! Infrastructure layer for redline.
//!
//! Contains implementations of the ports defined in `redline-core`: SQLite
//! checkpoint storage, the OpenAI-compatible chat client and the LLM-backed
//! agents built on it, the article fetch tool, config loading, and the
//! filesystem artifact writer.

pub mod agent;
pub mod config;
pub mod filesystem;
pub mod llm;
pub mod sqlite;
pub mod tool;
