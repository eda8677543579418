//! Shared domain types for redline.
//!
//! This crate contains the data shapes passed between the workflow engine,
//! the agent adapters, the tool registry, and the checkpoint store: the
//! conversation log, the run state, checkpoint records, agent outcomes,
//! configuration, and the error enums used at those boundaries.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror, schemars.

pub mod agent;
pub mod config;
pub mod conversation;
pub mod error;
pub mod run;
