//! Business logic and port trait definitions for redline.
//!
//! This crate defines the workflow engine together with the "ports" that the
//! infrastructure layer implements: agent adapters, tools, the human channel,
//! the checkpoint store, and the artifact writer. It depends only on
//! `redline-types` -- never on `redline-infra` or any network/database crate.

pub mod agent;
pub mod repository;
pub mod tool;
pub mod workflow;
