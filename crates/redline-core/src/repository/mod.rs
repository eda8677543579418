//! Repository trait definitions (ports).
//!
//! The infrastructure layer (redline-infra) implements these with SQLite.
//! The in-memory store lives here because the engine tests need it.

pub mod checkpoint;
pub mod memory;

pub use checkpoint::CheckpointStore;
pub use memory::InMemoryCheckpointStore;
