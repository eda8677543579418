//! Revision workflow: graph, routing, steps, engine, and driver.

pub mod checkpoint;
pub mod context;
pub mod delta;
pub mod driver;
pub mod engine;
pub mod export;
pub mod graph;
pub mod human;
pub mod retry;
pub mod router;
pub mod steps;
