//! Observability setup for redline: tracing subscriber and optional
//! OpenTelemetry export.

pub mod tracing_setup;
