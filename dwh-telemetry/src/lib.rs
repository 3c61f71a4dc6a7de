//! Telemetry setup shared by the loader binary and tests.

pub mod tracing;
