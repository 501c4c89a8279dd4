//! Telemetry initialization for the anonsync services.

pub mod tracing;
