//! Telemetry - Tracing Subscriber and OpenTelemetry Export
//!
//! Components log through `tracing` and open spans through the injected
//! `TraceContext`; this module decides where those spans go.

pub mod tracer;

pub use tracer::{init_tracer, TelemetryConfig, TelemetryGuard};
