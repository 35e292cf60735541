//! Shared helpers for integration tests.
//!
//! - `fixtures`: wiremock GPUStack server and wiring helpers
//! - `log_capture`: tracing event capture for assertions
//! - `logger`: structured per-test output

pub mod fixtures;
pub mod log_capture;
pub mod logger;
