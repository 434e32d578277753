//! Structured logging, with OpenTelemetry span export when configured.
//!
//! Logs go to stderr as JSON; stdout is reserved for command results.
//!
//! # Telemetry invariants
//!
//! - **No secret values** may appear in any span attribute or log field.
//!   Parameter names, pass keys and store directories are fine.
//! - Log level is configurable via `PASS_SSM_LOG_LEVEL` or `RUST_LOG`
//!   (default: `info`).

pub mod init;

pub use init::{init_telemetry, shutdown};
