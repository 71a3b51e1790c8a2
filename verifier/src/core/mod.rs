//! Deterministic, pure logic shared by the verifier.
//!
//! Core modules must be free of I/O side effects. Every classifier is a total
//! function over captured output: malformed or empty input yields a valid,
//! conservative verdict rather than an error.

pub mod cli_help;
pub mod console_log;
pub mod lint;
pub mod memory;
pub mod registry;
pub mod rejection;
pub mod resolution;
pub mod run_context;
pub mod startup;
pub mod typecheck;
pub mod types;
