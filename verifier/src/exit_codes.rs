//! Stable exit codes for verifier CLI commands.

/// The check ran and passed.
pub const OK: i32 = 0;
/// The check ran (or was refused by a gate) and did not pass.
pub const FAILED: i32 = 1;
/// Bad usage, unreadable input or invalid configuration.
pub const INVALID: i32 = 2;
