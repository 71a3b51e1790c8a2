//! Managed subprocess verification.
//!
//! Runs external commands as supervised children (argv only, no shell) with a
//! hard deadline and signal escalation, then classifies their captured output
//! into typed verdicts:
//!
//! - **[`core`]**: Pure classifiers, verdict types, resolution aggregation and
//!   the reentrancy context. No I/O.
//! - **[`io`]**: Process execution, output capture, signal delivery and
//!   configuration.
//! - **[`verify`]**: Verifiers that perform one child invocation each and the
//!   sequential pipeline built from them.

pub mod core;
pub mod exit_codes;
pub mod io;
pub mod logging;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
pub mod verify;
