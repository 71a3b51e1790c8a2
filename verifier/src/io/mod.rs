//! I/O helpers: child processes, output capture, signals, configuration.

pub mod capture;
pub mod config;
pub mod process;
pub mod signal;
