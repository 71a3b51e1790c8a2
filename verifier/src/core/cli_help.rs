//! CLI help completeness check.

use std::sync::LazyLock;

use regex::Regex;

use crate::core::types::CliHelpVerdict;

static USAGE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?im)^\s*usage:").unwrap());
static OPTIONS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?im)^\s*options:").unwrap());

/// Help text is complete iff it has both a usage and an options section.
///
/// The exit code is deliberately not consulted here; verifiers combine this
/// verdict with their own exit-code policy.
pub fn classify_cli_help(output: &str) -> CliHelpVerdict {
    let has_usage = USAGE_RE.is_match(output);
    let has_options = OPTIONS_RE.is_match(output);
    CliHelpVerdict {
        has_help: has_usage && has_options,
        has_usage,
        has_options,
    }
}
