//! Shared deterministic types for verifier core logic.
//!
//! These types define stable contracts between the executor, the classifiers
//! and the orchestrator. They carry no I/O and are created fresh per call.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// Terminal result of one child process invocation.
///
/// `exit_code` is `None` iff the process never closed naturally (timeout or
/// spawn failure). A natural close caused by signal `N` reports `128 + N`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    /// Arrival-ordered stdout/stderr chunks captured before the freeze point.
    pub combined_output: String,
    pub timed_out: bool,
    /// Classified spawn failure ("command not found", "permission denied", ...).
    pub spawn_error: Option<String>,
    /// Human-readable terminal failure: timeout message or spawn failure.
    pub error: Option<String>,
}

/// Maps exit codes to a verifier's domain `success` flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitCodePolicy {
    /// Only a clean exit counts (CLI help probes).
    Zero,
    /// Exit 0 or 1 means the tool ran to completion and reported pass/fail
    /// (PRD validation, full test suite).
    Completed,
}

impl ExitCodePolicy {
    pub fn accepts(self, exit_code: Option<i32>) -> bool {
        match (self, exit_code) {
            (Self::Zero, Some(0)) => true,
            (Self::Completed, Some(0 | 1)) => true,
            _ => false,
        }
    }
}

/// Memory-exhaustion subtype, by which component reported the failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MemoryErrorType {
    HeapOom,
    WorkerOom,
    SystemOom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Fatal,
    Warning,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryErrorVerdict {
    pub has_memory_error: bool,
    pub error_type: Option<MemoryErrorType>,
    /// Text that triggered the match, or `exit code N` for code-only detection.
    pub matched_pattern: Option<String>,
    pub suggestion: Option<String>,
    pub severity: Option<Severity>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionTag {
    HandledWarning,
    UnhandledWarning,
    UncaughtRejection,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromiseRejectionVerdict {
    pub matched_tags: BTreeSet<RejectionTag>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsoleLogVerdict {
    pub has_console_log: bool,
    pub console_log_count: usize,
    /// Names of the unstructured print shapes seen, in first-seen order.
    pub detected_patterns: Vec<String>,
    pub uses_logger: bool,
    pub logger_line_count: usize,
}

impl ConsoleLogVerdict {
    /// Both structured logger lines and raw prints were seen.
    pub fn is_mixed(&self) -> bool {
        self.console_log_count > 0 && self.logger_line_count > 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StartupErrorType {
    ModuleNotFound,
    RuntimeError,
    StackTrace,
    SpawnError,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartupErrorVerdict {
    pub error_types: BTreeSet<StartupErrorType>,
    pub raw_errors: Vec<String>,
    pub missing_modules: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CliHelpVerdict {
    pub has_help: bool,
    pub has_usage: bool,
    pub has_options: bool,
}

/// One compiler diagnostic line, e.g. `src/a.ts(10,5): error TS2307: ...`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypecheckDiagnostic {
    pub file: String,
    pub line: u32,
    pub column: u32,
    pub code: String,
    pub message: String,
    /// Unresolved module specifier; only set for the module-not-found code.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypecheckVerdict {
    pub diagnostics: Vec<TypecheckDiagnostic>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LintErrorStatus {
    pub has_errors: bool,
    pub errors: Vec<String>,
    /// False iff at least one critical (non-deferrable) error exists, or the
    /// report was missing.
    pub acceptable: bool,
    pub critical: Vec<String>,
    pub deferred: Vec<String>,
}

/// Tagged classifier output, so verdicts can be aggregated uniformly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Verdict {
    Memory(MemoryErrorVerdict),
    PromiseRejection(PromiseRejectionVerdict),
    ConsoleLog(ConsoleLogVerdict),
    Startup(StartupErrorVerdict),
    CliHelp(CliHelpVerdict),
    Typecheck(TypecheckVerdict),
    Lint(LintErrorStatus),
}

impl Verdict {
    /// Whether this verdict indicates something the caller must act on.
    pub fn has_problem(&self) -> bool {
        match self {
            Self::Memory(v) => v.has_memory_error,
            Self::PromiseRejection(v) => !v.matched_tags.is_empty(),
            Self::ConsoleLog(v) => v.has_console_log,
            Self::Startup(v) => !v.error_types.is_empty(),
            Self::CliHelp(v) => !v.has_help,
            Self::Typecheck(v) => !v.diagnostics.is_empty(),
            Self::Lint(v) => !v.acceptable,
        }
    }

    /// Matched evidence backing a problem verdict (empty when clean).
    pub fn evidence(&self) -> Vec<String> {
        match self {
            Self::Memory(v) => v.matched_pattern.iter().cloned().collect(),
            Self::PromiseRejection(v) => v
                .matched_tags
                .iter()
                .map(|tag| rejection_label(*tag).to_string())
                .collect(),
            Self::ConsoleLog(v) => v.detected_patterns.clone(),
            Self::Startup(v) => v.raw_errors.clone(),
            Self::CliHelp(v) => {
                let mut missing = Vec::new();
                if !v.has_usage {
                    missing.push("missing usage section".to_string());
                }
                if !v.has_options {
                    missing.push("missing options section".to_string());
                }
                missing
            }
            Self::Typecheck(v) => v
                .diagnostics
                .iter()
                .map(|d| {
                    format!(
                        "{}({},{}): {} {}",
                        d.file, d.line, d.column, d.code, d.message
                    )
                })
                .collect(),
            Self::Lint(v) => {
                if v.acceptable {
                    Vec::new()
                } else if v.critical.is_empty() {
                    vec!["lint report missing".to_string()]
                } else {
                    v.critical.clone()
                }
            }
        }
    }
}

fn rejection_label(tag: RejectionTag) -> &'static str {
    match tag {
        RejectionTag::HandledWarning => "PromiseRejectionHandledWarning",
        RejectionTag::UnhandledWarning => "UnhandledPromiseRejectionWarning",
        RejectionTag::UncaughtRejection => "UnhandledPromiseRejection",
    }
}

/// Aggregate of named sub-resolutions combined with AND semantics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueResolutionStatus {
    pub all_resolved: bool,
    /// Sub-check name and whether it resolved, in evaluation order.
    pub resolutions: Vec<(String, bool)>,
    pub remaining_issues: Vec<String>,
    /// Matched evidence per unresolved category.
    pub error_details: BTreeMap<String, Vec<String>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_policy_only_accepts_clean_exit() {
        assert!(ExitCodePolicy::Zero.accepts(Some(0)));
        assert!(!ExitCodePolicy::Zero.accepts(Some(1)));
        assert!(!ExitCodePolicy::Zero.accepts(None));
    }

    #[test]
    fn completed_policy_accepts_pass_and_fail() {
        assert!(ExitCodePolicy::Completed.accepts(Some(0)));
        assert!(ExitCodePolicy::Completed.accepts(Some(1)));
        assert!(!ExitCodePolicy::Completed.accepts(Some(2)));
        assert!(!ExitCodePolicy::Completed.accepts(Some(137)));
        assert!(!ExitCodePolicy::Completed.accepts(None));
    }

    #[test]
    fn cli_help_evidence_names_missing_sections() {
        let verdict = Verdict::CliHelp(CliHelpVerdict {
            has_help: false,
            has_usage: true,
            has_options: false,
        });
        assert!(verdict.has_problem());
        assert_eq!(verdict.evidence(), vec!["missing options section"]);
    }

    #[test]
    fn verdict_serializes_with_kind_tag() {
        let verdict = Verdict::CliHelp(CliHelpVerdict::default());
        let json = serde_json::to_value(&verdict).expect("serialize");
        assert_eq!(json["kind"], "cli_help");
        assert_eq!(json["has_help"], false);
    }
}
