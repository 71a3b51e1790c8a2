//! Memory-exhaustion detection for captured test output.
//!
//! Patterns are tried in priority order and the first match wins. An exit code
//! of 134 (SIGABRT) or 137 (SIGKILL) without any textual evidence still counts
//! as a memory error, with warning severity.

use std::sync::LazyLock;

use regex::Regex;

use crate::core::types::{MemoryErrorType, MemoryErrorVerdict, Severity};

/// Exit codes of signal-terminated processes that indicate memory pressure.
pub const OOM_EXIT_CODES: [i32; 2] = [134, 137];

struct MemoryPattern {
    regex: &'static LazyLock<Regex>,
    error_type: MemoryErrorType,
    severity: Severity,
    suggestion: &'static str,
}

static HEAP_FATAL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)FATAL ERROR:[^\n]*?(?:heap out of memory|heap limit)|JavaScript heap out of memory")
        .unwrap()
});
static WORKER_OOM_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)worker terminated due to reaching memory limit|ERR_WORKER_OUT_OF_MEMORY")
        .unwrap()
});
static ALLOC_RETRY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)CALL_AND_RETRY_LAST|Allocation failed").unwrap());

const HEAP_SUGGESTION: &str =
    "Increase the heap limit, e.g. NODE_OPTIONS=\"--max-old-space-size=4096\"";
const WORKER_SUGGESTION: &str =
    "Reduce worker concurrency or raise the worker resourceLimits.maxOldGenerationSizeMb";
const RETRY_SUGGESTION: &str =
    "Allocation retries indicate heap pressure; profile memory usage or raise the heap limit";
const SYSTEM_SUGGESTION: &str =
    "Process was terminated by a signal; check system memory limits and test isolation";

static PATTERNS: [MemoryPattern; 3] = [
    MemoryPattern {
        regex: &HEAP_FATAL_RE,
        error_type: MemoryErrorType::HeapOom,
        severity: Severity::Fatal,
        suggestion: HEAP_SUGGESTION,
    },
    MemoryPattern {
        regex: &WORKER_OOM_RE,
        error_type: MemoryErrorType::WorkerOom,
        severity: Severity::Fatal,
        suggestion: WORKER_SUGGESTION,
    },
    MemoryPattern {
        regex: &ALLOC_RETRY_RE,
        error_type: MemoryErrorType::HeapOom,
        severity: Severity::Warning,
        suggestion: RETRY_SUGGESTION,
    },
];

/// Classify `output` and `exit_code` for memory exhaustion.
pub fn classify_memory_error(output: &str, exit_code: Option<i32>) -> MemoryErrorVerdict {
    for pattern in &PATTERNS {
        if let Some(found) = pattern.regex.find(output) {
            return MemoryErrorVerdict {
                has_memory_error: true,
                error_type: Some(pattern.error_type),
                matched_pattern: Some(found.as_str().to_string()),
                suggestion: Some(pattern.suggestion.to_string()),
                severity: Some(pattern.severity),
            };
        }
    }

    match exit_code {
        Some(code) if OOM_EXIT_CODES.contains(&code) => MemoryErrorVerdict {
            has_memory_error: true,
            error_type: Some(MemoryErrorType::SystemOom),
            matched_pattern: Some(format!("exit code {code}")),
            suggestion: Some(SYSTEM_SUGGESTION.to_string()),
            severity: Some(Severity::Warning),
        },
        _ => MemoryErrorVerdict::default(),
    }
}
