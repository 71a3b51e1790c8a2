//! Detection of raw console printing versus structured logger output.
//!
//! Each physical line is tested against structured logger shapes first; only
//! lines that are not logger lines are tested against the unstructured print
//! shapes. Both sets are compiled into a `RegexSet` so a line is scanned once
//! per set and the whole pass stays linear in the output size.

use std::sync::LazyLock;

use regex::RegexSet;

use crate::core::types::ConsoleLogVerdict;

static LOGGER_SHAPES: LazyLock<RegexSet> = LazyLock::new(|| {
    RegexSet::new([
        // JSON object carrying a level field
        r#"^\s*\{.*"level"\s*:"#,
        // [INFO] message
        r"(?i)^\s*\[(?:trace|debug|info|warn|warning|error|fatal)\]",
        // 2024-01-01T12:00:00 message
        r"^\s*\[?\d{4}-\d{2}-\d{2}[T ]\d{2}:\d{2}:\d{2}",
        // [TaskOrchestrator] message
        r"^\s*\[[A-Za-z][\w.:/-]*\]\s",
    ])
    .unwrap()
});

const PRINT_SHAPE_NAMES: [&str; 5] = [
    "border",
    "emoji_status",
    "key_value",
    "plain_sentence",
    "indented_content",
];
const BORDER: usize = 0;

static PRINT_SHAPES: LazyLock<RegexSet> = LazyLock::new(|| {
    RegexSet::new([
        r"^\s*(?:={3,}|-{3,})\s*$",
        r"^\s*(?:✅|❌|⚠|✓|✗|✔|✖|🚀|📋|🔍|📝|💡|🎉|⏳|🔧|📦|🧪|🔥)",
        r"^[A-Za-z][A-Za-z0-9 _-]{0,40}:\s+\S",
        r"^[A-Z][a-z]+(?:\s+\S+)+",
        r"^(?: {2,}|\t)\S",
    ])
    .unwrap()
});

/// Count logger lines and raw print lines in `output`.
pub fn classify_console_logs(output: &str) -> ConsoleLogVerdict {
    let mut console_log_count = 0usize;
    let mut logger_line_count = 0usize;
    let mut seen = [false; PRINT_SHAPE_NAMES.len()];
    let mut detected_patterns = Vec::new();

    for line in output.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if LOGGER_SHAPES.is_match(line) {
            logger_line_count += 1;
            continue;
        }
        if trimmed.starts_with(|c: char| c.is_ascii_digit()) {
            continue;
        }

        let matches = PRINT_SHAPES.matches(line);
        if !matches.matched_any() {
            continue;
        }
        let symbols_only = !trimmed.chars().any(char::is_alphanumeric);
        if symbols_only && !matches.matched(BORDER) {
            continue;
        }

        console_log_count += 1;
        for idx in matches.iter() {
            if !seen[idx] {
                seen[idx] = true;
                detected_patterns.push(PRINT_SHAPE_NAMES[idx].to_string());
            }
        }
    }

    ConsoleLogVerdict {
        has_console_log: console_log_count > 0,
        console_log_count,
        detected_patterns,
        uses_logger: logger_line_count > 0,
        logger_line_count,
    }
}
