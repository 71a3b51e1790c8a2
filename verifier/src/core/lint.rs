//! Lint report classification into critical and deferrable errors.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::types::LintErrorStatus;

/// Placeholder for messages without a rule id (parse errors and the like).
pub const NO_RULE_ID: &str = "no-rule-id";

const ERROR_SEVERITY: u8 = 2;

/// Rules whose errors may be fixed in a later pass without failing the check.
pub const DEFAULT_DEFERRABLE_RULES: [&str; 5] = [
    "@typescript-eslint/no-explicit-any",
    "@typescript-eslint/no-non-null-assertion",
    "@typescript-eslint/explicit-function-return-type",
    "@typescript-eslint/strict-boolean-expressions",
    "no-console",
];

/// Aggregate lint report produced by the lint collaborator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LintReport {
    pub error_count: u64,
    pub warning_count: u64,
    pub by_rule: BTreeMap<String, u64>,
    pub top_files: Vec<LintFileCount>,
    pub full_results: Option<Vec<LintFileResult>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LintFileCount {
    pub file: String,
    pub count: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LintFileResult {
    pub file_path: String,
    pub messages: Vec<LintMessage>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LintMessage {
    pub rule_id: Option<String>,
    pub severity: u8,
    pub message: String,
    pub line: u32,
    pub column: u32,
}

/// Classify `report` against the deferrable allow-list.
///
/// A missing report yields `acceptable: false` with no errors.
pub fn classify_lint_report<S: AsRef<str>>(
    report: Option<&LintReport>,
    cwd: &Path,
    deferrable_rules: &[S],
) -> LintErrorStatus {
    let Some(report) = report else {
        return LintErrorStatus::default();
    };

    let entries = match &report.full_results {
        Some(results) => detailed_entries(results, cwd),
        None => aggregate_entries(&report.by_rule),
    };

    let mut status = LintErrorStatus {
        acceptable: true,
        ..LintErrorStatus::default()
    };
    for (rule, line) in entries {
        let deferrable = deferrable_rules.iter().any(|r| r.as_ref() == rule);
        if deferrable {
            status.deferred.push(line.clone());
        } else {
            status.critical.push(line.clone());
            status.acceptable = false;
        }
        status.errors.push(line);
    }
    status.has_errors = !status.errors.is_empty();
    status
}

/// Parse `raw` as a JSON lint report, treating malformed input as missing.
pub fn parse_lint_report(raw: &str) -> Option<LintReport> {
    match serde_json::from_str(raw) {
        Ok(report) => Some(report),
        Err(err) => {
            tracing::debug!(err = %err, "lint report is not valid json");
            None
        }
    }
}

fn aggregate_entries(by_rule: &BTreeMap<String, u64>) -> Vec<(String, String)> {
    by_rule
        .iter()
        .filter(|(_, count)| **count > 0)
        .map(|(rule, count)| {
            let rule = rule_or_placeholder(Some(rule.as_str()));
            let line = format!("{rule}: {count} error(s)");
            (rule, line)
        })
        .collect()
}

fn detailed_entries(results: &[LintFileResult], cwd: &Path) -> Vec<(String, String)> {
    let mut entries = Vec::new();
    for result in results {
        let file = relative_path(&result.file_path, cwd);
        for msg in result
            .messages
            .iter()
            .filter(|m| m.severity == ERROR_SEVERITY)
        {
            let rule = rule_or_placeholder(msg.rule_id.as_deref());
            let line = format!(
                "{rule}: {file}:{}:{} - {}",
                msg.line, msg.column, msg.message
            );
            entries.push((rule, line));
        }
    }
    entries
}

fn rule_or_placeholder(rule: Option<&str>) -> String {
    match rule.map(str::trim) {
        Some(rule) if !rule.is_empty() => rule.to_string(),
        _ => NO_RULE_ID.to_string(),
    }
}

fn relative_path(file: &str, cwd: &Path) -> String {
    match Path::new(file).strip_prefix(cwd) {
        Ok(rel) if !rel.as_os_str().is_empty() => rel.display().to_string(),
        _ => file.to_string(),
    }
}
