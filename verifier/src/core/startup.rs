//! Startup error classification for a launched program.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::core::types::{StartupErrorType, StartupErrorVerdict};

pub const UNKNOWN_SPAWN_ERROR: &str = "Unknown spawn error";

static STRICT_MODULE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)ERR_MODULE_NOT_FOUND\]?:?\s*Cannot find (?:module|package) ['"`]([^'"`]+)['"`]"#)
        .unwrap()
});
static GENERIC_MODULE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)Cannot find module ['"`]([^'"`]+)['"`]"#).unwrap());
static RUNTIME_ERROR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:Error|TypeError|ReferenceError|SyntaxError|RangeError|URIError|EvalError|AggregateError|InternalError):",
    )
    .unwrap()
});
static STACK_FRAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*at\s+(?:(?:new|async)\s+)?(?:[A-Za-z_$<][\w$.<>\[\]]*\s*\(|\[)").unwrap()
});

/// What the classifier knows about the invocation that produced `output`.
#[derive(Debug, Clone, Copy)]
pub struct StartupInput<'a> {
    /// Whether the process was launched at all.
    pub success: bool,
    /// Spawn error reported by the executor, if any.
    pub error: Option<&'a str>,
    pub output: &'a str,
}

/// Classify startup errors.
///
/// A failed launch short-circuits: captured text is ignored and the verdict
/// carries exactly one `SPAWN_ERROR` tag.
pub fn classify_startup_errors(input: StartupInput<'_>) -> StartupErrorVerdict {
    if !input.success {
        let message = input
            .error
            .filter(|err| !err.trim().is_empty())
            .unwrap_or(UNKNOWN_SPAWN_ERROR);
        return StartupErrorVerdict {
            error_types: BTreeSet::from([StartupErrorType::SpawnError]),
            raw_errors: vec![message.to_string()],
            missing_modules: Vec::new(),
        };
    }

    let mut verdict = StartupErrorVerdict::default();
    for line in input.output.lines() {
        let captures = STRICT_MODULE_RE
            .captures(line)
            .or_else(|| GENERIC_MODULE_RE.captures(line));
        let mut evidence = false;
        if let Some(caps) = captures {
            verdict.error_types.insert(StartupErrorType::ModuleNotFound);
            let module = caps[1].to_string();
            if !verdict.missing_modules.contains(&module) {
                verdict.missing_modules.push(module);
            }
            evidence = true;
        }
        if RUNTIME_ERROR_RE.is_match(line) {
            verdict.error_types.insert(StartupErrorType::RuntimeError);
            evidence = true;
        }
        if STACK_FRAME_RE.is_match(line) {
            verdict.error_types.insert(StartupErrorType::StackTrace);
            evidence = true;
        }
        if evidence {
            push_unique(&mut verdict.raw_errors, line.trim());
        }
    }
    verdict
}

/// Classify captured text of a process that did launch.
pub fn classify_startup_output(output: &str) -> StartupErrorVerdict {
    classify_startup_errors(StartupInput {
        success: true,
        error: None,
        output,
    })
}

fn push_unique(list: &mut Vec<String>, line: &str) {
    if !list.iter().any(|existing| existing == line) {
        list.push(line.to_string());
    }
}
