//! Composable registry of output classifiers.
//!
//! Each classifier maps `(output, exit_code)` to a tagged [`Verdict`], which
//! lets the orchestrator aggregate any active set of classifiers uniformly.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::core::cli_help::classify_cli_help;
use crate::core::console_log::classify_console_logs;
use crate::core::lint::{DEFAULT_DEFERRABLE_RULES, classify_lint_report, parse_lint_report};
use crate::core::memory::classify_memory_error;
use crate::core::rejection::classify_promise_rejections;
use crate::core::startup::classify_startup_output;
use crate::core::typecheck::parse_typecheck_output;
use crate::core::types::Verdict;

/// Pure mapping from captured output to a verdict.
pub trait Classifier: Send + Sync {
    fn kind(&self) -> ClassifierKind;
    fn classify(&self, output: &str, exit_code: Option<i32>) -> Verdict;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum ClassifierKind {
    Memory,
    PromiseRejection,
    ConsoleLog,
    Startup,
    CliHelp,
    Typecheck,
    Lint,
}

impl ClassifierKind {
    pub const ALL: [ClassifierKind; 7] = [
        Self::Memory,
        Self::PromiseRejection,
        Self::ConsoleLog,
        Self::Startup,
        Self::CliHelp,
        Self::Typecheck,
        Self::Lint,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::PromiseRejection => "promise_rejection",
            Self::ConsoleLog => "console_log",
            Self::Startup => "startup",
            Self::CliHelp => "cli_help",
            Self::Typecheck => "typecheck",
            Self::Lint => "lint",
        }
    }
}

pub struct MemoryClassifier;

impl Classifier for MemoryClassifier {
    fn kind(&self) -> ClassifierKind {
        ClassifierKind::Memory
    }

    fn classify(&self, output: &str, exit_code: Option<i32>) -> Verdict {
        Verdict::Memory(classify_memory_error(output, exit_code))
    }
}

pub struct PromiseRejectionClassifier;

impl Classifier for PromiseRejectionClassifier {
    fn kind(&self) -> ClassifierKind {
        ClassifierKind::PromiseRejection
    }

    fn classify(&self, output: &str, _exit_code: Option<i32>) -> Verdict {
        Verdict::PromiseRejection(classify_promise_rejections(output))
    }
}

pub struct ConsoleLogClassifier;

impl Classifier for ConsoleLogClassifier {
    fn kind(&self) -> ClassifierKind {
        ClassifierKind::ConsoleLog
    }

    fn classify(&self, output: &str, _exit_code: Option<i32>) -> Verdict {
        Verdict::ConsoleLog(classify_console_logs(output))
    }
}

/// Text-only startup classification; spawn failures are handled by the
/// startup verifier, which has the executor's error string.
pub struct StartupClassifier;

impl Classifier for StartupClassifier {
    fn kind(&self) -> ClassifierKind {
        ClassifierKind::Startup
    }

    fn classify(&self, output: &str, _exit_code: Option<i32>) -> Verdict {
        Verdict::Startup(classify_startup_output(output))
    }
}

pub struct CliHelpClassifier;

impl Classifier for CliHelpClassifier {
    fn kind(&self) -> ClassifierKind {
        ClassifierKind::CliHelp
    }

    fn classify(&self, output: &str, _exit_code: Option<i32>) -> Verdict {
        Verdict::CliHelp(classify_cli_help(output))
    }
}

pub struct TypecheckClassifier;

impl Classifier for TypecheckClassifier {
    fn kind(&self) -> ClassifierKind {
        ClassifierKind::Typecheck
    }

    fn classify(&self, output: &str, _exit_code: Option<i32>) -> Verdict {
        Verdict::Typecheck(parse_typecheck_output(output))
    }
}

/// Treats the output as a JSON lint report.
pub struct LintClassifier {
    pub cwd: PathBuf,
    pub deferrable_rules: Vec<String>,
}

impl Default for LintClassifier {
    fn default() -> Self {
        Self {
            cwd: PathBuf::new(),
            deferrable_rules: DEFAULT_DEFERRABLE_RULES
                .iter()
                .map(|rule| rule.to_string())
                .collect(),
        }
    }
}

impl Classifier for LintClassifier {
    fn kind(&self) -> ClassifierKind {
        ClassifierKind::Lint
    }

    fn classify(&self, output: &str, _exit_code: Option<i32>) -> Verdict {
        let report = parse_lint_report(output);
        Verdict::Lint(classify_lint_report(
            report.as_ref(),
            &self.cwd,
            &self.deferrable_rules,
        ))
    }
}

/// Build the default classifier for `kind`.
pub fn classifier_for(kind: ClassifierKind) -> Box<dyn Classifier> {
    match kind {
        ClassifierKind::Memory => Box::new(MemoryClassifier),
        ClassifierKind::PromiseRejection => Box::new(PromiseRejectionClassifier),
        ClassifierKind::ConsoleLog => Box::new(ConsoleLogClassifier),
        ClassifierKind::Startup => Box::new(StartupClassifier),
        ClassifierKind::CliHelp => Box::new(CliHelpClassifier),
        ClassifierKind::Typecheck => Box::new(TypecheckClassifier),
        ClassifierKind::Lint => Box::new(LintClassifier::default()),
    }
}

/// Verdict produced by one registered classifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NamedVerdict {
    pub classifier: ClassifierKind,
    pub verdict: Verdict,
}

/// Ordered set of active classifiers. Registering a kind twice replaces the
/// earlier entry.
#[derive(Default)]
pub struct ClassifierRegistry {
    classifiers: Vec<Box<dyn Classifier>>,
}

impl ClassifierRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry containing every built-in classifier.
    pub fn with_defaults() -> Self {
        Self::with_kinds(&ClassifierKind::ALL)
    }

    pub fn with_kinds(kinds: &[ClassifierKind]) -> Self {
        kinds
            .iter()
            .fold(Self::new(), |registry, kind| {
                registry.register(classifier_for(*kind))
            })
    }

    pub fn register(mut self, classifier: Box<dyn Classifier>) -> Self {
        let kind = classifier.kind();
        self.classifiers.retain(|existing| existing.kind() != kind);
        self.classifiers.push(classifier);
        self
    }

    pub fn kinds(&self) -> Vec<ClassifierKind> {
        self.classifiers.iter().map(|c| c.kind()).collect()
    }

    pub fn get(&self, kind: ClassifierKind) -> Option<&dyn Classifier> {
        self.classifiers
            .iter()
            .find(|c| c.kind() == kind)
            .map(|c| c.as_ref())
    }

    pub fn classify_all(&self, output: &str, exit_code: Option<i32>) -> Vec<NamedVerdict> {
        self.classifiers
            .iter()
            .map(|c| NamedVerdict {
                classifier: c.kind(),
                verdict: c.classify(output, exit_code),
            })
            .collect()
    }
}
