//! Managed subprocess verifier CLI.
//!
//! Every command prints a JSON result on stdout and exits with one of the
//! codes in [`verifier::exit_codes`]. Diagnostics go to stderr.

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use verifier::core::lint::{classify_lint_report, parse_lint_report};
use verifier::core::registry::{ClassifierKind, ClassifierRegistry, LintClassifier};
use verifier::exit_codes;
use verifier::io::config::{VerifierConfig, load_config};
use verifier::io::process::ProcessExecutor;
use verifier::logging;
use verifier::verify::Verifier;
use verifier::verify::pipeline::Stage;
use verifier::verify::prd::PrdStructure;
use verifier::verify::suite::SingleTestOutcome;

#[derive(Parser)]
#[command(
    name = "verifier",
    version,
    disable_help_subcommand = true,
    about = "Run commands under supervision and classify their output"
)]
struct Cli {
    /// Configuration file; defaults apply when it does not exist.
    #[arg(long, global = true, default_value = "verifier.toml")]
    config: PathBuf,

    /// Working directory for child processes and lint path stripping.
    #[arg(long, global = true)]
    cwd: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Check that `<runner> run <script> -- <flags>` prints complete help.
    Help {
        script: String,
        #[arg(last = true)]
        flags: Vec<String>,
    },
    /// Run a PRD validation script, optionally merging a structure report.
    Prd {
        script: String,
        /// JSON file with `{formatValid, sectionsPresent, missingSections, message}`.
        #[arg(long)]
        structure: Option<PathBuf>,
        #[arg(last = true)]
        flags: Vec<String>,
    },
    /// Run the full test suite if the single-test stage allows it.
    Suite {
        /// JSON file with `{success, hasMemoryError, output, exitCode}`.
        #[arg(long)]
        upstream: PathBuf,
    },
    /// Run the type checker and report parsed diagnostics.
    Typecheck,
    /// Launch a command and look for startup errors.
    Startup {
        command: String,
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
    /// Classify captured output read from a file or stdin.
    Classify {
        /// Classifier to apply; repeatable. All classifiers when omitted.
        #[arg(long = "classifier", value_enum)]
        classifiers: Vec<ClassifierKind>,
        #[arg(long, allow_negative_numbers = true)]
        exit_code: Option<i32>,
        file: Option<PathBuf>,
    },
    /// Classify an aggregate lint report.
    Lint { report: PathBuf },
    /// Run a JSON list of stages in order.
    Pipeline { plan: PathBuf },
}

fn main() {
    logging::init();
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("{:#}", err);
            std::process::exit(exit_codes::INVALID);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    let config = load_config(&cli.config)?;
    debug!(config = %cli.config.display(), "configuration loaded");
    let mut verifier = Verifier::new(ProcessExecutor::new(), config);
    if let Some(cwd) = cli.cwd {
        verifier = verifier.with_cwd(cwd);
    }
    let runtime = tokio::runtime::Runtime::new().context("start tokio runtime")?;
    runtime.block_on(dispatch(&verifier, cli.command))
}

async fn dispatch(verifier: &Verifier<ProcessExecutor>, command: Command) -> Result<i32> {
    match command {
        Command::Help { script, flags } => {
            let check = verifier.check_cli_help(&script, &flags).await;
            emit(&check, check.success)
        }
        Command::Prd {
            script,
            structure,
            flags,
        } => {
            let structure: Option<PrdStructure> =
                structure.as_deref().map(read_json).transpose()?;
            let check = verifier.check_prd(&script, &flags, structure.as_ref()).await;
            emit(&check, check.valid)
        }
        Command::Suite { upstream } => {
            let upstream: SingleTestOutcome = read_json(&upstream)?;
            let outcome = verifier.run_full_suite(&upstream).await;
            emit(&outcome, outcome.passed)
        }
        Command::Typecheck => {
            let outcome = verifier.run_typecheck().await;
            emit(&outcome, outcome.success)
        }
        Command::Startup { command, args } => {
            let check = verifier.check_startup(&command, &args).await;
            emit(&check, check.success)
        }
        Command::Classify {
            classifiers,
            exit_code,
            file,
        } => cmd_classify(verifier, &classifiers, exit_code, file.as_deref()),
        Command::Lint { report } => cmd_lint(verifier, &report),
        Command::Pipeline { plan } => {
            let stages: Vec<Stage> = read_json(&plan)?;
            let registry = registry_for(verifier.config(), &verifier.effective_cwd(), &[]);
            let report = verifier.run_pipeline(&stages, &registry).await?;
            emit(&report, report.status.all_resolved)
        }
    }
}

fn cmd_classify(
    verifier: &Verifier<ProcessExecutor>,
    kinds: &[ClassifierKind],
    exit_code: Option<i32>,
    file: Option<&Path>,
) -> Result<i32> {
    let output = match file {
        Some(path) => {
            fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?
        }
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("read stdin")?;
            buf
        }
    };
    let registry = registry_for(verifier.config(), &verifier.effective_cwd(), kinds);
    let verdicts = registry.classify_all(&output, exit_code);
    let clean = verdicts.iter().all(|named| !named.verdict.has_problem());
    emit(&verdicts, clean)
}

fn cmd_lint(verifier: &Verifier<ProcessExecutor>, report: &Path) -> Result<i32> {
    let raw = fs::read_to_string(report).with_context(|| format!("read {}", report.display()))?;
    let parsed = parse_lint_report(&raw);
    let status = classify_lint_report(
        parsed.as_ref(),
        &verifier.effective_cwd(),
        &verifier.config().lint.deferrable_rules,
    );
    emit(&status, status.acceptable)
}

/// Registry for `kinds` (all kinds when empty), with the lint classifier
/// configured from `config`.
fn registry_for(
    config: &VerifierConfig,
    cwd: &Path,
    kinds: &[ClassifierKind],
) -> ClassifierRegistry {
    let registry = if kinds.is_empty() {
        ClassifierRegistry::with_defaults()
    } else {
        ClassifierRegistry::with_kinds(kinds)
    };
    if registry.get(ClassifierKind::Lint).is_none() {
        return registry;
    }
    registry.register(Box::new(LintClassifier {
        cwd: cwd.to_path_buf(),
        deferrable_rules: config.lint.deferrable_rules.clone(),
    }))
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parse {}", path.display()))
}

/// Print `value` as pretty JSON and map `passed` to an exit code.
fn emit<T: Serialize>(value: &T, passed: bool) -> Result<i32> {
    let payload = serde_json::to_string_pretty(value).context("serialize result json")?;
    println!("{payload}");
    Ok(if passed {
        exit_codes::OK
    } else {
        exit_codes::FAILED
    })
}
