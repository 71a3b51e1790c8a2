//! Verification orchestration.
//!
//! Each verifier performs exactly one child invocation through a
//! [`ProcessRunner`] and classifies the terminal result with `core`
//! classifiers. Expected domain failures (spawn errors, timeouts, refused
//! gates) are reported in the returned structs, never as errors.

pub mod help;
pub mod pipeline;
pub mod prd;
pub mod resolution;
pub mod startup;
pub mod suite;
pub mod typecheck;

use std::path::PathBuf;

use tracing::warn;

use crate::core::run_context::RunContext;
use crate::io::config::VerifierConfig;
use crate::io::process::{ProcessRunner, RunRequest};
use crate::io::signal::TimeoutPolicy;

/// Entry point bundling the process runner, configuration and run context.
pub struct Verifier<R> {
    runner: R,
    config: VerifierConfig,
    context: RunContext,
    cwd: Option<PathBuf>,
}

impl<R: ProcessRunner> Verifier<R> {
    pub fn new(runner: R, config: VerifierConfig) -> Self {
        Self {
            runner,
            config,
            context: RunContext::root(),
            cwd: None,
        }
    }

    pub fn with_context(mut self, context: RunContext) -> Self {
        self.context = context;
        self
    }

    /// Run every child in `cwd` instead of the current directory.
    pub fn with_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    pub fn config(&self) -> &VerifierConfig {
        &self.config
    }

    /// The configured working directory, else the process's current one.
    pub fn effective_cwd(&self) -> PathBuf {
        match &self.cwd {
            Some(cwd) => cwd.clone(),
            None => std::env::current_dir().unwrap_or_else(|err| {
                warn!(err = %err, "cannot resolve current directory");
                PathBuf::new()
            }),
        }
    }

    fn request(
        &self,
        command: &str,
        args: Vec<String>,
        policy: TimeoutPolicy,
    ) -> RunRequest {
        let request = RunRequest::new(command, args).with_policy(policy);
        match &self.cwd {
            Some(cwd) => request.with_cwd(cwd.clone()),
            None => request,
        }
    }

    /// `<script-runner> run <script> -- <flags>`; the separator is omitted
    /// when there are no flags.
    fn script_request(&self, script: &str, flags: &[String], policy: TimeoutPolicy) -> RunRequest {
        let mut args = vec!["run".to_string(), script.to_string()];
        if !flags.is_empty() {
            args.push("--".to_string());
            args.extend(flags.iter().cloned());
        }
        self.request(&self.config.script_runner, args, policy)
    }
}
