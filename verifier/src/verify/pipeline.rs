//! Sequential verification pipeline.
//!
//! Stages run one at a time in declaration order. Every stage contributes one
//! sub-resolution and the report is their AND-aggregate.

use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::core::lint::{LintReport, classify_lint_report};
use crate::core::registry::ClassifierRegistry;
use crate::core::resolution::{SubResolution, aggregate_resolutions};
use crate::core::run_context::NestedExecution;
use crate::core::types::{IssueResolutionStatus, LintErrorStatus, TypecheckVerdict, Verdict};
use crate::io::process::ProcessRunner;
use crate::verify::Verifier;
use crate::verify::help::CliHelpCheck;
use crate::verify::prd::{PrdCheck, PrdStructure};
use crate::verify::resolution::{ResolutionCheck, resolve_issues};
use crate::verify::startup::StartupCheck;
use crate::verify::suite::{FullSuiteOutcome, SingleTestOutcome};
use crate::verify::typecheck::TypecheckOutcome;

/// One pipeline step, as read from a JSON plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum Stage {
    CliHelp {
        script: String,
        #[serde(default)]
        flags: Vec<String>,
    },
    Prd {
        script: String,
        #[serde(default)]
        flags: Vec<String>,
        #[serde(default)]
        structure: Option<PrdStructure>,
    },
    FullSuite {
        upstream: SingleTestOutcome,
    },
    Typecheck,
    Startup {
        command: String,
        #[serde(default)]
        args: Vec<String>,
    },
    Lint {
        #[serde(default)]
        report: Option<LintReport>,
    },
    Resolution {
        checks: Vec<ResolutionCheck>,
    },
}

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Self::CliHelp { .. } => "cli_help",
            Self::Prd { .. } => "prd",
            Self::FullSuite { .. } => "full_suite",
            Self::Typecheck => "typecheck",
            Self::Startup { .. } => "startup",
            Self::Lint { .. } => "lint",
            Self::Resolution { .. } => "resolution",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum StageOutcome {
    CliHelp(CliHelpCheck),
    Prd(PrdCheck),
    FullSuite(FullSuiteOutcome),
    Typecheck(TypecheckOutcome),
    Startup(StartupCheck),
    Lint(LintErrorStatus),
    Resolution(IssueResolutionStatus),
}

impl StageOutcome {
    fn sub_resolution(&self, name: &str) -> SubResolution {
        match self {
            Self::CliHelp(check) => {
                if check.success {
                    SubResolution::resolved(name, "CLI help incomplete")
                } else {
                    let mut evidence: Vec<String> = check.error.iter().cloned().collect();
                    if !check.has_help {
                        evidence.push("usage or options section missing".to_string());
                    }
                    if let Some(code) = check.exit_code.filter(|code| *code != 0) {
                        evidence.push(format!("exit code {code}"));
                    }
                    SubResolution::unresolved(name, "CLI help incomplete", evidence)
                }
            }
            Self::Prd(check) => {
                if check.valid {
                    SubResolution::resolved(name, "PRD invalid")
                } else {
                    SubResolution::unresolved(name, "PRD invalid", check.remaining_issues.clone())
                }
            }
            Self::FullSuite(outcome) => {
                if outcome.passed {
                    SubResolution::resolved(name, "full test suite failed")
                } else {
                    let mut evidence = vec![outcome.message.clone()];
                    if let Some(pattern) = outcome
                        .memory
                        .as_ref()
                        .and_then(|m| m.matched_pattern.clone())
                    {
                        evidence.push(pattern);
                    }
                    SubResolution::unresolved(name, "full test suite failed", evidence)
                }
            }
            Self::Typecheck(outcome) => {
                if outcome.success {
                    SubResolution::resolved(name, "type errors")
                } else {
                    let mut evidence = Verdict::Typecheck(TypecheckVerdict {
                        diagnostics: outcome.diagnostics.clone(),
                    })
                    .evidence();
                    evidence.extend(outcome.error.iter().cloned());
                    SubResolution::unresolved(name, "type errors", evidence)
                }
            }
            Self::Startup(check) => {
                if check.success {
                    SubResolution::resolved(name, "startup errors")
                } else {
                    let mut evidence = check.verdict.raw_errors.clone();
                    if let (true, Some(code)) = (evidence.is_empty(), check.exit_code) {
                        evidence.push(format!("exit code {code}"));
                    }
                    SubResolution::unresolved(name, "startup errors", evidence)
                }
            }
            Self::Lint(status) => {
                let verdict = Verdict::Lint(status.clone());
                if verdict.has_problem() {
                    SubResolution::unresolved(name, "critical lint errors", verdict.evidence())
                } else {
                    SubResolution::resolved(name, "critical lint errors")
                }
            }
            Self::Resolution(status) => {
                if status.all_resolved {
                    SubResolution::resolved(name, "issues remain")
                } else {
                    SubResolution::unresolved(name, "issues remain", status.remaining_issues.clone())
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PipelineReport {
    pub stages: Vec<StageOutcome>,
    pub status: IssueResolutionStatus,
}

impl<R: ProcessRunner> Verifier<R> {
    /// Run `stages` in order.
    ///
    /// Refuses with [`NestedExecution`] when a pipeline is already running in
    /// this context and bug-fix recursion was not granted.
    #[instrument(skip_all, fields(stages = stages.len()))]
    pub async fn run_pipeline(
        &self,
        stages: &[Stage],
        registry: &ClassifierRegistry,
    ) -> Result<PipelineReport, NestedExecution> {
        let entered = self.context.enter().inspect_err(|_| {
            warn!("refusing nested pipeline run");
        })?;
        info!(
            nested = self.context.pipeline_running(),
            context = ?entered,
            "pipeline started"
        );

        let mut outcomes = Vec::with_capacity(stages.len());
        let mut subs = Vec::with_capacity(stages.len());
        for stage in stages {
            let outcome = self.run_stage(stage, registry).await;
            let sub = outcome.sub_resolution(stage.name());
            info!(stage = stage.name(), resolved = sub.resolved, "stage finished");
            subs.push(sub);
            outcomes.push(outcome);
        }

        let status = aggregate_resolutions(subs);
        info!(all_resolved = status.all_resolved, "pipeline finished");
        Ok(PipelineReport {
            stages: outcomes,
            status,
        })
    }

    async fn run_stage(&self, stage: &Stage, registry: &ClassifierRegistry) -> StageOutcome {
        match stage {
            Stage::CliHelp { script, flags } => {
                StageOutcome::CliHelp(self.check_cli_help(script, flags).await)
            }
            Stage::Prd {
                script,
                flags,
                structure,
            } => StageOutcome::Prd(self.check_prd(script, flags, structure.as_ref()).await),
            Stage::FullSuite { upstream } => {
                StageOutcome::FullSuite(self.run_full_suite(upstream).await)
            }
            Stage::Typecheck => StageOutcome::Typecheck(self.run_typecheck().await),
            Stage::Startup { command, args } => {
                StageOutcome::Startup(self.check_startup(command, args).await)
            }
            Stage::Lint { report } => {
                StageOutcome::Lint(classify_lint_report(
                    report.as_ref(),
                    &self.effective_cwd(),
                    &self.config.lint.deferrable_rules,
                ))
            }
            Stage::Resolution { checks } => {
                StageOutcome::Resolution(resolve_issues(checks, registry))
            }
        }
    }
}
