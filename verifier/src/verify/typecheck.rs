//! Type-check run.

use serde::Serialize;
use tracing::{debug, instrument, warn};

use crate::core::typecheck::{missing_modules, parse_typecheck_output};
use crate::core::types::TypecheckDiagnostic;
use crate::io::process::ProcessRunner;
use crate::verify::Verifier;

const TYPECHECK_FLAGS: [&str; 3] = ["--noEmit", "--pretty", "false"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypecheckOutcome {
    /// Exit 0 with no diagnostics.
    pub success: bool,
    pub diagnostics: Vec<TypecheckDiagnostic>,
    pub missing_modules: Vec<String>,
    pub exit_code: Option<i32>,
    pub error: Option<String>,
    pub timed_out: bool,
}

impl<R: ProcessRunner> Verifier<R> {
    /// Run the configured compiler with `--noEmit --pretty false` and parse
    /// diagnostics from stderr.
    #[instrument(skip_all)]
    pub async fn run_typecheck(&self) -> TypecheckOutcome {
        let typecheck = &self.config.typecheck;
        let Some((command, rest)) = typecheck.command.split_first() else {
            warn!("typecheck command is empty");
            return TypecheckOutcome {
                success: false,
                diagnostics: Vec::new(),
                missing_modules: Vec::new(),
                exit_code: None,
                error: Some("typecheck command is empty".to_string()),
                timed_out: false,
            };
        };
        let args = rest
            .iter()
            .cloned()
            .chain(TYPECHECK_FLAGS.iter().map(|flag| flag.to_string()))
            .collect();
        let request = self.request(command, args, self.config.typecheck_policy());
        let result = self.runner.run(&request).await;

        let verdict = parse_typecheck_output(&result.stderr);
        let missing = missing_modules(&verdict.diagnostics);
        let success = result.exit_code == Some(0) && verdict.diagnostics.is_empty();
        debug!(
            success,
            diagnostics = verdict.diagnostics.len(),
            exit_code = ?result.exit_code,
            "typecheck finished"
        );
        TypecheckOutcome {
            success,
            diagnostics: verdict.diagnostics,
            missing_modules: missing,
            exit_code: result.exit_code,
            error: result.error,
            timed_out: result.timed_out,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::io::config::{TypecheckConfig, VerifierConfig};
    use crate::test_support::{ScriptedRunner, exited, exited_with_stderr, timed_out};
    use crate::verify::Verifier;
    use std::time::Duration;

    const STDERR: &str = "src/a.ts(3,20): error TS2307: Cannot find module 'lodash' or its corresponding type declarations.\n\
src/b.ts(10,5): error TS2322: Type 'string' is not assignable to type 'number'.\n";

    #[tokio::test]
    async fn builds_compiler_invocation_from_config() {
        let config = VerifierConfig {
            typecheck: TypecheckConfig {
                command: vec!["pnpm".to_string(), "exec".to_string(), "tsc".to_string()],
                timeout_secs: 45,
            },
            ..VerifierConfig::default()
        };
        let verifier = Verifier::new(ScriptedRunner::new(vec![exited(0, "")]), config)
            .with_cwd("/project");
        let outcome = verifier.run_typecheck().await;
        assert!(outcome.success);

        let request = &verifier.runner().requests()[0];
        assert_eq!(request.display(), "pnpm exec tsc --noEmit --pretty false");
        assert_eq!(request.policy.timeout, Duration::from_secs(45));
        assert_eq!(request.cwd.as_deref(), Some(std::path::Path::new("/project")));
    }

    #[tokio::test]
    async fn diagnostics_are_read_from_stderr_only() {
        let verifier = Verifier::new(
            ScriptedRunner::new(vec![exited_with_stderr(2, STDERR, "")]),
            VerifierConfig::default(),
        );
        let outcome = verifier.run_typecheck().await;
        assert!(outcome.diagnostics.is_empty());
        assert!(!outcome.success);
    }

    #[tokio::test]
    async fn parses_diagnostics_and_missing_modules() {
        let verifier = Verifier::new(
            ScriptedRunner::new(vec![exited_with_stderr(2, "", STDERR)]),
            VerifierConfig::default(),
        );
        let outcome = verifier.run_typecheck().await;
        assert!(!outcome.success);
        assert_eq!(outcome.diagnostics.len(), 2);
        assert_eq!(outcome.missing_modules, vec!["lodash"]);
        assert_eq!(outcome.diagnostics[1].code, "TS2322");
    }

    #[tokio::test]
    async fn timeout_is_not_success() {
        let verifier = Verifier::new(
            ScriptedRunner::new(vec![timed_out("")]),
            VerifierConfig::default(),
        );
        let outcome = verifier.run_typecheck().await;
        assert!(!outcome.success);
        assert!(outcome.timed_out);
        assert_eq!(outcome.exit_code, None);
    }
}
