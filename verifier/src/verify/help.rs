//! CLI help completeness probe.

use serde::Serialize;
use tracing::{debug, instrument};

use crate::core::cli_help::classify_cli_help;
use crate::core::types::ExitCodePolicy;
use crate::io::process::ProcessRunner;
use crate::verify::Verifier;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CliHelpCheck {
    /// Exit code 0 and complete help text.
    pub success: bool,
    pub has_help: bool,
    pub exit_code: Option<i32>,
    pub output: String,
    pub error: Option<String>,
}

impl<R: ProcessRunner> Verifier<R> {
    /// Run `<runner> run <script> -- <flags>` and check the help text.
    #[instrument(skip_all, fields(script = %script))]
    pub async fn check_cli_help(&self, script: &str, flags: &[String]) -> CliHelpCheck {
        let request = self.script_request(script, flags, self.config.probe_policy());
        let result = self.runner.run(&request).await;
        let verdict = classify_cli_help(&result.combined_output);
        let success = ExitCodePolicy::Zero.accepts(result.exit_code) && verdict.has_help;
        debug!(
            success,
            has_usage = verdict.has_usage,
            has_options = verdict.has_options,
            exit_code = ?result.exit_code,
            "cli help probe finished"
        );
        CliHelpCheck {
            success,
            has_help: verdict.has_help,
            exit_code: result.exit_code,
            output: result.combined_output,
            error: result.error,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::io::config::VerifierConfig;
    use crate::test_support::{ScriptedRunner, exited, not_found, timed_out};
    use crate::verify::Verifier;

    const HELP: &str = "Usage: prp [options]\n\nOptions:\n  -h, --help  display help\n";

    fn flags() -> Vec<String> {
        vec!["--help".to_string()]
    }

    #[tokio::test]
    async fn complete_help_with_clean_exit_succeeds() {
        let verifier = Verifier::new(
            ScriptedRunner::new(vec![exited(0, HELP)]),
            VerifierConfig::default(),
        );
        let check = verifier.check_cli_help("dev", &flags()).await;
        assert!(check.success);
        assert!(check.has_help);
        assert_eq!(
            verifier.runner().requests()[0].display(),
            "npm run dev -- --help"
        );
    }

    /// Complete help text is still a failure when the process exits non-zero.
    #[tokio::test]
    async fn nonzero_exit_fails_despite_help() {
        let verifier = Verifier::new(
            ScriptedRunner::new(vec![exited(1, HELP)]),
            VerifierConfig::default(),
        );
        let check = verifier.check_cli_help("dev", &flags()).await;
        assert!(!check.success);
        assert!(check.has_help);
    }

    #[tokio::test]
    async fn usage_without_options_fails() {
        let verifier = Verifier::new(
            ScriptedRunner::new(vec![exited(0, "Usage: prp [command]\n")]),
            VerifierConfig::default(),
        );
        let check = verifier.check_cli_help("dev", &flags()).await;
        assert!(!check.success);
        assert!(!check.has_help);
    }

    #[tokio::test]
    async fn spawn_failure_and_timeout_are_reported() {
        let verifier = Verifier::new(
            ScriptedRunner::new(vec![not_found("npm"), timed_out("Usage: x")]),
            VerifierConfig::default(),
        );
        let missing = verifier.check_cli_help("dev", &flags()).await;
        assert!(!missing.success);
        assert_eq!(missing.exit_code, None);
        assert!(missing.error.is_some_and(|e| e.contains("command not found")));

        let hung = verifier.check_cli_help("dev", &flags()).await;
        assert!(!hung.success);
        assert!(hung.error.is_some_and(|e| e.contains("timed out")));
    }
}
