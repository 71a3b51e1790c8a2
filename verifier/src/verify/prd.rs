//! PRD validation probe.
//!
//! The validation script reports pass/fail through its exit code: 0 means the
//! PRD is valid, 1 means the script ran and found problems. Both count as a
//! completed invocation. The structural markdown check is done elsewhere and
//! its result is merged in here when supplied.

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::core::types::ExitCodePolicy;
use crate::io::process::ProcessRunner;
use crate::verify::Verifier;

/// Result of the structural PRD validator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PrdStructure {
    pub format_valid: bool,
    pub sections_present: Vec<String>,
    pub missing_sections: Vec<String>,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PrdCheck {
    /// The validation script ran to completion (exit 0 or 1).
    pub completed: bool,
    /// Completed, exited 0, and the structure (if supplied) is sound.
    pub valid: bool,
    pub exit_code: Option<i32>,
    pub output: String,
    pub error: Option<String>,
    pub structure: Option<PrdStructure>,
    pub remaining_issues: Vec<String>,
}

impl<R: ProcessRunner> Verifier<R> {
    #[instrument(skip_all, fields(script = %script))]
    pub async fn check_prd(
        &self,
        script: &str,
        flags: &[String],
        structure: Option<&PrdStructure>,
    ) -> PrdCheck {
        let request = self.script_request(script, flags, self.config.probe_policy());
        let result = self.runner.run(&request).await;
        let completed = ExitCodePolicy::Completed.accepts(result.exit_code);

        let mut remaining_issues = Vec::new();
        if !completed {
            let reason = match (&result.error, result.exit_code) {
                (Some(err), _) => err.clone(),
                (None, Some(code)) => format!("exit code {code}"),
                (None, None) => "no exit code".to_string(),
            };
            remaining_issues.push(format!("PRD validation did not complete: {reason}"));
        } else if result.exit_code == Some(1) {
            remaining_issues.push("PRD validation reported failures".to_string());
        }

        let mut structure_ok = true;
        if let Some(structure) = structure {
            if !structure.format_valid {
                structure_ok = false;
                remaining_issues.push(format!("PRD format invalid: {}", structure.message));
            }
            for section in &structure.missing_sections {
                structure_ok = false;
                remaining_issues.push(format!("PRD missing section: {section}"));
            }
        }

        let valid = completed && result.exit_code == Some(0) && structure_ok;
        debug!(completed, valid, exit_code = ?result.exit_code, "prd probe finished");
        PrdCheck {
            completed,
            valid,
            exit_code: result.exit_code,
            output: result.combined_output,
            error: result.error,
            structure: structure.cloned(),
            remaining_issues,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::config::VerifierConfig;
    use crate::test_support::{ScriptedRunner, exited, timed_out};

    fn verifier(results: Vec<crate::core::types::ExecutionResult>) -> Verifier<ScriptedRunner> {
        Verifier::new(ScriptedRunner::new(results), VerifierConfig::default())
    }

    fn flags() -> Vec<String> {
        vec!["--validate-prd".to_string(), "PRD.md".to_string()]
    }

    #[tokio::test]
    async fn exit_one_is_completed_but_invalid() {
        let v = verifier(vec![exited(1, "2 problems found")]);
        let check = v.check_prd("prd", &flags(), None).await;
        assert!(check.completed);
        assert!(!check.valid);
        assert_eq!(check.remaining_issues, vec!["PRD validation reported failures"]);
    }

    #[tokio::test]
    async fn exit_two_is_not_completed() {
        let v = verifier(vec![exited(2, "crash")]);
        let check = v.check_prd("prd", &flags(), None).await;
        assert!(!check.completed);
        assert_eq!(
            check.remaining_issues,
            vec!["PRD validation did not complete: exit code 2"]
        );
    }

    #[tokio::test]
    async fn structure_problems_invalidate_clean_run() {
        let v = verifier(vec![exited(0, "ok")]);
        let structure = PrdStructure {
            format_valid: true,
            sections_present: vec!["Overview".to_string()],
            missing_sections: vec!["Goals".to_string()],
            message: String::new(),
        };
        let check = v.check_prd("prd", &flags(), Some(&structure)).await;
        assert!(check.completed);
        assert!(!check.valid);
        assert_eq!(check.remaining_issues, vec!["PRD missing section: Goals"]);
    }

    #[tokio::test]
    async fn clean_run_with_sound_structure_is_valid() {
        let v = verifier(vec![exited(0, "ok")]);
        let structure = PrdStructure {
            format_valid: true,
            ..PrdStructure::default()
        };
        let check = v.check_prd("prd", &flags(), Some(&structure)).await;
        assert!(check.valid);
        assert!(check.remaining_issues.is_empty());
    }

    #[tokio::test]
    async fn timeout_is_not_completed() {
        let v = verifier(vec![timed_out("")]);
        let check = v.check_prd("prd", &flags(), None).await;
        assert!(!check.completed);
        assert!(check.remaining_issues[0].contains("timed out"));
    }
}
