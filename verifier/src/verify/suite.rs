//! Gated full test suite run.

use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::core::memory::classify_memory_error;
use crate::core::rejection::classify_promise_rejections;
use crate::core::types::{ExitCodePolicy, MemoryErrorVerdict, PromiseRejectionVerdict};
use crate::io::process::ProcessRunner;
use crate::verify::Verifier;

/// Result of the single-test stage, produced by an upstream collaborator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SingleTestOutcome {
    pub success: bool,
    pub has_memory_error: bool,
    pub output: String,
    pub exit_code: Option<i32>,
}

impl SingleTestOutcome {
    /// The full suite may only run after a clean single-test stage.
    pub fn permits_full_suite(&self) -> bool {
        self.success && !self.has_memory_error
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FullSuiteOutcome {
    /// The suite ran to completion (exit 0 or 1). False when the gate refused.
    pub completed: bool,
    /// Exit 0 with no memory error.
    pub passed: bool,
    pub message: String,
    pub exit_code: Option<i32>,
    pub output: String,
    pub timed_out: bool,
    pub memory: Option<MemoryErrorVerdict>,
    pub rejections: Option<PromiseRejectionVerdict>,
}

impl FullSuiteOutcome {
    fn refused(upstream: &SingleTestOutcome) -> Self {
        Self {
            completed: false,
            passed: false,
            message: format!(
                "full test suite not run: single-test stage success={}, hasMemoryError={}",
                upstream.success, upstream.has_memory_error
            ),
            exit_code: None,
            output: String::new(),
            timed_out: false,
            memory: None,
            rejections: None,
        }
    }
}

impl<R: ProcessRunner> Verifier<R> {
    /// Run `<runner> run <test-script>` if the single-test stage allows it.
    ///
    /// No process is spawned when the gate refuses.
    #[instrument(skip_all)]
    pub async fn run_full_suite(&self, upstream: &SingleTestOutcome) -> FullSuiteOutcome {
        if !upstream.permits_full_suite() {
            warn!(
                success = upstream.success,
                has_memory_error = upstream.has_memory_error,
                "full suite gate refused"
            );
            return FullSuiteOutcome::refused(upstream);
        }

        let request = self.script_request(
            &self.config.test_script,
            &[],
            self.config.full_suite_policy(),
        );
        let result = self.runner.run(&request).await;
        let memory = classify_memory_error(&result.combined_output, result.exit_code);
        let rejections = classify_promise_rejections(&result.combined_output);
        let completed = ExitCodePolicy::Completed.accepts(result.exit_code);
        let passed = result.exit_code == Some(0) && !memory.has_memory_error;

        let message = if let Some(error) = &result.error {
            error.clone()
        } else if memory.has_memory_error {
            let suggestion = memory.suggestion.as_deref().unwrap_or("reduce memory usage");
            format!("full test suite hit a memory error: {suggestion}")
        } else if passed {
            "full test suite passed".to_string()
        } else {
            match result.exit_code {
                Some(code) => format!("full test suite failed with exit code {code}"),
                None => "full test suite did not report an exit code".to_string(),
            }
        };
        info!(completed, passed, exit_code = ?result.exit_code, "full suite finished");

        FullSuiteOutcome {
            completed,
            passed,
            message,
            exit_code: result.exit_code,
            output: result.combined_output,
            timed_out: result.timed_out,
            memory: Some(memory),
            rejections: Some(rejections),
        }
    }
}
