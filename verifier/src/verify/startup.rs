//! Startup-error check for an arbitrary command.
//!
//! A long-running command that is still alive at the deadline counts as a
//! clean start, provided nothing in its output looks like an error.

use serde::Serialize;
use tracing::{debug, instrument};

use crate::core::startup::{StartupInput, classify_startup_errors};
use crate::core::types::StartupErrorVerdict;
use crate::io::process::ProcessRunner;
use crate::verify::Verifier;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StartupCheck {
    pub success: bool,
    pub verdict: StartupErrorVerdict,
    pub exit_code: Option<i32>,
    pub timed_out: bool,
}

impl<R: ProcessRunner> Verifier<R> {
    #[instrument(skip_all, fields(command = %command))]
    pub async fn check_startup(&self, command: &str, args: &[String]) -> StartupCheck {
        let request = self.request(command, args.to_vec(), self.config.probe_policy());
        let result = self.runner.run(&request).await;
        let verdict = classify_startup_errors(StartupInput {
            success: result.spawn_error.is_none(),
            error: result.spawn_error.as_deref(),
            output: &result.combined_output,
        });
        let success =
            verdict.error_types.is_empty() && (result.exit_code == Some(0) || result.timed_out);
        debug!(
            success,
            errors = verdict.error_types.len(),
            exit_code = ?result.exit_code,
            timed_out = result.timed_out,
            "startup check finished"
        );
        StartupCheck {
            success,
            verdict,
            exit_code: result.exit_code,
            timed_out: result.timed_out,
        }
    }
}
