//! Test-only helpers: a scripted process runner and result builders.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::core::types::ExecutionResult;
use crate::io::process::{ProcessRunner, RunRequest, SpawnFailure};

/// Process runner that returns queued results in order and records every
/// request it receives. Once the queue is empty it reports a spawn failure.
#[derive(Default)]
pub struct ScriptedRunner {
    results: Mutex<VecDeque<ExecutionResult>>,
    requests: Mutex<Vec<RunRequest>>,
}

impl ScriptedRunner {
    pub fn new(results: Vec<ExecutionResult>) -> Self {
        Self {
            results: Mutex::new(results.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Requests received so far, in order.
    pub fn requests(&self) -> Vec<RunRequest> {
        self.requests.lock().expect("requests lock").clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().expect("requests lock").len()
    }
}

#[async_trait]
impl ProcessRunner for ScriptedRunner {
    async fn run(&self, request: &RunRequest) -> ExecutionResult {
        self.requests
            .lock()
            .expect("requests lock")
            .push(request.clone());
        self.results
            .lock()
            .expect("results lock")
            .pop_front()
            .unwrap_or_else(|| {
                ExecutionResult::spawn_failed(&SpawnFailure::Other {
                    command: request.command.clone(),
                    message: "no scripted result left".to_string(),
                })
            })
    }
}

/// A natural close with `exit_code`, all output on stdout.
pub fn exited(exit_code: i32, stdout: &str) -> ExecutionResult {
    ExecutionResult {
        exit_code: Some(exit_code),
        stdout: stdout.to_string(),
        combined_output: stdout.to_string(),
        ..ExecutionResult::default()
    }
}

/// A natural close with separate stdout and stderr.
pub fn exited_with_stderr(exit_code: i32, stdout: &str, stderr: &str) -> ExecutionResult {
    ExecutionResult {
        exit_code: Some(exit_code),
        stdout: stdout.to_string(),
        stderr: stderr.to_string(),
        combined_output: format!("{stdout}{stderr}"),
        ..ExecutionResult::default()
    }
}

/// A forced timeout after capturing `partial` output.
pub fn timed_out(partial: &str) -> ExecutionResult {
    ExecutionResult {
        stdout: partial.to_string(),
        combined_output: partial.to_string(),
        timed_out: true,
        error: Some("command timed out after 10000ms".to_string()),
        ..ExecutionResult::default()
    }
}

/// A missing binary.
pub fn not_found(command: &str) -> ExecutionResult {
    ExecutionResult::spawn_failed(&SpawnFailure::NotFound {
        command: command.to_string(),
    })
}
