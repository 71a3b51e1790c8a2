//! Explicit reentrancy context threaded through a verification run.
//!
//! Nested pipeline runs are detected from this value rather than from a
//! process-wide environment marker.

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("verification pipeline is already running and bug-fix recursion is not allowed")]
pub struct NestedExecution;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunContext {
    pipeline_running: bool,
    bugfix_recursion_allowed: bool,
}

impl RunContext {
    /// Context for a top-level invocation: nothing running yet.
    pub fn root() -> Self {
        Self::default()
    }

    /// Grant the capability to re-enter the pipeline from a bug-fix stage.
    pub fn allow_bugfix_recursion(self) -> Self {
        Self {
            bugfix_recursion_allowed: true,
            ..self
        }
    }

    pub fn pipeline_running(&self) -> bool {
        self.pipeline_running
    }

    pub fn bugfix_recursion_allowed(&self) -> bool {
        self.bugfix_recursion_allowed
    }

    /// Enter the pipeline, returning the context for the nested call chain.
    ///
    /// The recursion capability is consumed on entry: a bug-fix run can nest
    /// one level, not indefinitely.
    pub fn enter(&self) -> Result<RunContext, NestedExecution> {
        if self.pipeline_running && !self.bugfix_recursion_allowed {
            return Err(NestedExecution);
        }
        Ok(RunContext {
            pipeline_running: true,
            bugfix_recursion_allowed: false,
        })
    }
}
