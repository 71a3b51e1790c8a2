//! Managed child process execution with timeouts and signal escalation.
//!
//! One invocation owns exactly one child. A single select loop processes
//! output chunks, the child's exit, and the timeout deadline, so the capture
//! freeze happens synchronously with whichever terminal event wins. Chunks
//! still in flight when the loop resolves are never part of the result.

use std::io;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tracing::{debug, error, instrument, warn};

use crate::core::types::ExecutionResult;
use crate::io::capture::{OutputAccumulator, StreamKind};
use crate::io::signal::{ProcessGroupSignaller, Signaller, TerminationSignal, TimeoutPolicy};

const READ_CHUNK_BYTES: usize = 8192;

/// Parameters for one child process invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRequest {
    /// Executable name or path; never interpreted by a shell.
    pub command: String,
    /// Literal argv passed to the executable.
    pub args: Vec<String>,
    /// Working directory; the caller's current directory when `None`.
    pub cwd: Option<PathBuf>,
    pub policy: TimeoutPolicy,
}

impl RunRequest {
    pub fn new<I, S>(command: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            command: command.into(),
            args: args.into_iter().map(Into::into).collect(),
            cwd: None,
            policy: TimeoutPolicy::default(),
        }
    }

    pub fn with_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    pub fn with_policy(mut self, policy: TimeoutPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// `command arg1 arg2`, for logs and messages.
    pub fn display(&self) -> String {
        std::iter::once(self.command.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Why a child could not be launched or waited on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpawnFailure {
    #[error("command not found: {command}")]
    NotFound { command: String },
    #[error("permission denied: {command}")]
    PermissionDenied { command: String },
    #[error("failed to run {command}: {message}")]
    Other { command: String, message: String },
}

impl SpawnFailure {
    pub fn from_io(command: &str, err: &io::Error) -> Self {
        let command = command.to_string();
        let message = err.to_string();
        match err.kind() {
            io::ErrorKind::NotFound => Self::NotFound { command },
            io::ErrorKind::PermissionDenied => Self::PermissionDenied { command },
            _ if message.contains("ENOENT") => Self::NotFound { command },
            _ if message.contains("EACCES") => Self::PermissionDenied { command },
            _ => Self::Other { command, message },
        }
    }
}

impl ExecutionResult {
    /// Result for a child that never ran (or whose wait failed); output is
    /// discarded on this path.
    pub fn spawn_failed(failure: &SpawnFailure) -> Self {
        let message = failure.to_string();
        Self {
            spawn_error: Some(message.clone()),
            error: Some(message),
            ..Self::default()
        }
    }
}

/// Abstraction over process execution. Verifiers depend on this trait so tests
/// can substitute scripted results without spawning anything.
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    /// Run one child to a terminal result. Never fails: spawn errors and
    /// timeouts are reported inside the result.
    async fn run(&self, request: &RunRequest) -> ExecutionResult;
}

/// Executor that spawns real child processes.
#[derive(Debug, Clone)]
pub struct ProcessExecutor<S = ProcessGroupSignaller> {
    signaller: Arc<S>,
}

impl ProcessExecutor {
    pub fn new() -> Self {
        Self::with_signaller(ProcessGroupSignaller)
    }
}

impl Default for ProcessExecutor {
    fn default() -> Self {
        Self::new()
    }
}

enum LoopEvent {
    Timeout,
    Exited(io::Result<ExitStatus>),
    Chunk(Option<(StreamKind, Vec<u8>)>),
}

impl<S: Signaller> ProcessExecutor<S> {
    pub fn with_signaller(signaller: S) -> Self {
        Self {
            signaller: Arc::new(signaller),
        }
    }

    #[instrument(skip_all, fields(command = %request.command, timeout_ms = request.policy.timeout.as_millis() as u64))]
    async fn execute(&self, request: &RunRequest) -> ExecutionResult {
        let mut cmd = Command::new(&request.command);
        cmd.args(&request.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(cwd) = &request.cwd {
            cmd.current_dir(cwd);
        }
        #[cfg(unix)]
        cmd.process_group(0);

        debug!(argv = %request.display(), "spawning child process");
        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(err) => {
                let failure = SpawnFailure::from_io(&request.command, &err);
                error!(err = %err, failure = %failure, "failed to spawn command");
                return ExecutionResult::spawn_failed(&failure);
            }
        };
        let pid = child.id();

        let (tx, mut rx) = mpsc::unbounded_channel();
        if let Some(stdout) = child.stdout.take() {
            tokio::spawn(pump(stdout, StreamKind::Stdout, tx.clone()));
        }
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(pump(stderr, StreamKind::Stderr, tx.clone()));
        }
        drop(tx);

        let mut output = OutputAccumulator::new();
        let deadline = tokio::time::sleep(request.policy.timeout);
        tokio::pin!(deadline);
        let mut exit_status: Option<ExitStatus> = None;
        let mut streams_open = true;

        loop {
            // Deadline first so a chatty child cannot starve the timeout.
            let event = tokio::select! {
                biased;
                () = &mut deadline => LoopEvent::Timeout,
                status = child.wait(), if exit_status.is_none() => LoopEvent::Exited(status),
                chunk = rx.recv(), if streams_open => LoopEvent::Chunk(chunk),
            };

            match event {
                LoopEvent::Timeout => {
                    output.freeze();
                    drop(rx);
                    let timeout_ms = request.policy.timeout.as_millis();
                    warn!(timeout_ms = timeout_ms as u64, "command timed out, escalating");
                    if let Some(pid) = pid {
                        escalate(
                            child,
                            pid,
                            Arc::clone(&self.signaller),
                            &request.policy,
                            exit_status.is_some(),
                        );
                    }
                    let captured = output.finish();
                    return ExecutionResult {
                        exit_code: None,
                        stdout: captured.stdout,
                        stderr: captured.stderr,
                        combined_output: captured.combined,
                        timed_out: true,
                        spawn_error: None,
                        error: Some(format!("command timed out after {timeout_ms}ms")),
                    };
                }
                LoopEvent::Exited(Ok(status)) => {
                    debug!(status = %status, "child exited, draining output");
                    exit_status = Some(status);
                }
                LoopEvent::Exited(Err(err)) => {
                    output.freeze();
                    let failure = SpawnFailure::from_io(&request.command, &err);
                    error!(err = %err, failure = %failure, "failed waiting on command");
                    return ExecutionResult::spawn_failed(&failure);
                }
                LoopEvent::Chunk(Some((stream, chunk))) => {
                    output.push(stream, &chunk);
                }
                LoopEvent::Chunk(None) => streams_open = false,
            }

            if let (Some(status), false) = (exit_status, streams_open) {
                output.freeze();
                let exit_code = exit_code_of(status);
                debug!(exit_code = ?exit_code, "command closed");
                let captured = output.finish();
                return ExecutionResult {
                    exit_code,
                    stdout: captured.stdout,
                    stderr: captured.stderr,
                    combined_output: captured.combined,
                    timed_out: false,
                    spawn_error: None,
                    error: None,
                };
            }
        }
    }
}

#[async_trait]
impl<S: Signaller> ProcessRunner for ProcessExecutor<S> {
    async fn run(&self, request: &RunRequest) -> ExecutionResult {
        self.execute(request).await
    }
}

/// Forward chunks from one pipe until EOF or until the receiver is gone.
async fn pump<R: AsyncRead + Unpin>(
    mut reader: R,
    stream: StreamKind,
    tx: mpsc::UnboundedSender<(StreamKind, Vec<u8>)>,
) {
    let mut buf = vec![0u8; READ_CHUNK_BYTES];
    loop {
        match reader.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => {
                if tx.send((stream, buf[..n].to_vec())).is_err() {
                    break;
                }
            }
            Err(err) => {
                debug!(err = %err, stream = ?stream, "output read failed");
                break;
            }
        }
    }
}

/// Send the first signal now and walk the rest of the sequence in the
/// background, one grace window apart, stopping as soon as the child exits.
///
/// When the child had already exited before the deadline, descendants in its
/// group are what keep the pipes open, so every remaining signal is sent to
/// the group without waiting on the child.
fn escalate<S: Signaller>(
    mut child: Child,
    pid: u32,
    signaller: Arc<S>,
    policy: &TimeoutPolicy,
    child_exited: bool,
) {
    let mut signals = policy.signal_sequence.clone().into_iter();
    let Some(first) = signals.next() else {
        return;
    };
    send_signal(signaller.as_ref(), &mut child, pid, first);

    let grace = policy.kill_grace;
    tokio::spawn(async move {
        for signal in signals {
            if child_exited {
                tokio::time::sleep(grace).await;
                send_signal(signaller.as_ref(), &mut child, pid, signal);
                continue;
            }
            tokio::select! {
                status = child.wait() => {
                    debug!(pid, status = ?status.ok(), "child exited within grace window");
                    return;
                }
                () = tokio::time::sleep(grace) => {
                    send_signal(signaller.as_ref(), &mut child, pid, signal);
                }
            }
        }
        let _ = child.wait().await;
    });
}

fn send_signal<S: Signaller>(
    signaller: &S,
    child: &mut Child,
    pid: u32,
    signal: TerminationSignal,
) {
    match signaller.send(pid, signal) {
        Ok(()) => debug!(pid, signal = ?signal, "sent signal"),
        Err(err) => {
            warn!(pid, signal = ?signal, err = %err, "failed to signal child");
            if signal == TerminationSignal::Kill {
                let _ = child.start_kill();
            }
        }
    }
}

/// Natural exit code; death by signal `N` maps to `128 + N`.
fn exit_code_of(status: ExitStatus) -> Option<i32> {
    if let Some(code) = status.code() {
        return Some(code);
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return Some(128 + signal);
        }
    }
    None
}
