//! Termination signals and the escalation policy for timed-out children.

use std::io;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default delay between successive escalation signals.
pub const DEFAULT_KILL_GRACE: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TerminationSignal {
    /// SIGTERM: ask the process to exit.
    Terminate,
    /// SIGKILL: force the process to exit.
    Kill,
}

/// Timeout bound and signal escalation for one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeoutPolicy {
    pub timeout: Duration,
    /// Wait between one signal and the next while the process is still alive.
    pub kill_grace: Duration,
    pub signal_sequence: Vec<TerminationSignal>,
}

impl TimeoutPolicy {
    /// Policy with the standard `[Terminate, Kill]` sequence.
    pub fn new(timeout: Duration, kill_grace: Duration) -> Self {
        Self {
            timeout,
            kill_grace,
            signal_sequence: vec![TerminationSignal::Terminate, TerminationSignal::Kill],
        }
    }
}

impl Default for TimeoutPolicy {
    fn default() -> Self {
        Self::new(Duration::from_secs(30), DEFAULT_KILL_GRACE)
    }
}

/// Delivers termination signals to a spawned child.
pub trait Signaller: Send + Sync + 'static {
    /// Send `signal` to the child with process id `pid` (and its process group).
    fn send(&self, pid: u32, signal: TerminationSignal) -> io::Result<()>;
}

/// Signals the child's whole process group, so wrappers such as script runners
/// do not leave their own children behind.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessGroupSignaller;

#[cfg(unix)]
impl Signaller for ProcessGroupSignaller {
    fn send(&self, pid: u32, signal: TerminationSignal) -> io::Result<()> {
        use nix::errno::Errno;
        use nix::sys::signal::{Signal, kill, killpg};
        use nix::unistd::Pid;

        let raw = i32::try_from(pid)
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "pid out of range"))?;
        let signal = match signal {
            TerminationSignal::Terminate => Signal::SIGTERM,
            TerminationSignal::Kill => Signal::SIGKILL,
        };
        // The child leads its own group; fall back to the single process if
        // the group is already gone. Nothing left to signal counts as sent.
        match killpg(Pid::from_raw(raw), signal).or_else(|_| kill(Pid::from_raw(raw), signal)) {
            Ok(()) | Err(Errno::ESRCH) => Ok(()),
            Err(err) => Err(io::Error::from(err)),
        }
    }
}

#[cfg(not(unix))]
impl Signaller for ProcessGroupSignaller {
    fn send(&self, _pid: u32, _signal: TerminationSignal) -> io::Result<()> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "signal escalation requires unix",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_sequence_terminates_then_kills() {
        let policy = TimeoutPolicy::new(Duration::from_secs(10), Duration::from_millis(500));
        assert_eq!(
            policy.signal_sequence,
            vec![TerminationSignal::Terminate, TerminationSignal::Kill]
        );
        assert_eq!(TimeoutPolicy::default().kill_grace, DEFAULT_KILL_GRACE);
    }

    #[cfg(unix)]
    #[test]
    fn signalling_a_reaped_process_is_not_an_error() {
        let mut child = std::process::Command::new("true")
            .spawn()
            .expect("spawn true");
        let pid = child.id();
        child.wait().expect("wait");

        ProcessGroupSignaller
            .send(pid, TerminationSignal::Kill)
            .expect("missing process counts as signalled");
    }
}
