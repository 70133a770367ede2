use std::fmt;
use std::io::{self, Write};
use std::os::unix::process::ExitStatusExt;
use std::process::ExitStatus;

use tracing::{debug, warn};

use crate::signals::Signal;

/// How a foreground command ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionOutcome {
    /// Normal exit with the given code.
    Exited(i32),
    /// Killed by the given signal number.
    Signaled(i32),
    /// Neither of the above, or the status could not be collected.
    Abnormal,
}

impl ExecutionOutcome {
    pub fn success(self) -> bool {
        self == ExecutionOutcome::Exited(0)
    }

    /// Shell-style status: the exit code, `128 + signal`, or 1.
    pub fn exit_code(self) -> i32 {
        match self {
            ExecutionOutcome::Exited(code) => code,
            ExecutionOutcome::Signaled(signal) => 128 + signal,
            ExecutionOutcome::Abnormal => 1,
        }
    }
}

impl From<ExitStatus> for ExecutionOutcome {
    fn from(status: ExitStatus) -> Self {
        if let Some(code) = status.code() {
            return ExecutionOutcome::Exited(code);
        }
        if let Some(signal) = status.signal() {
            return ExecutionOutcome::Signaled(signal);
        }
        ExecutionOutcome::Abnormal
    }
}

impl fmt::Display for ExecutionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionOutcome::Exited(code) => write!(f, "exited with code {code}"),
            ExecutionOutcome::Signaled(signal) => {
                write!(f, "terminated by signal {}", Signal::from_raw(*signal))
            }
            ExecutionOutcome::Abnormal => f.write_str("did not terminate normally"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WaitMode {
    Block,
    /// Return immediately when the process has not changed state.
    Poll,
}

/// `waitpid` on one specific child. `Ok(None)` only in [`WaitMode::Poll`]
/// when the child is still running.
pub(crate) fn wait_for_pid(pid: u32, mode: WaitMode) -> io::Result<Option<ExitStatus>> {
    let flags = match mode {
        WaitMode::Block => 0,
        WaitMode::Poll => libc::WNOHANG,
    };
    let mut raw_status: libc::c_int = 0;

    loop {
        // SAFETY: `raw_status` is a live, writable c_int for the whole call.
        let rc = unsafe { libc::waitpid(pid as libc::pid_t, &mut raw_status, flags) };
        if rc < 0 {
            let err = io::Error::last_os_error();
            if err.raw_os_error() == Some(libc::EINTR) {
                continue;
            }
            return Err(err);
        }
        if rc == 0 {
            return Ok(None);
        }
        return Ok(Some(ExitStatus::from_raw(raw_status)));
    }
}

/// Block until `pid` terminates and classify how it ended.
pub(crate) fn wait_one(pid: u32, command: &str, err: &mut dyn Write) -> ExecutionOutcome {
    match wait_for_pid(pid, WaitMode::Block) {
        Ok(Some(status)) => {
            let outcome = ExecutionOutcome::from(status);
            debug!(pid, command, ?outcome, "child collected");
            outcome
        }
        Ok(None) => ExecutionOutcome::Abnormal,
        Err(e) => {
            warn!(pid, command, error = %e, "waitpid failed");
            let _ = writeln!(err, "msh: {command}: cannot wait for process {pid}: {e}");
            ExecutionOutcome::Abnormal
        }
    }
}

/// Write the diagnostic for a failed outcome; successful outcomes are silent.
pub fn report(command: &str, outcome: ExecutionOutcome, err: &mut dyn Write) {
    if !outcome.success() {
        let _ = writeln!(err, "msh: {command}: {outcome}");
    }
}

/// One pipeline member as seen by the waiter.
#[derive(Debug)]
pub(crate) enum Pending {
    /// A live child to collect.
    Running { pid: u32, command: String },
    /// A member that never reached its program; its outcome is already known
    /// and its diagnostic already written.
    Settled(ExecutionOutcome),
}

/// Collect every pending member in launch order, reporting abnormal ends.
pub(crate) fn wait_all(pending: Vec<Pending>, err: &mut dyn Write) -> Vec<ExecutionOutcome> {
    pending
        .into_iter()
        .map(|member| match member {
            Pending::Running { pid, command } => {
                let outcome = wait_one(pid, &command, err);
                report(&command, outcome, err);
                outcome
            }
            Pending::Settled(outcome) => outcome,
        })
        .collect()
}
