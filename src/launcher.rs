use std::io;
use std::os::unix::process::CommandExt;
use std::process;

use tracing::debug;

use crate::ast::Command;
use crate::error::ExecError;
use crate::plan::{DescriptorPlan, PipeEndpoints};
use crate::signals::SignalPolicy;

/// Starts one OS process per [`Command`].
#[derive(Debug, Clone, Default)]
pub struct Launcher {
    signals: SignalPolicy,
}

impl Launcher {
    pub fn new(signals: SignalPolicy) -> Self {
        Self { signals }
    }

    /// Start `command` with its streams wired according to `plan` and return
    /// its pid.
    ///
    /// In the child, the interactive signals are reset to their default
    /// disposition before the program image is loaded. Failures that belong
    /// to this one child (a redirection that cannot be opened, a program that
    /// cannot be loaded) come back as [`ExecError::Redirect`] and
    /// [`ExecError::Load`]; [`ExecError::Spawn`] means no process could be
    /// created at all.
    pub fn launch(
        &self,
        command: &Command,
        plan: &DescriptorPlan,
        pipes: &mut PipeEndpoints,
    ) -> Result<u32, ExecError> {
        let streams = plan.resolve(pipes)?;

        let argv = command.argv();
        let mut process = process::Command::new(command.program());
        process
            .arg0(&argv[0])
            .args(&argv[1..])
            .stdin(streams.stdin)
            .stdout(streams.stdout)
            .stderr(streams.stderr);

        let signals = self.signals.clone();
        // SAFETY: the hook only calls signal(2), which is async-signal-safe.
        unsafe {
            process.pre_exec(move || signals.restore_in_child());
        }

        // `process` owns this child's pipe ends and files; they are closed in
        // the parent when it drops at the end of this call.
        match process.spawn() {
            Ok(child) => {
                let pid = child.id();
                debug!(pid, program = command.program(), "process started");
                Ok(pid)
            }
            Err(source) if is_load_failure(&source) => Err(ExecError::Load {
                command: command.program().to_string(),
                source,
            }),
            Err(source) => Err(ExecError::Spawn {
                command: command.program().to_string(),
                source,
            }),
        }
    }
}

/// Errors `execve` reports about the program itself rather than about the
/// system's capacity to create a process.
fn is_load_failure(err: &io::Error) -> bool {
    if matches!(
        err.kind(),
        io::ErrorKind::NotFound | io::ErrorKind::PermissionDenied
    ) {
        return true;
    }
    matches!(
        err.raw_os_error(),
        Some(
            libc::ENOEXEC
                | libc::EISDIR
                | libc::ENOTDIR
                | libc::ELOOP
                | libc::ENAMETOOLONG
                | libc::ETXTBSY
                | libc::E2BIG
        )
    )
}
