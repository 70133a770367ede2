use std::io::Write;

use tracing::{debug, warn};

use crate::ast::CommandLine;
use crate::error::ExecError;
use crate::launcher::Launcher;
use crate::plan::{DescriptorPlan, PipeEndpoints};
use crate::status::{ExecutionOutcome, Pending, wait_all};

/// Run every command of `line` concurrently, connected by pipes, and block
/// until all of them have terminated. Returns one outcome per command, in
/// pipeline order.
///
/// A member whose redirection or program cannot be opened fails on its own
/// with a diagnostic; the rest of the pipeline still runs. If the OS refuses
/// to create a process, no further members are started, the ones already
/// running are waited for, and the creation error is returned.
///
/// A line with no commands has nothing to run and yields no outcomes.
pub fn run_foreground(
    launcher: &Launcher,
    line: &CommandLine,
    err: &mut dyn Write,
) -> Result<Vec<ExecutionOutcome>, ExecError> {
    let count = line.len();
    if count == 0 {
        return Ok(Vec::new());
    }

    let mut pipes = PipeEndpoints::create(count - 1).map_err(ExecError::Pipe)?;
    debug!(
        commands = count,
        pipes = pipes.boundaries(),
        "starting foreground pipeline"
    );

    let mut pending = Vec::with_capacity(count);
    let mut creation_failure = None;

    for (index, command) in line.commands.iter().enumerate() {
        let plan = DescriptorPlan::for_position(index, line);
        match launcher.launch(command, &plan, &mut pipes) {
            Ok(pid) => pending.push(Pending::Running {
                pid,
                command: command.program().to_string(),
            }),
            Err(error) => match error.child_outcome() {
                Some(outcome) => {
                    let _ = writeln!(err, "msh: {error}");
                    pending.push(Pending::Settled(outcome));
                }
                None => {
                    warn!(index, %error, "pipeline aborted after partial launch");
                    creation_failure = Some(error);
                    break;
                }
            },
        }
    }

    // Readers only see end-of-stream once the parent's copies are gone too.
    pipes.close_all();

    let outcomes = wait_all(pending, err);
    match creation_failure {
        Some(error) => Err(error),
        None => Ok(outcomes),
    }
}

/// Start the single command of a background `line` and return its pid
/// without waiting. Unredirected streams are attached to the null device.
pub fn spawn_background(launcher: &Launcher, line: &CommandLine) -> Result<u32, ExecError> {
    match line.len() {
        0 => return Err(ExecError::EmptyCommandLine),
        1 => {}
        _ => return Err(ExecError::BackgroundPipeline),
    }

    let detached;
    let line = if line.background {
        line
    } else {
        detached = line.clone().in_background();
        &detached
    };

    let plan = DescriptorPlan::for_position(0, line);
    let mut pipes = PipeEndpoints::default();
    launcher.launch(&line.commands[0], &plan, &mut pipes)
}
