use std::io::Write;

use tracing::{debug, warn};

use crate::ast::CommandLine;
use crate::config::Config;
use crate::error::{ExecError, JobError};
use crate::jobs::{Job, JobTable};
use crate::launcher::Launcher;
use crate::pipeline;
use crate::signals::SignalPolicy;
use crate::status::{self, ExecutionOutcome};

/// Everything the interactive loop needs to run command lines: the launcher,
/// the background job table and the signal policy they share.
#[derive(Debug)]
pub struct Engine {
    config: Config,
    launcher: Launcher,
    jobs: JobTable,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl Engine {
    pub fn new(config: Config) -> Self {
        Self {
            launcher: Launcher::new(config.signals.clone()),
            jobs: JobTable::with_capacity(config.job_capacity),
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn signal_policy(&self) -> &SignalPolicy {
        &self.config.signals
    }

    pub fn jobs(&self) -> &JobTable {
        &self.jobs
    }

    /// Run `line` in the foreground or background according to its flag.
    /// A background launch and an empty line yield no outcomes.
    pub fn execute(
        &mut self,
        line: &CommandLine,
        out: &mut dyn Write,
        err: &mut dyn Write,
    ) -> Result<Vec<ExecutionOutcome>, ExecError> {
        if line.is_empty() {
            return Ok(Vec::new());
        }
        if line.background {
            self.run_background(line, out, err)?;
            Ok(Vec::new())
        } else {
            self.run_foreground(line, err)
        }
    }

    /// See [`pipeline::run_foreground`].
    pub fn run_foreground(
        &self,
        line: &CommandLine,
        err: &mut dyn Write,
    ) -> Result<Vec<ExecutionOutcome>, ExecError> {
        pipeline::run_foreground(&self.launcher, line, err)
    }

    /// Start the single command of `line` without waiting for it, track it in
    /// the job table and print `[pid] command`. Returns the pid.
    pub fn run_background(
        &mut self,
        line: &CommandLine,
        out: &mut dyn Write,
        err: &mut dyn Write,
    ) -> Result<u32, ExecError> {
        // Check before starting anything so a full table never orphans a child.
        self.jobs.ensure_room()?;

        let pid = pipeline::spawn_background(&self.launcher, line)?;
        let command = line.to_string();

        if let Err(error) = self.jobs.register(pid, command.clone()) {
            warn!(pid, %error, "background job could not be tracked; waiting for it");
            let _ = writeln!(err, "msh: {error}; waiting for {pid} in the foreground");
            let outcome = status::wait_one(pid, &command, err);
            status::report(&command, outcome, err);
            return Err(error.into());
        }

        debug!(pid, %command, "background job started");
        let _ = writeln!(out, "[{pid}] {command}");
        Ok(pid)
    }

    /// The `jobs` builtin: refresh liveness, print, forget finished jobs.
    pub fn list_jobs(&mut self, out: &mut dyn Write, err: &mut dyn Write) -> Vec<Job> {
        self.jobs.list_with_refresh(out, err)
    }

    /// The `fg` builtin: wait for `pid`, or the most recent running job.
    pub fn bring_to_foreground(
        &mut self,
        pid: Option<u32>,
        out: &mut dyn Write,
        err: &mut dyn Write,
    ) -> Result<ExecutionOutcome, JobError> {
        self.jobs.bring_to_foreground(pid, out, err)
    }
}
