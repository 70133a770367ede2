use std::io::{self, Write};

use tracing::{debug, warn};

use crate::error::JobError;
use crate::status::{self, ExecutionOutcome, WaitMode};

/// Default number of background jobs tracked at once.
pub const DEFAULT_JOB_CAPACITY: usize = 64;

/// The lifecycle state of a tracked job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Running,
    Finished(ExecutionOutcome),
}

/// A single background process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub pid: u32,
    pub command: String,
    pub state: JobState,
}

/// The shell's job table, keyed by pid and kept in registration order.
///
/// A job leaves the table the moment its termination is observed, so the
/// table never holds a pid the kernel is free to hand out again.
#[derive(Debug)]
pub struct JobTable {
    jobs: Vec<Job>,
    capacity: usize,
}

impl Default for JobTable {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_JOB_CAPACITY)
    }
}

impl JobTable {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            jobs: Vec::new(),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn get(&self, pid: u32) -> Option<&Job> {
        self.jobs.iter().find(|job| job.pid == pid)
    }

    /// All jobs in registration order.
    pub fn jobs(&self) -> &[Job] {
        &self.jobs
    }

    /// Fails when one more job would exceed the configured capacity.
    pub fn ensure_room(&self) -> Result<(), JobError> {
        if self.jobs.len() >= self.capacity {
            return Err(JobError::CapacityExceeded {
                capacity: self.capacity,
            });
        }
        Ok(())
    }

    /// Track a newly started background process.
    pub fn register(&mut self, pid: u32, command: String) -> Result<(), JobError> {
        self.ensure_room()?;
        if self.get(pid).is_some() {
            return Err(JobError::DuplicatePid(pid));
        }
        debug!(pid, %command, "job registered");
        self.jobs.push(Job {
            pid,
            command,
            state: JobState::Running,
        });
        Ok(())
    }

    pub fn remove(&mut self, pid: u32) -> Option<Job> {
        let index = self.jobs.iter().position(|job| job.pid == pid)?;
        Some(self.jobs.remove(index))
    }

    /// Most recently registered job that has not been observed to finish.
    pub fn most_recent_running(&self) -> Option<u32> {
        self.jobs
            .iter()
            .rev()
            .find(|job| job.state == JobState::Running)
            .map(|job| job.pid)
    }

    /// Polls every running job without blocking. Prints one line per job;
    /// jobs seen to have finished are printed as `Finished` exactly once and
    /// removed. Returns what was printed.
    pub fn list_with_refresh(&mut self, out: &mut dyn Write, err: &mut dyn Write) -> Vec<Job> {
        for job in &mut self.jobs {
            if job.state != JobState::Running {
                continue;
            }
            match poll_state(job.pid) {
                Ok(state) => job.state = state,
                Err(e) => {
                    warn!(pid = job.pid, error = %e, "cannot poll job");
                    let _ = writeln!(err, "msh: cannot check job {}: {e}", job.pid);
                }
            }
        }

        let mut listed = Vec::with_capacity(self.jobs.len());
        for job in &self.jobs {
            let label = match job.state {
                JobState::Running => "Running",
                JobState::Finished(_) => "Finished",
            };
            let _ = writeln!(out, "[{}]  {:<9} {}", job.pid, label, job.command);
            listed.push(job.clone());
        }

        self.jobs.retain(|job| {
            let finished = matches!(job.state, JobState::Finished(_));
            if finished {
                debug!(pid = job.pid, "job reaped");
            }
            !finished
        });
        listed
    }

    /// Block on a job until it terminates, then drop it from the table.
    /// With no pid, the most recent running job is chosen. An unknown pid
    /// or an empty table is an error and leaves the table untouched.
    pub fn bring_to_foreground(
        &mut self,
        pid: Option<u32>,
        out: &mut dyn Write,
        err: &mut dyn Write,
    ) -> Result<ExecutionOutcome, JobError> {
        let pid = match pid {
            Some(pid) if self.get(pid).is_some() => pid,
            Some(pid) => return Err(JobError::NoSuchJob(pid)),
            None => self.most_recent_running().ok_or(JobError::NoCurrentJob)?,
        };

        let (command, state) = match self.get(pid) {
            Some(job) => (job.command.clone(), job.state),
            None => return Err(JobError::NoSuchJob(pid)),
        };
        let _ = writeln!(out, "{command}");

        let outcome = match state {
            JobState::Finished(outcome) => outcome,
            JobState::Running => status::wait_one(pid, &command, err),
        };
        status::report(&command, outcome, err);
        self.remove(pid);
        Ok(outcome)
    }
}

fn poll_state(pid: u32) -> io::Result<JobState> {
    match status::wait_for_pid(pid, WaitMode::Poll) {
        Ok(None) => Ok(JobState::Running),
        Ok(Some(status)) => Ok(JobState::Finished(ExecutionOutcome::from(status))),
        // Someone else collected it; all that is left to say is that it ended.
        Err(e) if e.raw_os_error() == Some(libc::ECHILD) => {
            Ok(JobState::Finished(ExecutionOutcome::Abnormal))
        }
        Err(e) => Err(e),
    }
}
