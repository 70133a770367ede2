use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::status::ExecutionOutcome;

/// Exit code reported for a program that could not be found.
pub const EXIT_NOT_FOUND: i32 = 127;
/// Exit code reported for a program that was found but could not be loaded.
pub const EXIT_NOT_EXECUTABLE: i32 = 126;

/// Failures while turning a [`CommandLine`](crate::CommandLine) into processes.
#[derive(Debug, Error)]
pub enum ExecError {
    #[error("empty command line")]
    EmptyCommandLine,

    #[error("background pipelines are not supported")]
    BackgroundPipeline,

    #[error("cannot create pipe: {0}")]
    Pipe(#[source] io::Error),

    /// The OS refused to create a new process.
    #[error("{command}: cannot create process: {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    /// The process was created but its program image could not be loaded.
    #[error("{command}: {source}")]
    Load {
        command: String,
        #[source]
        source: io::Error,
    },

    /// A redirection target could not be opened.
    #[error("{}: {source}", path.display())]
    Redirect {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Job(#[from] JobError),
}

impl ExecError {
    /// The outcome a forked child would have produced for this failure, if
    /// the failure belongs to one child rather than the whole pipeline.
    pub fn child_outcome(&self) -> Option<ExecutionOutcome> {
        match self {
            ExecError::Redirect { .. } => Some(ExecutionOutcome::Exited(1)),
            ExecError::Load { source, .. } if source.kind() == io::ErrorKind::NotFound => {
                Some(ExecutionOutcome::Exited(EXIT_NOT_FOUND))
            }
            ExecError::Load { .. } => Some(ExecutionOutcome::Exited(EXIT_NOT_EXECUTABLE)),
            _ => None,
        }
    }
}

/// Job table lookups and registrations that could not be honoured.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum JobError {
    #[error("job table is full ({capacity} jobs)")]
    CapacityExceeded { capacity: usize },

    #[error("{0}: job already registered")]
    DuplicatePid(u32),

    #[error("{0}: no such job")]
    NoSuchJob(u32),

    #[error("no current job")]
    NoCurrentJob,
}

/// Syntax problems found while splitting a line into a pipeline.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("syntax error near unexpected token `{0}'")]
    UnexpectedToken(&'static str),

    #[error("syntax error: expected filename after `{0}'")]
    MissingTarget(&'static str),

    #[error("syntax error: `{0}' only applies to the {1} command of a pipeline")]
    MisplacedRedirect(&'static str, &'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_failures_map_to_shell_exit_codes() {
        let missing = ExecError::Load {
            command: "nope".into(),
            source: io::Error::from(io::ErrorKind::NotFound),
        };
        assert_eq!(missing.child_outcome(), Some(ExecutionOutcome::Exited(127)));

        let denied = ExecError::Load {
            command: "./data.txt".into(),
            source: io::Error::from(io::ErrorKind::PermissionDenied),
        };
        assert_eq!(denied.child_outcome(), Some(ExecutionOutcome::Exited(126)));
    }

    #[test]
    fn pipeline_wide_failures_have_no_child_outcome() {
        let err = ExecError::Spawn {
            command: "sleep".into(),
            source: io::Error::from_raw_os_error(libc::EAGAIN),
        };
        assert!(err.child_outcome().is_none());
        assert!(ExecError::EmptyCommandLine.child_outcome().is_none());
    }

    #[test]
    fn redirect_message_names_the_path() {
        let err = ExecError::Redirect {
            path: PathBuf::from("/missing/out.txt"),
            source: io::Error::from_raw_os_error(libc::ENOENT),
        };
        assert!(err.to_string().starts_with("/missing/out.txt: "));
        assert_eq!(err.child_outcome(), Some(ExecutionOutcome::Exited(1)));
    }
}
