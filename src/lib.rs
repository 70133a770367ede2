//! Pipeline execution engine for the `msh` interactive shell.
//!
//! The engine takes an already-parsed [`CommandLine`], starts one process per
//! command with its standard streams wired through pipes and redirections,
//! and either waits for all of them ([`Engine::run_foreground`]) or tracks a
//! single background process in the [`JobTable`] ([`Engine::run_background`],
//! [`Engine::list_jobs`], [`Engine::bring_to_foreground`]).

#[cfg(not(unix))]
compile_error!("msh drives fork/exec, pipes and POSIX signals; only Unix targets are supported");

pub mod ast;
pub mod builtins;
pub mod config;
pub mod engine;
pub mod error;
pub mod jobs;
pub mod launcher;
pub mod parser;
pub mod pipeline;
pub mod plan;
pub mod signals;
pub mod status;

pub use ast::{Command, CommandLine};
pub use config::Config;
pub use engine::Engine;
pub use error::{ExecError, JobError, ParseError};
pub use jobs::{Job, JobState, JobTable};
pub use signals::{Disposition, Signal, SignalPolicy};
pub use status::ExecutionOutcome;
