//! Standard-stream wiring for each member of a pipeline.
//!
//! [`DescriptorPlan::for_position`] is a pure function of the member's index
//! and the command line's redirections. [`DescriptorPlan::resolve`] turns a
//! plan into live descriptors, moving pipe ends out of [`PipeEndpoints`] so
//! that each end is owned by exactly one child's spawn and released from the
//! parent as soon as that spawn returns.

use std::fs::{File, OpenOptions};
use std::io;
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use os_pipe::{PipeReader, PipeWriter};
use tracing::trace;

use crate::ast::CommandLine;
use crate::error::ExecError;

/// Permission bits for files created by `>` and `2>` (`rw-r--r--`).
pub const REDIRECT_FILE_MODE: u32 = 0o644;

/// Where a command's standard input comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    Inherit,
    Null,
    File(PathBuf),
    /// Read end of the pipe at this boundary index.
    Pipe(usize),
}

/// Where a command's standard output or error goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sink {
    Inherit,
    Null,
    File(PathBuf),
    /// Write end of the pipe at this boundary index.
    Pipe(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescriptorPlan {
    pub stdin: Source,
    pub stdout: Sink,
    pub stderr: Sink,
}

impl DescriptorPlan {
    /// Plan for member `index` of `line`. Boundary `i` sits between member
    /// `i` and member `i + 1`.
    pub fn for_position(index: usize, line: &CommandLine) -> Self {
        let last = line.len().saturating_sub(1);

        let stdin = match &line.input {
            Some(path) if index == 0 => Source::File(path.clone()),
            _ if index > 0 => Source::Pipe(index - 1),
            _ if line.background => Source::Null,
            _ => Source::Inherit,
        };

        let stdout = match &line.output {
            Some(path) if index == last => Sink::File(path.clone()),
            _ if index < last => Sink::Pipe(index),
            _ if line.background => Sink::Null,
            _ => Sink::Inherit,
        };

        let stderr = match &line.error {
            Some(path) if index == last => Sink::File(path.clone()),
            _ if line.background => Sink::Null,
            _ => Sink::Inherit,
        };

        Self {
            stdin,
            stdout,
            stderr,
        }
    }

    /// Open files and claim pipe ends for this plan. Claimed ends leave
    /// `pipes`; if a later step fails they are dropped here, exactly as a
    /// child that failed its redirection would close them.
    pub fn resolve(&self, pipes: &mut PipeEndpoints) -> Result<Streams, ExecError> {
        let stdin = match &self.stdin {
            Source::Inherit => Stdio::inherit(),
            Source::Null => Stdio::null(),
            Source::File(path) => Stdio::from(open_input(path)?),
            Source::Pipe(boundary) => Stdio::from(pipes.take_reader(*boundary)?),
        };
        let stdout = resolve_sink(&self.stdout, pipes)?;
        let stderr = resolve_sink(&self.stderr, pipes)?;
        Ok(Streams {
            stdin,
            stdout,
            stderr,
        })
    }
}

fn resolve_sink(sink: &Sink, pipes: &mut PipeEndpoints) -> Result<Stdio, ExecError> {
    Ok(match sink {
        Sink::Inherit => Stdio::inherit(),
        Sink::Null => Stdio::null(),
        Sink::File(path) => Stdio::from(open_output(path)?),
        Sink::Pipe(boundary) => Stdio::from(pipes.take_writer(*boundary)?),
    })
}

fn open_input(path: &Path) -> Result<File, ExecError> {
    File::open(path).map_err(|source| ExecError::Redirect {
        path: path.to_path_buf(),
        source,
    })
}

fn open_output(path: &Path) -> Result<File, ExecError> {
    OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(REDIRECT_FILE_MODE)
        .open(path)
        .map_err(|source| ExecError::Redirect {
            path: path.to_path_buf(),
            source,
        })
}

/// Live descriptors for one child's standard streams.
#[derive(Debug)]
pub struct Streams {
    pub stdin: Stdio,
    pub stdout: Stdio,
    pub stderr: Stdio,
}

/// The pipes of one pipeline, one (read, write) pair per boundary.
///
/// Both ends are created close-on-exec, so an end that is not duplicated onto
/// a child's standard stream never survives into that child's program. Ends
/// still held here when the value is dropped are closed.
#[derive(Debug, Default)]
pub struct PipeEndpoints {
    readers: Vec<Option<PipeReader>>,
    writers: Vec<Option<PipeWriter>>,
}

impl PipeEndpoints {
    /// Create `boundaries` pipes. Pipes made before a failure are closed.
    pub fn create(boundaries: usize) -> io::Result<Self> {
        let mut pipes = Self {
            readers: Vec::with_capacity(boundaries),
            writers: Vec::with_capacity(boundaries),
        };
        for _ in 0..boundaries {
            let (reader, writer) = os_pipe::pipe()?;
            pipes.readers.push(Some(reader));
            pipes.writers.push(Some(writer));
        }
        trace!(boundaries, "pipes created");
        Ok(pipes)
    }

    pub fn boundaries(&self) -> usize {
        self.readers.len()
    }

    /// Number of pipe ends the parent still holds.
    #[cfg(test)]
    fn open_ends(&self) -> usize {
        let readers = self.readers.iter().filter(|r| r.is_some()).count();
        let writers = self.writers.iter().filter(|w| w.is_some()).count();
        readers + writers
    }

    fn take_reader(&mut self, boundary: usize) -> Result<PipeReader, ExecError> {
        self.readers
            .get_mut(boundary)
            .and_then(Option::take)
            .ok_or_else(|| claimed_twice(boundary, "read"))
    }

    fn take_writer(&mut self, boundary: usize) -> Result<PipeWriter, ExecError> {
        self.writers
            .get_mut(boundary)
            .and_then(Option::take)
            .ok_or_else(|| claimed_twice(boundary, "write"))
    }

    /// Close every end the parent still holds.
    pub fn close_all(&mut self) {
        self.readers.clear();
        self.writers.clear();
    }
}

fn claimed_twice(boundary: usize, end: &str) -> ExecError {
    ExecError::Pipe(io::Error::new(
        io::ErrorKind::InvalidInput,
        format!("{end} end of pipe {boundary} is not available"),
    ))
}
