//! Disposition of the interactive-control signals.
//!
//! The interpreter ignores SIGINT and SIGQUIT so a keyboard interrupt at the
//! prompt, or while waiting on a foreground pipeline, never kills it. Ignored
//! dispositions survive `exec`, so every child puts them back to the default
//! before its program image is loaded.

use std::{fmt, io};

use tracing::debug;

/// A signal number with a printable name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Signal(libc::c_int);

impl Signal {
    pub const INTERRUPT: Signal = Signal(libc::SIGINT);
    pub const QUIT: Signal = Signal(libc::SIGQUIT);

    pub fn from_raw(number: libc::c_int) -> Self {
        Signal(number)
    }

    pub fn number(self) -> libc::c_int {
        self.0
    }

    pub fn name(self) -> Option<&'static str> {
        signal_name(self.0)
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{} ({name})", self.0),
            None => write!(f, "{}", self.0),
        }
    }
}

/// Symbolic name for the common POSIX signals.
fn signal_name(number: libc::c_int) -> Option<&'static str> {
    let name = match number {
        libc::SIGHUP => "SIGHUP",
        libc::SIGINT => "SIGINT",
        libc::SIGQUIT => "SIGQUIT",
        libc::SIGILL => "SIGILL",
        libc::SIGTRAP => "SIGTRAP",
        libc::SIGABRT => "SIGABRT",
        libc::SIGBUS => "SIGBUS",
        libc::SIGFPE => "SIGFPE",
        libc::SIGKILL => "SIGKILL",
        libc::SIGUSR1 => "SIGUSR1",
        libc::SIGSEGV => "SIGSEGV",
        libc::SIGUSR2 => "SIGUSR2",
        libc::SIGPIPE => "SIGPIPE",
        libc::SIGALRM => "SIGALRM",
        libc::SIGTERM => "SIGTERM",
        libc::SIGCHLD => "SIGCHLD",
        libc::SIGCONT => "SIGCONT",
        libc::SIGSTOP => "SIGSTOP",
        libc::SIGTSTP => "SIGTSTP",
        libc::SIGTTIN => "SIGTTIN",
        libc::SIGTTOU => "SIGTTOU",
        _ => return None,
    };
    Some(name)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// The kernel default (terminate, for the interactive signals).
    Default,
    Ignore,
}

impl Disposition {
    fn handler(self) -> libc::sighandler_t {
        match self {
            Disposition::Default => libc::SIG_DFL,
            Disposition::Ignore => libc::SIG_IGN,
        }
    }
}

/// The set of signals the interpreter shields itself from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignalPolicy {
    signals: Vec<Signal>,
}

impl Default for SignalPolicy {
    fn default() -> Self {
        Self::interactive()
    }
}

impl SignalPolicy {
    /// SIGINT and SIGQUIT: the signals a terminal sends from the keyboard.
    pub fn interactive() -> Self {
        Self::new(vec![Signal::INTERRUPT, Signal::QUIT])
    }

    pub fn new(signals: Vec<Signal>) -> Self {
        Self { signals }
    }

    pub fn signals(&self) -> &[Signal] {
        &self.signals
    }

    /// Set every signal in the policy to `disposition` for this process.
    pub fn apply(&self, disposition: Disposition) -> io::Result<()> {
        set_all(&self.signals, disposition)?;
        debug!(?disposition, signals = ?self.signals, "signal disposition set");
        Ok(())
    }

    /// Put every signal back to its default. Runs in a freshly forked child,
    /// so it must stay async-signal-safe: no allocation, no locks, no logging.
    pub fn restore_in_child(&self) -> io::Result<()> {
        set_all(&self.signals, Disposition::Default)
    }
}

fn set_all(signals: &[Signal], disposition: Disposition) -> io::Result<()> {
    for signal in signals {
        // SAFETY: the handler is SIG_DFL or SIG_IGN, never a Rust function.
        let previous = unsafe { libc::signal(signal.number(), disposition.handler()) };
        if previous == libc::SIG_ERR {
            return Err(io::Error::last_os_error());
        }
    }
    Ok(())
}
