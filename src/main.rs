use std::io::{self, BufRead, Write};
use std::process::ExitCode;

use crossterm::tty::IsTty;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use msh::builtins::{self, BuiltinAction};
use msh::{Config, Disposition, Engine, ExecutionOutcome, parser};

/// Status recorded for a line that could not be parsed.
const EXIT_SYNTAX: i32 = 2;

fn init_logging() {
    let filter = EnvFilter::try_from_env("MSH_LOG")
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}

/// Status of a whole pipeline: that of its last command.
fn pipeline_status(outcomes: &[ExecutionOutcome]) -> i32 {
    outcomes.last().map_or(0, |outcome| outcome.exit_code())
}

fn main() -> ExitCode {
    init_logging();

    let mut engine = Engine::new(Config::from_env());
    let interactive = io::stdin().is_tty();

    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut stdout = io::stdout();
    let mut stderr = io::stderr();
    let mut raw = Vec::new();
    let mut last_status = 0;

    loop {
        if let Err(e) = engine.signal_policy().apply(Disposition::Ignore) {
            warn!(error = %e, "could not ignore interactive signals");
        }

        if interactive {
            let _ = write!(stdout, "{}", engine.config().prompt);
            if stdout.flush().is_err() {
                break;
            }
        }

        raw.clear();
        match input.read_until(b'\n', &mut raw) {
            Ok(0) => {
                if interactive {
                    let _ = writeln!(stdout);
                }
                break;
            }
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                let _ = writeln!(stderr, "msh: error reading input: {e}");
                return ExitCode::FAILURE;
            }
        }
        // Bytes that are not UTF-8 become U+FFFD rather than ending the session.
        let line = String::from_utf8_lossy(&raw);

        let parsed = match parser::parse(&line) {
            Ok(Some(parsed)) => parsed,
            Ok(None) => continue,
            Err(e) => {
                let _ = writeln!(stderr, "msh: {e}");
                last_status = EXIT_SYNTAX;
                continue;
            }
        };
        debug!(line = %parsed, previous_status = last_status, "parsed command line");

        if let Some((program, args)) = builtins::as_builtin(&parsed) {
            match builtins::execute(program, args, &mut stdout, &mut stderr, &mut engine) {
                BuiltinAction::Continue(code) => last_status = code,
                BuiltinAction::Exit(code) => return ExitCode::from(code as u8),
            }
        } else {
            last_status = match engine.execute(&parsed, &mut stdout, &mut stderr) {
                Ok(outcomes) => pipeline_status(&outcomes),
                Err(e) => {
                    let _ = writeln!(stderr, "msh: {e}");
                    e.child_outcome().map_or(1, |outcome| outcome.exit_code())
                }
            };
        }
        debug!(status = last_status, "command line finished");
    }

    ExitCode::SUCCESS
}
