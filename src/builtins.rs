use std::io::Write;

use crate::ast::CommandLine;
use crate::engine::Engine;

/// The list of all builtin command names.
const BUILTINS: &[&str] = &["cd", "exit", "jobs", "fg"];

#[derive(Debug, PartialEq, Eq)]
pub enum BuiltinAction {
    Continue(i32),
    Exit(i32),
}

/// Returns true if the command name is a shell builtin.
pub fn is_builtin(name: &str) -> bool {
    BUILTINS.contains(&name)
}

/// The builtin `line` invokes, if any. Builtins only run on their own: a
/// builtin name inside a pipeline, with a redirection, or in the background
/// is launched as an external program like any other command.
pub fn as_builtin(line: &CommandLine) -> Option<(&str, &[String])> {
    if line.len() != 1
        || line.background
        || line.input.is_some()
        || line.output.is_some()
        || line.error.is_some()
    {
        return None;
    }
    let command = &line.commands[0];
    if !is_builtin(command.program()) {
        return None;
    }
    Some((command.program(), &command.argv()[1..]))
}

/// Execute a builtin command, writing output to the provided streams.
pub fn execute(
    program: &str,
    args: &[String],
    stdout: &mut dyn Write,
    stderr: &mut dyn Write,
    engine: &mut Engine,
) -> BuiltinAction {
    match program {
        "cd" => BuiltinAction::Continue(builtin_cd(args, stderr)),
        "exit" => builtin_exit(args, stderr),
        "jobs" => BuiltinAction::Continue(builtin_jobs(engine, stdout, stderr)),
        "fg" => BuiltinAction::Continue(builtin_fg(args, engine, stdout, stderr)),
        _ => {
            let _ = writeln!(stderr, "msh: unknown builtin: {program}");
            BuiltinAction::Continue(1)
        }
    }
}

fn builtin_cd(args: &[String], stderr: &mut dyn Write) -> i32 {
    let target = match args.first() {
        Some(dir) => dir.clone(),
        None => match std::env::var("HOME") {
            Ok(home) => home,
            Err(_) => {
                let _ = writeln!(stderr, "cd: HOME not set");
                return 1;
            }
        },
    };

    if let Err(e) = std::env::set_current_dir(&target) {
        let _ = writeln!(stderr, "cd: {target}: {e}");
        return 1;
    }

    0
}

fn builtin_exit(args: &[String], stderr: &mut dyn Write) -> BuiltinAction {
    match args.first() {
        None => BuiltinAction::Exit(0),
        Some(s) => match s.parse::<i32>() {
            Ok(code) => BuiltinAction::Exit(code),
            Err(_) => {
                let _ = writeln!(stderr, "exit: {s}: numeric argument required");
                BuiltinAction::Exit(2)
            }
        },
    }
}

fn builtin_jobs(engine: &mut Engine, stdout: &mut dyn Write, stderr: &mut dyn Write) -> i32 {
    engine.list_jobs(stdout, stderr);
    0
}

/// Wait for a background job in the foreground.
fn builtin_fg(
    args: &[String],
    engine: &mut Engine,
    stdout: &mut dyn Write,
    stderr: &mut dyn Write,
) -> i32 {
    let pid = match args.first() {
        None => None,
        Some(s) => match s.parse::<u32>() {
            Ok(pid) => Some(pid),
            Err(_) => {
                let _ = writeln!(stderr, "fg: {s}: invalid process id");
                return 1;
            }
        },
    };

    match engine.bring_to_foreground(pid, stdout, stderr) {
        Ok(outcome) => outcome.exit_code(),
        Err(e) => {
            let _ = writeln!(stderr, "fg: {e}");
            1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Command;
    use crate::parser::parse;

    #[test]
    fn builtins_only_run_alone() {
        let alone = parse("fg 123").unwrap().unwrap();
        assert_eq!(as_builtin(&alone), Some(("fg", &["123".to_string()][..])));

        for line in ["jobs | cat", "cd /tmp > out.txt", "exit &"] {
            let parsed = parse(line).unwrap().unwrap();
            assert_eq!(as_builtin(&parsed), None, "{line}");
        }

        let external = CommandLine::single(Command::new("ls"));
        assert_eq!(as_builtin(&external), None);
    }

    #[test]
    fn exit_parses_status() {
        let mut err = Vec::new();
        let mut exit = |args: &[&str]| {
            let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
            builtin_exit(&args, &mut err)
        };
        assert_eq!(exit(&[]), BuiltinAction::Exit(0));
        assert_eq!(exit(&["3"]), BuiltinAction::Exit(3));
        assert_eq!(exit(&["x"]), BuiltinAction::Exit(2));

        let message = String::from_utf8(err).unwrap();
        assert!(message.contains("numeric argument required"));
    }

    #[test]
    fn fg_rejects_non_numeric_pid() {
        let mut engine = Engine::default();
        let (mut out, mut err) = (Vec::new(), Vec::new());
        let code = builtin_fg(&["%1".into()], &mut engine, &mut out, &mut err);
        assert_eq!(code, 1);
        let message = String::from_utf8(err).unwrap();
        assert!(message.contains("invalid process id"));
    }

    #[test]
    fn fg_without_jobs_reports_no_current_job() {
        let mut engine = Engine::default();
        let (mut out, mut err) = (Vec::new(), Vec::new());
        let action = execute("fg", &[], &mut out, &mut err, &mut engine);
        assert_eq!(action, BuiltinAction::Continue(1));
        let message = String::from_utf8(err).unwrap();
        assert!(message.contains("fg: no current job"));
    }

    #[test]
    fn cd_to_missing_directory_fails() {
        let mut err = Vec::new();
        let code = builtin_cd(&["/definitely/not/a/dir".into()], &mut err);
        assert_eq!(code, 1);
        let message = String::from_utf8(err).unwrap();
        assert!(message.starts_with("cd: /definitely/not/a/dir"));
    }
}
