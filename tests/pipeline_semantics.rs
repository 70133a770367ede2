use std::fs;

use msh::{Command, CommandLine, Engine, ExecutionOutcome};

fn sh(script: &str) -> Command {
    Command::from_argv(["sh", "-c", script]).expect("non-empty argv")
}

fn run(line: &CommandLine) -> (Vec<ExecutionOutcome>, String) {
    let engine = Engine::default();
    let mut err = Vec::new();
    let outcomes = engine.run_foreground(line, &mut err).expect("run pipeline");
    (outcomes, String::from_utf8_lossy(&err).into_owned())
}

#[test]
fn single_command_exit_code_is_reported() {
    let (outcomes, stderr) = run(&CommandLine::single(sh("exit 7")));
    assert_eq!(outcomes, vec![ExecutionOutcome::Exited(7)]);
    assert!(stderr.contains("exited with code 7"), "stderr was: {stderr}");
}

#[test]
fn three_stage_pipeline_streams_data_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("sorted.txt");
    let line = CommandLine::new(vec![
        Command::from_argv(["printf", "b\\na\\nb\\n"]).unwrap(),
        Command::new("sort"),
        Command::new("uniq"),
    ])
    .with_output(&out);

    let (outcomes, stderr) = run(&line);
    assert_eq!(outcomes, vec![ExecutionOutcome::Exited(0); 3]);
    assert!(stderr.is_empty(), "stderr was: {stderr}");
    assert_eq!(fs::read_to_string(&out).unwrap(), "a\nb\n");
}

#[test]
fn input_redirect_feeds_first_command() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in.txt");
    let out = dir.path().join("out.txt");
    fs::write(&input, "hello\nworld\n").unwrap();

    let count = Command::from_argv(["wc", "-l"]).unwrap();
    let line = CommandLine::new(vec![Command::new("cat"), count])
        .with_input(&input)
        .with_output(&out);

    let (outcomes, _) = run(&line);
    assert_eq!(outcomes, vec![ExecutionOutcome::Exited(0); 2]);
    assert_eq!(fs::read_to_string(&out).unwrap().trim(), "2");
}

#[test]
fn output_redirect_truncates_existing_file() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out.txt");
    fs::write(&out, "a much longer previous content\n").unwrap();

    let echo = Command::from_argv(["echo", "new"]).unwrap();
    let line = CommandLine::single(echo).with_output(&out);
    run(&line);
    assert_eq!(fs::read_to_string(&out).unwrap(), "new\n");
}

#[test]
fn unopenable_output_fails_only_its_command() {
    let dir = tempfile::tempdir().unwrap();
    let sibling = dir.path().join("first.txt");
    let target = dir.path().join("missing-dir").join("out.txt");

    let script = format!("echo sibling > {}", sibling.display());
    let commands = vec![sh(&script), Command::new("cat")];
    let line = CommandLine::new(commands).with_output(&target);

    let (outcomes, stderr) = run(&line);
    assert_eq!(outcomes[0], ExecutionOutcome::Exited(0));
    assert_eq!(outcomes[1], ExecutionOutcome::Exited(1));
    assert!(stderr.contains("missing-dir"), "stderr was: {stderr}");
    assert_eq!(fs::read_to_string(&sibling).unwrap(), "sibling\n");
}

#[test]
fn missing_input_file_fails_first_command() {
    let dir = tempfile::tempdir().unwrap();
    let commands = vec![Command::new("cat"), Command::new("true")];
    let absent = dir.path().join("absent.txt");
    let line = CommandLine::new(commands).with_input(absent);

    let (outcomes, stderr) = run(&line);
    let expected = [ExecutionOutcome::Exited(1), ExecutionOutcome::Exited(0)];
    assert_eq!(outcomes, expected);
    assert!(stderr.contains("absent.txt"), "stderr was: {stderr}");
}

#[test]
fn error_redirect_captures_last_command_stderr() {
    let dir = tempfile::tempdir().unwrap();
    let errors = dir.path().join("errors.txt");
    let command = sh("echo oops 1>&2");
    let line = CommandLine::single(command).with_error(&errors);

    let (outcomes, _) = run(&line);
    assert_eq!(outcomes, vec![ExecutionOutcome::Exited(0)]);
    assert_eq!(fs::read_to_string(&errors).unwrap(), "oops\n");
}

#[test]
fn unknown_program_yields_127_and_diagnostic() {
    let (outcomes, stderr) = run(&CommandLine::single(Command::new("msh-no-such-program")));
    assert_eq!(outcomes, vec![ExecutionOutcome::Exited(127)]);
    assert!(stderr.contains("msh-no-such-program"), "stderr was: {stderr}");
}

#[test]
fn early_reader_exit_terminates_writer_by_sigpipe() {
    let head = Command::from_argv(["head", "-1"]).unwrap();
    let line = CommandLine::new(vec![Command::new("yes"), head]);
    let line = line.with_output("/dev/null");

    let (outcomes, stderr) = run(&line);
    assert_eq!(outcomes[0], ExecutionOutcome::Signaled(libc::SIGPIPE));
    assert_eq!(outcomes[1], ExecutionOutcome::Exited(0));
    assert!(stderr.contains("terminated by signal"), "stderr was: {stderr}");
}

#[test]
fn signal_termination_is_reported_with_name() {
    let (outcomes, stderr) = run(&CommandLine::single(sh("kill -TERM $$")));
    assert_eq!(outcomes, vec![ExecutionOutcome::Signaled(libc::SIGTERM)]);
    assert!(stderr.contains("SIGTERM"), "stderr was: {stderr}");
}
