use std::fmt;
use std::path::PathBuf;

/// A single program invocation: the program to load and its full argument
/// vector. `argv[0]` is what the program sees as its own name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    program: String,
    argv: Vec<String>,
}

impl Command {
    /// A command with no arguments beyond its own name.
    pub fn new(program: impl Into<String>) -> Self {
        let program = program.into();
        Self {
            argv: vec![program.clone()],
            program,
        }
    }

    /// Build a command from a complete argument vector. Returns `None` when
    /// `argv` is empty, since there is then no program to run.
    pub fn from_argv<I, S>(argv: I) -> Option<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let argv: Vec<String> = argv.into_iter().map(Into::into).collect();
        let program = argv.first()?.clone();
        Some(Self { program, argv })
    }

    /// Append one argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.argv.push(arg.into());
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// The argument vector passed verbatim to the program, `argv[0]` included.
    pub fn argv(&self) -> &[String] {
        &self.argv
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, arg) in self.argv.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            if arg.is_empty() || arg.contains(char::is_whitespace) {
                write!(f, "'{arg}'")?;
            } else {
                f.write_str(arg)?;
            }
        }
        Ok(())
    }
}

/// One parsed input line: a pipeline plus its redirections and whether it
/// should run in the background.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandLine {
    /// Pipeline members in order; the `n`-th writes into the `(n+1)`-th.
    pub commands: Vec<Command>,
    /// `< path`: standard input of the first command.
    pub input: Option<PathBuf>,
    /// `> path`: standard output of the last command.
    pub output: Option<PathBuf>,
    /// `2> path`: standard error of the last command.
    pub error: Option<PathBuf>,
    /// Trailing `&`.
    pub background: bool,
}

impl CommandLine {
    pub fn new(commands: Vec<Command>) -> Self {
        Self {
            commands,
            ..Self::default()
        }
    }

    pub fn single(command: Command) -> Self {
        Self::new(vec![command])
    }

    pub fn with_input(mut self, path: impl Into<PathBuf>) -> Self {
        self.input = Some(path.into());
        self
    }

    pub fn with_output(mut self, path: impl Into<PathBuf>) -> Self {
        self.output = Some(path.into());
        self
    }

    pub fn with_error(mut self, path: impl Into<PathBuf>) -> Self {
        self.error = Some(path.into());
        self
    }

    pub fn in_background(mut self) -> Self {
        self.background = true;
        self
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, command) in self.commands.iter().enumerate() {
            if i > 0 {
                f.write_str(" | ")?;
            }
            write!(f, "{command}")?;
        }
        if let Some(path) = &self.input {
            write!(f, " < {}", path.display())?;
        }
        if let Some(path) = &self.output {
            write!(f, " > {}", path.display())?;
        }
        if let Some(path) = &self.error {
            write!(f, " 2> {}", path.display())?;
        }
        if self.background {
            f.write_str(" &")?;
        }
        Ok(())
    }
}
