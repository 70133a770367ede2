use crate::ast::{Command, CommandLine};
use crate::error::ParseError;

/// A piece of a word, tagged with whether it was quoted.
#[derive(Debug, Clone, PartialEq)]
enum Segment {
    /// Unquoted text: eligible for glob expansion.
    Plain(String),
    /// Quoted or backslash-escaped text: always literal.
    Literal(String),
}

type Word = Vec<Segment>;

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Word(Word),
    Pipe,
    Input,
    Output,
    ErrorOutput,
    Background,
}

impl Token {
    fn symbol(&self) -> &'static str {
        match self {
            Token::Word(_) => "word",
            Token::Pipe => "|",
            Token::Input => "<",
            Token::Output => ">",
            Token::ErrorOutput => "2>",
            Token::Background => "&",
        }
    }
}

/// States for the tokenizer state machine.
enum State {
    /// Between tokens: whitespace is skipped
    Between,
    /// Building an unquoted word: whitespace or an operator ends it
    InWord,
    /// Inside double quotes: `\` escapes `"`, `\`, `$` and `` ` ``
    InDoubleQuote,
    /// Inside single quotes: everything is literal
    InSingleQuote,
}

#[derive(Default)]
struct Lexer {
    tokens: Vec<Token>,
    word: Word,
    plain: String,
}

impl Lexer {
    fn flush_plain(&mut self) {
        if !self.plain.is_empty() {
            self.word
                .push(Segment::Plain(std::mem::take(&mut self.plain)));
        }
    }

    fn push_literal(&mut self, text: String) {
        self.flush_plain();
        self.word.push(Segment::Literal(text));
    }

    fn finish_word(&mut self) {
        self.flush_plain();
        if !self.word.is_empty() {
            self.tokens
                .push(Token::Word(std::mem::take(&mut self.word)));
        }
    }

    fn operator(&mut self, token: Token) {
        self.finish_word();
        self.tokens.push(token);
    }
}

fn operator_for(ch: char) -> Option<Token> {
    match ch {
        '|' => Some(Token::Pipe),
        '<' => Some(Token::Input),
        '>' => Some(Token::Output),
        '&' => Some(Token::Background),
        _ => None,
    }
}

/// Split a line into words and operators, preserving quote context.
fn tokenize(input: &str) -> Vec<Token> {
    let mut lexer = Lexer::default();
    let mut state = State::Between;
    let mut quoted = String::new();
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        match (&state, ch) {
            (State::Between, ' ' | '\t' | '\n' | '\r') => {}
            (State::Between, '2') if chars.peek() == Some(&'>') => {
                chars.next();
                lexer.operator(Token::ErrorOutput);
            }
            (State::Between | State::InWord, c) if operator_for(c).is_some() => {
                if let Some(token) = operator_for(c) {
                    lexer.operator(token);
                }
                state = State::Between;
            }
            (State::InWord, ' ' | '\t' | '\n' | '\r') => {
                lexer.finish_word();
                state = State::Between;
            }
            (State::Between | State::InWord, '"') => state = State::InDoubleQuote,
            (State::Between | State::InWord, '\'') => state = State::InSingleQuote,
            (State::Between | State::InWord, '\\') => {
                let escaped = chars.next().unwrap_or('\\');
                lexer.push_literal(escaped.to_string());
                state = State::InWord;
            }
            (State::Between | State::InWord, c) => {
                lexer.plain.push(c);
                state = State::InWord;
            }

            (State::InDoubleQuote, '"') => {
                // "" is a valid empty argument, so push even when empty.
                lexer.push_literal(std::mem::take(&mut quoted));
                state = State::InWord;
            }
            (State::InDoubleQuote, '\\') => match chars.peek() {
                Some(&next) if matches!(next, '"' | '\\' | '$' | '`') => {
                    chars.next();
                    quoted.push(next);
                }
                _ => quoted.push('\\'),
            },
            (State::InSingleQuote, '\'') => {
                lexer.push_literal(std::mem::take(&mut quoted));
                state = State::InWord;
            }
            (State::InDoubleQuote | State::InSingleQuote, c) => quoted.push(c),
        }
    }

    // An unterminated quote keeps what was read so far, literally.
    if matches!(state, State::InDoubleQuote | State::InSingleQuote) && !quoted.is_empty() {
        lexer.push_literal(quoted);
    }
    lexer.finish_word();
    lexer.tokens
}

/// Parse one input line into a [`CommandLine`].
///
/// Blank lines yield `Ok(None)`. `<` may only follow the first command of a
/// pipeline, `>` and `2>` only the last, and `&` must end the line.
pub fn parse(input: &str) -> Result<Option<CommandLine>, ParseError> {
    let tokens = tokenize(input);
    if tokens.is_empty() {
        return Ok(None);
    }

    let mut segments: Vec<Vec<String>> = vec![Vec::new()];
    let mut line = CommandLine::default();
    let mut tail_redirects: Vec<(usize, &'static str)> = Vec::new();
    let mut tokens = tokens.into_iter();

    while let Some(token) = tokens.next() {
        if line.background {
            return Err(ParseError::UnexpectedToken(token.symbol()));
        }
        let current = segments.len() - 1;
        match token {
            Token::Word(word) => segments[current].extend(expand_word(&word)),
            Token::Pipe => {
                if segments[current].is_empty() {
                    return Err(ParseError::UnexpectedToken("|"));
                }
                segments.push(Vec::new());
            }
            Token::Input => {
                if current != 0 {
                    return Err(ParseError::MisplacedRedirect("<", "first"));
                }
                line.input = Some(redirect_target(tokens.next(), "<")?.into());
            }
            Token::Output => {
                line.output = Some(redirect_target(tokens.next(), ">")?.into());
                tail_redirects.push((current, ">"));
            }
            Token::ErrorOutput => {
                line.error = Some(redirect_target(tokens.next(), "2>")?.into());
                tail_redirects.push((current, "2>"));
            }
            Token::Background => {
                if segments[current].is_empty() {
                    return Err(ParseError::UnexpectedToken("&"));
                }
                line.background = true;
            }
        }
    }

    let last = segments.len() - 1;
    if segments[last].is_empty() {
        let near = if last == 0 { "newline" } else { "|" };
        return Err(ParseError::UnexpectedToken(near));
    }
    if let Some((_, op)) = tail_redirects.iter().find(|(segment, _)| *segment != last) {
        return Err(ParseError::MisplacedRedirect(*op, "last"));
    }

    line.commands = segments
        .into_iter()
        .filter_map(Command::from_argv)
        .collect();
    Ok(Some(line))
}

fn redirect_target(token: Option<Token>, op: &'static str) -> Result<String, ParseError> {
    match token {
        Some(Token::Word(word)) => Ok(join_segments(&word)),
        _ => Err(ParseError::MissingTarget(op)),
    }
}

fn join_segments(word: &[Segment]) -> String {
    word.iter()
        .map(|segment| match segment {
            Segment::Plain(s) | Segment::Literal(s) => s.as_str(),
        })
        .collect()
}

// ── Glob Expansion ──

fn contains_glob_chars(s: &str) -> bool {
    s.contains('*') || s.contains('?') || s.contains('[')
}

/// Expand a word into one or more arguments. Only unquoted glob characters
/// trigger expansion; quoted ones are escaped so they match literally.
fn expand_word(word: &[Segment]) -> Vec<String> {
    let globbable = word
        .iter()
        .any(|segment| matches!(segment, Segment::Plain(s) if contains_glob_chars(s)));
    let text = join_segments(word);
    if !globbable {
        return vec![text];
    }

    let pattern: String = word
        .iter()
        .map(|segment| match segment {
            Segment::Plain(s) => s.clone(),
            Segment::Literal(s) => glob::Pattern::escape(s),
        })
        .collect();

    match glob::glob(&pattern) {
        Ok(paths) => {
            let mut matches: Vec<String> = paths
                .filter_map(|entry| entry.ok())
                .map(|path| path.to_string_lossy().into_owned())
                .collect();

            if matches.is_empty() {
                // No matches: the word stays literal.
                vec![text]
            } else {
                matches.sort();
                matches
            }
        }
        Err(_) => vec![text],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn argv(line: &CommandLine, index: usize) -> Vec<&str> {
        line.commands[index]
            .argv()
            .iter()
            .map(String::as_str)
            .collect()
    }

    #[test]
    fn simple_command() {
        let line = parse("echo hello world").unwrap().unwrap();
        assert_eq!(line.len(), 1);
        assert_eq!(argv(&line, 0), vec!["echo", "hello", "world"]);
        assert!(!line.background);
    }

    #[test]
    fn blank_line_is_nothing_to_run() {
        assert_eq!(parse("").unwrap(), None);
        assert_eq!(parse("   \t\n").unwrap(), None);
    }

    #[test]
    fn quotes_preserve_spaces_and_operators() {
        let line = parse(r#"echo "a  |  b" 'c > d' e\ f"#).unwrap().unwrap();
        assert_eq!(line.len(), 1);
        assert_eq!(argv(&line, 0), vec!["echo", "a  |  b", "c > d", "e f"]);
        assert!(line.output.is_none());
    }

    #[test]
    fn empty_quoted_arguments_survive() {
        let line = parse(r#"cmd "" ''"#).unwrap().unwrap();
        assert_eq!(argv(&line, 0), vec!["cmd", "", ""]);
    }

    #[test]
    fn backslash_in_double_quotes() {
        let line = parse(r#"echo "a\"b" "c\\d" "e\nf""#).unwrap().unwrap();
        assert_eq!(argv(&line, 0), vec!["echo", r#"a"b"#, r"c\d", r"e\nf"]);
    }

    #[test]
    fn pipeline_with_redirections() {
        let line = parse("sort < in.txt | uniq -c | head -n 3 > out.txt 2> err.txt")
            .unwrap()
            .unwrap();
        assert_eq!(line.len(), 3);
        assert_eq!(argv(&line, 0), vec!["sort"]);
        assert_eq!(argv(&line, 1), vec!["uniq", "-c"]);
        assert_eq!(argv(&line, 2), vec!["head", "-n", "3"]);
        assert_eq!(line.input, Some(PathBuf::from("in.txt")));
        assert_eq!(line.output, Some(PathBuf::from("out.txt")));
        assert_eq!(line.error, Some(PathBuf::from("err.txt")));
    }

    #[test]
    fn operators_need_no_surrounding_spaces() {
        let line = parse("ls|wc -l>count.txt&").unwrap().unwrap();
        assert_eq!(argv(&line, 0), vec!["ls"]);
        assert_eq!(argv(&line, 1), vec!["wc", "-l"]);
        assert_eq!(line.output, Some(PathBuf::from("count.txt")));
        assert!(line.background);
    }

    #[test]
    fn two_inside_a_word_is_not_a_redirect() {
        let line = parse("echo a2>b.txt").unwrap().unwrap();
        assert_eq!(argv(&line, 0), vec!["echo", "a2"]);
        assert_eq!(line.output, Some(PathBuf::from("b.txt")));
        assert!(line.error.is_none());
    }

    #[test]
    fn trailing_ampersand_marks_background() {
        let line = parse("sleep 10 &").unwrap().unwrap();
        assert!(line.background);
        assert_eq!(argv(&line, 0), vec!["sleep", "10"]);
    }

    #[test]
    fn ampersand_must_end_the_line() {
        assert_eq!(
            parse("sleep 1 & echo hi"),
            Err(ParseError::UnexpectedToken("word"))
        );
        assert_eq!(parse("&"), Err(ParseError::UnexpectedToken("&")));
    }

    #[test]
    fn empty_pipeline_segments_are_errors() {
        assert_eq!(parse("| wc"), Err(ParseError::UnexpectedToken("|")));
        assert_eq!(parse("ls |"), Err(ParseError::UnexpectedToken("|")));
        assert_eq!(parse("ls | | wc"), Err(ParseError::UnexpectedToken("|")));
        assert_eq!(
            parse("> out.txt"),
            Err(ParseError::UnexpectedToken("newline"))
        );
    }

    #[test]
    fn redirect_needs_a_target() {
        assert_eq!(parse("echo >"), Err(ParseError::MissingTarget(">")));
        assert_eq!(parse("cat < | wc"), Err(ParseError::MissingTarget("<")));
    }

    #[test]
    fn redirects_are_bound_to_pipeline_ends() {
        assert_eq!(
            parse("ls | sort < in.txt"),
            Err(ParseError::MisplacedRedirect("<", "first"))
        );
        assert_eq!(
            parse("ls > out.txt | sort"),
            Err(ParseError::MisplacedRedirect(">", "last"))
        );
        assert_eq!(
            parse("ls 2> err.txt | sort > out.txt"),
            Err(ParseError::MisplacedRedirect("2>", "last"))
        );
    }

    #[test]
    fn glob_expands_unquoted_patterns_only() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.log", "a.log", "c.txt"] {
            std::fs::write(dir.path().join(name), "").unwrap();
        }
        let base = dir.path().display();

        let line = parse(&format!("ls {base}/*.log")).unwrap().unwrap();
        assert_eq!(
            argv(&line, 0)[1..],
            [format!("{base}/a.log"), format!("{base}/b.log")]
        );

        let quoted = parse(&format!("ls '{base}/*.log'")).unwrap().unwrap();
        assert_eq!(argv(&quoted, 0)[1], format!("{base}/*.log"));
    }

    #[test]
    fn glob_without_matches_stays_literal() {
        let line = parse("ls *.definitely_not_a_real_extension_xyz")
            .unwrap()
            .unwrap();
        assert_eq!(argv(&line, 0)[1], "*.definitely_not_a_real_extension_xyz");
    }

    #[test]
    fn unterminated_quote_keeps_text() {
        let line = parse("echo 'abc").unwrap().unwrap();
        assert_eq!(argv(&line, 0), vec!["echo", "abc"]);
    }
}
