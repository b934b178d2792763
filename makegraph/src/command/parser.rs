// SPDX-License-Identifier: GPL-3.0-or-later

//! Splits the textual build trace into individual command lines.
//!
//! The trace is the output of a build tool running in "print the commands,
//! don't execute them" mode. Each command is separated by a newline or a
//! conjunction (`&&`, and the bare `&` under the POSIX grammar).
//!
//! The words of a command are tokenized with one of two escaping grammars:
//!
//! - POSIX: a backslash escapes the next character (no pairing rule), single
//!   and double quotes group words, backslash-newline continues the line.
//! - Windows: backslashes are literal, unless a run of them precedes a double
//!   quote. Then each pair of backslashes collapses to one, and an odd
//!   trailing backslash escapes the quote. The `'` and the bare `&` are
//!   regular characters.
//!
//! Both grammars keep the escaped form of each argument next to the
//! unescaped one. Redirections (`2>&1`, `> log`) are not arguments of the
//! executed program, those are dropped.
//!
//! The `Entering directory` and `Leaving directory` messages of make are
//! followed, so each command knows the directory it was executed in.

use crate::command::CommandLine;
use crate::conventions::{Grammar, PathConventions};
use regex_lite::Regex;
use std::borrow::Cow;
use std::sync::LazyLock;
use thiserror::Error;

/// Represents the errors of the trace parsing.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("Quotation started at line {line} is never closed")]
    UnterminatedQuote { line: usize },
    #[error("Conjunction at line {line} is not followed by a command")]
    DanglingConjunction { line: usize },
}

/// A command of the trace, with the directory the build tool was in when it
/// printed the command.
///
/// The directory is known only when the build tool reports its directory
/// changes (`make[1]: Entering directory '/project/jni'`).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TracedCommand {
    pub command: CommandLine,
    pub directory: Option<String>,
}

/// Parse the trace into a sequence of commands.
///
/// The escaping grammar is taken from the conventions of the platform where
/// the trace was produced. Diagnostic messages of the build tool itself
/// (like `make[1]: Entering directory ...`) are not commands and skipped.
pub fn parse(text: &str, conventions: &dyn PathConventions) -> Result<Vec<CommandLine>, ParseError> {
    let commands = parse_traced(text, conventions)?;
    Ok(commands.into_iter().map(|traced| traced.command).collect())
}

/// Parse the trace into a sequence of commands, with their directories.
pub fn parse_traced(text: &str, conventions: &dyn PathConventions) -> Result<Vec<TracedCommand>, ParseError> {
    let trace = Trace::scan(text, conventions);
    let mut tokenizer = Tokenizer::new(&trace.text, conventions.grammar());

    let mut commands = Vec::new();
    let mut words: Vec<(String, String)> = Vec::new();
    // The line where the current command starts.
    let mut start = 0;
    // The line of the last conjunction, while no command followed it yet.
    let mut dangling: Option<usize> = None;

    while let Some(token) = tokenizer.next_token()? {
        match token {
            Token::Word { raw, escaped, line } => {
                dangling = None;
                if words.is_empty() {
                    start = line;
                }
                words.push((raw, escaped));
            }
            Token::Newline => {
                commands.extend(take_command(&mut words, trace.directory_at(start)));
            }
            Token::Conjunction => {
                if let Some(line) = dangling {
                    return Err(ParseError::DanglingConjunction { line });
                }
                commands.extend(take_command(&mut words, trace.directory_at(start)));
                dangling = Some(tokenizer.line);
            }
        }
    }
    if let Some(line) = dangling {
        return Err(ParseError::DanglingConjunction { line });
    }
    commands.extend(take_command(&mut words, trace.directory_at(start)));

    log::debug!("Parsed {} commands from the trace", commands.len());
    Ok(commands)
}

fn take_command(words: &mut Vec<(String, String)>, directory: Option<&String>) -> Option<TracedCommand> {
    let mut words = without_redirections(std::mem::take(words)).into_iter();
    let (executable, _) = words.next()?;
    let (raw_args, escaped_args) = words.unzip();
    Some(TracedCommand {
        command: CommandLine::new(executable, raw_args, escaped_args),
        directory: directory.cloned(),
    })
}

static BUILD_TOOL_MESSAGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*\S*make(?:\.exe)?(?:\[\d+\])?: ").expect("Invalid build tool message pattern")
});

/// A redirection, with the target glued (`2>&1`, `>log`) or not (`> log`).
static REDIRECTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:\d*(?:>>?|<)&?|&>>?)(.*)$").expect("Invalid redirection pattern"));

/// Removes the redirections of a command, those are not arguments of the
/// executed program. Quoted words are never redirections.
fn without_redirections(words: Vec<(String, String)>) -> Vec<(String, String)> {
    let mut result = Vec::with_capacity(words.len());
    let mut target_follows = false;
    for (raw, escaped) in words {
        if target_follows {
            target_follows = false;
            continue;
        }
        match REDIRECTION.captures(&escaped) {
            Some(captures) => target_follows = captures[1].is_empty(),
            None => result.push((raw, escaped)),
        }
    }
    result
}

static DIRECTORY_CHANGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\s*\S*make(?:\.exe)?(?:\[\d+\])?: (Entering|Leaving) directory [`'"](.*)['"]\s*$"#)
        .expect("Invalid directory change pattern")
});

/// The trace with the build tool messages blanked out.
///
/// The message lines are kept (as empty lines) to keep the line numbers of
/// the error messages right. The directory changes reported by the build
/// tool are followed, so each line knows the directory it was printed in.
struct Trace<'a> {
    text: Cow<'a, str>,
    /// The current directory of the build tool, by line (starting from zero).
    directories: Vec<Option<String>>,
}

impl<'a> Trace<'a> {
    fn scan(text: &'a str, conventions: &dyn PathConventions) -> Self {
        if !text.lines().any(|line| BUILD_TOOL_MESSAGE.is_match(line)) {
            return Self { text: Cow::Borrowed(text), directories: vec![] };
        }

        let mut stack: Vec<String> = Vec::new();
        let mut directories = Vec::new();
        let mut lines = Vec::new();
        for line in text.split('\n') {
            if let Some(captures) = DIRECTORY_CHANGE.captures(line) {
                let directory = match stack.last() {
                    Some(current) if !conventions.is_absolute(&captures[2]) => {
                        conventions.join_paths(current, &captures[2]).as_str().to_string()
                    }
                    _ => captures[2].to_string(),
                };
                if &captures[1] == "Entering" {
                    stack.push(directory);
                } else if let Some(position) = stack.iter().rposition(|entered| *entered == directory) {
                    stack.truncate(position);
                } else {
                    stack.pop();
                }
            }
            if BUILD_TOOL_MESSAGE.is_match(line) {
                lines.push("");
            } else {
                lines.push(line);
            }
            directories.push(stack.last().cloned());
        }
        Self { text: Cow::Owned(lines.join("\n")), directories }
    }

    /// The directory of the build tool at the given line (starting from one).
    fn directory_at(&self, line: usize) -> Option<&String> {
        line.checked_sub(1)
            .and_then(|index| self.directories.get(index))
            .and_then(Option::as_ref)
    }
}

#[derive(Debug, PartialEq)]
enum Token {
    Word { raw: String, escaped: String, line: usize },
    Newline,
    Conjunction,
}

#[derive(Copy, Clone, Debug, PartialEq)]
enum Quote {
    None,
    Double,
    Single,
}

struct Tokenizer {
    chars: Vec<char>,
    position: usize,
    line: usize,
    grammar: Grammar,
}

impl Tokenizer {
    fn new(text: &str, grammar: Grammar) -> Self {
        Self { chars: text.chars().collect(), position: 0, line: 1, grammar }
    }

    fn peek(&self, offset: usize) -> Option<char> {
        self.chars.get(self.position + offset).copied()
    }

    fn advance(&mut self, count: usize) {
        for _ in 0..count {
            if self.peek(0) == Some('\n') {
                self.line += 1;
            }
            self.position += 1;
        }
    }

    fn is_line_continuation(&self) -> bool {
        self.grammar == Grammar::Posix && self.peek(0) == Some('\\') && self.peek(1) == Some('\n')
    }

    /// The number of characters of the conjunction at the current position.
    ///
    /// The `&` of a redirection (`2>&1`, `&>log`) is not a conjunction.
    fn conjunction_width(&self) -> Option<usize> {
        match (self.peek(0), self.peek(1)) {
            (Some('&'), Some('&')) => Some(2),
            (Some('&'), Some('>')) => None,
            (Some('&'), _) if self.grammar == Grammar::Posix && !self.follows_redirection() => Some(1),
            _ => None,
        }
    }

    fn follows_redirection(&self) -> bool {
        self.position
            .checked_sub(1)
            .and_then(|previous| self.chars.get(previous))
            .is_some_and(|c| matches!(c, '>' | '<'))
    }

    fn next_token(&mut self) -> Result<Option<Token>, ParseError> {
        loop {
            match self.peek(0) {
                Some(' ' | '\t' | '\r') => self.advance(1),
                Some('\\') if self.is_line_continuation() => self.advance(2),
                _ => break,
            }
        }
        match self.peek(0) {
            None => Ok(None),
            Some('\n') => {
                self.advance(1);
                Ok(Some(Token::Newline))
            }
            Some(_) => {
                if let Some(width) = self.conjunction_width() {
                    self.advance(width);
                    Ok(Some(Token::Conjunction))
                } else {
                    self.word().map(Some)
                }
            }
        }
    }

    fn word(&mut self) -> Result<Token, ParseError> {
        let start_line = self.line;
        let mut raw = String::new();
        let mut escaped = String::new();
        let mut quote = Quote::None;

        while let Some(c) = self.peek(0) {
            match (quote, c) {
                (Quote::None, ' ' | '\t' | '\r' | '\n') => break,
                (Quote::None, '&') if self.conjunction_width().is_some() => break,
                (Quote::Single, '\'') => {
                    quote = Quote::None;
                    escaped.push(c);
                    self.advance(1);
                }
                (Quote::Single, _) => {
                    raw.push(c);
                    escaped.push(c);
                    self.advance(1);
                }
                (_, '\\') => match self.grammar {
                    Grammar::Posix => self.posix_backslash(&mut raw, &mut escaped),
                    Grammar::Windows => self.windows_backslashes(&mut raw, &mut escaped, &mut quote),
                },
                (Quote::None, '"') => {
                    quote = Quote::Double;
                    escaped.push(c);
                    self.advance(1);
                }
                (Quote::Double, '"') => {
                    quote = Quote::None;
                    escaped.push(c);
                    self.advance(1);
                }
                (Quote::None, '\'') if self.grammar == Grammar::Posix => {
                    quote = Quote::Single;
                    escaped.push(c);
                    self.advance(1);
                }
                _ => {
                    raw.push(c);
                    escaped.push(c);
                    self.advance(1);
                }
            }
        }

        if quote != Quote::None {
            return Err(ParseError::UnterminatedQuote { line: start_line });
        }
        Ok(Token::Word { raw, escaped, line: start_line })
    }

    /// The backslash escapes the next character, whatever it is.
    fn posix_backslash(&mut self, raw: &mut String, escaped: &mut String) {
        match self.peek(1) {
            // line continuation, drop both characters
            Some('\n') => self.advance(2),
            Some(next) => {
                raw.push(next);
                escaped.push('\\');
                escaped.push(next);
                self.advance(2);
            }
            None => {
                raw.push('\\');
                escaped.push('\\');
                self.advance(1);
            }
        }
    }

    /// Applies the "N backslashes and a quote" rule of the Windows runtime.
    fn windows_backslashes(&mut self, raw: &mut String, escaped: &mut String, quote: &mut Quote) {
        let count = self.chars[self.position..].iter().take_while(|c| **c == '\\').count();
        let escaped_run = "\\".repeat(count);

        if self.peek(count) == Some('"') {
            raw.push_str(&"\\".repeat(count / 2));
            escaped.push_str(&escaped_run);
            escaped.push('"');
            if count % 2 == 1 {
                raw.push('"');
            } else {
                *quote = match *quote {
                    Quote::None => Quote::Double,
                    _ => Quote::None,
                };
            }
            self.advance(count + 1);
        } else {
            raw.push_str(&escaped_run);
            escaped.push_str(&escaped_run);
            self.advance(count);
        }
    }
}
