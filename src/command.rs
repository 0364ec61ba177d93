//! User commands for the terminal client.
//!
//! This module defines the [`Command`] enum, which represents one line of user
//! input: either a control command for the client itself (`.exit`, `.toggle`,
//! `.refresh`, `.cancel`) or a [`Statement`] to send to the server against the
//! currently selected table.
//!
//! # Syntax
//!
//! - `select` or `select <column> <value>`
//! - `insert <value> [<value> ...]`
//! - `delete <column> <value>`
//!
//! Values that parse as integers are sent as JSON numbers, everything else as
//! strings. Double quotes group words into a single string value and keep it a
//! string even if it looks numeric.
//!
//! # Example
//! ```rust
//! use tabview::{Command, Statement};
//!
//! let cmd: Command = "select".try_into().unwrap();
//! assert_eq!(cmd, Command::Statement(Statement::Select { filter: None }));
//! ```
use std::io;

use serde_json::Value;
use thiserror::Error;

use crate::Statement;

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("unrecognized command '{0}'")]
    UnrecognizedCommand(String),

    #[error("invalid statement, {reason}")]
    InvalidStatement { reason: String },

    #[error("unterminated quote in '{0}'")]
    UnterminatedQuote(String),

    #[error("no command provided")]
    Empty,

    #[error("failed to read input: {0}")]
    Io(#[from] io::Error),
}

/// High-level user supplied commands.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Query to run against the current table.
    Statement(Statement),
    /// Switch between the two known tables and refresh.
    Toggle,
    /// Re-run `select` on the current table.
    Refresh,
    /// Cancel the in-flight request, if any.
    Cancel,
    /// Leave once nothing is in flight.
    Exit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Word {
    Bare(String),
    Quoted(String),
}

impl Word {
    fn text(&self) -> &str {
        match self {
            Word::Bare(s) | Word::Quoted(s) => s.as_str(),
        }
    }

    fn into_value(self) -> Value {
        match self {
            Word::Bare(s) => match s.parse::<i64>() {
                Ok(n) => Value::from(n),
                Err(_) => Value::String(s),
            },
            Word::Quoted(s) => Value::String(s),
        }
    }
}

fn split_words(input: &str) -> Result<Vec<Word>, CommandError> {
    let mut words = Vec::new();
    let mut chars = input.chars().peekable();

    while let Some(&ch) = chars.peek() {
        if ch.is_whitespace() {
            chars.next();
            continue;
        }

        if ch == '"' {
            chars.next();
            let mut word = String::new();
            loop {
                match chars.next() {
                    Some('"') => break,
                    Some(c) => word.push(c),
                    None => return Err(CommandError::UnterminatedQuote(input.to_string())),
                }
            }
            words.push(Word::Quoted(word));
        } else {
            let mut word = String::new();
            while let Some(&c) = chars.peek() {
                if c.is_whitespace() {
                    break;
                }
                word.push(c);
                chars.next();
            }
            words.push(Word::Bare(word));
        }
    }

    Ok(words)
}

fn column_and_value(verb: &str, mut args: Vec<Word>) -> Result<(String, Value), CommandError> {
    if args.len() != 2 {
        return Err(CommandError::InvalidStatement {
            reason: format!("{verb} requires a column and a value. Example: {verb} student_id 1"),
        });
    }

    let value = args.pop().map(Word::into_value).unwrap_or(Value::Null);
    let column = args.pop().map(|w| w.text().to_string()).unwrap_or_default();
    Ok((column, value))
}

impl TryInto<Command> for &str {
    type Error = CommandError;

    fn try_into(self) -> Result<Command, Self::Error> {
        match self.trim() {
            "" => Err(CommandError::Empty),
            ".exit" => Ok(Command::Exit),
            ".toggle" => Ok(Command::Toggle),
            ".refresh" => Ok(Command::Refresh),
            ".cancel" => Ok(Command::Cancel),
            s if s.starts_with('.') => Err(CommandError::UnrecognizedCommand(s.to_string())),
            s => {
                let mut words = split_words(s)?.into_iter();
                let verb = words
                    .next()
                    .map(|w| w.text().to_lowercase())
                    .unwrap_or_default();
                let args = words.collect::<Vec<_>>();

                let statement = match verb.as_str() {
                    "select" if args.is_empty() => Statement::Select { filter: None },
                    "select" => Statement::Select {
                        filter: Some(column_and_value("select", args)?),
                    },
                    "insert" if args.is_empty() => {
                        return Err(CommandError::InvalidStatement {
                            reason: "insert requires row values. Example: insert 1 Ann 2020-09-01 2 1200"
                                .to_string(),
                        });
                    }
                    "insert" => Statement::Insert {
                        row: args.into_iter().map(Word::into_value).collect(),
                    },
                    "delete" => {
                        let (column, value) = column_and_value("delete", args)?;
                        Statement::Delete { column, value }
                    }
                    _ => return Err(CommandError::UnrecognizedCommand(s.to_string())),
                };

                Ok(Command::Statement(statement))
            }
        }
    }
}
