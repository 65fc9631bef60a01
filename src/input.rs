//! Operator input.
//!
//! The session asks questions and the interactive sender reads messages
//! through [`LineSource`], so tests can script the operator.

use std::collections::VecDeque;
use std::io::{self, Write};

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

/// Trait for reading operator input one line at a time.
#[async_trait]
pub trait LineSource: Send {
    /// Show `prompt` and read the next line without its newline.
    ///
    /// Returns `None` at end of input.
    async fn next_line(&mut self, prompt: &str) -> io::Result<Option<String>>;
}

/// Reads lines from standard input.
pub struct StdinLines {
    lines: Lines<BufReader<Stdin>>,
}

impl StdinLines {
    /// Create a line source over the process's stdin.
    pub fn new() -> Self {
        Self {
            lines: BufReader::new(tokio::io::stdin()).lines(),
        }
    }
}

impl Default for StdinLines {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LineSource for StdinLines {
    async fn next_line(&mut self, prompt: &str) -> io::Result<Option<String>> {
        if !prompt.is_empty() {
            let mut stdout = io::stdout();
            write!(stdout, "{}", prompt)?;
            stdout.flush()?;
        }
        self.lines.next_line().await
    }
}

/// A fixed script of lines, for tests and non-interactive runs.
#[derive(Debug, Clone, Default)]
pub struct ScriptedLines {
    lines: VecDeque<String>,
}

impl ScriptedLines {
    /// Create a source that yields `lines` in order, then end of input.
    pub fn new<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            lines: lines.into_iter().map(Into::into).collect(),
        }
    }

    /// Number of lines not yet read.
    pub fn remaining(&self) -> usize {
        self.lines.len()
    }
}

#[async_trait]
impl LineSource for ScriptedLines {
    async fn next_line(&mut self, _prompt: &str) -> io::Result<Option<String>> {
        Ok(self.lines.pop_front())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_lines() {
        let mut source = ScriptedLines::new(["one", "two"]);
        assert_eq!(source.remaining(), 2);
        assert_eq!(source.next_line("> ").await.unwrap().as_deref(), Some("one"));
        assert_eq!(source.next_line("> ").await.unwrap().as_deref(), Some("two"));
        assert_eq!(source.next_line("> ").await.unwrap(), None);
    }
}
