//! Line input from the terminal mapped to interview actions.

use std::{fmt, path::PathBuf};

pub const HELP: &str = "\
Type a message and press Enter to talk to the interviewer.
  :code            start a multi-line code block, finish it with :end
  :run <file>      run the contents of a file
  :time            show elapsed interview time
  :done            end the interview and show the scorecard
  :dismiss         dismiss the current notification
  :new             discard this interview and start a fresh one
  :quit            exit";

/// Shown when a session could not be started; the prompt stays open for a retry.
pub fn start_failed(err: &dyn fmt::Display) -> String {
    format!("Could not start the interview: {err}\nType :new to try again or :quit to exit.")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Say(String),
    BeginCode,
    EndCode,
    RunFile(PathBuf),
    Time,
    Evaluate,
    Dismiss,
    New,
    Quit,
    Help,
    Empty,
    Unknown(String),
}

pub fn parse_line(line: &str) -> Input {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Input::Empty;
    }
    let Some(command) = trimmed.strip_prefix(':') else {
        return Input::Say(trimmed.to_string());
    };

    let (name, rest) = command
        .split_once(char::is_whitespace)
        .map_or((command, ""), |(name, rest)| (name, rest.trim()));

    match name {
        "code" => Input::BeginCode,
        "end" => Input::EndCode,
        "run" if !rest.is_empty() => Input::RunFile(PathBuf::from(rest)),
        "time" => Input::Time,
        "done" | "evaluate" => Input::Evaluate,
        "dismiss" => Input::Dismiss,
        "new" => Input::New,
        "quit" | "q" | "exit" => Input::Quit,
        "help" | "h" => Input::Help,
        _ => Input::Unknown(trimmed.to_string()),
    }
}

/// Accumulates lines between `:code` and `:end`.
#[derive(Debug, Default)]
pub struct CodeBuffer {
    lines: Option<Vec<String>>,
}

impl CodeBuffer {
    pub fn is_open(&self) -> bool {
        self.lines.is_some()
    }

    pub fn open(&mut self) {
        self.lines = Some(Vec::new());
    }

    pub fn push(&mut self, line: &str) {
        if let Some(lines) = self.lines.as_mut() {
            lines.push(line.to_string());
        }
    }

    pub fn close(&mut self) -> String {
        self.lines.take().map(|lines| lines.join("\n")).unwrap_or_default()
    }
}
