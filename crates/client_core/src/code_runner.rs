//! Code submission and the tri-state interpretation of its result.

use std::sync::Arc;

use shared::protocol::CodeExecuteResponse;
use tokio::sync::{broadcast, Mutex};

use crate::{
    events::SessionEvent,
    session::{Epoch, SessionTicket},
    transport::InterviewApi,
};

pub const IDLE_MARKER: &str = "Run your code to see output here...";
pub const RUNNING_MARKER: &str = "Running...";
pub const TIMEOUT_MARKER: &str = "Code timed out!";
pub const NO_OUTPUT_MARKER: &str = "(No output)";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputTone {
    Neutral,
    Success,
    Error,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CodeOutput {
    #[default]
    Idle,
    Running,
    TimedOut,
    Stderr(String),
    Stdout(String),
    NoOutput,
    Failed(String),
}

impl CodeOutput {
    /// Picks the single authoritative condition: timeout, then stderr, then stdout.
    pub fn from_result(result: &CodeExecuteResponse) -> Self {
        if result.timed_out {
            CodeOutput::TimedOut
        } else if !result.stderr.is_empty() {
            CodeOutput::Stderr(result.stderr.clone())
        } else if result.stdout.is_empty() {
            CodeOutput::NoOutput
        } else {
            CodeOutput::Stdout(result.stdout.clone())
        }
    }

    pub fn text(&self) -> String {
        match self {
            CodeOutput::Idle => IDLE_MARKER.to_string(),
            CodeOutput::Running => RUNNING_MARKER.to_string(),
            CodeOutput::TimedOut => TIMEOUT_MARKER.to_string(),
            CodeOutput::Stderr(text) | CodeOutput::Stdout(text) => text.clone(),
            CodeOutput::NoOutput => NO_OUTPUT_MARKER.to_string(),
            CodeOutput::Failed(message) => format!("Error: {message}"),
        }
    }

    pub fn tone(&self) -> OutputTone {
        match self {
            CodeOutput::Idle | CodeOutput::Running => OutputTone::Neutral,
            CodeOutput::Stdout(_) | CodeOutput::NoOutput => OutputTone::Success,
            CodeOutput::TimedOut | CodeOutput::Stderr(_) | CodeOutput::Failed(_) => {
                OutputTone::Error
            }
        }
    }
}

pub struct CodeRunner {
    api: Arc<dyn InterviewApi>,
    output: Mutex<CodeOutput>,
    epoch: Epoch,
    events: broadcast::Sender<SessionEvent>,
}

impl CodeRunner {
    pub(crate) fn new(
        api: Arc<dyn InterviewApi>,
        epoch: Epoch,
        events: broadcast::Sender<SessionEvent>,
    ) -> Self {
        Self {
            api,
            output: Mutex::new(CodeOutput::Idle),
            epoch,
            events,
        }
    }

    pub async fn output(&self) -> CodeOutput {
        self.output.lock().await.clone()
    }

    /// Runs `code` and renders exactly one result. Returns what was rendered, or
    /// `None` when nothing was submitted or the session ended mid-flight.
    pub async fn execute(&self, ticket: &SessionTicket, code: &str) -> Option<CodeOutput> {
        if code.trim().is_empty() {
            return None;
        }
        if !self.render(ticket, CodeOutput::Running).await {
            return None;
        }

        let output = match self.api.execute_code(&ticket.session_id, code).await {
            Ok(result) => CodeOutput::from_result(&result),
            Err(err) => CodeOutput::Failed(err.to_string()),
        };

        if self.render(ticket, output.clone()).await {
            Some(output)
        } else {
            None
        }
    }

    pub(crate) async fn clear(&self) {
        *self.output.lock().await = CodeOutput::Idle;
    }

    async fn render(&self, ticket: &SessionTicket, output: CodeOutput) -> bool {
        let mut current = self.output.lock().await;
        if !self.epoch.is_current(ticket) {
            return false;
        }
        *current = output.clone();
        let _ = self.events.send(SessionEvent::CodeOutput(output));
        true
    }
}

#[cfg(test)]
#[path = "tests/code_runner_tests.rs"]
mod tests;
