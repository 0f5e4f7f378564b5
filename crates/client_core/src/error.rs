//! Error taxonomy for calls to the interview server and for controller operations.

use std::fmt;

use shared::{domain::ConfigValidationError, error::ErrorCode};
use thiserror::Error;

/// The remote operation a failure belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    StartSession,
    FetchSession,
    PostMessage,
    ExecuteCode,
    Evaluate,
}

impl Operation {
    /// Message surfaced when the server gives no usable detail.
    pub fn generic_failure(self) -> &'static str {
        match self {
            Operation::StartSession => "Failed to start session",
            Operation::FetchSession => "Failed to load session",
            Operation::PostMessage => "Failed to send message",
            Operation::ExecuteCode => "Execution failed",
            Operation::Evaluate => "Evaluation failed",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::StartSession => "start_session",
            Operation::FetchSession => "fetch_session",
            Operation::PostMessage => "post_message",
            Operation::ExecuteCode => "execute_code",
            Operation::Evaluate => "evaluate",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum ApiCallError {
    /// The server answered with a non-success status.
    #[error("{detail}")]
    Rejected {
        operation: Operation,
        status: u16,
        detail: String,
        code: Option<ErrorCode>,
    },
    /// The server was unreachable or its response could not be decoded.
    #[error("{}", .operation.generic_failure())]
    Transport {
        operation: Operation,
        #[source]
        source: reqwest::Error,
    },
}

impl ApiCallError {
    pub fn rejected(
        operation: Operation,
        status: u16,
        detail: Option<&str>,
        code: Option<ErrorCode>,
    ) -> Self {
        Self::Rejected {
            operation,
            status,
            detail: detail
                .map(str::to_string)
                .unwrap_or_else(|| operation.generic_failure().to_string()),
            code,
        }
    }

    pub fn operation(&self) -> Operation {
        match self {
            ApiCallError::Rejected { operation, .. } | ApiCallError::Transport { operation, .. } => {
                *operation
            }
        }
    }

    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            ApiCallError::Rejected { code, .. } => *code,
            ApiCallError::Transport { .. } => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum SessionStartError {
    #[error("invalid interview configuration: {0}")]
    InvalidConfig(#[from] ConfigValidationError),
    /// `message` is what the user was shown, after the configuration hint rewrite.
    #[error("{message}")]
    Rejected {
        message: String,
        #[source]
        source: ApiCallError,
    },
}

/// User-triggered controls that gate themselves while their request is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Control {
    Start,
    Send,
    RunCode,
    Evaluate,
}

impl fmt::Display for Control {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Control::Start => "start",
            Control::Send => "send",
            Control::RunCode => "run-code",
            Control::Evaluate => "end-interview",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    SessionStart(#[from] SessionStartError),
    #[error("no active interview session")]
    NoActiveSession,
    #[error("{0} is already in progress")]
    ControlBusy(Control),
    #[error("interview is already completed")]
    AlreadyCompleted,
    #[error("Evaluation error: {0}")]
    Evaluation(#[source] ApiCallError),
}

#[derive(Debug, Error)]
pub enum EndpointError {
    #[error("invalid server url '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("server url '{0}' cannot carry request paths")]
    NotABase(String),
}
