//! Execution engine: request, outcome and error types.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::runtime::{InterpreterError, ReadinessState};

pub mod engine;
pub mod history;
pub mod python;
pub mod sink;

pub use engine::ExecutionEngine;
pub use history::History;
pub use sink::{ArtifactRef, OutputEvent, OutputSink, Stream};

/// Discriminates messages belonging to one run from late ones of an earlier run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(pub u64);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionRequest {
    pub id: RequestId,
    pub code: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    NotReady,
    Busy,
    Syntax,
    Runtime,
    TimedOut,
    Crashed,
}

/// Why a run did not succeed. Its `Display` is the outcome's error message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecutionError {
    #[error("runtime not ready ({0})")]
    NotReady(ReadinessState),
    #[error("busy: another run is already in flight")]
    Busy,
    #[error(transparent)]
    Interpreter(#[from] InterpreterError),
}

impl ExecutionError {
    pub fn kind(&self) -> FailureKind {
        match self {
            ExecutionError::NotReady(_) => FailureKind::NotReady,
            ExecutionError::Busy => FailureKind::Busy,
            ExecutionError::Interpreter(e) => match e {
                InterpreterError::Syntax(_) => FailureKind::Syntax,
                InterpreterError::Runtime(_) => FailureKind::Runtime,
                InterpreterError::NotReady => FailureKind::NotReady,
                InterpreterError::TimedOut(_) => FailureKind::TimedOut,
                InterpreterError::Crashed(_) => FailureKind::Crashed,
            },
        }
    }
}

/// Immutable record of one execution attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcome {
    pub request_id: RequestId,
    pub code: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub succeeded: bool,
    pub text: String,
    pub artifacts: Vec<ArtifactRef>,
    /// `repr` of a trailing expression, when the code ended with one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureKind>,
}

impl Outcome {
    pub(crate) fn succeeded(
        request_id: RequestId,
        code: String,
        started_at: DateTime<Utc>,
        text: String,
        artifacts: Vec<ArtifactRef>,
        value: Option<String>,
    ) -> Self {
        Self {
            request_id,
            code,
            started_at,
            finished_at: Utc::now(),
            succeeded: true,
            text,
            artifacts,
            value,
            error_message: None,
            failure: None,
        }
    }

    pub(crate) fn failed(
        request_id: RequestId,
        code: String,
        started_at: DateTime<Utc>,
        text: String,
        artifacts: Vec<ArtifactRef>,
        error: &ExecutionError,
    ) -> Self {
        Self {
            request_id,
            code,
            started_at,
            finished_at: Utc::now(),
            succeeded: false,
            text,
            artifacts,
            value: None,
            error_message: Some(error.to_string()),
            failure: Some(error.kind()),
        }
    }

    /// Rejection that never reached the interpreter.
    pub(crate) fn rejected(request_id: RequestId, code: String, error: &ExecutionError) -> Self {
        let now = Utc::now();
        let mut outcome = Self::failed(request_id, code, now, String::new(), Vec::new(), error);
        outcome.finished_at = now;
        outcome
    }

    pub fn duration(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}
