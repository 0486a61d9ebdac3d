//! Embedded interpreter runtime: lifecycle, readiness and the interpreter seam.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::execution::sink::OutputSink;

pub mod host;
pub mod readiness;

pub use host::RuntimeHost;
pub use readiness::{ReadinessState, ReadinessStore};

/// Which phase of the interpreter rejected the submitted code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Syntax,
    Runtime,
}

/// Raw result of one interpreter call, before the host types it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// `repr` of a trailing expression.
    Text(String),
    None,
    Error(ErrorKind, String),
}

impl Value {
    pub fn into_result(self) -> Result<Option<String>, InterpreterError> {
        match self {
            Value::Text(s) => Ok(Some(s)),
            Value::None => Ok(None),
            Value::Error(ErrorKind::Syntax, msg) => Err(InterpreterError::Syntax(msg)),
            Value::Error(ErrorKind::Runtime, msg) => Err(InterpreterError::Runtime(msg)),
        }
    }
}

/// Failure to bring an interpreter up. Terminal for the host that hit it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SetupError {
    #[error("failed to start interpreter: {0}")]
    Spawn(String),
    #[error("interpreter setup failed: {0}")]
    Fatal(String),
    #[error("interpreter protocol error during setup: {0}")]
    Protocol(String),
    #[error("interpreter setup timed out after {0}s")]
    TimedOut(u64),
}

/// Fault scoped to one execution request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InterpreterError {
    #[error("syntax error: {0}")]
    Syntax(String),
    #[error("runtime error: {0}")]
    Runtime(String),
    #[error("runtime not ready")]
    NotReady,
    #[error("execution timed out after {0}s")]
    TimedOut(u64),
    #[error("interpreter crashed: {0}")]
    Crashed(String),
}

/// A live interpreter instance. Output produced while running `code` must be
/// appended to `sink` as it is produced.
///
/// Faults in the submitted code come back as `Value::Error`; an `Err` means the
/// interpreter itself is broken and must not be reused.
#[async_trait]
pub trait Interpreter: Send {
    async fn run(&mut self, request_id: u64, code: &str, sink: &mut OutputSink) -> anyhow::Result<Value>;

    async fn shutdown(&mut self) {}
}

/// Performs the one-time (possibly slow) bring-up of an interpreter.
#[async_trait]
pub trait Launcher: Send + Sync {
    async fn launch(&self) -> Result<Box<dyn Interpreter>, SetupError>;
}
