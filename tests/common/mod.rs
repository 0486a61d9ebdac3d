//! Scripted interpreter used to drive the sandbox without Python.
//!
//! Statements are separated by `;` or newlines:
//! `print('x')` writes to stdout, `warn('x')` to stderr, `plot` emits an
//! artifact, `1/0` and `raise X` fail at runtime, `syntax(` fails to parse,
//! `wait` blocks until the gate is notified, `hang` never finishes and
//! `crash` breaks the interpreter. A trailing other statement becomes the value.
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use tokio::sync::Notify;

use codebox::execution::sink::{ArtifactRef, OutputSink, Stream};
use codebox::runtime::{ErrorKind, Interpreter, Launcher, SetupError, Value};
use codebox::{Sandbox, SandboxSettings};

#[derive(Debug, Default)]
pub struct Script {
    pub launches: AtomicUsize,
    pub executions: AtomicUsize,
    pub shutdowns: AtomicUsize,
    pub gate: Notify,
}

impl Script {
    pub fn launches(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }

    pub fn executions(&self) -> usize {
        self.executions.load(Ordering::SeqCst)
    }

    pub fn shutdowns(&self) -> usize {
        self.shutdowns.load(Ordering::SeqCst)
    }

    pub fn release(&self) {
        self.gate.notify_one();
    }
}

#[derive(Debug, Clone, Default)]
pub struct ScriptedLauncher {
    script: Arc<Script>,
    delay: Duration,
    /// 1-based launch numbers that fail.
    failing: Vec<usize>,
}

impl ScriptedLauncher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn failing_on(mut self, launches: &[usize]) -> Self {
        self.failing = launches.to_vec();
        self
    }

    pub fn script(&self) -> Arc<Script> {
        self.script.clone()
    }
}

#[async_trait]
impl Launcher for ScriptedLauncher {
    async fn launch(&self) -> Result<Box<dyn Interpreter>, SetupError> {
        let n = self.script.launches.fetch_add(1, Ordering::SeqCst) + 1;
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.failing.contains(&n) {
            return Err(SetupError::Fatal(format!("launch {} refused", n)));
        }
        Ok(Box::new(ScriptedInterpreter { script: self.script.clone() }))
    }
}

pub struct ScriptedInterpreter {
    script: Arc<Script>,
}

fn quoted(stmt: &str, func: &str) -> Option<String> {
    let inner = stmt.strip_prefix(func)?.strip_prefix('(')?.strip_suffix(')')?;
    let inner = inner.trim_matches(|c| c == '\'' || c == '"');
    Some(format!("{}\n", inner))
}

#[async_trait]
impl Interpreter for ScriptedInterpreter {
    async fn run(&mut self, _request_id: u64, code: &str, sink: &mut OutputSink) -> Result<Value> {
        self.script.executions.fetch_add(1, Ordering::SeqCst);
        let statements: Vec<&str> = code
            .split(|c| c == ';' || c == '\n')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect();
        if statements.iter().any(|s| s.starts_with("syntax(")) {
            return Ok(Value::Error(ErrorKind::Syntax, "SyntaxError: invalid syntax (line 1)".into()));
        }

        let mut value = Value::None;
        for stmt in statements {
            value = Value::None;
            if let Some(text) = quoted(stmt, "print") {
                sink.append_text(Stream::Stdout, text);
            } else if let Some(text) = quoted(stmt, "warn") {
                sink.append_text(Stream::Stderr, text);
            } else if stmt == "plot" {
                sink.append_artifact(ArtifactRef::png("aGk="));
            } else if stmt == "1/0" {
                return Ok(Value::Error(ErrorKind::Runtime, "ZeroDivisionError: division by zero (line 1)".into()));
            } else if let Some(name) = stmt.strip_prefix("raise ") {
                return Ok(Value::Error(
                    ErrorKind::Runtime,
                    format!("NameError: name '{}' is not defined (line 1)", name),
                ));
            } else if stmt == "wait" {
                self.script.gate.notified().await;
            } else if stmt == "hang" {
                std::future::pending::<()>().await;
            } else if stmt == "crash" {
                return Err(anyhow!("interpreter exited during execution"));
            } else {
                value = Value::Text(stmt.to_string());
            }
        }
        Ok(value)
    }

    async fn shutdown(&mut self) {
        self.script.shutdowns.fetch_add(1, Ordering::SeqCst);
    }
}

pub fn settings() -> SandboxSettings {
    SandboxSettings { setup_timeout: None, execution_timeout: None, ..SandboxSettings::default() }
}

pub fn sandbox(launcher: &ScriptedLauncher) -> Sandbox {
    Sandbox::new(Arc::new(launcher.clone()), settings())
}

pub async fn ready_sandbox(launcher: &ScriptedLauncher) -> Sandbox {
    let sandbox = sandbox(launcher);
    assert!(sandbox.ensure_ready().await.is_ready());
    sandbox
}
