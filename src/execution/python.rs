//! Python execution over the worker's NDJSON protocol.
//!
//! Each request is one line `{"id":N,"code":"..."}` on the worker's stdin. The
//! worker answers with any number of `stream`/`artifact` lines tagged with the
//! same id, then exactly one `result` or `error` line. Before the first request
//! it announces itself with `ready` (or `fatal` if setup failed).

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout};
use tracing::{debug, info};

use super::sink::{ArtifactRef, OutputSink, Stream};
use crate::process::python::{start_python, PythonOptions};
use crate::process::ProcessHandle;
use crate::runtime::{ErrorKind, Interpreter, Launcher, SetupError, Value};

#[derive(Debug, Serialize)]
struct DriverRequest<'a> {
    id: u64,
    code: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum DriverMessage {
    Ready { version: String },
    Fatal { message: String },
    Stream { id: Option<u64>, name: Stream, text: String },
    Artifact { id: Option<u64>, mime: String, data: String },
    #[serde(rename = "result")]
    Finished { id: u64, value: Option<String> },
    Error { id: u64, kind: ErrorKind, message: String },
}

fn decode(line: &str) -> serde_json::Result<DriverMessage> {
    serde_json::from_str(line)
}

/// Spawns a fresh Python worker and waits for its `ready` handshake.
#[derive(Debug, Clone, Default)]
pub struct PythonLauncher {
    options: PythonOptions,
}

impl PythonLauncher {
    pub fn new(options: PythonOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &PythonOptions {
        &self.options
    }
}

#[async_trait]
impl Launcher for PythonLauncher {
    async fn launch(&self) -> Result<Box<dyn Interpreter>, SetupError> {
        let ProcessHandle { child, stdin, stdout } =
            start_python(&self.options).map_err(|e| SetupError::Spawn(format!("{:#}", e)))?;
        let mut lines = BufReader::new(stdout).lines();

        loop {
            let line = lines
                .next_line()
                .await
                .map_err(|e| SetupError::Protocol(e.to_string()))?
                .ok_or_else(|| SetupError::Protocol("interpreter exited before becoming ready".into()))?;
            match decode(&line) {
                Ok(DriverMessage::Ready { version }) => {
                    info!(%version, program = %self.options.program, "python worker ready");
                    return Ok(Box::new(PythonInterpreter { child, stdin, lines, version }));
                }
                Ok(DriverMessage::Fatal { message }) => return Err(SetupError::Fatal(message)),
                Ok(other) => debug!(message = ?other, "ignoring message before ready"),
                Err(e) => return Err(SetupError::Protocol(format!("{}: {}", e, line))),
            }
        }
    }
}

pub struct PythonInterpreter {
    child: Child,
    stdin: ChildStdin,
    lines: Lines<BufReader<ChildStdout>>,
    version: String,
}

impl PythonInterpreter {
    pub fn version(&self) -> &str {
        &self.version
    }

    pub async fn execute_ndjson(&mut self, id: u64, code: &str, sink: &mut OutputSink) -> Result<Value> {
        let mut payload = serde_json::to_string(&DriverRequest { id, code })?;
        payload.push('\n');
        self.stdin
            .write_all(payload.as_bytes())
            .await
            .context("writing request to interpreter")?;
        self.stdin.flush().await.context("flushing request to interpreter")?;

        loop {
            let line = self
                .lines
                .next_line()
                .await
                .context("reading from interpreter")?
                .ok_or_else(|| anyhow!("interpreter exited during execution"))?;
            let msg = decode(&line).with_context(|| format!("malformed interpreter message: {}", line))?;
            match msg {
                DriverMessage::Stream { id: Some(m), name, text } if m == id => sink.append_text(name, text),
                DriverMessage::Artifact { id: Some(m), mime, data } if m == id => {
                    sink.append_artifact(ArtifactRef { mime, data })
                }
                DriverMessage::Finished { id: m, value } if m == id => {
                    return Ok(value.map_or(Value::None, Value::Text));
                }
                DriverMessage::Error { id: m, kind, message } if m == id => {
                    return Ok(Value::Error(kind, message));
                }
                other => debug!(request = id, message = ?other, "discarding late interpreter message"),
            }
        }
    }
}

#[async_trait]
impl Interpreter for PythonInterpreter {
    async fn run(&mut self, request_id: u64, code: &str, sink: &mut OutputSink) -> Result<Value> {
        self.execute_ndjson(request_id, code, sink).await
    }

    async fn shutdown(&mut self) {
        if let Err(e) = self.child.kill().await {
            debug!(error = %e, "python worker already gone");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_driver_messages() {
        assert_eq!(
            decode(r#"{"type":"ready","version":"3.12.1"}"#).unwrap(),
            DriverMessage::Ready { version: "3.12.1".into() }
        );
        assert_eq!(
            decode(r#"{"id":3,"type":"stream","name":"stderr","text":"oops\n"}"#).unwrap(),
            DriverMessage::Stream { id: Some(3), name: Stream::Stderr, text: "oops\n".into() }
        );
        assert_eq!(
            decode(r#"{"id":null,"type":"stream","name":"stdout","text":"x"}"#).unwrap(),
            DriverMessage::Stream { id: None, name: Stream::Stdout, text: "x".into() }
        );
        assert_eq!(
            decode(r#"{"type":"result","value":null,"id":3}"#).unwrap(),
            DriverMessage::Finished { id: 3, value: None }
        );
        assert_eq!(
            decode(r#"{"type":"error","kind":"syntax","message":"SyntaxError: invalid syntax (line 1)","id":9}"#)
                .unwrap(),
            DriverMessage::Error {
                id: 9,
                kind: ErrorKind::Syntax,
                message: "SyntaxError: invalid syntax (line 1)".into()
            }
        );
    }

    #[test]
    fn rejects_unknown_messages() {
        assert!(decode(r#"{"type":"hello"}"#).is_err());
        assert!(decode("not json").is_err());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn stale_messages_are_discarded() {
        // Replays leftovers of an abandoned request #1 before answering #2.
        let script = r#"read -r request
printf '%s\n' \
  '{"id":1,"type":"stream","name":"stdout","text":"stale\n"}' \
  '{"id":1,"type":"artifact","mime":"image/png","data":"aGk="}' \
  '{"id":1,"type":"result","value":null}' \
  '{"id":null,"type":"stream","name":"stderr","text":"orphan"}' \
  '{"id":2,"type":"stream","name":"stdout","text":"fresh\n"}' \
  '{"id":1,"type":"error","kind":"runtime","message":"too late"}' \
  '{"id":2,"type":"result","value":"3"}'
"#;
        let mut cmd = tokio::process::Command::new("sh");
        cmd.args(["-c", script]);
        let ProcessHandle { child, stdin, stdout } = ProcessHandle::spawn(cmd).unwrap();
        let mut interp = PythonInterpreter {
            child,
            stdin,
            lines: BufReader::new(stdout).lines(),
            version: "test".into(),
        };

        let mut sink = OutputSink::new();
        let value = interp.execute_ndjson(2, "1 + 2", &mut sink).await.unwrap();
        assert_eq!(value, Value::Text("3".into()));
        assert_eq!(sink.text(), "fresh\n");
        assert!(sink.artifacts().is_empty());
        interp.shutdown().await;
    }

    #[test]
    fn request_line_shape() {
        let line = serde_json::to_string(&DriverRequest { id: 2, code: "print('hi')" }).unwrap();
        assert_eq!(line, r#"{"id":2,"code":"print('hi')"}"#);
    }
}
