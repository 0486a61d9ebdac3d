//! Python interpreter process bootstrap.

use anyhow::{Context, Result};
use tokio::process::Command;
use tracing::debug;

use super::ProcessHandle;

/// Worker-side half of the NDJSON protocol.
pub const DRIVER: &str = include_str!("driver.py");

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PythonOptions {
    pub program: String,
    pub preload: Vec<String>,
    pub capture_plots: bool,
}

impl Default for PythonOptions {
    fn default() -> Self {
        Self { program: "python3".into(), preload: Vec::new(), capture_plots: true }
    }
}

pub fn start_python(opts: &PythonOptions) -> Result<ProcessHandle> {
    let mut cmd = Command::new(&opts.program);
    cmd.arg("-u") // unbuffered
        .arg("-c")
        .arg(DRIVER)
        .env("PYTHONIOENCODING", "utf-8")
        .env("MPLBACKEND", "Agg")
        .env("CODEBOX_PRELOAD", opts.preload.join(","))
        .env("CODEBOX_CAPTURE_PLOTS", if opts.capture_plots { "1" } else { "0" });

    debug!(program = %opts.program, preload = ?opts.preload, "spawning python worker");
    ProcessHandle::spawn(cmd).with_context(|| format!("starting python interpreter `{}`", opts.program))
}
