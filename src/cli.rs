use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgGroup, Parser};

use codebox::SandboxSettings;

#[derive(Parser, Debug, Clone)]
#[command(name = "codebox", about = "Run Python code in a single-flight sandbox", version)]
#[command(group(ArgGroup::new("source").args(["file", "code", "repl"]).multiple(false)))]
#[command(group(ArgGroup::new("timeout_switch").args(["timeout", "no_timeout"]).multiple(false)))]
pub struct Cli {
    /// Python source file to run (.py, .txt or no extension).
    #[arg(value_name = "FILE")]
    pub file: Option<String>,

    /// Code to run, instead of a file or stdin.
    #[arg(short = 'c', long)]
    pub code: Option<String>,

    /// Start an interactive session.
    ///
    /// Enter `"""` to start and end a multi-line block. Session commands:
    /// `:history`, `:status`, `:retry`, `:quit`.
    #[arg(long)]
    pub repl: bool,

    /// Print the final outcome as JSON instead of streaming text.
    #[arg(long)]
    pub json: bool,

    /// Python interpreter to launch.
    #[arg(long)]
    pub python: Option<String>,

    /// Seconds a single run may take before the interpreter is restarted.
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,
    /// Let runs take as long as they need.
    #[arg(long = "no-timeout")]
    pub no_timeout: bool,

    /// Module to import while the interpreter starts.
    /// Can be used multiple times: --preload numpy --preload matplotlib.pyplot
    #[arg(long = "preload", action = clap::ArgAction::Append)]
    pub preload: Vec<String>,

    /// Directory where rendered plots are written.
    #[arg(long = "artifact-dir")]
    pub artifact_dir: Option<PathBuf>,

    /// Do not capture matplotlib figures.
    #[arg(long = "no-plots")]
    pub no_plots: bool,

    /// Disable colored output.
    #[arg(long = "no-color")]
    pub no_color: bool,
}

impl Cli {
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }

    /// Flags override configuration.
    pub fn apply(&self, settings: &mut SandboxSettings) {
        if let Some(python) = &self.python {
            settings.python.program = python.clone();
        }
        if self.no_timeout {
            settings.execution_timeout = None;
        } else if let Some(secs) = self.timeout {
            settings.execution_timeout = (secs > 0).then(|| Duration::from_secs(secs));
        }
        if !self.preload.is_empty() {
            settings.python.preload = self.preload.clone();
        }
        if self.artifact_dir.is_some() {
            settings.artifact_dir = self.artifact_dir.clone();
        }
        if self.no_plots {
            settings.python.capture_plots = false;
        }
    }
}
