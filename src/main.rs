mod cli;
mod handlers;

use std::io::{self, Read};

use anyhow::{bail, Result};
use is_terminal::IsTerminal;
use tracing_subscriber::EnvFilter;

use codebox::printer::OutcomePrinter;
use codebox::utils::read_source;
use codebox::{Config, Sandbox, SandboxSettings};

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so they never mix with program output
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();

    let args = cli::Cli::parse();

    // Load config, then let flags override it
    let cfg = Config::load();
    let mut settings = SandboxSettings::from_config(&cfg);
    args.apply(&mut settings);

    let printer = OutcomePrinter { color: !args.no_color && io::stdout().is_terminal() };
    let sandbox = Sandbox::python(settings);

    if args.repl {
        let result = handlers::repl::run(&sandbox, &printer).await;
        sandbox.shutdown().await;
        return result;
    }

    // Resolve code: --code, FILE, or piped stdin
    let code = if let Some(code) = args.code.clone() {
        code
    } else if let Some(file) = args.file.as_deref() {
        read_source(file)?
    } else if !io::stdin().is_terminal() {
        let mut buf = String::new();
        io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        bail!("Provide code as FILE, with --code, or via stdin (or start --repl)");
    };

    let result = handlers::run::run(&sandbox, &code, args.json, &printer).await;
    sandbox.shutdown().await;
    if !result? {
        std::process::exit(1);
    }
    Ok(())
}
