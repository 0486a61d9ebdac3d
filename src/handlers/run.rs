//! One-shot handler: run code once and print the outcome.

use anyhow::{bail, Result};
use tokio::sync::mpsc;

use codebox::printer::OutcomePrinter;
use codebox::utils::write_artifacts;
use codebox::{Outcome, ReadinessState, Sandbox};

/// Run `code`, echoing output live, then print the result and export artifacts.
pub async fn execute_and_print(sandbox: &Sandbox, code: &str, printer: &OutcomePrinter) -> Result<Outcome> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let printing = async {
        while let Some(event) = rx.recv().await {
            printer.print_event(&event);
        }
    };
    let (outcome, ()) = tokio::join!(sandbox.run_streaming(code, tx), printing);

    printer.print_outcome(&outcome, true);
    export_artifacts(sandbox, &outcome, printer)?;
    Ok(outcome)
}

fn export_artifacts(sandbox: &Sandbox, outcome: &Outcome, printer: &OutcomePrinter) -> Result<()> {
    if let Some(dir) = &sandbox.settings().artifact_dir {
        for path in write_artifacts(outcome, dir)? {
            printer.note(&format!("wrote {}", path.display()));
        }
    }
    Ok(())
}

/// Returns whether the run succeeded.
pub async fn run(sandbox: &Sandbox, code: &str, json: bool, printer: &OutcomePrinter) -> Result<bool> {
    if let ReadinessState::Failed(reason) = sandbox.ensure_ready().await {
        bail!("runtime setup failed: {}", reason);
    }

    let outcome = if json {
        let outcome = sandbox.run(code).await;
        println!("{}", serde_json::to_string_pretty(&outcome)?);
        export_artifacts(sandbox, &outcome, printer)?;
        outcome
    } else {
        execute_and_print(sandbox, code, printer).await?
    };
    Ok(outcome.succeeded)
}
