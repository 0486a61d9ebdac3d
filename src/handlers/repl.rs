//! Line-oriented REPL over the sandbox.

use std::io::{self, Write};

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};

use codebox::printer::OutcomePrinter;
use codebox::Sandbox;

use super::run::execute_and_print;

const BLOCK_DELIMITER: &str = "\"\"\"";

/// Input mode for the REPL
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InputMode {
    /// Each line is run on its own
    Normal,
    /// Lines are collected until the closing `"""`
    MultiLine,
}

pub async fn run(sandbox: &Sandbox, printer: &OutcomePrinter) -> Result<()> {
    printer.note("codebox REPL: \"\"\" toggles multi-line input | :history :status :retry :quit");
    printer.note("starting interpreter...");
    let state = sandbox.ensure_ready().await;
    printer.print_state(&state);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut mode = InputMode::Normal;
    let mut block: Vec<String> = Vec::new();

    loop {
        print!("{}", if mode == InputMode::Normal { ">>> " } else { "... " });
        io::stdout().flush().ok();
        let Some(line) = lines.next_line().await? else {
            break;
        };

        if mode == InputMode::MultiLine {
            if line.trim() == BLOCK_DELIMITER {
                mode = InputMode::Normal;
                let code = block.join("\n");
                block.clear();
                submit(sandbox, &code, printer).await?;
            } else {
                block.push(line);
            }
            continue;
        }

        match line.trim() {
            "" => {}
            BLOCK_DELIMITER => mode = InputMode::MultiLine,
            ":quit" | ":q" | ":exit" => break,
            ":history" => printer.print_history(&sandbox.history()),
            ":status" => printer.print_state(&sandbox.state()),
            ":retry" => match sandbox.retry().await {
                Ok(state) => printer.print_state(&state),
                Err(e) => printer.note(&e.to_string()),
            },
            _ => submit(sandbox, &line, printer).await?,
        }
    }
    Ok(())
}

async fn submit(sandbox: &Sandbox, code: &str, printer: &OutcomePrinter) -> Result<()> {
    let state = sandbox.state();
    if !state.is_ready() {
        printer.note(&format!("run disabled: runtime {} (try :retry)", state));
        return Ok(());
    }
    execute_and_print(sandbox, code, printer).await?;
    Ok(())
}
