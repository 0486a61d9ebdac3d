//! Printers: live output, outcomes and the history panel.

use std::io::{self, Write};

use owo_colors::OwoColorize;

use crate::execution::{History, Outcome, OutputEvent, Stream};
use crate::runtime::ReadinessState;

pub struct OutcomePrinter {
    pub color: bool,
}

impl Default for OutcomePrinter {
    fn default() -> Self {
        Self { color: true }
    }
}

impl OutcomePrinter {
    /// Echo one piece of output while the run is still going.
    pub fn print_event(&self, event: &OutputEvent) {
        match event {
            OutputEvent::Text { stream: Stream::Stdout, text } => {
                print!("{}", text);
                io::stdout().flush().ok();
            }
            OutputEvent::Text { stream: Stream::Stderr, text } => {
                if self.color {
                    eprint!("{}", text.yellow());
                } else {
                    eprint!("{}", text);
                }
            }
            OutputEvent::Artifact(art) => self.note(&format!("[{} artifact, {} bytes base64]", art.mime, art.data.len())),
        }
    }

    /// Final result of a run. `streamed` means the text was already echoed.
    pub fn print_outcome(&self, outcome: &Outcome, streamed: bool) {
        if !streamed && !outcome.text.is_empty() {
            print!("{}", outcome.text);
            if !outcome.text.ends_with('\n') {
                println!();
            }
        }
        if let Some(value) = &outcome.value {
            if self.color {
                println!("{}", value.green());
            } else {
                println!("{}", value);
            }
        }
        if let Some(msg) = &outcome.error_message {
            if self.color {
                eprintln!("{}", msg.red());
            } else {
                eprintln!("{}", msg);
            }
        }
    }

    pub fn print_state(&self, state: &ReadinessState) {
        let label = format!("runtime: {}", state);
        if !self.color {
            println!("{}", label);
            return;
        }
        match state {
            ReadinessState::Ready => println!("{}", label.green()),
            ReadinessState::Failed(_) => println!("{}", label.red()),
            _ => println!("{}", label.cyan()),
        }
    }

    pub fn print_history(&self, history: &History) {
        if history.is_empty() {
            self.note("(no runs yet)");
            return;
        }
        for (i, outcome) in history.iter().enumerate() {
            let status = if outcome.succeeded { "ok" } else { "failed" };
            let header = format!(
                "[{}] {} {} {} ({} ms)",
                i,
                outcome.request_id,
                outcome.started_at.format("%H:%M:%S"),
                status,
                outcome.duration().num_milliseconds()
            );
            if self.color {
                if outcome.succeeded {
                    println!("{}", header.green());
                } else {
                    println!("{}", header.red());
                }
            } else {
                println!("{}", header);
            }
            println!("  code: {}", first_line(&outcome.code));
            if !outcome.text.is_empty() {
                println!("  output: {}", first_line(&outcome.text));
            }
            if let Some(msg) = &outcome.error_message {
                println!("  error: {}", msg);
            }
        }
    }

    pub fn note(&self, text: &str) {
        if self.color {
            eprintln!("{}", text.cyan());
        } else {
            eprintln!("{}", text);
        }
    }
}

/// First line of `s`, marked with an ellipsis when more follows.
pub fn first_line(s: &str) -> String {
    let mut lines = s.lines();
    let first = lines.next().unwrap_or("");
    if lines.next().is_some() {
        format!("{} ...", first)
    } else {
        first.to_string()
    }
}
