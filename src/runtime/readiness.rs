//! Page-lifetime readiness broadcast.

use std::fmt;

use serde::Serialize;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "reason", rename_all = "snake_case")]
pub enum ReadinessState {
    Uninitialized,
    Loading,
    Ready,
    Failed(String),
}

impl ReadinessState {
    pub fn is_ready(&self) -> bool {
        matches!(self, ReadinessState::Ready)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, ReadinessState::Failed(_))
    }

    fn can_move_to(&self, next: &ReadinessState) -> bool {
        use ReadinessState::*;
        matches!(
            (self, next),
            (Uninitialized, Loading)
                | (Loading, Ready)
                | (Loading, Failed(_))
                | (Ready, Failed(_))
                | (Failed(_), Loading)
        )
    }
}

impl fmt::Display for ReadinessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReadinessState::Uninitialized => f.write_str("uninitialized"),
            ReadinessState::Loading => f.write_str("loading"),
            ReadinessState::Ready => f.write_str("ready"),
            ReadinessState::Failed(reason) => write!(f, "failed: {}", reason),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid readiness transition: {from} -> {to}")]
pub struct InvalidTransition {
    pub from: ReadinessState,
    pub to: ReadinessState,
}

/// Readable by anyone, written only by the runtime host.
#[derive(Debug)]
pub struct ReadinessStore {
    tx: watch::Sender<ReadinessState>,
}

impl Default for ReadinessStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ReadinessStore {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(ReadinessState::Uninitialized);
        Self { tx }
    }

    pub fn current(&self) -> ReadinessState {
        self.tx.borrow().clone()
    }

    /// Receiver that observes every later transition.
    pub fn subscribe(&self) -> watch::Receiver<ReadinessState> {
        self.tx.subscribe()
    }

    pub(crate) fn set(&self, next: ReadinessState) -> Result<(), InvalidTransition> {
        let mut rejected = None;
        self.tx.send_if_modified(|cur| {
            if *cur == next {
                return false;
            }
            if !cur.can_move_to(&next) {
                rejected = Some(InvalidTransition { from: cur.clone(), to: next.clone() });
                return false;
            }
            info!(from = %cur, to = %next, "readiness transition");
            *cur = next.clone();
            true
        });
        match rejected {
            Some(err) => {
                warn!(%err, "rejected readiness transition");
                Err(err)
            }
            None => Ok(()),
        }
    }
}
