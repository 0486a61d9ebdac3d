//! Single-flight coordinator turning runtime results into history entries.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use chrono::Utc;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, warn};

use super::{ExecutionError, ExecutionRequest, History, Outcome, OutputEvent, OutputSink, RequestId};
use crate::runtime::{ReadinessState, RuntimeHost};

pub struct ExecutionEngine {
    host: RwLock<Arc<RuntimeHost>>,
    in_flight: AtomicBool,
    next_id: AtomicU64,
    history: Mutex<History>,
}

/// Clears the in-flight flag however the run ends, including when the
/// caller drops the `run` future.
struct FlightGuard<'a>(&'a AtomicBool);

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl ExecutionEngine {
    pub fn new(host: Arc<RuntimeHost>, history_capacity: usize) -> Self {
        Self {
            host: RwLock::new(host),
            in_flight: AtomicBool::new(false),
            next_id: AtomicU64::new(1),
            history: Mutex::new(History::with_capacity(history_capacity)),
        }
    }

    pub fn host(&self) -> Arc<RuntimeHost> {
        self.host.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub(crate) fn replace_host(&self, host: Arc<RuntimeHost>) -> Arc<RuntimeHost> {
        let mut slot = self.host.write().unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *slot, host)
    }

    pub fn readiness(&self) -> ReadinessState {
        self.host().readiness().current()
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    fn history_lock(&self) -> MutexGuard<'_, History> {
        self.history.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Copy of the history, newest first.
    pub fn history(&self) -> History {
        self.history_lock().clone()
    }

    pub fn last_outcome(&self) -> Option<Outcome> {
        self.history_lock().latest().cloned()
    }

    /// Execute `code`. Always resolves to an outcome; never errors.
    pub async fn run(&self, code: impl Into<String>) -> Outcome {
        self.dispatch(code.into(), OutputSink::new()).await
    }

    /// Like [`run`](Self::run), also forwarding output to `listener` as it is produced.
    pub async fn run_streaming(&self, code: impl Into<String>, listener: UnboundedSender<OutputEvent>) -> Outcome {
        self.dispatch(code.into(), OutputSink::with_listener(listener)).await
    }

    async fn dispatch(&self, code: String, mut sink: OutputSink) -> Outcome {
        let id = RequestId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let host = self.host();

        let state = host.readiness().current();
        if !state.is_ready() {
            debug!(request = %id, %state, "rejecting run: runtime not ready");
            return Outcome::rejected(id, code, &ExecutionError::NotReady(state));
        }

        // Claimed before the first suspension point, so an overlapping call
        // sees it immediately.
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            warn!(request = %id, "rejecting run: another run is in flight");
            return Outcome::rejected(id, code, &ExecutionError::Busy);
        }
        let _flight = FlightGuard(&self.in_flight);

        let request = ExecutionRequest { id, code };
        let started_at = Utc::now();
        info!(request = %id, bytes = request.code.len(), "dispatching run");
        let result = host.execute(&request, &mut sink).await;
        let (text, artifacts) = sink.finish();

        let outcome = match result {
            Ok(value) => Outcome::succeeded(id, request.code, started_at, text, artifacts, value),
            Err(e) => {
                let err = ExecutionError::from(e);
                debug!(request = %id, error = %err, "run failed");
                Outcome::failed(id, request.code, started_at, text, artifacts, &err)
            }
        };
        self.history_lock().push(outcome.clone());
        info!(request = %id, succeeded = outcome.succeeded, "run finished");
        outcome
    }
}
