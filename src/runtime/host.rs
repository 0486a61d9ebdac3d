//! Owner of the single interpreter instance and its one-time bring-up.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, OnceCell};
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use super::{InterpreterError, Interpreter, Launcher, ReadinessState, ReadinessStore, SetupError};
use crate::execution::{ExecutionRequest, OutputSink};

type Slot = Mutex<Option<Box<dyn Interpreter>>>;

pub struct RuntimeHost {
    launcher: Arc<dyn Launcher>,
    store: Arc<ReadinessStore>,
    setup_timeout: Option<Duration>,
    execution_timeout: Option<Duration>,
    /// Set exactly once by the first `ensure_ready`; a failure stays recorded.
    session: OnceCell<Result<Slot, SetupError>>,
}

impl RuntimeHost {
    pub fn new(launcher: Arc<dyn Launcher>, store: Arc<ReadinessStore>) -> Self {
        Self {
            launcher,
            store,
            setup_timeout: None,
            execution_timeout: None,
            session: OnceCell::new(),
        }
    }

    pub fn with_setup_timeout(mut self, limit: Option<Duration>) -> Self {
        self.setup_timeout = limit;
        self
    }

    pub fn with_execution_timeout(mut self, limit: Option<Duration>) -> Self {
        self.execution_timeout = limit;
        self
    }

    pub fn readiness(&self) -> &Arc<ReadinessStore> {
        &self.store
    }

    pub fn launcher(&self) -> &Arc<dyn Launcher> {
        &self.launcher
    }

    pub fn setup_timeout(&self) -> Option<Duration> {
        self.setup_timeout
    }

    pub fn execution_timeout(&self) -> Option<Duration> {
        self.execution_timeout
    }

    /// Idempotent bring-up. Concurrent callers share the one in-flight setup
    /// and all observe its result; a failure is never retried here.
    pub async fn ensure_ready(&self) -> ReadinessState {
        match self.session.get_or_init(|| self.bring_up()).await {
            Ok(_) => self.store.current(),
            Err(e) => ReadinessState::Failed(e.to_string()),
        }
    }

    /// True once setup failed or the interpreter was lost; such a host must be replaced.
    pub fn is_failed(&self) -> bool {
        match self.session.get() {
            Some(Err(_)) => true,
            Some(Ok(_)) => self.store.current().is_failed(),
            None => false,
        }
    }

    async fn bring_up(&self) -> Result<Slot, SetupError> {
        if let Err(e) = self.store.set(ReadinessState::Loading) {
            // Another host owns the store's current lifecycle.
            return Err(SetupError::Fatal(e.to_string()));
        }
        info!("starting interpreter");
        match self.launch().await {
            Ok(interp) => {
                let _ = self.store.set(ReadinessState::Ready);
                Ok(Mutex::new(Some(interp)))
            }
            Err(e) => {
                error!(error = %e, "interpreter setup failed");
                let _ = self.store.set(ReadinessState::Failed(e.to_string()));
                Err(e)
            }
        }
    }

    async fn launch(&self) -> Result<Box<dyn Interpreter>, SetupError> {
        match self.setup_timeout {
            Some(limit) => timeout(limit, self.launcher.launch())
                .await
                .unwrap_or_else(|_| Err(SetupError::TimedOut(limit.as_secs()))),
            None => self.launcher.launch().await,
        }
    }

    /// Run `request` against the interpreter, streaming its output into `sink`.
    ///
    /// Returns the `repr` of a trailing expression on success. Output captured
    /// before a fault stays in `sink`.
    pub async fn execute(
        &self,
        request: &ExecutionRequest,
        sink: &mut OutputSink,
    ) -> Result<Option<String>, InterpreterError> {
        let Some(Ok(slot)) = self.session.get() else {
            return Err(InterpreterError::NotReady);
        };
        if !self.store.current().is_ready() {
            return Err(InterpreterError::NotReady);
        }
        let mut guard = slot.lock().await;
        let Some(interp) = guard.as_mut() else {
            return Err(InterpreterError::NotReady);
        };

        debug!(request = %request.id, "executing");
        let ran = match self.execution_timeout {
            Some(limit) => timeout(limit, interp.run(request.id.0, &request.code, sink))
                .await
                .map_err(|_| limit),
            None => Ok(interp.run(request.id.0, &request.code, sink).await),
        };

        match ran {
            Ok(Ok(value)) => value.into_result(),
            Ok(Err(e)) => {
                warn!(request = %request.id, error = %e, "interpreter crashed, relaunching");
                self.relaunch(&mut guard).await;
                Err(InterpreterError::Crashed(format!("{:#}", e)))
            }
            Err(limit) => {
                warn!(request = %request.id, secs = limit.as_secs(), "execution timed out, relaunching");
                self.relaunch(&mut guard).await;
                Err(InterpreterError::TimedOut(limit.as_secs()))
            }
        }
    }

    /// The store stays `Ready` while the slot is empty; callers are held off
    /// by the slot lock until the new interpreter is in place or the store
    /// moves to `Failed`.
    async fn relaunch(&self, slot: &mut Option<Box<dyn Interpreter>>) {
        info!("relaunching interpreter, runs wait until it is up");
        if let Some(mut old) = slot.take() {
            old.shutdown().await;
        }
        match self.launch().await {
            Ok(interp) => {
                info!("interpreter relaunched");
                *slot = Some(interp);
            }
            Err(e) => {
                error!(error = %e, "interpreter relaunch failed");
                let _ = self.store.set(ReadinessState::Failed(format!("interpreter lost: {}", e)));
            }
        }
    }

    /// Stop the interpreter. The host is unusable afterwards.
    pub async fn shutdown(&self) {
        if let Some(Ok(slot)) = self.session.get() {
            if let Some(mut interp) = slot.lock().await.take() {
                info!("shutting down interpreter");
                interp.shutdown().await;
            }
        }
    }
}
