//! Explicitly owned sandbox context: readiness store, runtime host and engine.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::Mutex;
use tracing::info;

use crate::config::SandboxSettings;
use crate::execution::python::PythonLauncher;
use crate::execution::{ExecutionEngine, History, Outcome, OutputEvent};
use crate::runtime::{Launcher, ReadinessState, ReadinessStore, RuntimeHost};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RetryError {
    #[error("nothing to retry: runtime is {0}")]
    NotFailed(ReadinessState),
}

/// Constructed once per session and torn down with it.
pub struct Sandbox {
    store: Arc<ReadinessStore>,
    launcher: Arc<dyn Launcher>,
    settings: SandboxSettings,
    engine: ExecutionEngine,
    retry_lock: Mutex<()>,
}

impl Sandbox {
    pub fn new(launcher: Arc<dyn Launcher>, settings: SandboxSettings) -> Self {
        let store = Arc::new(ReadinessStore::new());
        let host = Arc::new(build_host(&launcher, &store, &settings));
        let engine = ExecutionEngine::new(host, settings.history_capacity);
        Self { store, launcher, settings, engine, retry_lock: Mutex::new(()) }
    }

    /// Sandbox backed by a Python worker process.
    pub fn python(settings: SandboxSettings) -> Self {
        let launcher = Arc::new(PythonLauncher::new(settings.python.clone()));
        Self::new(launcher, settings)
    }

    pub fn settings(&self) -> &SandboxSettings {
        &self.settings
    }

    pub fn readiness(&self) -> &Arc<ReadinessStore> {
        &self.store
    }

    pub fn state(&self) -> ReadinessState {
        self.store.current()
    }

    pub fn engine(&self) -> &ExecutionEngine {
        &self.engine
    }

    pub fn history(&self) -> History {
        self.engine.history()
    }

    pub async fn ensure_ready(&self) -> ReadinessState {
        self.engine.host().ensure_ready().await
    }

    pub async fn run(&self, code: impl Into<String>) -> Outcome {
        self.engine.run(code).await
    }

    pub async fn run_streaming(&self, code: impl Into<String>, listener: UnboundedSender<OutputEvent>) -> Outcome {
        self.engine.run_streaming(code, listener).await
    }

    /// Replace a failed host with a fresh one and bring it up (`Failed -> Loading`).
    pub async fn retry(&self) -> Result<ReadinessState, RetryError> {
        let _retrying = self.retry_lock.lock().await;
        let failed = self.engine.host();
        if !failed.is_failed() {
            return Err(RetryError::NotFailed(self.state()));
        }
        failed.shutdown().await;

        info!("retrying runtime setup with a fresh host");
        let host = Arc::new(build_host(&self.launcher, &self.store, &self.settings));
        self.engine.replace_host(host.clone());
        Ok(host.ensure_ready().await)
    }

    pub async fn shutdown(&self) {
        self.engine.host().shutdown().await;
    }
}

fn build_host(launcher: &Arc<dyn Launcher>, store: &Arc<ReadinessStore>, settings: &SandboxSettings) -> RuntimeHost {
    RuntimeHost::new(launcher.clone(), store.clone())
        .with_setup_timeout(settings.setup_timeout)
        .with_execution_timeout(settings.execution_timeout)
}
