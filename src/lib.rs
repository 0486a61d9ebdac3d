//! Interactive code-execution sandbox.
//!
//! A [`Sandbox`] owns one embedded interpreter (a Python worker process), brings
//! it up lazily, and runs code against it one request at a time. Each run
//! resolves to an [`Outcome`] with the captured text, rendered plot artifacts
//! and any error, and is recorded in a bounded [`History`].

pub mod config;
pub mod execution;
pub mod printer;
pub mod process;
pub mod runtime;
pub mod sandbox;
pub mod utils;

pub use config::{Config, SandboxSettings};
pub use execution::{ArtifactRef, ExecutionEngine, FailureKind, History, Outcome, OutputEvent, OutputSink, Stream};
pub use runtime::{ReadinessState, ReadinessStore, RuntimeHost};
pub use sandbox::Sandbox;
