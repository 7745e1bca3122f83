//! Runs `protoc` once per configured extra plugin.
//!
//! A [`Registry`] of [`TaskDescriptor`]s is turned into [`InvocationSpec`]s
//! (output directory + plugin executable) and handed, one at a time, to a
//! [`ProcessExecutor`]. Toolchain lookup, artifact resolution and process
//! execution are injected through the traits in [`sys::traits`].

pub mod config;
pub mod error;
pub mod invocation;
pub mod orchestrator;
pub mod resolve;
pub mod sys;
pub mod task;

pub use config::ExtrasConfig;
pub use error::{ArtifactError, ConfigError, ExtrasError, ProcessError, RegistryError};
pub use invocation::{InvocationBuilder, InvocationSpec};
pub use orchestrator::{FailurePolicy, Orchestrator, RunResult, RunStatus, TaskOutcome};
pub use resolve::{ExecutableResolver, PathResolver};
pub use sys::traits::{ArtifactResolver, ExecutionReport, ProcessExecutor, ToolchainProvider};
pub use task::{ExecutableSource, Registry, TaskDescriptor};
