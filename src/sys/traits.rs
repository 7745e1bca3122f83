use async_trait::async_trait;
use serde::Serialize;
use std::path::PathBuf;

use crate::error::{ArtifactError, ProcessError};
use crate::invocation::InvocationSpec;

// ==============================================================================
// 1. Process Execution (protoc + native plugin)
// ==============================================================================

/// What came back from one protoc run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutionReport {
    pub exit_code: i32,
    pub stderr_summary: String,
}

impl ExecutionReport {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

#[async_trait]
pub trait ProcessExecutor: Send + Sync {
    /// Runs the compiler for a single resolved invocation.
    /// A non-zero exit is returned as a report; only a failure to run at all is an `Err`.
    /// Creating `invocation.output_directory` is the executor's job.
    async fn execute(&self, invocation: &InvocationSpec) -> Result<ExecutionReport, ProcessError>;
}

// ==============================================================================
// 2. Toolchains
// ==============================================================================

#[async_trait]
pub trait ToolchainProvider: Send + Sync {
    /// Looks up `tool` inside the named toolchain. A miss is `None`, never an error.
    async fn find_tool(&self, toolchain: &str, tool: &str) -> Option<PathBuf>;
}

// ==============================================================================
// 3. Dependency Artifacts
// ==============================================================================

#[async_trait]
pub trait ArtifactResolver: Send + Sync {
    /// Resolves `group:artifact:version[:type[:classifier]]` to a local executable file.
    async fn resolve_binary(&self, coordinate: &str) -> Result<PathBuf, ArtifactError>;
}
