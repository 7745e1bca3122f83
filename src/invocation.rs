// src/invocation.rs

use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::error::ExtrasError;
use crate::resolve::{ExecutableResolver, PathResolver};
use crate::task::TaskDescriptor;

/// A fully resolved, ready-to-run protoc call for one extra plugin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvocationSpec {
    pub plugin_id: String,
    pub executable: PathBuf,
    pub parameter: Option<String>,
    pub output_directory: PathBuf,
}

pub struct InvocationBuilder {
    executables: ExecutableResolver,
}

impl InvocationBuilder {
    pub fn new(executables: ExecutableResolver) -> Self {
        Self { executables }
    }

    /// Absolute output directory for `task`. Pure: no filesystem access.
    pub fn output_directory(
        &self,
        task: &TaskDescriptor,
        default_output_base: Option<&Path>,
    ) -> Result<PathBuf, ExtrasError> {
        let dir = PathResolver::resolve(
            task.output_directory.as_deref(),
            task.output_base_directory.as_deref(),
            default_output_base,
            &task.id,
        )?;

        if dir.is_absolute() {
            Ok(dir)
        } else {
            Ok(self.executables.working_dir().join(dir))
        }
    }

    pub async fn build(
        &self,
        task: &TaskDescriptor,
        default_output_base: Option<&Path>,
    ) -> Result<InvocationSpec, ExtrasError> {
        let output_directory = self.output_directory(task, default_output_base)?;
        let executable = self.executables.resolve(task).await?;

        Ok(InvocationSpec {
            plugin_id: task.id.clone(),
            executable,
            parameter: task.parameter.clone(),
            output_directory,
        })
    }
}
