// src/task.rs

use std::collections::HashSet;
use std::path::PathBuf;

use crate::error::RegistryError;

/// One configured extra plugin.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskDescriptor {
    pub id: String,
    pub output_directory: Option<PathBuf>,
    pub output_base_directory: Option<PathBuf>,
    pub executable_path: Option<PathBuf>,
    pub parameter: Option<String>,
    pub toolchain_name: Option<String>,
    pub tool_name: Option<String>,
    pub artifact_coordinate: Option<String>,
}

/// Where a plugin executable may come from, in precedence order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutableSource<'a> {
    Explicit(&'a PathBuf),
    Toolchain { toolchain: &'a str, tool: &'a str },
    Artifact(&'a str),
}

impl TaskDescriptor {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    pub fn with_output_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_directory = Some(dir.into());
        self
    }

    pub fn with_output_base_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_base_directory = Some(dir.into());
        self
    }

    pub fn with_executable(mut self, path: impl Into<PathBuf>) -> Self {
        self.executable_path = Some(path.into());
        self
    }

    pub fn with_parameter(mut self, parameter: impl Into<String>) -> Self {
        self.parameter = Some(parameter.into());
        self
    }

    pub fn with_toolchain(mut self, toolchain: impl Into<String>, tool: impl Into<String>) -> Self {
        self.toolchain_name = Some(toolchain.into());
        self.tool_name = Some(tool.into());
        self
    }

    pub fn with_artifact(mut self, coordinate: impl Into<String>) -> Self {
        self.artifact_coordinate = Some(coordinate.into());
        self
    }

    /// The toolchain pair, only when both halves are set.
    pub fn toolchain(&self) -> Option<(&str, &str)> {
        match (&self.toolchain_name, &self.tool_name) {
            (Some(tc), Some(tool)) => Some((tc.as_str(), tool.as_str())),
            _ => None,
        }
    }

    /// Configured sources, highest precedence first.
    pub fn executable_sources(&self) -> Vec<ExecutableSource<'_>> {
        let mut sources = Vec::with_capacity(3);
        if let Some(path) = &self.executable_path {
            sources.push(ExecutableSource::Explicit(path));
        }
        if let Some((toolchain, tool)) = self.toolchain() {
            sources.push(ExecutableSource::Toolchain { toolchain, tool });
        }
        if let Some(coordinate) = &self.artifact_coordinate {
            sources.push(ExecutableSource::Artifact(coordinate));
        }
        sources
    }
}

/// Sealed, ordered collection of extra plugins. Execution order is insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Registry {
    tasks: Vec<TaskDescriptor>,
}

impl Registry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TaskDescriptor> {
        self.tasks.iter()
    }

    pub fn get(&self, id: &str) -> Option<&TaskDescriptor> {
        self.tasks.iter().find(|t| t.id == id)
    }
}

impl<'a> IntoIterator for &'a Registry {
    type Item = &'a TaskDescriptor;
    type IntoIter = std::slice::Iter<'a, TaskDescriptor>;

    fn into_iter(self) -> Self::IntoIter {
        self.tasks.iter()
    }
}

#[derive(Debug, Default)]
pub struct RegistryBuilder {
    tasks: Vec<TaskDescriptor>,
}

impl RegistryBuilder {
    pub fn push(mut self, task: TaskDescriptor) -> Self {
        self.tasks.push(task);
        self
    }

    /// Validates ids and freezes the collection.
    pub fn seal(self) -> Result<Registry, RegistryError> {
        self.validate()?;
        Ok(Registry { tasks: self.tasks })
    }

    fn validate(&self) -> Result<(), RegistryError> {
        let mut seen = HashSet::with_capacity(self.tasks.len());
        for (position, task) in self.tasks.iter().enumerate() {
            if task.id.is_empty() {
                return Err(RegistryError::EmptyTaskId { position });
            }
            // The id ends up inside protoc flags: --plugin=protoc-gen-<id> and --<id>_out
            if !task
                .id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
            {
                return Err(RegistryError::InvalidTaskId(task.id.clone()));
            }
            if !seen.insert(task.id.as_str()) {
                return Err(RegistryError::DuplicateTaskId(task.id.clone()));
            }
        }
        Ok(())
    }
}

impl FromIterator<TaskDescriptor> for RegistryBuilder {
    fn from_iter<I: IntoIterator<Item = TaskDescriptor>>(iter: I) -> Self {
        Self {
            tasks: iter.into_iter().collect(),
        }
    }
}
