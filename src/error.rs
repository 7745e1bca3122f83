// src/error.rs

use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

/// Per-task failure carried in a `TaskOutcome`.
///
/// Every variant names the plugin it belongs to so a rendered `RunResult`
/// reads on its own without the Registry at hand.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExtrasError {
    #[error("no output directory could be computed for plugin '{plugin_id}'")]
    MissingOutputBase { plugin_id: String },

    #[error("no executable configured for plugin '{plugin_id}'")]
    NoExecutableConfigured { plugin_id: String },

    #[error("artifact '{coordinate}' for plugin '{plugin_id}' not found")]
    ArtifactNotFound { plugin_id: String, coordinate: String },

    #[error("artifact '{coordinate}' for plugin '{plugin_id}' is not executable: {path:?}")]
    ArtifactNotExecutable {
        plugin_id: String,
        coordinate: String,
        path: PathBuf,
    },

    #[error("plugin '{plugin_id}' shares output directory {path:?} with {conflicts_with:?}")]
    DuplicateOutputDirectory {
        plugin_id: String,
        path: PathBuf,
        conflicts_with: Vec<String>,
    },

    #[error("executable resolution failed for plugin '{plugin_id}': {reason}")]
    ExecutableResolutionFailed { plugin_id: String, reason: String },

    #[error("protoc failed for plugin '{plugin_id}' (exit code {exit_code:?}): {reason}")]
    ProcessExecutionFailed {
        plugin_id: String,
        exit_code: Option<i32>,
        reason: String,
    },
}

impl ExtrasError {
    pub fn plugin_id(&self) -> &str {
        match self {
            Self::MissingOutputBase { plugin_id }
            | Self::NoExecutableConfigured { plugin_id }
            | Self::ArtifactNotFound { plugin_id, .. }
            | Self::ArtifactNotExecutable { plugin_id, .. }
            | Self::DuplicateOutputDirectory { plugin_id, .. }
            | Self::ExecutableResolutionFailed { plugin_id, .. }
            | Self::ProcessExecutionFailed { plugin_id, .. } => plugin_id,
        }
    }
}

/// Raised while sealing a Registry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("extra plugin at position {position} has an empty id")]
    EmptyTaskId { position: usize },

    #[error("extra plugin id '{0}' may only contain ASCII letters, digits, '-' and '_'")]
    InvalidTaskId(String),

    #[error("duplicate extra plugin id: {0}")]
    DuplicateTaskId(String),
}

/// Raised by an `ArtifactResolver`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ArtifactError {
    #[error("invalid artifact coordinate '{0}' (expected group:artifact:version[:type[:classifier]])")]
    InvalidCoordinate(String),

    #[error("artifact not found at {0:?}")]
    NotFound(PathBuf),

    #[error("artifact at {0:?} is not executable")]
    NotExecutable(PathBuf),

    #[error("io error: {0}")]
    Io(String),
}

/// Raised by a `ProcessExecutor` when protoc could not be run at all.
/// A non-zero exit is not a `ProcessError`; it is reported through `ExecutionReport`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProcessError {
    #[error("failed to launch {executable:?}: {reason}")]
    Launch { executable: PathBuf, reason: String },

    #[error("io error: {0}")]
    Io(String),
}

impl From<std::io::Error> for ProcessError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid value for {key}: {reason}")]
    InvalidValue { key: String, reason: String },

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plugin_id_is_reachable_from_every_variant() {
        let err = ExtrasError::DuplicateOutputDirectory {
            plugin_id: "grpc".into(),
            path: PathBuf::from("/out/shared"),
            conflicts_with: vec!["kotlin".into()],
        };
        assert_eq!(err.plugin_id(), "grpc");

        let err = ExtrasError::ProcessExecutionFailed {
            plugin_id: "kotlin".into(),
            exit_code: Some(1),
            reason: "boom".into(),
        };
        assert_eq!(err.plugin_id(), "kotlin");
    }

    #[test]
    fn serializes_with_kind_tag() {
        let err = ExtrasError::NoExecutableConfigured { plugin_id: "a".into() };
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["kind"], "no_executable_configured");
        assert_eq!(json["plugin_id"], "a");
    }
}
