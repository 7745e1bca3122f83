// src/config.rs

use serde::Deserialize;
use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::orchestrator::FailurePolicy;
use crate::sys::toolchain::ToolchainDef;
use crate::task::{Registry, TaskDescriptor};

pub const CONFIG_ENV: &str = "PROTOC_EXTRAS_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "protoc-extras.toml";
pub const DEFAULT_OUTPUT_BASE: &str = "target/generated-sources/protobuf";

#[derive(Clone, Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExtrasConfig {
    /// Process-wide base; each plugin writes to `<base>/<id>` unless it overrides.
    /// Relative to the working directory.
    pub output_base_directory: PathBuf,
    /// Relative paths are resolved against this. Defaults to the current directory.
    pub working_directory: Option<PathBuf>,
    pub failure_policy: FailurePolicy,
    pub skip: bool,
    pub protoc: ProtocSettings,
    pub toolchains: HashMap<String, ToolchainDef>,
    pub repository: RepositorySettings,
    pub extra_plugins: Vec<PluginConfig>,
}

impl Default for ExtrasConfig {
    fn default() -> Self {
        Self {
            output_base_directory: PathBuf::from(DEFAULT_OUTPUT_BASE),
            working_directory: None,
            failure_policy: FailurePolicy::default(),
            skip: false,
            protoc: ProtocSettings::default(),
            toolchains: HashMap::new(),
            repository: RepositorySettings::default(),
            extra_plugins: Vec::new(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProtocSettings {
    pub executable: PathBuf,
    pub proto_source_root: PathBuf,
    pub include_directories: Vec<PathBuf>,
    /// Explicit sources. Empty means: scan `proto_source_root`.
    pub proto_files: Vec<PathBuf>,
}

impl Default for ProtocSettings {
    fn default() -> Self {
        Self {
            executable: PathBuf::from("protoc"),
            proto_source_root: PathBuf::from("src/main/proto"),
            include_directories: Vec::new(),
            proto_files: Vec::new(),
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RepositorySettings {
    pub local: Option<PathBuf>,
}

/// One `[[extra_plugins]]` record.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PluginConfig {
    pub id: String,
    pub output_directory: Option<PathBuf>,
    pub output_base_directory: Option<PathBuf>,
    pub executable: Option<PathBuf>,
    pub parameter: Option<String>,
    pub toolchain: Option<String>,
    pub tool: Option<String>,
    pub artifact: Option<String>,
}

impl ExtrasConfig {
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Reads the TOML file named by `PROTOC_EXTRAS_CONFIG` and layers env overrides on top.
    /// A missing default file is not an error; a missing explicitly named one is.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let explicit = lookup(CONFIG_ENV).filter(|v| !v.trim().is_empty());
        let path = PathBuf::from(explicit.as_deref().unwrap_or(DEFAULT_CONFIG_FILE));

        let mut cfg = match std::fs::read_to_string(&path) {
            Ok(raw) => Self::from_toml_str(&raw, &path)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound && explicit.is_none() => {
                tracing::debug!(path = %path.display(), "No config file, using defaults");
                Self::default()
            }
            Err(source) => return Err(ConfigError::Read { path, source }),
        };

        cfg.apply_overrides(&lookup)?;
        Ok(cfg)
    }

    pub fn from_toml_str(raw: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    fn apply_overrides<F>(&mut self, lookup: &F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("PROTOC_EXTRAS_OUTPUT_BASE") {
            self.output_base_directory = PathBuf::from(v);
        }
        if let Some(v) = get("PROTOC_EXTRAS_FAILURE_POLICY") {
            self.failure_policy = v.parse().map_err(|reason| ConfigError::InvalidValue {
                key: "PROTOC_EXTRAS_FAILURE_POLICY".into(),
                reason,
            })?;
        }
        if let Some(v) = get("PROTOC_EXTRAS_PROTOC") {
            self.protoc.executable = PathBuf::from(v);
        }
        if let Some(v) = get("PROTOC_EXTRAS_SKIP") {
            self.skip = match v.trim() {
                "1" | "true" | "yes" => true,
                "0" | "false" | "no" => false,
                other => {
                    return Err(ConfigError::InvalidValue {
                        key: "PROTOC_EXTRAS_SKIP".into(),
                        reason: format!("expected a boolean, got '{other}'"),
                    });
                }
            };
        }

        if self.repository.local.is_none() {
            self.repository.local = get("HOME").map(|home| Path::new(&home).join(".m2/repository"));
        }
        Ok(())
    }

    /// Absolute working directory.
    pub fn working_dir(&self) -> Result<PathBuf, ConfigError> {
        let cwd = env::current_dir().map_err(|e| ConfigError::InvalidValue {
            key: "working_directory".into(),
            reason: e.to_string(),
        })?;
        Ok(match &self.working_directory {
            Some(dir) if dir.is_absolute() => dir.clone(),
            Some(dir) => cwd.join(dir),
            None => cwd,
        })
    }

    /// Seals the configured extra plugins, in file order.
    pub fn registry(&self) -> Result<Registry, ConfigError> {
        let builder = self
            .extra_plugins
            .iter()
            .map(PluginConfig::to_task)
            .collect::<crate::task::RegistryBuilder>();
        Ok(builder.seal()?)
    }
}

impl PluginConfig {
    fn to_task(&self) -> TaskDescriptor {
        if self.toolchain.is_some() != self.tool.is_some() {
            tracing::warn!(
                plugin = %self.id,
                "Both 'toolchain' and 'tool' are needed for toolchain lookup, ignoring the pair"
            );
        }

        TaskDescriptor {
            id: self.id.clone(),
            output_directory: self.output_directory.clone(),
            output_base_directory: self.output_base_directory.clone(),
            executable_path: self.executable.clone(),
            parameter: self.parameter.clone(),
            toolchain_name: self.toolchain.clone(),
            tool_name: self.tool.clone(),
            artifact_coordinate: self.artifact.clone(),
        }
    }
}
