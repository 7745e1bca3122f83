// src/sys/toolchain.rs

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;

use crate::sys::traits::ToolchainProvider;

/// One named toolchain from the `[toolchains.<name>]` table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ToolchainDef {
    /// Fallback lookup: `<home>/bin/<tool>`.
    pub home: Option<PathBuf>,
    #[serde(default)]
    pub tools: HashMap<String, PathBuf>,
}

pub struct ConfiguredToolchains {
    toolchains: HashMap<String, ToolchainDef>,
}

impl ConfiguredToolchains {
    pub fn new(toolchains: HashMap<String, ToolchainDef>) -> Self {
        Self { toolchains }
    }
}

#[async_trait]
impl ToolchainProvider for ConfiguredToolchains {
    async fn find_tool(&self, toolchain: &str, tool: &str) -> Option<PathBuf> {
        let def = self.toolchains.get(toolchain)?;
        tracing::info!(toolchain, ?def, "Toolchain in protoc-extras");

        if let Some(path) = def.tools.get(tool) {
            return Some(path.clone());
        }

        let candidate = def.home.as_ref()?.join("bin").join(tool);
        match tokio::fs::metadata(&candidate).await {
            Ok(meta) if meta.is_file() => Some(candidate),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn explicit_tool_mapping_wins() {
        let mut tools = HashMap::new();
        tools.insert("grpc".to_string(), PathBuf::from("/opt/grpc/protoc-gen-grpc"));
        let provider = ConfiguredToolchains::new(HashMap::from([(
            "protobuf".to_string(),
            ToolchainDef {
                home: Some("/unused".into()),
                tools,
            },
        )]));

        assert_eq!(
            provider.find_tool("protobuf", "grpc").await,
            Some(PathBuf::from("/opt/grpc/protoc-gen-grpc"))
        );
    }

    #[tokio::test]
    async fn falls_back_to_home_bin() {
        let home = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(home.path().join("bin")).unwrap();
        std::fs::write(home.path().join("bin/protoc-gen-kotlin"), "").unwrap();

        let provider = ConfiguredToolchains::new(HashMap::from([(
            "protobuf".to_string(),
            ToolchainDef {
                home: Some(home.path().to_path_buf()),
                tools: HashMap::new(),
            },
        )]));

        assert_eq!(
            provider.find_tool("protobuf", "protoc-gen-kotlin").await,
            Some(home.path().join("bin/protoc-gen-kotlin"))
        );
        assert_eq!(provider.find_tool("protobuf", "protoc-gen-missing").await, None);
    }

    #[tokio::test]
    async fn unknown_toolchain_is_a_miss() {
        let provider = ConfiguredToolchains::new(HashMap::new());
        assert_eq!(provider.find_tool("protobuf", "grpc").await, None);
    }
}
