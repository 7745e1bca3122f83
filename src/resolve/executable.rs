// src/resolve/executable.rs

use std::path::{Path, PathBuf};

use crate::error::{ArtifactError, ExtrasError};
use crate::sys::traits::{ArtifactResolver, ToolchainProvider};
use crate::task::{ExecutableSource, TaskDescriptor};

/// Picks the plugin executable: explicit path, then toolchain, then artifact.
pub struct ExecutableResolver {
    toolchains: Box<dyn ToolchainProvider>,
    artifacts: Box<dyn ArtifactResolver>,
    working_dir: PathBuf,
}

impl ExecutableResolver {
    pub fn new(
        toolchains: Box<dyn ToolchainProvider>,
        artifacts: Box<dyn ArtifactResolver>,
        working_dir: PathBuf,
    ) -> Self {
        Self {
            toolchains,
            artifacts,
            working_dir,
        }
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    pub async fn resolve(&self, task: &TaskDescriptor) -> Result<PathBuf, ExtrasError> {
        for source in task.executable_sources() {
            match source {
                ExecutableSource::Explicit(path) => {
                    if let Some((toolchain, _)) = task.toolchain() {
                        tracing::warn!(
                            plugin = %task.id,
                            toolchain,
                            executable = %path.display(),
                            "Toolchain ignored, explicit plugin executable is set"
                        );
                    }
                    return Ok(self.absolutize(path));
                }
                ExecutableSource::Toolchain { toolchain, tool } => {
                    match self.toolchains.find_tool(toolchain, tool).await {
                        Some(path) => {
                            tracing::info!(plugin = %task.id, toolchain, tool, path = %path.display(), "Plugin resolved from toolchain");
                            return Ok(self.absolutize(&path));
                        }
                        None => {
                            tracing::debug!(plugin = %task.id, toolchain, tool, "Toolchain lookup missed");
                        }
                    }
                }
                ExecutableSource::Artifact(coordinate) => {
                    let path = self
                        .artifacts
                        .resolve_binary(coordinate)
                        .await
                        .map_err(|e| artifact_failure(&task.id, coordinate, e))?;
                    tracing::info!(plugin = %task.id, coordinate, path = %path.display(), "Plugin resolved from artifact");
                    return Ok(self.absolutize(&path));
                }
            }
        }

        Err(ExtrasError::NoExecutableConfigured {
            plugin_id: task.id.clone(),
        })
    }

    fn absolutize(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.working_dir.join(path)
        }
    }
}

fn artifact_failure(plugin_id: &str, coordinate: &str, err: ArtifactError) -> ExtrasError {
    match err {
        ArtifactError::NotFound(_) => ExtrasError::ArtifactNotFound {
            plugin_id: plugin_id.to_string(),
            coordinate: coordinate.to_string(),
        },
        ArtifactError::NotExecutable(path) => ExtrasError::ArtifactNotExecutable {
            plugin_id: plugin_id.to_string(),
            coordinate: coordinate.to_string(),
            path,
        },
        other => ExtrasError::ExecutableResolutionFailed {
            plugin_id: plugin_id.to_string(),
            reason: other.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use tracing_subscriber::fmt::MakeWriter;

    struct CountingToolchains {
        calls: Arc<AtomicUsize>,
        answer: Option<PathBuf>,
    }

    #[async_trait]
    impl ToolchainProvider for CountingToolchains {
        async fn find_tool(&self, _toolchain: &str, _tool: &str) -> Option<PathBuf> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.answer.clone()
        }
    }

    struct CannedArtifacts(Result<PathBuf, ArtifactError>);

    #[async_trait]
    impl ArtifactResolver for CannedArtifacts {
        async fn resolve_binary(&self, _coordinate: &str) -> Result<PathBuf, ArtifactError> {
            self.0.clone()
        }
    }

    fn build_resolver(
        toolchain_answer: Option<&str>,
        artifact: Result<PathBuf, ArtifactError>,
    ) -> (ExecutableResolver, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let resolver = ExecutableResolver::new(
            Box::new(CountingToolchains {
                calls: calls.clone(),
                answer: toolchain_answer.map(PathBuf::from),
            }),
            Box::new(CannedArtifacts(artifact)),
            PathBuf::from("/work"),
        );
        (resolver, calls)
    }

    #[tokio::test]
    async fn explicit_path_skips_toolchain_lookup() {
        let (resolver, calls) = build_resolver(Some("/tc/bin/grpc"), Ok("/repo/grpc.exe".into()));
        let task = TaskDescriptor::new("grpc")
            .with_executable("/bin/x")
            .with_toolchain("protobuf", "grpc");

        assert_eq!(resolver.resolve(&task).await.unwrap(), PathBuf::from("/bin/x"));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl Captured {
        fn text(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    impl std::io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for Captured {
        type Writer = Captured;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    async fn warnings_for(task: &TaskDescriptor) -> String {
        let captured = Captured::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(captured.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::WARN)
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let (resolver, _) = build_resolver(Some("/tc/bin/grpc"), Ok("/repo/grpc.exe".into()));
        resolver.resolve(task).await.unwrap();
        captured.text()
    }

    #[tokio::test]
    async fn ignored_toolchain_is_warned_only_when_shadowed_by_explicit_path() {
        let both = TaskDescriptor::new("grpc")
            .with_executable("/bin/x")
            .with_toolchain("protobuf", "grpc");
        let logs = warnings_for(&both).await;
        assert!(logs.contains("Toolchain ignored"), "missing warning in: {logs}");
        assert!(logs.contains("grpc"));

        let explicit_only = TaskDescriptor::new("grpc").with_executable("/bin/x");
        assert!(!warnings_for(&explicit_only).await.contains("Toolchain ignored"));

        let toolchain_only = TaskDescriptor::new("grpc").with_toolchain("protobuf", "grpc");
        assert!(!warnings_for(&toolchain_only).await.contains("Toolchain ignored"));
    }

    #[tokio::test]
    async fn relative_explicit_path_is_joined_to_working_dir() {
        let (resolver, _) = build_resolver(None, Err(ArtifactError::Io("unused".into())));
        let task = TaskDescriptor::new("grpc").with_executable("tools/protoc-gen-grpc");

        assert_eq!(
            resolver.resolve(&task).await.unwrap(),
            PathBuf::from("/work/tools/protoc-gen-grpc")
        );
    }

    #[tokio::test]
    async fn toolchain_hit_wins_over_artifact() {
        let (resolver, calls) = build_resolver(Some("/tc/bin/grpc"), Ok("/repo/grpc.exe".into()));
        let task = TaskDescriptor::new("grpc")
            .with_toolchain("protobuf", "grpc")
            .with_artifact("io.grpc:protoc-gen-grpc-java:1.60.0");

        assert_eq!(resolver.resolve(&task).await.unwrap(), PathBuf::from("/tc/bin/grpc"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn toolchain_miss_falls_through_to_artifact() {
        let (resolver, calls) = build_resolver(None, Ok("/repo/grpc.exe".into()));
        let task = TaskDescriptor::new("grpc")
            .with_toolchain("protobuf", "grpc")
            .with_artifact("io.grpc:protoc-gen-grpc-java:1.60.0");

        assert_eq!(resolver.resolve(&task).await.unwrap(), PathBuf::from("/repo/grpc.exe"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn toolchain_miss_without_artifact_is_unconfigured() {
        let (resolver, _) = build_resolver(None, Ok("/repo/unused".into()));
        let task = TaskDescriptor::new("grpc").with_toolchain("protobuf", "grpc");

        assert_eq!(
            resolver.resolve(&task).await.unwrap_err(),
            ExtrasError::NoExecutableConfigured {
                plugin_id: "grpc".into()
            }
        );
    }

    #[tokio::test]
    async fn nothing_configured() {
        let (resolver, calls) = build_resolver(Some("/tc/bin/grpc"), Ok("/repo/unused".into()));
        let err = resolver.resolve(&TaskDescriptor::new("a")).await.unwrap_err();

        assert_eq!(err, ExtrasError::NoExecutableConfigured { plugin_id: "a".into() });
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn artifact_errors_are_mapped() {
        let task = TaskDescriptor::new("grpc").with_artifact("g:a:v");

        let (resolver, _) = build_resolver(None, Err(ArtifactError::NotFound("/repo/g/a".into())));
        assert_eq!(
            resolver.resolve(&task).await.unwrap_err(),
            ExtrasError::ArtifactNotFound {
                plugin_id: "grpc".into(),
                coordinate: "g:a:v".into()
            }
        );

        let (resolver, _) = build_resolver(None, Err(ArtifactError::NotExecutable("/repo/a.exe".into())));
        assert_eq!(
            resolver.resolve(&task).await.unwrap_err(),
            ExtrasError::ArtifactNotExecutable {
                plugin_id: "grpc".into(),
                coordinate: "g:a:v".into(),
                path: "/repo/a.exe".into()
            }
        );

        let (resolver, _) = build_resolver(None, Err(ArtifactError::InvalidCoordinate("g:a:v".into())));
        assert!(matches!(
            resolver.resolve(&task).await.unwrap_err(),
            ExtrasError::ExecutableResolutionFailed { .. }
        ));
    }
}
