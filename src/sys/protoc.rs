// src/sys/protoc.rs

use async_trait::async_trait;
use std::collections::VecDeque;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use walkdir::WalkDir;

use crate::error::ProcessError;
use crate::invocation::InvocationSpec;
use crate::sys::traits::{ExecutionReport, ProcessExecutor};

/// Lines of stderr kept for the failure summary.
const STDERR_SUMMARY_LINES: usize = 20;

/// Runs the real `protoc` binary with one native plugin per invocation.
pub struct ProtocExecutor {
    protoc: PathBuf,
    proto_source_root: PathBuf,
    include_directories: Vec<PathBuf>,
    proto_files: Vec<PathBuf>,
}

impl ProtocExecutor {
    pub fn new(
        protoc: PathBuf,
        proto_source_root: PathBuf,
        include_directories: Vec<PathBuf>,
        proto_files: Vec<PathBuf>,
    ) -> Self {
        Self {
            protoc,
            proto_source_root,
            include_directories,
            proto_files,
        }
    }

    /// `--proto_path`s, then the plugin binding, then the `_out` flag, then sources.
    pub fn arguments(&self, invocation: &InvocationSpec) -> Vec<OsString> {
        let mut args = Vec::with_capacity(3 + self.include_directories.len() + self.proto_files.len());

        args.push(prefixed("--proto_path=", &self.proto_source_root));
        for dir in &self.include_directories {
            args.push(prefixed("--proto_path=", dir));
        }

        args.push(prefixed(
            &format!("--plugin=protoc-gen-{}=", invocation.plugin_id),
            &invocation.executable,
        ));

        let mut out_flag = format!("--{}_out=", invocation.plugin_id);
        if let Some(parameter) = &invocation.parameter {
            out_flag.push_str(parameter);
            out_flag.push(':');
        }
        args.push(prefixed(&out_flag, &invocation.output_directory));

        args.extend(self.proto_files.iter().map(|f| f.as_os_str().to_os_string()));
        args
    }
}

fn prefixed(prefix: &str, path: &Path) -> OsString {
    let mut arg = OsString::from(prefix);
    arg.push(path.as_os_str());
    arg
}

#[async_trait]
impl ProcessExecutor for ProtocExecutor {
    async fn execute(&self, invocation: &InvocationSpec) -> Result<ExecutionReport, ProcessError> {
        tokio::fs::create_dir_all(&invocation.output_directory)
            .await
            .map_err(|e| {
                ProcessError::Io(format!(
                    "failed to create output directory {:?}: {}",
                    invocation.output_directory, e
                ))
            })?;

        let args = self.arguments(invocation);
        tracing::debug!(plugin = %invocation.plugin_id, protoc = %self.protoc.display(), ?args, "Spawning protoc");

        let mut child = Command::new(&self.protoc)
            .args(&args)
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ProcessError::Launch {
                executable: self.protoc.clone(),
                reason: e.to_string(),
            })?;

        let mut tail = VecDeque::with_capacity(STDERR_SUMMARY_LINES);
        if let Some(stderr) = child.stderr.take() {
            // protoc echoes file names verbatim, which are not guaranteed to be UTF-8.
            let mut reader = BufReader::new(stderr);
            let mut buf = Vec::new();
            loop {
                buf.clear();
                match reader.read_until(b'\n', &mut buf).await {
                    Ok(0) => break,
                    Ok(_) => {
                        let line = String::from_utf8_lossy(&buf).trim_end().to_string();
                        tracing::warn!(plugin = %invocation.plugin_id, "[protoc] {}", line);
                        if tail.len() == STDERR_SUMMARY_LINES {
                            tail.pop_front();
                        }
                        tail.push_back(line);
                    }
                    Err(e) => {
                        tracing::warn!(plugin = %invocation.plugin_id, error = %e, "Stopped reading protoc stderr");
                        break;
                    }
                }
            }
        }

        // Always reap the child so the next plugin never overlaps this one.
        let status = child.wait().await?;

        Ok(ExecutionReport {
            exit_code: status.code().unwrap_or(-1),
            stderr_summary: Vec::from(tail).join("\n"),
        })
    }
}

/// Every `*.proto` file under `root`, sorted so protoc sees a stable order.
pub fn discover_proto_files(root: &Path) -> Result<Vec<PathBuf>, ProcessError> {
    if !root.is_dir() {
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(root).follow_links(true) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) if e.loop_ancestor().is_some() => {
                tracing::warn!(error = %e, "Skipping symlink loop under proto source root");
                continue;
            }
            Err(e) => return Err(ProcessError::Io(e.to_string())),
        };
        if entry.file_type().is_file()
            && entry.path().extension().is_some_and(|ext| ext == "proto")
        {
            files.push(entry.into_path());
        }
    }
    files.sort();
    Ok(files)
}
