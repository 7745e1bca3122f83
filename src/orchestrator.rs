// src/orchestrator.rs

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::ExtrasError;
use crate::invocation::InvocationBuilder;
use crate::sys::traits::ProcessExecutor;
use crate::task::{Registry, TaskDescriptor};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// First failure stops the run; the rest are reported `Skipped`.
    #[default]
    FailFast,
    ContinueOnError,
}

impl FromStr for FailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "fail-fast" => Ok(Self::FailFast),
            "continue-on-error" => Ok(Self::ContinueOnError),
            other => Err(format!(
                "unknown failure policy '{other}' (expected 'fail-fast' or 'continue-on-error')"
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum TaskOutcome {
    Completed {
        plugin_id: String,
        executable: PathBuf,
        output_directory: PathBuf,
    },
    Failed {
        plugin_id: String,
        error: ExtrasError,
    },
    Skipped {
        plugin_id: String,
    },
}

impl TaskOutcome {
    pub fn plugin_id(&self) -> &str {
        match self {
            Self::Completed { plugin_id, .. }
            | Self::Failed { plugin_id, .. }
            | Self::Skipped { plugin_id } => plugin_id,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }

    pub fn error(&self) -> Option<&ExtrasError> {
        match self {
            Self::Failed { error, .. } => Some(error),
            _ => None,
        }
    }

    fn failed(error: ExtrasError) -> Self {
        Self::Failed {
            plugin_id: error.plugin_id().to_string(),
            error,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    AllSucceeded,
    PartialFailure,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunResult {
    pub status: RunStatus,
    pub outcomes: Vec<TaskOutcome>,
}

impl RunResult {
    fn from_outcomes(outcomes: Vec<TaskOutcome>) -> Self {
        let status = if outcomes.iter().all(TaskOutcome::is_completed) {
            RunStatus::AllSucceeded
        } else {
            RunStatus::PartialFailure
        };
        Self { status, outcomes }
    }

    pub fn is_success(&self) -> bool {
        self.status == RunStatus::AllSucceeded
    }

    /// Success because no work was configured, as opposed to work that all passed.
    pub fn nothing_to_do(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn failures(&self) -> impl Iterator<Item = &ExtrasError> {
        self.outcomes.iter().filter_map(TaskOutcome::error)
    }
}

/// Drives one protoc run per extra plugin, strictly in registry order.
pub struct Orchestrator {
    builder: InvocationBuilder,
    executor: Box<dyn ProcessExecutor>,
    default_output_base: Option<PathBuf>,
    policy: FailurePolicy,
}

impl Orchestrator {
    pub fn new(
        builder: InvocationBuilder,
        executor: Box<dyn ProcessExecutor>,
        default_output_base: Option<PathBuf>,
        policy: FailurePolicy,
    ) -> Self {
        Self {
            builder,
            executor,
            default_output_base,
            policy,
        }
    }

    pub async fn run(&self, registry: &Registry) -> RunResult {
        if registry.is_empty() {
            tracing::info!("No extra plugins to execute.");
            return RunResult::from_outcomes(Vec::new());
        }

        tracing::info!(plugins = registry.len(), policy = ?self.policy, "Starting extra plugin run");

        let default_base = self.default_output_base.as_deref();
        let planned: Vec<Result<PathBuf, ExtrasError>> = registry
            .iter()
            .map(|task| self.builder.output_directory(task, default_base))
            .collect();
        let mut collisions = find_collisions(registry, &planned);

        let mut outcomes = Vec::with_capacity(registry.len());
        let mut aborted = false;

        for (idx, task) in registry.iter().enumerate() {
            if aborted {
                // Known collisions stay Failed: they were never runnable work.
                let outcome = match collisions.remove(&idx) {
                    Some(err) => TaskOutcome::failed(err),
                    None => TaskOutcome::Skipped {
                        plugin_id: task.id.clone(),
                    },
                };
                outcomes.push(outcome);
                continue;
            }

            let outcome = if let Some(err) = collisions.remove(&idx) {
                TaskOutcome::failed(err)
            } else if let Err(err) = &planned[idx] {
                TaskOutcome::failed(err.clone())
            } else {
                self.run_task(task, default_base).await
            };

            if let Some(err) = outcome.error() {
                tracing::error!(plugin = %task.id, error = %err, "Extra plugin failed");
                if self.policy == FailurePolicy::FailFast {
                    aborted = true;
                }
            }
            outcomes.push(outcome);
        }

        let result = RunResult::from_outcomes(outcomes);
        tracing::info!(status = ?result.status, "Extra plugin run finished");
        result
    }

    async fn run_task(&self, task: &TaskDescriptor, default_base: Option<&Path>) -> TaskOutcome {
        let invocation = match self.builder.build(task, default_base).await {
            Ok(invocation) => invocation,
            Err(err) => return TaskOutcome::failed(err),
        };

        tracing::info!(
            plugin = %invocation.plugin_id,
            executable = %invocation.executable.display(),
            output = %invocation.output_directory.display(),
            "Running extra plugin"
        );

        match self.executor.execute(&invocation).await {
            Ok(report) if report.success() => TaskOutcome::Completed {
                plugin_id: invocation.plugin_id,
                executable: invocation.executable,
                output_directory: invocation.output_directory,
            },
            Ok(report) => TaskOutcome::failed(ExtrasError::ProcessExecutionFailed {
                plugin_id: invocation.plugin_id,
                exit_code: Some(report.exit_code),
                reason: report.stderr_summary,
            }),
            Err(err) => TaskOutcome::failed(ExtrasError::ProcessExecutionFailed {
                plugin_id: invocation.plugin_id,
                exit_code: None,
                reason: err.to_string(),
            }),
        }
    }
}

/// Maps registry index -> `DuplicateOutputDirectory` for every task sharing a directory.
fn find_collisions(
    registry: &Registry,
    planned: &[Result<PathBuf, ExtrasError>],
) -> HashMap<usize, ExtrasError> {
    let mut by_dir: HashMap<&Path, Vec<usize>> = HashMap::new();
    for (idx, dir) in planned.iter().enumerate() {
        if let Ok(dir) = dir {
            by_dir.entry(dir.as_path()).or_default().push(idx);
        }
    }

    let ids: Vec<&str> = registry.iter().map(|t| t.id.as_str()).collect();
    let mut collisions = HashMap::new();
    for (dir, members) in by_dir.into_iter().filter(|(_, m)| m.len() > 1) {
        for &idx in &members {
            let conflicts_with = members
                .iter()
                .filter(|&&other| other != idx)
                .map(|&other| ids[other].to_string())
                .collect();
            collisions.insert(
                idx,
                ExtrasError::DuplicateOutputDirectory {
                    plugin_id: ids[idx].to_string(),
                    path: dir.to_path_buf(),
                    conflicts_with,
                },
            );
        }
    }
    collisions
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_policy_parses_kebab_case() {
        assert_eq!("fail-fast".parse::<FailurePolicy>(), Ok(FailurePolicy::FailFast));
        assert_eq!(
            " continue-on-error ".parse::<FailurePolicy>(),
            Ok(FailurePolicy::ContinueOnError)
        );
        assert!("sometimes".parse::<FailurePolicy>().is_err());
    }

    #[test]
    fn collisions_cover_every_member_and_compare_normalised_paths() {
        let registry = Registry::builder()
            .push(TaskDescriptor::new("a"))
            .push(TaskDescriptor::new("b"))
            .push(TaskDescriptor::new("c"))
            .seal()
            .unwrap();
        let planned = vec![
            Ok(PathBuf::from("/out/shared")),
            Ok(PathBuf::from("/out/unique")),
            Ok(PathBuf::from("/out/./shared/")),
        ];

        let collisions = find_collisions(&registry, &planned);
        assert_eq!(collisions.len(), 2);
        assert_eq!(
            collisions[&0],
            ExtrasError::DuplicateOutputDirectory {
                plugin_id: "a".into(),
                path: "/out/shared".into(),
                conflicts_with: vec!["c".into()],
            }
        );
        assert!(matches!(
            &collisions[&2],
            ExtrasError::DuplicateOutputDirectory { plugin_id, conflicts_with, .. }
                if plugin_id == "c" && conflicts_with == &vec!["a".to_string()]
        ));
    }

    #[test]
    fn status_requires_every_outcome_completed() {
        let ok = TaskOutcome::Completed {
            plugin_id: "a".into(),
            executable: "/bin/a".into(),
            output_directory: "/out/a".into(),
        };
        let skipped = TaskOutcome::Skipped { plugin_id: "b".into() };

        assert!(RunResult::from_outcomes(vec![ok.clone()]).is_success());
        assert_eq!(
            RunResult::from_outcomes(vec![ok, skipped]).status,
            RunStatus::PartialFailure
        );
        let empty = RunResult::from_outcomes(Vec::new());
        assert!(empty.is_success() && empty.nothing_to_do());
    }
}
