// src/main.rs

use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use protoc_extras::config::ExtrasConfig;
use protoc_extras::invocation::InvocationBuilder;
use protoc_extras::orchestrator::{Orchestrator, RunResult, TaskOutcome};
use protoc_extras::resolve::ExecutableResolver;
use protoc_extras::sys::protoc::discover_proto_files;
use protoc_extras::sys::{ConfiguredToolchains, LocalRepository, ProtocExecutor};

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    // ==============================================================================
    // 1. Configuration & Logging
    // ==============================================================================

    init_tracing();
    let config = ExtrasConfig::load()?;

    if config.skip {
        tracing::info!("Skipping extra plugin execution");
        return Ok(ExitCode::SUCCESS);
    }

    let working_dir = config.working_dir()?;
    let absolute = |p: &PathBuf| if p.is_absolute() { p.clone() } else { working_dir.join(p) };
    let registry = config.registry()?;

    // ==============================================================================
    // 2. Proto Sources
    // ==============================================================================

    let source_root = absolute(&config.protoc.proto_source_root);
    let proto_files = if config.protoc.proto_files.is_empty() {
        discover_proto_files(&source_root)?
    } else {
        config.protoc.proto_files.iter().map(absolute).collect()
    };

    if proto_files.is_empty() {
        tracing::info!(root = %source_root.display(), "No proto files to compile");
        return Ok(ExitCode::SUCCESS);
    }

    // ==============================================================================
    // 3. Dependency Injection & Run
    // ==============================================================================

    let repository = LocalRepository::new(
        config
            .repository
            .local
            .as_ref()
            .map(absolute)
            .unwrap_or_else(|| working_dir.join(".plugins")),
    );
    tracing::debug!(repository = %repository.root().display(), "Local plugin repository");

    let executables = ExecutableResolver::new(
        Box::new(ConfiguredToolchains::new(config.toolchains.clone())),
        Box::new(repository),
        working_dir.clone(),
    );
    let executor = ProtocExecutor::new(
        config.protoc.executable.clone(),
        source_root,
        config.protoc.include_directories.iter().map(absolute).collect(),
        proto_files,
    );

    let orchestrator = Orchestrator::new(
        InvocationBuilder::new(executables),
        Box::new(executor),
        Some(absolute(&config.output_base_directory)),
        config.failure_policy,
    );

    let result = orchestrator.run(&registry).await;
    report(&result)?;

    Ok(if result.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("PROTOC_EXTRAS_LOG_FORMAT").is_ok_and(|v| v == "json");

    if json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

fn report(result: &RunResult) -> Result<(), Box<dyn std::error::Error>> {
    for outcome in &result.outcomes {
        match outcome {
            TaskOutcome::Completed {
                plugin_id,
                output_directory,
                ..
            } => tracing::info!(plugin = %plugin_id, output = %output_directory.display(), "completed"),
            TaskOutcome::Failed { plugin_id, error } => {
                tracing::error!(plugin = %plugin_id, %error, "failed")
            }
            TaskOutcome::Skipped { plugin_id } => tracing::warn!(plugin = %plugin_id, "skipped"),
        }
    }

    if let Ok(path) = std::env::var("PROTOC_EXTRAS_REPORT") {
        std::fs::write(&path, serde_json::to_string_pretty(result)?)?;
        tracing::info!(path = %path, "Wrote run report");
    }
    Ok(())
}
