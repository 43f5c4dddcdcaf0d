// /////////////////////////////////////////////////////////////////////////////
// Subforge
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Subforge CLI
//!
//! Composition root: parses and validates CLI arguments, wires the
//! concrete infrastructure adapters to the domain ports, and dispatches
//! to the matching application use case. Exit codes follow the
//! documented external contract (spec §6) via [`subforge_bootstrap::ExitCode`].

use std::path::PathBuf;
use std::sync::Arc;
use subforge::application::{prepare, run, status, PrepareRequest, RunRequest, StatusRequest};
use subforge::infrastructure::{
    FilesystemCacheStore, FilesystemCapabilityCache, FilesystemManifestStore, FilesystemRuntimeRegistry, GlobalConfig,
    SubprocessLauncher, SubprocessStageExecutor, SystemCapabilityProbe,
};
use subforge_bootstrap::cli::ValidatedCommand;
use subforge_bootstrap::logger::{BootstrapLogger, ConsoleLogger};
use subforge_bootstrap::platform::create_platform;
use subforge_bootstrap::shutdown::ShutdownCoordinator;
use subforge_bootstrap::signals::create_signal_handler;
use subforge_bootstrap::{bootstrap_cli, ExitCode};
use subforge_domain::services::capability_probe::CapabilityProbe;
use subforge_domain::services::parameter_resolver::StageParamOverrides;

#[tokio::main]
async fn main() -> std::process::ExitCode {
    subforge::infrastructure::logging::init();
    let bootstrap_log = ConsoleLogger::new();

    let cli = match bootstrap_cli() {
        Ok(cli) => cli,
        Err(e) => {
            bootstrap_log.error(&e.to_string());
            return exit(ExitCode::InvalidArguments);
        }
    };

    let global_config = match subforge::infrastructure::config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            bootstrap_log.error(&format!("failed to load configuration: {e}"));
            return exit(ExitCode::InvalidArguments);
        }
    };

    match cli.command {
        ValidatedCommand::Prepare {
            input,
            workflow,
            source_language,
            target_languages,
            user_id,
            clip_range,
        } => run_prepare(input, workflow, source_language, target_languages, user_id, clip_range, &global_config).await,
        ValidatedCommand::Run {
            job,
            restart,
            stages,
            dry_run,
        } => run_run(job, restart, stages, dry_run, &global_config).await,
        ValidatedCommand::Status { job, json, gc } => run_status(job, json, gc, &global_config).await,
    }
}

fn exit(code: ExitCode) -> std::process::ExitCode {
    std::process::ExitCode::from(code.as_i32() as u8)
}

async fn run_prepare(
    input: PathBuf,
    workflow: String,
    source_language: Option<String>,
    target_languages: Vec<String>,
    user_id: String,
    clip_range: Option<(f64, f64)>,
    global_config: &GlobalConfig,
) -> std::process::ExitCode {
    let manifest_store: Arc<dyn subforge_domain::repositories::ManifestRepository> =
        Arc::new(FilesystemManifestStore::new(global_config.workdir_root.clone()));
    let runtime_registry: Arc<dyn subforge_domain::services::runtime_registry::RuntimeRegistry> =
        Arc::new(FilesystemRuntimeRegistry::new(global_config.runtimes_root.clone()));
    let process_launcher: Arc<dyn subforge_domain::services::process_launcher::ProcessLauncher> = Arc::new(SubprocessLauncher::new());

    let request = PrepareRequest {
        input,
        workflow,
        source_language,
        target_languages,
        user_id,
        clip_range,
    };

    match prepare(request, &global_config.workdir_root, manifest_store, runtime_registry, process_launcher).await {
        Ok(outcome) => {
            println!("prepared job in {}", outcome.job_dir.display());
            println!("{}", outcome.run_command);
            println!("{}", outcome.job_id);
            exit(ExitCode::Success)
        }
        Err(e) => {
            eprintln!("prepare failed: {e}\nhint: {}", e.hint());
            exit(ExitCode::for_prepare_error(&e))
        }
    }
}

async fn run_run(
    job: String,
    restart: Option<String>,
    stages: Vec<String>,
    dry_run: bool,
    global_config: &GlobalConfig,
) -> std::process::ExitCode {
    let platform = Arc::from(create_platform());
    let capability_probe = SystemCapabilityProbe::new(platform);
    let capability_cache = FilesystemCapabilityCache::new(global_config.cache_root.join("capability.json"));
    let ttl = chrono::Duration::hours(global_config.capability_ttl_hours);
    let capability = match capability_probe.load_or_probe(&capability_cache, ttl, chrono::Utc::now()).await {
        Ok(capability) => global_config.apply_capability_override(capability),
        Err(e) => {
            eprintln!("capability probe failed: {e}");
            return exit(ExitCode::for_run_error(&e));
        }
    };

    let manifest_store: Arc<dyn subforge_domain::repositories::ManifestRepository> =
        Arc::new(FilesystemManifestStore::new(global_config.workdir_root.clone()));
    let cache_store: Arc<dyn subforge_domain::repositories::CacheRepository> =
        Arc::new(FilesystemCacheStore::new(global_config.cache_root.clone()));
    let runtime_registry: Arc<dyn subforge_domain::services::runtime_registry::RuntimeRegistry> =
        Arc::new(FilesystemRuntimeRegistry::new(global_config.runtimes_root.clone()));
    let process_launcher: Arc<dyn subforge_domain::services::process_launcher::ProcessLauncher> = Arc::new(SubprocessLauncher::new());

    let stage_executor: Arc<dyn subforge_domain::services::stage_executor::StageExecutor> = Arc::new(SubprocessStageExecutor::new(
        runtime_registry,
        process_launcher,
        Some(cache_store),
        capability,
        StageParamOverrides::default(),
    ));

    let shutdown = ShutdownCoordinator::new(std::time::Duration::from_secs(global_config.shutdown_grace_secs));
    let cancellation = shutdown.token();
    let signal_handler = create_signal_handler();
    let shutdown_for_signal = shutdown.clone();
    tokio::spawn(async move {
        signal_handler
            .wait_for_signal(Box::new(move || shutdown_for_signal.initiate_shutdown()))
            .await;
    });

    let request = RunRequest {
        job_id: job,
        restart,
        stages,
        dry_run,
    };

    match run(request, &global_config.workdir_root, manifest_store, stage_executor, cancellation).await {
        Ok(result) if result.interrupted => {
            eprintln!("run interrupted");
            exit(ExitCode::Interrupted)
        }
        Ok(result) => {
            for report in &result.reports {
                println!("{:<16} {:<10} cache_hit={}", report.stage.as_str(), report.outcome, report.cache_hit);
            }
            match result.failed_stage {
                Some(stage) => {
                    eprintln!("stage '{stage}' failed");
                    exit(ExitCode::StageFailed)
                }
                None => exit(ExitCode::Success),
            }
        }
        Err(e) => {
            eprintln!("run failed: {e}\nhint: {}", e.hint());
            exit(ExitCode::for_run_error(&e))
        }
    }
}

async fn run_status(job: String, json: bool, gc: bool, global_config: &GlobalConfig) -> std::process::ExitCode {
    let manifest_store = FilesystemManifestStore::new(global_config.workdir_root.clone());
    let cache_store = FilesystemCacheStore::new(global_config.cache_root.clone());

    let request = StatusRequest { job_id: job, gc };
    match status(request, &manifest_store, Some(&cache_store), &global_config.cache_max_size_gb).await {
        Ok(report) => {
            if json {
                match serde_json::to_string_pretty(&report) {
                    Ok(text) => println!("{text}"),
                    Err(e) => eprintln!("failed to render status as json: {e}"),
                }
            } else {
                print!("{}", status::render_table(&report));
            }
            exit(ExitCode::Success)
        }
        Err(e) => {
            eprintln!("status failed: {e}");
            exit(ExitCode::Success)
        }
    }
}
