//! Command handlers
//!
//! `run` wires template resolution, the workspace manager, the GitHub
//! gateway, and the orchestrator together. Everything that can fail for
//! configuration reasons (unknown scenario, missing repo, missing
//! credential) fails here, before a single directory or remote object is
//! created.

use crate::config::Config;
use crate::exit_codes::{ExitCode, error_to_exit_code};
use crate::orchestrator::{Orchestrator, PollPolicy, RetryPolicy};
use crate::remote::{GithubGateway, RemoteGateway};
use crate::report::{Expectation, VerdictReport, summarize};
use crate::template::{self, ResolveOptions};
use crate::workspace::{WorkspaceManager, WorkspaceProvider};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Timeout for individual git invocations. Clones of large repositories
/// dominate this; API-style short timeouts would be too tight.
const GIT_TIMEOUT: Duration = Duration::from_secs(120);

/// Execute `radar_love run`.
pub async fn execute_run_command(
    config: &Config,
    scenarios: &[String],
    expect: Expectation,
    options: &ResolveOptions,
    json: bool,
) -> Result<(), ExitCode> {
    // Fail-fast section: no workspace or remote mutation above this line.
    let repo = config.require_repo().map_err(config_error)?;
    let credential = config.load_credential().map_err(config_error)?;

    let mut artifacts = Vec::with_capacity(scenarios.len());
    for scenario in scenarios {
        let artifact = template::resolve(scenario, options).map_err(config_error)?;
        artifacts.push(artifact);
    }

    let gateway = GithubGateway::new(
        config.api_base_url.clone(),
        repo.clone(),
        config.base_branch.clone(),
        credential.clone(),
        config.request_timeout,
    )
    .map_err(|e| {
        eprintln!("✗ {e}");
        error_to_exit_code(&crate::error::RadarError::Remote(e))
    })?;

    let manager = WorkspaceManager::new(
        config.workspace_root.clone(),
        config.clone_url(repo, &credential),
        config.base_branch.clone(),
        config.commit_author_name.clone(),
        config.commit_author_email.clone(),
        GIT_TIMEOUT,
    );

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received; cancelling runs and cleaning up");
            interrupt.cancel();
        }
    });

    let retry = RetryPolicy {
        max_attempts: config.retry_max_attempts,
        ..RetryPolicy::default()
    };
    let poll = PollPolicy {
        interval: config.poll_interval,
        jitter: config.poll_jitter,
        clean_confirmations: config.clean_confirmations,
        max_scan_errors: config.max_scan_errors,
        overall_timeout: config.overall_timeout,
    };

    let gateway: Arc<dyn RemoteGateway> = Arc::new(gateway);
    let workspace: Arc<dyn WorkspaceProvider> = Arc::new(manager);
    let orchestrator = Arc::new(Orchestrator::new(
        gateway,
        workspace,
        retry,
        poll,
        config.keep_artifacts,
        cancel,
    ));

    // Independent tasks: no shared mutable state beyond the gateway
    // credential, which is read-only after initialization.
    let mut set = JoinSet::new();
    for artifact in artifacts {
        let orchestrator = Arc::clone(&orchestrator);
        set.spawn(async move { orchestrator.execute(artifact).await });
    }

    let mut outcomes = Vec::new();
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok(run) => outcomes.push(summarize(&run)),
            Err(e) => warn!(error = %e, "run task panicked"),
        }
    }

    let report = VerdictReport::new(outcomes);
    if json {
        match serde_json::to_string_pretty(&report) {
            Ok(rendered) => println!("{rendered}"),
            Err(e) => {
                eprintln!("✗ failed to serialize report: {e}");
                return Err(ExitCode::INTERNAL);
            }
        }
    } else {
        print!("{}", report.render(expect));
    }

    let code = report.exit_code(expect);
    if code == ExitCode::SUCCESS {
        Ok(())
    } else {
        Err(code)
    }
}

/// Execute `radar_love scenarios`.
pub fn execute_scenarios_command(json: bool) -> Result<(), ExitCode> {
    let catalog = template::list_scenarios();
    if json {
        match serde_json::to_string_pretty(&catalog) {
            Ok(rendered) => println!("{rendered}"),
            Err(e) => {
                eprintln!("✗ failed to serialize catalog: {e}");
                return Err(ExitCode::INTERNAL);
            }
        }
    } else {
        for scenario in catalog {
            println!(
                "{:<28} {} [{}] -> {}",
                scenario.id, scenario.description, scenario.kind, scenario.default_path
            );
        }
    }
    Ok(())
}

fn config_error(err: impl std::fmt::Display) -> ExitCode {
    eprintln!("✗ {err}");
    ExitCode::CONFIG
}
