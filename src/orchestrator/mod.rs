//! Scenario orchestrator
//!
//! Drives one scenario run from `Pending` to a terminal verdict:
//!
//! ```text
//! Pending → WorkspacePrepared → Pushed → PrCreated → Polling
//!                                → {Detected | Clean | TimedOut | Failed}
//! ```
//!
//! Within a run the steps are strictly sequential; every transition
//! depends on the prior step's success. Remote calls are wrapped in the
//! retry policy; the polling loop is an explicit bounded iteration with a
//! deadline check every round, so cancellation and timeout are observable
//! at each iteration boundary. Any terminal state releases the cleanup
//! ledger unconditionally.

mod backoff;
mod cleanup;
mod poll;

pub use backoff::{RetryPolicy, with_retry};
pub use cleanup::{CleanupLedger, CleanupObligation};
pub use poll::PollPolicy;

use crate::remote::{PullRequestHandle, RemoteGateway, ScanStatus};
use crate::secret::SyntheticSecret;
use crate::template::MaterializedArtifact;
use crate::workspace::{WorkspaceHandle, WorkspaceProvider};
use chrono::{DateTime, Utc};
use nanoid::nanoid;
use std::fmt;
use std::sync::Arc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Alphabet for run identifiers: lowercase alphanumeric, safe in branch
/// names and directory names.
const ID_ALPHABET: [char; 36] = [
    '0', '1', '2', '3', '4', '5', '6', '7', '8', '9', 'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'i',
    'j', 'k', 'l', 'm', 'n', 'o', 'p', 'q', 'r', 's', 't', 'u', 'v', 'w', 'x', 'y', 'z',
];

/// Length of generated run identifiers.
const ID_LENGTH: usize = 10;

/// Branch namespace for simulated leaks.
const BRANCH_PREFIX: &str = "radar-love";

/// State of a scenario run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Pending,
    WorkspacePrepared,
    Pushed,
    PrCreated,
    Polling,
    /// The simulated leak was caught by the scanner
    Detected,
    /// The scan ran and confirmed nothing was found
    Clean,
    /// No verdict within the polling budget
    TimedOut,
    /// A step failed or the run was cancelled
    Failed,
}

impl RunState {
    /// Whether this state ends the run.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Detected | Self::Clean | Self::TimedOut | Self::Failed
        )
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::WorkspacePrepared => "workspace-prepared",
            Self::Pushed => "pushed",
            Self::PrCreated => "pr-created",
            Self::Polling => "polling",
            Self::Detected => "detected",
            Self::Clean => "clean",
            Self::TimedOut => "timed-out",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// One scenario run, exclusively owned by the orchestrator for its
/// lifetime and handed to the reporter once terminal.
#[derive(Debug, Clone)]
pub struct ScenarioRun {
    /// Run identifier, embedded in branch and workspace names
    pub id: String,
    /// Scenario that produced the artifact
    pub scenario_id: String,
    /// The injected secret
    pub secret: SyntheticSecret,
    /// The run's dedicated branch
    pub branch: String,
    /// Pull request, once created
    pub pull_request: Option<PullRequestHandle>,
    /// Current state
    pub state: RunState,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    /// Diagnostic message for the terminal state
    pub detail: Option<String>,
    /// Cleanup warnings, attached to the report but never promoted to the
    /// run's own verdict
    pub cleanup_warnings: Vec<String>,
}

/// Drives scenario runs against a gateway and a workspace provider.
pub struct Orchestrator {
    gateway: Arc<dyn RemoteGateway>,
    workspace: Arc<dyn WorkspaceProvider>,
    retry: RetryPolicy,
    poll: PollPolicy,
    retain_artifacts: bool,
    cancel: CancellationToken,
}

impl Orchestrator {
    #[must_use]
    pub fn new(
        gateway: Arc<dyn RemoteGateway>,
        workspace: Arc<dyn WorkspaceProvider>,
        retry: RetryPolicy,
        poll: PollPolicy,
        retain_artifacts: bool,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            gateway,
            workspace,
            retry,
            poll,
            retain_artifacts,
            cancel,
        }
    }

    /// Execute one scenario run to a terminal state, then release its
    /// cleanup obligations.
    ///
    /// Never returns an error: every failure path is folded into the
    /// run's terminal state and diagnostic detail, so the reporter sees a
    /// uniform shape regardless of which component gave out.
    pub async fn execute(&self, artifact: MaterializedArtifact) -> ScenarioRun {
        let run_id = nanoid!(ID_LENGTH, &ID_ALPHABET);
        let branch = format!("{BRANCH_PREFIX}/{}-{run_id}", artifact.scenario_id);

        let mut run = ScenarioRun {
            id: run_id,
            scenario_id: artifact.scenario_id.clone(),
            secret: artifact.secret.clone(),
            branch,
            pull_request: None,
            state: RunState::Pending,
            started_at: Utc::now(),
            finished_at: None,
            detail: None,
            cleanup_warnings: Vec::new(),
        };
        let mut ledger = CleanupLedger::new();

        info!(run_id = %run.id, scenario = %run.scenario_id, "run starting");
        self.drive(&mut run, &artifact, &mut ledger).await;
        debug_assert!(run.state.is_terminal());

        run.cleanup_warnings = ledger
            .release_all(&self.gateway, &self.workspace, self.retain_artifacts)
            .await;
        run.finished_at = Some(Utc::now());
        info!(
            run_id = %run.id,
            state = %run.state,
            warnings = run.cleanup_warnings.len(),
            "run finished"
        );
        run
    }

    /// Walk the state machine up to a terminal state. Cleanup happens in
    /// `execute` regardless of where this returns.
    async fn drive(
        &self,
        run: &mut ScenarioRun,
        artifact: &MaterializedArtifact,
        ledger: &mut CleanupLedger,
    ) {
        if self.check_cancelled(run) {
            return;
        }

        // Pending → WorkspacePrepared
        let handle = match self.prepare_workspace(run).await {
            Ok(handle) => handle,
            Err(detail) => return fail(run, detail),
        };
        ledger.record(CleanupObligation::DestroyWorkspace {
            handle: handle.clone(),
        });
        run.state = RunState::WorkspacePrepared;
        debug!(run_id = %run.id, state = %run.state, "transition");

        if self.check_cancelled(run) {
            return;
        }

        // WorkspacePrepared → Pushed
        let remote_ref = match self.apply_and_push(artifact, &handle).await {
            Ok(remote_ref) => remote_ref,
            Err(detail) => return fail(run, detail),
        };
        run.state = RunState::Pushed;
        debug!(run_id = %run.id, state = %run.state, "transition");

        if self.check_cancelled(run) {
            return;
        }

        // Pushed → PrCreated
        let title = format!("radar_love: {} simulation", run.scenario_id);
        let body = format!(
            "Automated secret-leak simulation (scenario `{}`, run `{}`).\n\n\
             This pull request was created by radar_love to exercise secret \
             scanning and will be closed automatically.",
            run.scenario_id, run.id
        );
        let pr = match with_retry(&self.retry, &self.cancel, "open pull request", || {
            self.gateway.open_pull_request(&remote_ref, &title, &body)
        })
        .await
        {
            Ok(pr) => pr,
            Err(e) => return fail(run, format!("failed to open pull request: {e}")),
        };
        ledger.record(CleanupObligation::ClosePullRequest {
            pr: pr.clone(),
            delete_branch: true,
        });
        run.pull_request = Some(pr.clone());
        run.state = RunState::PrCreated;
        info!(run_id = %run.id, pr = pr.number, url = %pr.url, "pull request created");

        // PrCreated → Polling: immediate
        run.state = RunState::Polling;
        self.poll_for_verdict(run, &pr).await;
    }

    async fn prepare_workspace(&self, run: &ScenarioRun) -> Result<WorkspaceHandle, String> {
        let workspace = Arc::clone(&self.workspace);
        let run_id = run.id.clone();
        let branch = run.branch.clone();
        match tokio::task::spawn_blocking(move || workspace.prepare(&run_id, &branch)).await {
            Ok(Ok(handle)) => Ok(handle),
            Ok(Err(e)) => Err(format!("workspace preparation failed: {e}")),
            Err(_) => Err("workspace preparation task panicked".to_string()),
        }
    }

    async fn apply_and_push(
        &self,
        artifact: &MaterializedArtifact,
        handle: &WorkspaceHandle,
    ) -> Result<crate::workspace::RemoteRef, String> {
        let workspace = Arc::clone(&self.workspace);
        let artifact = artifact.clone();
        let handle = handle.clone();
        match tokio::task::spawn_blocking(move || {
            workspace
                .apply(&handle, &artifact)
                .map_err(|e| format!("artifact apply failed: {e}"))?;
            workspace
                .commit_and_push(&handle)
                .map_err(|e| format!("push failed: {e}"))
        })
        .await
        {
            Ok(Ok(remote_ref)) => Ok(remote_ref),
            Ok(Err(e)) => Err(e),
            Err(_) => Err("workspace task panicked".to_string()),
        }
    }

    /// The polling loop: bounded iteration with interval + jitter and a
    /// deadline check each round.
    async fn poll_for_verdict(&self, run: &mut ScenarioRun, pr: &PullRequestHandle) {
        let deadline = Instant::now() + self.poll.overall_timeout;
        let secret = run.secret.clone();
        let mut clean_streak = 0u32;
        let mut error_streak = 0u32;

        loop {
            if self.check_cancelled(run) {
                return;
            }
            if Instant::now() >= deadline {
                run.state = RunState::TimedOut;
                run.detail = Some(format!(
                    "no scan verdict within {}s",
                    self.poll.overall_timeout.as_secs()
                ));
                return;
            }

            let observation = match with_retry(&self.retry, &self.cancel, "scan status", || {
                self.gateway.scan_status(pr, &secret)
            })
            .await
            {
                Ok(observation) => observation,
                Err(e) => return fail(run, format!("scan status failed: {e}")),
            };

            debug!(
                run_id = %run.id,
                status = ?observation.status,
                clean_streak,
                "scan observation"
            );

            match observation.status {
                ScanStatus::AlertDetected => {
                    run.state = RunState::Detected;
                    let alert_url = observation
                        .metadata
                        .get("html_url")
                        .and_then(|v| v.as_str())
                        .unwrap_or("(no alert url)");
                    run.detail = Some(format!("scanner raised an alert: {alert_url}"));
                    return;
                }
                ScanStatus::ScanClean => {
                    clean_streak += 1;
                    error_streak = 0;
                    if clean_streak >= self.poll.clean_confirmations {
                        run.state = RunState::Clean;
                        run.detail = Some(format!(
                            "scan clean across {clean_streak} consecutive reads"
                        ));
                        return;
                    }
                }
                ScanStatus::NotYetReported => {
                    // A clean read only counts once the scan is known to
                    // have run; seeing "not yet" resets the streak.
                    clean_streak = 0;
                    error_streak = 0;
                }
                ScanStatus::ScanError => {
                    error_streak += 1;
                    clean_streak = 0;
                    warn!(run_id = %run.id, error_streak, "scan subsystem reported an error");
                    if error_streak >= self.poll.max_scan_errors {
                        return fail(
                            run,
                            format!(
                                "scan subsystem failing across {error_streak} consecutive reads"
                            ),
                        );
                    }
                }
            }

            tokio::select! {
                () = tokio::time::sleep(self.poll.next_delay()) => {}
                () = self.cancel.cancelled() => {
                    fail(run, "cancelled by operator".to_string());
                    return;
                }
            }
        }
    }

    fn check_cancelled(&self, run: &mut ScenarioRun) -> bool {
        if self.cancel.is_cancelled() {
            fail(run, "cancelled by operator".to_string());
            true
        } else {
            false
        }
    }
}

fn fail(run: &mut ScenarioRun, detail: String) {
    warn!(run_id = %run.id, detail = %detail, "run failed");
    run.state = RunState::Failed;
    run.detail = Some(detail);
}
