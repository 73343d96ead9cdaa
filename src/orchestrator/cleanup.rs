//! Deferred cleanup obligations
//!
//! Every remote or local resource a run creates (scratch workspace, pull
//! request) records an obligation here at the moment of creation. When the
//! run reaches any terminal state the ledger is released unconditionally,
//! in reverse acquisition order, so no failure branch needs its own
//! cleanup calls and no orphaned branch or PR survives a run.
//!
//! Releases are best-effort: a transient remote failure gets one bounded
//! retry, anything else becomes a warning attached to the run. A cleanup
//! failure never changes the run's verdict.

use crate::remote::{PullRequestHandle, RemoteGateway};
use crate::workspace::{WorkspaceHandle, WorkspaceProvider};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Delay before the single cleanup retry.
const CLEANUP_RETRY_DELAY: Duration = Duration::from_secs(2);

/// One recorded cleanup obligation.
#[derive(Debug, Clone)]
pub enum CleanupObligation {
    /// Close the run's pull request (and delete its branch)
    ClosePullRequest {
        pr: PullRequestHandle,
        delete_branch: bool,
    },
    /// Remove the run's scratch workspace
    DestroyWorkspace { handle: WorkspaceHandle },
}

/// Ordered list of obligations for one run.
#[derive(Default)]
pub struct CleanupLedger {
    obligations: Vec<CleanupObligation>,
}

impl CleanupLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an obligation at resource-creation time.
    pub fn record(&mut self, obligation: CleanupObligation) {
        self.obligations.push(obligation);
    }

    /// Number of outstanding obligations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.obligations.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.obligations.is_empty()
    }

    /// Release every obligation, in reverse acquisition order.
    ///
    /// Draining makes a second call a no-op, matching the idempotence
    /// contract of the underlying operations. With `retain` set the
    /// resources are kept for manual inspection and noted as warnings so
    /// the report shows what was left behind.
    pub async fn release_all(
        &mut self,
        gateway: &Arc<dyn RemoteGateway>,
        workspace: &Arc<dyn WorkspaceProvider>,
        retain: bool,
    ) -> Vec<String> {
        let mut warnings = Vec::new();

        for obligation in self.obligations.drain(..).rev() {
            match obligation {
                CleanupObligation::ClosePullRequest { pr, delete_branch } => {
                    if retain {
                        warnings.push(format!(
                            "retained pull request #{} for inspection: {}",
                            pr.number, pr.url
                        ));
                        continue;
                    }
                    if let Err(e) = close_with_retry(gateway, &pr, delete_branch).await {
                        warn!(number = pr.number, error = %e, "pull request cleanup failed");
                        warnings.push(format!("failed to close pull request #{}: {e}", pr.number));
                    } else {
                        info!(number = pr.number, "pull request closed");
                    }
                }
                CleanupObligation::DestroyWorkspace { handle } => {
                    if retain {
                        warnings.push(format!(
                            "retained workspace for inspection: {}",
                            handle.dir
                        ));
                        continue;
                    }
                    let workspace = Arc::clone(workspace);
                    let join = tokio::task::spawn_blocking(move || workspace.destroy(&handle));
                    if join.await.is_err() {
                        warnings.push("workspace cleanup task panicked".to_string());
                    }
                }
            }
        }

        warnings
    }
}

async fn close_with_retry(
    gateway: &Arc<dyn RemoteGateway>,
    pr: &PullRequestHandle,
    delete_branch: bool,
) -> Result<(), crate::remote::RemoteError> {
    match gateway.close_pull_request(pr, delete_branch).await {
        Err(e) if e.is_transient() => {
            warn!(number = pr.number, error = %e, "cleanup hit transient error, retrying once");
            tokio::time::sleep(CLEANUP_RETRY_DELAY).await;
            gateway.close_pull_request(pr, delete_branch).await
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::{RemoteError, ScanObservation, ScanStatus};
    use crate::secret::SyntheticSecret;
    use crate::template::MaterializedArtifact;
    use crate::workspace::{GitError, RemoteRef, WorkspaceError};
    use async_trait::async_trait;
    use camino::Utf8PathBuf;
    use chrono::Utc;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct CountingGateway {
        close_calls: AtomicU32,
        fail_closes: bool,
    }

    #[async_trait]
    impl RemoteGateway for CountingGateway {
        async fn open_pull_request(
            &self,
            _head: &RemoteRef,
            _title: &str,
            _body: &str,
        ) -> Result<PullRequestHandle, RemoteError> {
            unreachable!("not used in cleanup tests")
        }

        async fn scan_status(
            &self,
            _pr: &PullRequestHandle,
            _secret: &SyntheticSecret,
        ) -> Result<ScanObservation, RemoteError> {
            Ok(ScanObservation::new(
                ScanStatus::NotYetReported,
                serde_json::Value::Null,
            ))
        }

        async fn close_pull_request(
            &self,
            _pr: &PullRequestHandle,
            _delete_branch: bool,
        ) -> Result<(), RemoteError> {
            self.close_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_closes {
                Err(RemoteError::Network {
                    detail: "down".to_string(),
                })
            } else {
                Ok(())
            }
        }
    }

    struct CountingWorkspace {
        destroy_calls: AtomicU32,
    }

    impl WorkspaceProvider for CountingWorkspace {
        fn prepare(&self, _run_id: &str, _branch: &str) -> Result<WorkspaceHandle, WorkspaceError> {
            unreachable!("not used in cleanup tests")
        }

        fn apply(
            &self,
            _handle: &WorkspaceHandle,
            _artifact: &MaterializedArtifact,
        ) -> Result<(), WorkspaceError> {
            unreachable!("not used in cleanup tests")
        }

        fn commit_and_push(&self, _handle: &WorkspaceHandle) -> Result<RemoteRef, GitError> {
            unreachable!("not used in cleanup tests")
        }

        fn destroy(&self, _handle: &WorkspaceHandle) {
            self.destroy_calls.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn pr_handle() -> PullRequestHandle {
        PullRequestHandle {
            number: 7,
            url: "https://github.com/acme/widgets/pull/7".to_string(),
            head_branch: "radar-love/test".to_string(),
            created_at: Utc::now(),
        }
    }

    fn ws_handle() -> WorkspaceHandle {
        WorkspaceHandle {
            run_id: "abc".to_string(),
            dir: Utf8PathBuf::from("/tmp/radar-love/run-abc"),
            branch: "radar-love/test".to_string(),
        }
    }

    #[tokio::test]
    async fn releases_both_obligations_exactly_once() {
        let counting_gw = Arc::new(CountingGateway {
            close_calls: AtomicU32::new(0),
            fail_closes: false,
        });
        let counting_ws = Arc::new(CountingWorkspace {
            destroy_calls: AtomicU32::new(0),
        });
        let gateway: Arc<dyn RemoteGateway> = counting_gw.clone();
        let workspace: Arc<dyn WorkspaceProvider> = counting_ws.clone();

        let mut ledger = CleanupLedger::new();
        ledger.record(CleanupObligation::DestroyWorkspace {
            handle: ws_handle(),
        });
        ledger.record(CleanupObligation::ClosePullRequest {
            pr: pr_handle(),
            delete_branch: true,
        });

        let warnings = ledger.release_all(&gateway, &workspace, false).await;
        assert!(warnings.is_empty());
        assert!(ledger.is_empty());
        assert_eq!(counting_gw.close_calls.load(Ordering::SeqCst), 1);
        assert_eq!(counting_ws.destroy_calls.load(Ordering::SeqCst), 1);

        // Second release is a no-op: the ledger drained.
        let warnings = ledger.release_all(&gateway, &workspace, false).await;
        assert!(warnings.is_empty());
        assert_eq!(counting_gw.close_calls.load(Ordering::SeqCst), 1);
        assert_eq!(counting_ws.destroy_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cleanup_failures_become_warnings() {
        let counting = Arc::new(CountingGateway {
            close_calls: AtomicU32::new(0),
            fail_closes: true,
        });
        let gateway: Arc<dyn RemoteGateway> = counting.clone();
        let workspace: Arc<dyn WorkspaceProvider> = Arc::new(CountingWorkspace {
            destroy_calls: AtomicU32::new(0),
        });

        let mut ledger = CleanupLedger::new();
        ledger.record(CleanupObligation::ClosePullRequest {
            pr: pr_handle(),
            delete_branch: true,
        });

        let warnings = ledger.release_all(&gateway, &workspace, false).await;
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("pull request #7"));
        // Transient failure gets exactly one retry.
        assert_eq!(counting.close_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn retain_keeps_resources_and_notes_them() {
        let counting_gw = Arc::new(CountingGateway {
            close_calls: AtomicU32::new(0),
            fail_closes: false,
        });
        let counting_ws = Arc::new(CountingWorkspace {
            destroy_calls: AtomicU32::new(0),
        });
        let gateway: Arc<dyn RemoteGateway> = counting_gw.clone();
        let workspace: Arc<dyn WorkspaceProvider> = counting_ws.clone();

        let mut ledger = CleanupLedger::new();
        ledger.record(CleanupObligation::DestroyWorkspace {
            handle: ws_handle(),
        });
        ledger.record(CleanupObligation::ClosePullRequest {
            pr: pr_handle(),
            delete_branch: true,
        });

        let warnings = ledger.release_all(&gateway, &workspace, true).await;
        assert_eq!(warnings.len(), 2);
        assert_eq!(counting_gw.close_calls.load(Ordering::SeqCst), 0);
        assert_eq!(counting_ws.destroy_calls.load(Ordering::SeqCst), 0);
    }
}
