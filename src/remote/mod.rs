//! Remote gateway: typed client surface over the code-hosting API
//!
//! The gateway is deliberately thin: every operation is a single API
//! round-trip snapshot. Polling, retry, and backoff live in the
//! orchestrator, which needs to distinguish rate-limit pressure (back off
//! longer) from generic transient failures (standard backoff) from
//! permanent errors (give up immediately).

mod github;
mod http;

pub use github::GithubGateway;

use crate::secret::SyntheticSecret;
use crate::workspace::RemoteRef;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::time::Duration;
use thiserror::Error;

/// Remote API errors.
///
/// [`RemoteError::is_transient`] partitions the taxonomy for the retry
/// policy: rate-limit and network failures are worth retrying, while auth
/// and not-found indicate a configuration problem and never are.
#[derive(Error, Debug)]
pub enum RemoteError {
    #[error("remote API rate limit hit (retry-after: {retry_after_secs:?})")]
    RateLimited { retry_after_secs: Option<u64> },

    #[error("remote API rejected credentials: {detail}")]
    Unauthorized { detail: String },

    #[error("remote resource not found: {resource}")]
    NotFound { resource: String },

    #[error("remote API network failure: {detail}")]
    Network { detail: String },

    #[error("remote API request timed out after {seconds}s")]
    Timeout { seconds: u64 },

    #[error("unexpected remote API response{}: {detail}", format_status(.status))]
    Protocol { status: Option<u16>, detail: String },

    #[error("remote operation cancelled")]
    Cancelled,
}

fn format_status(status: &Option<u16>) -> String {
    status.map_or_else(String::new, |s| format!(" (status {s})"))
}

impl RemoteError {
    /// Whether the retry policy may re-attempt the failed call.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::RateLimited { .. } | Self::Network { .. } | Self::Timeout { .. }
        )
    }
}

/// Handle to a pull request created by a run.
#[derive(Debug, Clone)]
pub struct PullRequestHandle {
    /// Pull request number
    pub number: u64,
    /// Browser URL, surfaced in reports
    pub url: String,
    /// Head branch of the pull request
    pub head_branch: String,
    /// When the pull request was created
    pub created_at: DateTime<Utc>,
}

/// Classification of one scan snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanStatus {
    /// The remote has not evaluated the pull request yet
    NotYetReported,
    /// An alert matching the injected secret was raised
    AlertDetected,
    /// The scan ran and reported nothing for this run
    ScanClean,
    /// The scan subsystem is present but failing or unavailable
    ScanError,
}

/// Point-in-time snapshot of remote scan state for a pull request.
#[derive(Debug, Clone)]
pub struct ScanObservation {
    pub status: ScanStatus,
    pub observed_at: DateTime<Utc>,
    /// Raw response details, kept for diagnostics
    pub metadata: serde_json::Value,
}

impl ScanObservation {
    #[must_use]
    pub fn new(status: ScanStatus, metadata: serde_json::Value) -> Self {
        Self {
            status,
            observed_at: Utc::now(),
            metadata,
        }
    }
}

/// Typed client over the code-hosting API.
///
/// Implementations never block beyond a single API call: `scan_status` is
/// a snapshot read, and waiting across snapshots belongs to the caller.
/// `close_pull_request` is idempotent; closing an already-closed or
/// missing pull request succeeds.
#[async_trait]
pub trait RemoteGateway: Send + Sync {
    /// Open a pull request for the pushed branch.
    async fn open_pull_request(
        &self,
        head: &RemoteRef,
        title: &str,
        body: &str,
    ) -> Result<PullRequestHandle, RemoteError>;

    /// Read a single snapshot of the scan state for a pull request.
    ///
    /// `secret` is the run's injected value, used to match alerts to this
    /// run rather than to unrelated repository findings.
    async fn scan_status(
        &self,
        pr: &PullRequestHandle,
        secret: &SyntheticSecret,
    ) -> Result<ScanObservation, RemoteError>;

    /// Close the pull request and optionally delete its branch.
    async fn close_pull_request(
        &self,
        pr: &PullRequestHandle,
        delete_branch: bool,
    ) -> Result<(), RemoteError>;
}

/// Suggested wait before retrying a failed call, when the error carries one.
#[must_use]
pub fn retry_after_hint(error: &RemoteError) -> Option<Duration> {
    match error {
        RemoteError::RateLimited {
            retry_after_secs: Some(secs),
        } => Some(Duration::from_secs(*secs)),
        _ => None,
    }
}
