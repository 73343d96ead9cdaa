//! GitHub implementation of the remote gateway
//!
//! Pull requests via the REST pulls API; scan results via the
//! secret-scanning alerts API. Two eventual-consistency quirks are folded
//! into the observation taxonomy rather than surfaced as errors:
//!
//! - a 404 reading a just-created pull request means the remote has not
//!   caught up yet (`NotYetReported`)
//! - a 404 on the alerts endpoint means secret scanning is disabled or
//!   unavailable for the repository (`ScanError`)

use super::http::HttpClient;
use super::{PullRequestHandle, RemoteError, RemoteGateway, ScanObservation, ScanStatus};
use crate::config::{RemoteCredential, RepoSlug};
use crate::secret::SyntheticSecret;
use crate::workspace::RemoteRef;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use tracing::debug;

/// REST API version header value
const API_VERSION: &str = "2022-11-28";

/// Media type for REST API requests
const ACCEPT: &str = "application/vnd.github+json";

/// GitHub-backed remote gateway.
pub struct GithubGateway {
    http: HttpClient,
    api_base: String,
    repo: RepoSlug,
    base_branch: String,
    credential: RemoteCredential,
    request_timeout: Duration,
}

impl GithubGateway {
    /// Create a gateway bound to one repository and one credential.
    ///
    /// # Errors
    ///
    /// Returns `RemoteError::Protocol` if the HTTP client cannot be built.
    pub fn new(
        api_base: String,
        repo: RepoSlug,
        base_branch: String,
        credential: RemoteCredential,
        request_timeout: Duration,
    ) -> Result<Self, RemoteError> {
        let user_agent = format!("radar_love/{}", env!("CARGO_PKG_VERSION"));
        Ok(Self {
            http: HttpClient::new(&user_agent)?,
            api_base,
            repo,
            base_branch,
            credential,
            request_timeout,
        })
    }

    fn repo_url(&self, tail: &str) -> String {
        format!(
            "{}/repos/{}/{}/{tail}",
            self.api_base, self.repo.owner, self.repo.name
        )
    }

    fn request(&self, method: reqwest::Method, url: &str) -> reqwest::RequestBuilder {
        self.http
            .request(method, url)
            .bearer_auth(self.credential.token())
            .header("accept", ACCEPT)
            .header("x-github-api-version", API_VERSION)
    }

    fn get(&self, url: &str) -> reqwest::RequestBuilder {
        self.request(reqwest::Method::GET, url)
    }
}

#[async_trait]
impl RemoteGateway for GithubGateway {
    async fn open_pull_request(
        &self,
        head: &RemoteRef,
        title: &str,
        body: &str,
    ) -> Result<PullRequestHandle, RemoteError> {
        let url = self.repo_url("pulls");
        let request = self
            .request(reqwest::Method::POST, &url)
            .json(&OpenPullRequest {
                title,
                head: &head.branch,
                base: &self.base_branch,
                body,
            });

        let response = self
            .http
            .send(request, self.request_timeout, "pull request creation")
            .await?;
        let created: PullResponse =
            response.json().await.map_err(|e| RemoteError::Protocol {
                status: None,
                detail: format!("failed to parse pull request response: {e}"),
            })?;

        debug!(number = created.number, "pull request opened");
        Ok(PullRequestHandle {
            number: created.number,
            url: created.html_url,
            head_branch: head.branch.clone(),
            created_at: created.created_at,
        })
    }

    async fn scan_status(
        &self,
        pr: &PullRequestHandle,
        secret: &SyntheticSecret,
    ) -> Result<ScanObservation, RemoteError> {
        // The pull request itself may not be visible yet right after
        // creation; that is "not scanned yet", not an error.
        let pr_url = self.repo_url(&format!("pulls/{}", pr.number));
        match self
            .http
            .send(self.get(&pr_url), self.request_timeout, "pull request")
            .await
        {
            Ok(_) => {}
            Err(RemoteError::NotFound { .. }) => {
                return Ok(ScanObservation::new(
                    ScanStatus::NotYetReported,
                    json!({ "reason": "pull request not yet visible" }),
                ));
            }
            Err(e) => return Err(e),
        }

        let alerts_url = self.repo_url("secret-scanning/alerts?state=open&per_page=100");
        let response = match self
            .http
            .send(self.get(&alerts_url), self.request_timeout, "secret scanning alerts")
            .await
        {
            Ok(response) => response,
            Err(RemoteError::NotFound { .. }) => {
                return Ok(ScanObservation::new(
                    ScanStatus::ScanError,
                    json!({ "reason": "secret scanning unavailable for repository" }),
                ));
            }
            Err(e) => return Err(e),
        };

        let alerts: Vec<SecretScanningAlert> =
            response.json().await.map_err(|e| RemoteError::Protocol {
                status: None,
                detail: format!("failed to parse alerts response: {e}"),
            })?;

        match match_alert(&alerts, secret.value(), pr.created_at) {
            Some(alert) => Ok(ScanObservation::new(
                ScanStatus::AlertDetected,
                json!({
                    "alert_number": alert.number,
                    "secret_type": alert.secret_type,
                    "html_url": alert.html_url,
                }),
            )),
            None => Ok(ScanObservation::new(
                ScanStatus::ScanClean,
                json!({ "open_alerts": alerts.len() }),
            )),
        }
    }

    async fn close_pull_request(
        &self,
        pr: &PullRequestHandle,
        delete_branch: bool,
    ) -> Result<(), RemoteError> {
        let url = self.repo_url(&format!("pulls/{}", pr.number));
        let request = self
            .request(reqwest::Method::PATCH, &url)
            .json(&json!({ "state": "closed" }));
        match self
            .http
            .send(request, self.request_timeout, "pull request closure")
            .await
        {
            Ok(_) | Err(RemoteError::NotFound { .. }) => {}
            Err(e) => return Err(e),
        }

        if delete_branch {
            let ref_url = self.repo_url(&format!("git/refs/heads/{}", pr.head_branch));
            let request = self.request(reqwest::Method::DELETE, &ref_url);
            match self
                .http
                .send(request, self.request_timeout, "branch deletion")
                .await
            {
                Ok(_) | Err(RemoteError::NotFound { .. }) => {}
                // 422 means the ref is already gone
                Err(RemoteError::Protocol {
                    status: Some(422), ..
                }) => {}
                Err(e) => return Err(e),
            }
        }

        debug!(number = pr.number, delete_branch, "pull request cleaned up");
        Ok(())
    }
}

/// Find the alert raised for this run's secret.
///
/// Exact value match when the API exposes the secret; otherwise fall back
/// to alerts created after the pull request, which excludes pre-existing
/// repository findings.
fn match_alert<'a>(
    alerts: &'a [SecretScanningAlert],
    secret_value: &str,
    pr_created_at: DateTime<Utc>,
) -> Option<&'a SecretScanningAlert> {
    alerts.iter().find(|alert| match alert.secret.as_deref() {
        Some(value) => value == secret_value,
        None => alert
            .created_at
            .is_some_and(|created| created >= pr_created_at),
    })
}

#[derive(Debug, Serialize)]
struct OpenPullRequest<'a> {
    title: &'a str,
    head: &'a str,
    base: &'a str,
    body: &'a str,
}

#[derive(Debug, Deserialize)]
struct PullResponse {
    number: u64,
    html_url: String,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct SecretScanningAlert {
    number: u64,
    secret_type: Option<String>,
    secret: Option<String>,
    created_at: Option<DateTime<Utc>>,
    html_url: Option<String>,
}
