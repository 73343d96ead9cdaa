//! Shared HTTP client for the remote gateway
//!
//! One `reqwest::Client` per gateway, configured once: connection reuse,
//! rustls TLS, short connect timeout. Status codes map to the typed
//! [`RemoteError`] taxonomy here so the gateway methods stay declarative.
//! Transport error text is redacted before it can reach logs.

use super::RemoteError;
use crate::secret::redact;
use reqwest::{Client, Response, StatusCode, header::RETRY_AFTER};
use std::time::Duration;

/// Connect timeout for new connections.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP client wrapper owned by a gateway instance.
#[derive(Debug, Clone)]
pub(crate) struct HttpClient {
    client: Client,
}

impl HttpClient {
    /// Build the underlying client.
    ///
    /// # Errors
    ///
    /// Returns `RemoteError::Protocol` if the TLS backend cannot be
    /// initialized.
    pub fn new(user_agent: &str) -> Result<Self, RemoteError> {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(4)
            .use_rustls_tls()
            .user_agent(user_agent)
            .build()
            .map_err(|e| RemoteError::Protocol {
                status: None,
                detail: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self { client })
    }

    /// Start a request on the pooled client, so client-level defaults
    /// (user agent, connection reuse) apply.
    pub fn request(&self, method: reqwest::Method, url: &str) -> reqwest::RequestBuilder {
        self.client.request(method, url)
    }

    /// Execute a single request with a per-call timeout.
    ///
    /// No retry happens here; one call is one API round-trip. The caller's
    /// retry policy decides what to do with the typed error.
    pub async fn send(
        &self,
        request: reqwest::RequestBuilder,
        timeout: Duration,
        resource: &str,
    ) -> Result<Response, RemoteError> {
        let request = request
            .timeout(timeout)
            .build()
            .map_err(|e| RemoteError::Protocol {
                status: None,
                detail: format!("failed to build request: {e}"),
            })?;

        match self.client.execute(request).await {
            Ok(response) => {
                let status = response.status();
                if status.is_success() {
                    return Ok(response);
                }
                let retry_after = parse_retry_after(&response);
                Err(map_error_status(status, retry_after, resource))
            }
            Err(e) if e.is_timeout() => Err(RemoteError::Timeout {
                seconds: timeout.as_secs(),
            }),
            Err(e) => Err(RemoteError::Network {
                detail: redact(&e.to_string()),
            }),
        }
    }
}

fn parse_retry_after(response: &Response) -> Option<u64> {
    response
        .headers()
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok())
}

/// Map an error status to the `RemoteError` taxonomy.
///
/// 401/403 → unauthorized, 429 → rate-limited (with any `Retry-After`
/// hint), 404 → not-found, other 4xx → protocol, 5xx → network (transient,
/// the caller may retry).
pub(crate) fn map_error_status(
    status: StatusCode,
    retry_after_secs: Option<u64>,
    resource: &str,
) -> RemoteError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => RemoteError::Unauthorized {
            detail: format!("{status} for {resource}"),
        },
        StatusCode::TOO_MANY_REQUESTS => RemoteError::RateLimited { retry_after_secs },
        StatusCode::NOT_FOUND => RemoteError::NotFound {
            resource: resource.to_string(),
        },
        s if s.is_server_error() => RemoteError::Network {
            detail: format!("{status} for {resource}"),
        },
        s => RemoteError::Protocol {
            status: Some(s.as_u16()),
            detail: format!("unexpected status for {resource}"),
        },
    }
}
