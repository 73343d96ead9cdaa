//! Exit code constants and error mapping for radar_love
//!
//! Configuration problems get a distinct code so callers can tell "you gave
//! me bad input" apart from "the run itself went wrong". A completed run
//! whose verdict does not match the expected policy also gets its own code,
//! distinct from both success and infrastructure failure.

use crate::error::RadarError;
use crate::remote::RemoteError;

/// Type-safe exit code for the CLI.
///
/// The numeric values are part of the public contract: scripts wrapping
/// `radar_love` key off them to distinguish outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCode(i32);

impl ExitCode {
    /// Success - the run reached a terminal verdict matching the expected policy
    pub const SUCCESS: Self = Self(0);

    /// Internal error - unexpected failure not covered by a specific code
    pub const INTERNAL: Self = Self(1);

    /// Configuration error - bad CLI arguments, unknown scenario, or missing
    /// credential, detected before any workspace or remote side effect
    pub const CONFIG: Self = Self(2);

    /// Verdict mismatch - the run completed (Detected or Clean) but the
    /// verdict does not match the `--expect` policy
    pub const VERDICT_MISMATCH: Self = Self(3);

    /// Scan timeout - polling exceeded the overall wall-clock budget
    pub const SCAN_TIMEOUT: Self = Self(10);

    /// Run failed - a workspace or remote failure aborted the run
    pub const RUN_FAILED: Self = Self(70);

    /// Numeric value for `std::process::exit`
    #[must_use]
    pub const fn as_i32(self) -> i32 {
        self.0
    }

    /// Severity rank used when aggregating a batch: the report exits with
    /// the most severe individual outcome.
    #[must_use]
    pub const fn severity(self) -> u8 {
        match self.0 {
            0 => 0,
            3 => 1,
            10 => 2,
            70 => 3,
            _ => 4,
        }
    }
}

/// Map a `RadarError` to its exit code.
///
/// Configuration and template errors map to [`ExitCode::CONFIG`]; remote
/// auth/not-found errors are configuration problems too (a bad token or a
/// bad repo slug), while everything else that aborts a run maps to
/// [`ExitCode::RUN_FAILED`].
#[must_use]
pub fn error_to_exit_code(error: &RadarError) -> ExitCode {
    match error {
        RadarError::Config(_) | RadarError::Template(_) => ExitCode::CONFIG,
        RadarError::Remote(remote) => match remote {
            RemoteError::Unauthorized { .. } | RemoteError::NotFound { .. } => ExitCode::CONFIG,
            _ => ExitCode::RUN_FAILED,
        },
        RadarError::Workspace(_) | RadarError::Git(_) | RadarError::Runner(_) => {
            ExitCode::RUN_FAILED
        }
        RadarError::Io(_) => ExitCode::INTERNAL,
    }
}

impl From<&RadarError> for ExitCode {
    fn from(err: &RadarError) -> Self {
        error_to_exit_code(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigError;
    use crate::template::TemplateError;
    use crate::workspace::WorkspaceError;

    #[test]
    fn exit_code_constants() {
        assert_eq!(ExitCode::SUCCESS.as_i32(), 0);
        assert_eq!(ExitCode::CONFIG.as_i32(), 2);
        assert_eq!(ExitCode::VERDICT_MISMATCH.as_i32(), 3);
        assert_eq!(ExitCode::SCAN_TIMEOUT.as_i32(), 10);
        assert_eq!(ExitCode::RUN_FAILED.as_i32(), 70);
    }

    #[test]
    fn config_error_maps_to_config_code() {
        let err = RadarError::Config(ConfigError::MissingRepo);
        assert_eq!(error_to_exit_code(&err), ExitCode::CONFIG);
    }

    #[test]
    fn template_not_found_maps_to_config_code() {
        let err = RadarError::Template(TemplateError::NotFound {
            id: "nope".to_string(),
        });
        assert_eq!(error_to_exit_code(&err), ExitCode::CONFIG);
    }

    #[test]
    fn unauthorized_maps_to_config_code() {
        let err = RadarError::Remote(RemoteError::Unauthorized {
            detail: "401".to_string(),
        });
        assert_eq!(error_to_exit_code(&err), ExitCode::CONFIG);
    }

    #[test]
    fn transient_remote_maps_to_run_failed() {
        let err = RadarError::Remote(RemoteError::Network {
            detail: "connection reset".to_string(),
        });
        assert_eq!(error_to_exit_code(&err), ExitCode::RUN_FAILED);
    }

    #[test]
    fn workspace_error_maps_to_run_failed() {
        let err = RadarError::Workspace(WorkspaceError::DiskFull);
        assert_eq!(error_to_exit_code(&err), ExitCode::RUN_FAILED);
    }

    #[test]
    fn severity_orders_failures_above_mismatch() {
        assert!(ExitCode::RUN_FAILED.severity() > ExitCode::SCAN_TIMEOUT.severity());
        assert!(ExitCode::SCAN_TIMEOUT.severity() > ExitCode::VERDICT_MISMATCH.severity());
        assert!(ExitCode::VERDICT_MISMATCH.severity() > ExitCode::SUCCESS.severity());
    }
}
