//! Error taxonomy for radar_love
//!
//! Component errors are defined next to the components that raise them and
//! aggregated here. Library code returns `RadarError` and does NOT call
//! `std::process::exit()`; the CLI maps errors to exit codes at the edge.

use thiserror::Error;

pub use crate::config::ConfigError;
pub use crate::remote::RemoteError;
pub use crate::runner::RunnerError;
pub use crate::template::TemplateError;
pub use crate::workspace::{GitError, WorkspaceError};

/// Top-level error type for radar_love operations.
///
/// Errors fall into the taxonomy the orchestrator reasons about:
///
/// | Category | Variants | Handling |
/// |----------|----------|----------|
/// | Configuration | `Config`, `Template` | fail fast, before any workspace or remote mutation |
/// | Transient remote | `Remote` (network, rate-limit) | retried with backoff |
/// | Permanent remote | `Remote` (auth, not-found) | surfaced immediately, no retry |
/// | Workspace | `Workspace`, `Git`, `Runner`, `Io` | surfaced, triggers cleanup |
#[derive(Error, Debug)]
pub enum RadarError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Scenario template error: {0}")]
    Template(#[from] TemplateError),

    #[error("Workspace error: {0}")]
    Workspace(#[from] WorkspaceError),

    #[error("Git error: {0}")]
    Git(#[from] GitError),

    #[error("Remote API error: {0}")]
    Remote(#[from] RemoteError),

    #[error("Process runner error: {0}")]
    Runner(#[from] RunnerError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
