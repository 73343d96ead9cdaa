//! radar_love - simulate secret leaks and trigger GitHub PR scans
//!
//! This crate drives synthetic secret-leak scenarios end to end: it
//! materializes a scenario artifact with a generated (recognizably
//! synthetic) secret, injects it into a disposable clone of a target
//! repository, pushes a dedicated branch, opens a pull request, polls the
//! secret-scanning API for a verdict, and reports the outcome. Remote and
//! local resources created along the way are cleaned up unconditionally
//! when the run reaches any terminal state.
//!
//! # Quick Start (CLI)
//!
//! ```bash
//! export GITHUB_TOKEN=...   # or RADAR_LOVE_TOKEN
//! radar_love run --scenario cloud-credential-basic --repo acme/widgets
//! radar_love scenarios
//! ```
//!
//! # Library Usage
//!
//! The orchestrator is usable directly with custom gateway or workspace
//! implementations, which is also how the test suite drives failure paths:
//!
//! ```ignore
//! let orchestrator = Orchestrator::new(gateway, workspace, retry, poll, false, cancel);
//! let run = orchestrator.execute(artifact).await;
//! let outcome = report::summarize(&run);
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod exit_codes;
pub mod logging;
pub mod orchestrator;
pub mod remote;
pub mod report;
pub mod runner;
pub mod secret;
pub mod template;
pub mod workspace;

pub use config::{CliOverrides, Config, RemoteCredential, RepoSlug};
pub use error::RadarError;
pub use exit_codes::ExitCode;
pub use orchestrator::{Orchestrator, PollPolicy, RetryPolicy, RunState, ScenarioRun};
pub use report::{Expectation, Verdict, VerdictReport};
pub use secret::{SecretPatternKind, SyntheticSecret};
pub use template::{MaterializedArtifact, ResolveOptions, ScenarioTemplate};
