//! CLI argument definitions
//!
//! Command-line structure via clap derive. Enum-valued flags get their own
//! `ValueEnum` types here and convert into the domain enums at the edge,
//! keeping clap out of the library modules.

use crate::report::Expectation;
use crate::secret::SecretPatternKind;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// radar_love - simulate secret leaks and trigger PR scans
#[derive(Parser)]
#[command(name = "radar_love")]
#[command(about = "CLI toolkit for simulating secret leaks and triggering GitHub PR scans")]
#[command(long_about = r#"
radar_love generates a synthetic secret leak, pushes it to a target
repository on a disposable branch, opens a pull request, and polls the
secret-scanning API for the verdict. The branch, the pull request, and the
local scratch workspace are cleaned up when the run ends, whatever the
outcome.

Generated secrets match real credential shapes but carry the RDLV
namespace marker, so they are recognizably synthetic.

EXAMPLES:
  # Run a single scenario against the configured repository
  radar_love run --scenario cloud-credential-basic

  # Target a specific repository with a shorter polling budget
  radar_love run --scenario private-key-deploy --repo acme/widgets --timeout 120

  # Batch: several scenarios concurrently, structured output
  radar_love run --scenario cloud-credential-basic --scenario generic-token-script --json

  # Keep the branch, PR, and workspace around for manual inspection
  radar_love run --scenario cloud-credential-basic --keep

  # List the scenario catalog
  radar_love scenarios

CONFIGURATION:
  Configuration precedence: CLI flags > config file > defaults.
  The config file is discovered by searching upward from CWD for
  .radar_love/config.toml; use --config for an explicit path.
  The remote credential is read from RADAR_LOVE_TOKEN or GITHUB_TOKEN.

EXIT CODES:
  0   verdict matched the expected outcome
  2   configuration error (before any remote side effect)
  3   run completed but the verdict did not match --expect
  10  no scan verdict within the polling budget
  70  a workspace or remote failure aborted the run
"#)]
#[command(version)]
pub struct Cli {
    /// Path to configuration file (overrides discovery)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run one or more leak scenarios to a verdict
    Run {
        /// Scenario to run; repeat the flag for a concurrent batch
        #[arg(long = "scenario", value_name = "NAME", required = true)]
        scenarios: Vec<String>,

        /// Target repository as <owner>/<name>
        #[arg(long, value_name = "OWNER/NAME")]
        repo: Option<String>,

        /// Overall polling budget in seconds
        #[arg(long, value_name = "SECONDS")]
        timeout: Option<u64>,

        /// Expected scan outcome, used for the exit code
        #[arg(long, value_enum, default_value = "detected")]
        expect: ExpectArg,

        /// Override the scenario's default secret shape
        #[arg(long, value_enum, value_name = "KIND")]
        pattern_kind: Option<PatternKindArg>,

        /// Override the scenario's default target path
        #[arg(long, value_name = "PATH")]
        file_name: Option<String>,

        /// Retain the branch, pull request, and workspace for inspection
        #[arg(long)]
        keep: bool,

        /// Emit the report as JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// List the built-in scenario catalog
    Scenarios {
        /// Emit the catalog as JSON instead of text
        #[arg(long)]
        json: bool,
    },
}

/// CLI surface for [`Expectation`].
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpectArg {
    Detected,
    Clean,
    Any,
}

impl From<ExpectArg> for Expectation {
    fn from(arg: ExpectArg) -> Self {
        match arg {
            ExpectArg::Detected => Self::Detected,
            ExpectArg::Clean => Self::Clean,
            ExpectArg::Any => Self::Any,
        }
    }
}

/// CLI surface for [`SecretPatternKind`].
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternKindArg {
    CloudCredential,
    PrivateKey,
    GenericToken,
}

impl From<PatternKindArg> for SecretPatternKind {
    fn from(arg: PatternKindArg) -> Self {
        match arg {
            PatternKindArg::CloudCredential => Self::CloudCredential,
            PatternKindArg::PrivateKey => Self::PrivateKey,
            PatternKindArg::GenericToken => Self::GenericToken,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_run_with_repeated_scenarios() {
        let cli = Cli::try_parse_from([
            "radar_love",
            "run",
            "--scenario",
            "cloud-credential-basic",
            "--scenario",
            "private-key-deploy",
            "--repo",
            "acme/widgets",
            "--timeout",
            "120",
        ])
        .unwrap();
        match cli.command {
            Commands::Run {
                scenarios,
                repo,
                timeout,
                expect,
                ..
            } => {
                assert_eq!(scenarios.len(), 2);
                assert_eq!(repo.as_deref(), Some("acme/widgets"));
                assert_eq!(timeout, Some(120));
                assert_eq!(expect, ExpectArg::Detected);
            }
            Commands::Scenarios { .. } => panic!("expected run command"),
        }
    }

    #[test]
    fn run_requires_at_least_one_scenario() {
        assert!(Cli::try_parse_from(["radar_love", "run"]).is_err());
    }

    #[test]
    fn expectation_converts() {
        assert_eq!(Expectation::from(ExpectArg::Clean), Expectation::Clean);
        assert_eq!(Expectation::from(ExpectArg::Any), Expectation::Any);
    }

    #[test]
    fn pattern_kind_converts() {
        assert_eq!(
            SecretPatternKind::from(PatternKindArg::PrivateKey),
            SecretPatternKind::PrivateKey
        );
    }
}
