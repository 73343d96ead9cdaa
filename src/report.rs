//! Verdict reporting
//!
//! Pure functions from terminal run snapshots to a structured report and a
//! human-readable summary. No I/O happens here; the CLI decides whether to
//! print the rendered text or the JSON form.

use crate::exit_codes::ExitCode;
use crate::orchestrator::{RunState, ScenarioRun};
use serde::Serialize;
use std::fmt;

/// Terminal verdict of one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Verdict {
    /// The simulated leak was caught
    Detected,
    /// The scan ran and found nothing
    Clean,
    /// No verdict within the polling budget
    TimedOut,
    /// The run aborted before a verdict
    Failed,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Detected => "detected",
            Self::Clean => "clean",
            Self::TimedOut => "timed-out",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// What the operator expects the scanner to do with the injected leak.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Expectation {
    /// The scanner should raise an alert (the usual case)
    #[default]
    Detected,
    /// The scanner should stay quiet (e.g. pattern known to be unsupported)
    Clean,
    /// Either completed outcome is acceptable
    Any,
}

impl Expectation {
    /// Whether a verdict satisfies this expectation.
    #[must_use]
    pub const fn matches(self, verdict: Verdict) -> bool {
        match (self, verdict) {
            (Self::Detected, Verdict::Detected) | (Self::Clean, Verdict::Clean) => true,
            (Self::Any, Verdict::Detected | Verdict::Clean) => true,
            _ => false,
        }
    }
}

/// Outcome of one run, in report form.
#[derive(Debug, Clone, Serialize)]
pub struct RunOutcome {
    pub run_id: String,
    pub scenario: String,
    pub verdict: Verdict,
    pub branch: String,
    pub pull_request_url: Option<String>,
    pub detail: Option<String>,
    pub duration_secs: Option<f64>,
    pub cleanup_warnings: Vec<String>,
}

/// Summarize a terminal run into its report form.
///
/// Pure function of the run's final snapshot. A run handed over in a
/// non-terminal state (which would be an orchestrator bug) reports as
/// `Failed` rather than panicking.
#[must_use]
pub fn summarize(run: &ScenarioRun) -> RunOutcome {
    let verdict = match run.state {
        RunState::Detected => Verdict::Detected,
        RunState::Clean => Verdict::Clean,
        RunState::TimedOut => Verdict::TimedOut,
        _ => Verdict::Failed,
    };

    let duration_secs = run.finished_at.map(|finished| {
        (finished - run.started_at)
            .to_std()
            .unwrap_or_default()
            .as_secs_f64()
    });

    RunOutcome {
        run_id: run.id.clone(),
        scenario: run.scenario_id.clone(),
        verdict,
        branch: run.branch.clone(),
        pull_request_url: run.pull_request.as_ref().map(|pr| pr.url.clone()),
        detail: run.detail.clone(),
        duration_secs,
        cleanup_warnings: run.cleanup_warnings.clone(),
    }
}

/// Aggregated report over one or more runs.
#[derive(Debug, Clone, Serialize)]
pub struct VerdictReport {
    pub outcomes: Vec<RunOutcome>,
}

impl VerdictReport {
    #[must_use]
    pub fn new(outcomes: Vec<RunOutcome>) -> Self {
        Self { outcomes }
    }

    /// Exit code for one outcome under the expected policy.
    #[must_use]
    pub fn outcome_exit_code(outcome: &RunOutcome, expect: Expectation) -> ExitCode {
        match outcome.verdict {
            Verdict::TimedOut => ExitCode::SCAN_TIMEOUT,
            Verdict::Failed => ExitCode::RUN_FAILED,
            verdict if expect.matches(verdict) => ExitCode::SUCCESS,
            _ => ExitCode::VERDICT_MISMATCH,
        }
    }

    /// Overall exit code: the most severe individual outcome.
    #[must_use]
    pub fn exit_code(&self, expect: Expectation) -> ExitCode {
        self.outcomes
            .iter()
            .map(|o| Self::outcome_exit_code(o, expect))
            .max_by_key(|code| code.severity())
            .unwrap_or(ExitCode::SUCCESS)
    }

    /// Human-readable summary, one block per run.
    #[must_use]
    pub fn render(&self, expect: Expectation) -> String {
        let mut out = String::new();
        for outcome in &self.outcomes {
            let glyph = if Self::outcome_exit_code(outcome, expect) == ExitCode::SUCCESS {
                '✓'
            } else {
                '✗'
            };
            let duration = outcome
                .duration_secs
                .map_or_else(String::new, |secs| format!(" in {secs:.1}s"));
            out.push_str(&format!(
                "{glyph} {} (run {}) - {}{duration}\n",
                outcome.scenario, outcome.run_id, outcome.verdict
            ));
            if let Some(detail) = &outcome.detail {
                out.push_str(&format!("    {detail}\n"));
            }
            if let Some(url) = &outcome.pull_request_url {
                out.push_str(&format!("    pull request: {url}\n"));
            }
            for warning in &outcome.cleanup_warnings {
                out.push_str(&format!("    warning: {warning}\n"));
            }
        }
        let ok = self
            .outcomes
            .iter()
            .filter(|o| Self::outcome_exit_code(o, expect) == ExitCode::SUCCESS)
            .count();
        out.push_str(&format!(
            "{ok}/{} scenario(s) matched the expected outcome\n",
            self.outcomes.len()
        ));
        out
    }
}
