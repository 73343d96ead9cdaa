//! Subprocess runner for git invocations
//!
//! All process execution goes through [`CommandSpec`] to ensure argv-style
//! invocation: arguments are passed as discrete elements, never as shell
//! strings, so artifact paths and branch names cannot be shell-interpreted.

use std::ffi::OsString;
use std::io::Read;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};
use thiserror::Error;

/// Process runner errors
#[derive(Error, Debug)]
pub enum RunnerError {
    #[error("failed to spawn '{program}': {reason}")]
    SpawnFailed { program: String, reason: String },

    #[error("failed to wait for '{program}': {reason}")]
    WaitFailed { program: String, reason: String },

    #[error("'{program}' timed out after {timeout_seconds}s")]
    Timeout {
        program: String,
        timeout_seconds: u64,
    },
}

/// Specification for a command to execute.
///
/// Arguments are `Vec<OsString>`, not shell strings; no `sh -c` is ever
/// used.
#[derive(Debug, Clone)]
pub struct CommandSpec {
    /// The program to execute
    pub program: OsString,
    /// Arguments as discrete elements
    pub args: Vec<OsString>,
    /// Optional working directory
    pub cwd: Option<PathBuf>,
}

impl CommandSpec {
    /// Create a new `CommandSpec` with the given program.
    #[must_use]
    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
        }
    }

    /// Add a single argument.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Add multiple arguments.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set the working directory.
    #[must_use]
    pub fn cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    fn to_command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command.args(&self.args);
        if let Some(cwd) = &self.cwd {
            command.current_dir(cwd);
        }
        command
    }

    fn program_name(&self) -> String {
        self.program.to_string_lossy().into_owned()
    }
}

/// Captured output of a completed process.
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub exit_code: Option<i32>,
}

impl ProcessOutput {
    /// Whether the process exited with code 0.
    #[must_use]
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Stdout as lossy UTF-8, trimmed.
    #[must_use]
    pub fn stdout_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stdout).trim().to_string()
    }

    /// Stderr as lossy UTF-8, trimmed.
    #[must_use]
    pub fn stderr_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stderr).trim().to_string()
    }
}

/// Native process runner with timeout enforcement.
///
/// Polls the child with `try_wait` and kills it when the deadline passes,
/// so a hung git invocation cannot stall a run past its budget. Stdout and
/// stderr are drained on reader threads to keep the pipes from filling.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeRunner;

/// Poll interval while waiting for a child process.
const WAIT_POLL: Duration = Duration::from_millis(50);

impl NativeRunner {
    /// Create a new `NativeRunner`.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Execute a command, enforcing the timeout.
    ///
    /// # Errors
    ///
    /// * `RunnerError::SpawnFailed` - the program could not be started
    /// * `RunnerError::Timeout` - the deadline passed; the child was killed
    /// * `RunnerError::WaitFailed` - waiting on the child failed
    ///
    /// A non-zero exit code is NOT an error here; callers inspect
    /// [`ProcessOutput::success`] and classify stderr themselves.
    pub fn run(&self, cmd: &CommandSpec, timeout: Duration) -> Result<ProcessOutput, RunnerError> {
        let program = cmd.program_name();

        let mut child = cmd
            .to_command()
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| RunnerError::SpawnFailed {
                program: program.clone(),
                reason: e.to_string(),
            })?;

        let stdout_reader = spawn_pipe_reader(child.stdout.take());
        let stderr_reader = spawn_pipe_reader(child.stderr.take());

        let deadline = Instant::now() + timeout;
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => {
                    if Instant::now() >= deadline {
                        let _ = child.kill();
                        let _ = child.wait();
                        let _ = stdout_reader.join();
                        let _ = stderr_reader.join();
                        return Err(RunnerError::Timeout {
                            program,
                            timeout_seconds: timeout.as_secs(),
                        });
                    }
                    std::thread::sleep(WAIT_POLL);
                }
                Err(e) => {
                    let _ = child.kill();
                    return Err(RunnerError::WaitFailed {
                        program,
                        reason: e.to_string(),
                    });
                }
            }
        };

        let stdout = stdout_reader.join().unwrap_or_default();
        let stderr = stderr_reader.join().unwrap_or_default();

        Ok(ProcessOutput {
            stdout,
            stderr,
            exit_code: status.code(),
        })
    }
}

fn spawn_pipe_reader<R: Read + Send + 'static>(
    pipe: Option<R>,
) -> std::thread::JoinHandle<Vec<u8>> {
    std::thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_end(&mut buf);
        }
        buf
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_spec_builds_argv() {
        let cmd = CommandSpec::new("git")
            .arg("clone")
            .args(["--depth", "1"])
            .cwd("/tmp");
        assert_eq!(cmd.program, OsString::from("git"));
        assert_eq!(cmd.args.len(), 3);
        assert_eq!(cmd.cwd, Some(PathBuf::from("/tmp")));
    }

    #[test]
    fn runs_and_captures_stdout() {
        let runner = NativeRunner::new();
        let cmd = CommandSpec::new("echo").arg("hello");
        let output = runner.run(&cmd, Duration::from_secs(10)).unwrap();
        assert!(output.success());
        assert_eq!(output.stdout_lossy(), "hello");
    }

    #[test]
    fn nonzero_exit_is_not_an_error() {
        let runner = NativeRunner::new();
        let cmd = CommandSpec::new("false");
        let output = runner.run(&cmd, Duration::from_secs(10)).unwrap();
        assert!(!output.success());
    }

    #[test]
    fn spawn_failure_is_typed() {
        let runner = NativeRunner::new();
        let cmd = CommandSpec::new("definitely-not-a-real-program-xyz");
        let err = runner.run(&cmd, Duration::from_secs(10)).unwrap_err();
        assert!(matches!(err, RunnerError::SpawnFailed { .. }));
    }

    #[test]
    fn timeout_kills_the_child() {
        let runner = NativeRunner::new();
        let cmd = CommandSpec::new("sleep").arg("30");
        let start = Instant::now();
        let err = runner.run(&cmd, Duration::from_millis(200)).unwrap_err();
        assert!(matches!(err, RunnerError::Timeout { .. }));
        assert!(start.elapsed() < Duration::from_secs(5));
    }
}
