//! Scratch workspace management
//!
//! Each run gets an isolated, disposable clone of the target repository
//! under a unique directory (run identifier embedded), so concurrent runs
//! never interfere. Git operations go through the argv-only
//! [`NativeRunner`](crate::runner::NativeRunner); stderr is redacted before
//! it reaches any error or log because git echoes the authenticated remote
//! URL on failure.

use crate::runner::{CommandSpec, NativeRunner, RunnerError};
use crate::secret::redact;
use crate::template::MaterializedArtifact;
use camino::{Utf8Path, Utf8PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Workspace preparation and write errors
#[derive(Error, Debug)]
pub enum WorkspaceError {
    #[error("failed to clone target repository: {detail}")]
    CloneFailed { detail: String },

    #[error("no space left on device while preparing workspace")]
    DiskFull,

    #[error("branch '{branch}' already exists on the remote")]
    BranchExists { branch: String },

    #[error("failed to write artifact '{path}': {reason}")]
    Write { path: String, reason: String },
}

/// Git commit/push errors
#[derive(Error, Debug)]
pub enum GitError {
    #[error("push rejected by remote: {detail}")]
    PushRejected { detail: String },

    #[error("git authentication failed: {detail}")]
    AuthFailed { detail: String },

    #[error("git {op} failed: {detail}")]
    CommandFailed { op: String, detail: String },

    #[error("git {op} timed out after {timeout_seconds}s")]
    Timeout { op: String, timeout_seconds: u64 },
}

/// Handle to one prepared scratch workspace.
#[derive(Debug, Clone)]
pub struct WorkspaceHandle {
    /// Run identifier embedded in the directory name
    pub run_id: String,
    /// Absolute path of the working copy
    pub dir: Utf8PathBuf,
    /// The run's dedicated branch
    pub branch: String,
}

/// Pushed branch reference on the remote.
#[derive(Debug, Clone)]
pub struct RemoteRef {
    /// Branch name on the remote
    pub branch: String,
    /// Head commit SHA
    pub head_sha: String,
}

/// Seam between the orchestrator and workspace operations.
///
/// The production implementation is [`WorkspaceManager`]; tests substitute
/// stubs to drive failure paths without touching git. All methods are
/// synchronous; async callers bridge with `spawn_blocking`.
pub trait WorkspaceProvider: Send + Sync {
    /// Clone the target repository into a fresh directory and create the
    /// run's branch.
    fn prepare(&self, run_id: &str, branch: &str) -> Result<WorkspaceHandle, WorkspaceError>;

    /// Write the materialized artifact into the working copy.
    fn apply(
        &self,
        handle: &WorkspaceHandle,
        artifact: &MaterializedArtifact,
    ) -> Result<(), WorkspaceError>;

    /// Commit the artifact and push the branch to the remote.
    fn commit_and_push(&self, handle: &WorkspaceHandle) -> Result<RemoteRef, GitError>;

    /// Remove the working copy. Best-effort and idempotent: destroying a
    /// missing workspace is a no-op, and failures are logged, never raised.
    fn destroy(&self, handle: &WorkspaceHandle);
}

/// Production workspace manager backed by the git CLI.
pub struct WorkspaceManager {
    root: Utf8PathBuf,
    clone_url: String,
    base_branch: String,
    author_name: String,
    author_email: String,
    git_timeout: Duration,
    runner: NativeRunner,
}

/// Commit message used for injected artifacts. Deliberately unremarkable:
/// the scan should trigger on content, not on a suspicious message.
const COMMIT_MESSAGE: &str = "chore: update deployment configuration";

impl WorkspaceManager {
    /// Create a manager rooted at `root`.
    ///
    /// `clone_url` may embed the remote credential; it is never logged and
    /// any git output quoting it is redacted.
    #[must_use]
    pub fn new(
        root: Utf8PathBuf,
        clone_url: String,
        base_branch: String,
        author_name: String,
        author_email: String,
        git_timeout: Duration,
    ) -> Self {
        Self {
            root,
            clone_url,
            base_branch,
            author_name,
            author_email,
            git_timeout,
            runner: NativeRunner::new(),
        }
    }

    fn git(&self, op: &str, cmd: CommandSpec) -> Result<String, GitError> {
        let output = match self.runner.run(&cmd, self.git_timeout) {
            Ok(output) => output,
            Err(RunnerError::Timeout {
                timeout_seconds, ..
            }) => {
                return Err(GitError::Timeout {
                    op: op.to_string(),
                    timeout_seconds,
                });
            }
            Err(e) => {
                return Err(GitError::CommandFailed {
                    op: op.to_string(),
                    detail: e.to_string(),
                });
            }
        };

        if output.success() {
            Ok(output.stdout_lossy())
        } else {
            Err(GitError::CommandFailed {
                op: op.to_string(),
                detail: redact(&output.stderr_lossy()),
            })
        }
    }
}

impl WorkspaceProvider for WorkspaceManager {
    fn prepare(&self, run_id: &str, branch: &str) -> Result<WorkspaceHandle, WorkspaceError> {
        std::fs::create_dir_all(&self.root).map_err(map_io_error)?;

        let dir = self.root.join(format!("run-{run_id}"));
        if dir.exists() {
            // Run ids are collision-resistant; a pre-existing directory
            // means a previous run with this id was not cleaned up.
            return Err(WorkspaceError::CloneFailed {
                detail: format!("workspace directory already exists: {dir}"),
            });
        }

        let clone = CommandSpec::new("git")
            .arg("clone")
            .args(["--depth", "1", "--single-branch"])
            .args(["--branch", &self.base_branch])
            .arg(&self.clone_url)
            .arg(dir.as_str());
        self.git("clone", clone).map_err(|e| classify_clone_error(&e))?;

        // The run's branch must not already exist on the remote, or the
        // push would entangle this run with someone else's work.
        let ls_remote = CommandSpec::new("git")
            .args(["-C", dir.as_str()])
            .args(["ls-remote", "--heads", "origin"])
            .arg(branch);
        let listed = self
            .git("ls-remote", ls_remote)
            .map_err(|e| classify_clone_error(&e))?;
        if !listed.is_empty() {
            return Err(WorkspaceError::BranchExists {
                branch: branch.to_string(),
            });
        }

        let checkout = CommandSpec::new("git")
            .args(["-C", dir.as_str()])
            .args(["checkout", "-b"])
            .arg(branch);
        self.git("checkout", checkout)
            .map_err(|e| classify_clone_error(&e))?;

        info!(run_id, %dir, branch, "workspace prepared");
        Ok(WorkspaceHandle {
            run_id: run_id.to_string(),
            dir,
            branch: branch.to_string(),
        })
    }

    fn apply(
        &self,
        handle: &WorkspaceHandle,
        artifact: &MaterializedArtifact,
    ) -> Result<(), WorkspaceError> {
        let target = resolve_artifact_path(&handle.dir, &artifact.path)?;

        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent).map_err(|e| map_write_error(&artifact.path, &e))?;
        }
        std::fs::write(&target, &artifact.content)
            .map_err(|e| map_write_error(&artifact.path, &e))?;

        debug!(run_id = %handle.run_id, path = %artifact.path, "artifact applied");
        Ok(())
    }

    fn commit_and_push(&self, handle: &WorkspaceHandle) -> Result<RemoteRef, GitError> {
        let dir = handle.dir.as_str();

        self.git("add", CommandSpec::new("git").args(["-C", dir, "add", "-A"]))?;

        let commit = CommandSpec::new("git")
            .args(["-C", dir])
            .arg("-c")
            .arg(format!("user.name={}", self.author_name))
            .arg("-c")
            .arg(format!("user.email={}", self.author_email))
            .args(["commit", "-m", COMMIT_MESSAGE]);
        self.git("commit", commit)?;

        let push = CommandSpec::new("git")
            .args(["-C", dir])
            .args(["push", "--set-upstream", "origin"])
            .arg(&handle.branch);
        self.git("push", push).map_err(classify_push_error)?;

        let head_sha = self.git(
            "rev-parse",
            CommandSpec::new("git").args(["-C", dir, "rev-parse", "HEAD"]),
        )?;

        info!(run_id = %handle.run_id, branch = %handle.branch, "branch pushed");
        Ok(RemoteRef {
            branch: handle.branch.clone(),
            head_sha,
        })
    }

    fn destroy(&self, handle: &WorkspaceHandle) {
        if !handle.dir.exists() {
            debug!(run_id = %handle.run_id, "workspace already gone");
            return;
        }
        match std::fs::remove_dir_all(&handle.dir) {
            Ok(()) => debug!(run_id = %handle.run_id, dir = %handle.dir, "workspace destroyed"),
            Err(e) => warn!(
                run_id = %handle.run_id,
                dir = %handle.dir,
                error = %e,
                "workspace cleanup failed; leaving directory behind"
            ),
        }
    }
}

/// Reject artifact paths that would escape the working copy.
fn resolve_artifact_path(
    dir: &Utf8Path,
    relative: &Utf8Path,
) -> Result<Utf8PathBuf, WorkspaceError> {
    let escapes = relative.is_absolute()
        || relative
            .components()
            .any(|c| matches!(c, camino::Utf8Component::ParentDir));
    if escapes {
        return Err(WorkspaceError::Write {
            path: relative.to_string(),
            reason: "artifact path escapes the workspace".to_string(),
        });
    }
    Ok(dir.join(relative))
}

fn map_io_error(e: std::io::Error) -> WorkspaceError {
    if is_disk_full(&e) {
        WorkspaceError::DiskFull
    } else {
        WorkspaceError::CloneFailed {
            detail: e.to_string(),
        }
    }
}

fn map_write_error(path: &Utf8Path, e: &std::io::Error) -> WorkspaceError {
    if is_disk_full(e) {
        WorkspaceError::DiskFull
    } else {
        WorkspaceError::Write {
            path: path.to_string(),
            reason: e.to_string(),
        }
    }
}

fn is_disk_full(e: &std::io::Error) -> bool {
    e.raw_os_error() == Some(28) || e.to_string().contains("No space left")
}

fn classify_clone_error(e: &GitError) -> WorkspaceError {
    let detail = e.to_string();
    if detail.contains("No space left") {
        WorkspaceError::DiskFull
    } else {
        WorkspaceError::CloneFailed { detail }
    }
}

fn classify_push_error(e: GitError) -> GitError {
    let GitError::CommandFailed { detail, .. } = &e else {
        return e;
    };
    let lower = detail.to_lowercase();
    if lower.contains("authentication failed")
        || lower.contains("could not read username")
        || lower.contains("invalid username or")
        || lower.contains("403")
        || lower.contains("401")
    {
        GitError::AuthFailed {
            detail: detail.clone(),
        }
    } else if lower.contains("[rejected]")
        || lower.contains("failed to push")
        || lower.contains("push declined")
        || lower.contains("gh013")
    {
        GitError::PushRejected {
            detail: detail.clone(),
        }
    } else {
        e
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::secret::SecretPatternKind;
    use crate::template::{ResolveOptions, resolve};

    fn manager_in(root: &Utf8Path) -> WorkspaceManager {
        WorkspaceManager::new(
            root.to_owned(),
            "https://example.invalid/org/repo.git".to_string(),
            "main".to_string(),
            "Radar Love".to_string(),
            "radar-love@example.com".to_string(),
            Duration::from_secs(30),
        )
    }

    fn handle_in(root: &Utf8Path, run_id: &str) -> WorkspaceHandle {
        WorkspaceHandle {
            run_id: run_id.to_string(),
            dir: root.join(format!("run-{run_id}")),
            branch: format!("radar-love/test-{run_id}"),
        }
    }

    #[test]
    fn destroy_is_idempotent() {
        let tmp = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(tmp.path().to_path_buf()).unwrap();
        let manager = manager_in(&root);
        let handle = handle_in(&root, "abc123");

        std::fs::create_dir_all(&handle.dir).unwrap();
        std::fs::write(handle.dir.join("file.txt"), "content").unwrap();

        manager.destroy(&handle);
        assert!(!handle.dir.exists());

        // Second destroy on a missing workspace is a no-op, not an error.
        manager.destroy(&handle);
        assert!(!handle.dir.exists());
    }

    #[test]
    fn apply_writes_artifact_with_parents() {
        let tmp = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(tmp.path().to_path_buf()).unwrap();
        let manager = manager_in(&root);
        let handle = handle_in(&root, "def456");
        std::fs::create_dir_all(&handle.dir).unwrap();

        let artifact = resolve("cloud-credential-basic", &ResolveOptions::default()).unwrap();
        manager.apply(&handle, &artifact).unwrap();

        let written = std::fs::read_to_string(handle.dir.join(artifact.path.as_str())).unwrap();
        assert!(written.contains(artifact.secret.value()));
    }

    #[test]
    fn apply_rejects_path_traversal() {
        let tmp = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(tmp.path().to_path_buf()).unwrap();
        let manager = manager_in(&root);
        let handle = handle_in(&root, "ghi789");
        std::fs::create_dir_all(&handle.dir).unwrap();

        let options = ResolveOptions {
            pattern_kind: Some(SecretPatternKind::GenericToken),
            file_name: Some("../outside.txt".to_string()),
        };
        let artifact = resolve("generic-token-script", &options).unwrap();

        let err = manager.apply(&handle, &artifact).unwrap_err();
        assert!(matches!(err, WorkspaceError::Write { .. }));
        assert!(!tmp.path().join("outside.txt").exists());
    }

    #[test]
    fn push_error_classification() {
        let auth = classify_push_error(GitError::CommandFailed {
            op: "push".to_string(),
            detail: "fatal: Authentication failed for 'https://github.com/o/r.git'".to_string(),
        });
        assert!(matches!(auth, GitError::AuthFailed { .. }));

        let rejected = classify_push_error(GitError::CommandFailed {
            op: "push".to_string(),
            detail: "! [rejected] main -> main (fetch first)".to_string(),
        });
        assert!(matches!(rejected, GitError::PushRejected { .. }));

        let push_protection = classify_push_error(GitError::CommandFailed {
            op: "push".to_string(),
            detail: "remote: error GH013: Repository rule violations found".to_string(),
        });
        assert!(matches!(push_protection, GitError::PushRejected { .. }));

        let other = classify_push_error(GitError::CommandFailed {
            op: "push".to_string(),
            detail: "unexpected".to_string(),
        });
        assert!(matches!(other, GitError::CommandFailed { .. }));
    }
}
