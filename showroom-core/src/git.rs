//! [`GitBackend`] implementation that drives the `git` executable.

use async_trait::async_trait;
use std::path::Path;
use tokio::process::Command;

use crate::contract::GitBackend;
use crate::error::GitError;

/// Runs git as a child process. Children are killed when their future is
/// dropped, so wrapping an acquisition in a timeout really stops the clone.
#[derive(Debug, Clone)]
pub struct GitCli {
    program: String,
}

impl Default for GitCli {
    fn default() -> Self {
        Self {
            program: "git".to_string(),
        }
    }
}

impl GitCli {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a specific git executable instead of the one on `PATH`.
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    async fn run(&self, repo: Option<&Path>, args: &[&str]) -> Result<String, GitError> {
        let command_line = args.join(" ");
        let mut cmd = Command::new(&self.program);
        if let Some(repo) = repo {
            cmd.arg("-C").arg(repo);
        }
        cmd.args(args)
            .env("GIT_TERMINAL_PROMPT", "0")
            .kill_on_drop(true);

        tracing::debug!(command = %command_line, repo = ?repo, "Running git");
        let output = cmd.output().await.map_err(|e| {
            tracing::error!(error = ?e, command = %command_line, "Failed to launch git process");
            GitError::new(&command_line, format!("failed to launch git: {e}"))
        })?;

        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            tracing::debug!(
                command = %command_line,
                status = ?output.status,
                stderr = %stderr,
                "Git exited with non-zero code"
            );
            Err(GitError::new(
                command_line,
                if stderr.is_empty() {
                    format!("exited with {}", output.status)
                } else {
                    stderr
                },
            ))
        }
    }
}

#[async_trait]
impl GitBackend for GitCli {
    async fn clone_repo(&self, url: &str, dest: &Path) -> Result<(), GitError> {
        let dest = dest.to_string_lossy();
        self.run(None, &["clone", "--quiet", url, dest.as_ref()])
            .await
            .map(|_| ())
    }

    async fn fetch(&self, repo: &Path) -> Result<(), GitError> {
        self.run(Some(repo), &["fetch", "--quiet", "--tags", "--force", "origin"])
            .await
            .map(|_| ())
    }

    async fn checkout(&self, repo: &Path, reference: &str) -> Result<(), GitError> {
        self.run(Some(repo), &["checkout", "--quiet", reference])
            .await
            .map(|_| ())
    }

    async fn fast_forward(&self, repo: &Path, branch: &str) -> Result<(), GitError> {
        let upstream = format!("origin/{branch}");
        self.run(Some(repo), &["merge", "--ff-only", "--quiet", &upstream])
            .await
            .map(|_| ())
    }

    async fn head_commit(&self, repo: &Path) -> Result<String, GitError> {
        self.run(Some(repo), &["rev-parse", "HEAD"]).await
    }

    async fn resolve_commit(&self, repo: &Path, revision: &str) -> Result<String, GitError> {
        let spec = format!("{revision}^{{commit}}");
        self.run(Some(repo), &["rev-parse", "--verify", "--quiet", &spec])
            .await
    }

    async fn current_branch(&self, repo: &Path) -> Result<Option<String>, GitError> {
        let name = self.run(Some(repo), &["rev-parse", "--abbrev-ref", "HEAD"]).await?;
        if name == "HEAD" || name.is_empty() {
            Ok(None)
        } else {
            Ok(Some(name))
        }
    }
}
