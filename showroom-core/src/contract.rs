//! # contract: seams to the outside world
//!
//! The core talks to two external systems: git (to obtain working copies)
//! and an LLM provider (to generate structured artifacts). Both are modelled
//! as async traits so the acquisition state machine and the invoker can be
//! driven by real clients in production and by `mockall` mocks in tests.
//!
//! - [`GitBackend`]: the handful of git operations the acquisition state machine needs.
//! - [`LlmProvider`]: a single schema-constrained chat completion.
//!
//! Implementations convert every upstream failure into the typed errors from
//! [`crate::error`]; nothing crosses these traits unlabeled.

use async_trait::async_trait;
use std::path::Path;

#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;

use crate::error::{GitError, ProviderError};

/// Git operations used by [`crate::download`].
///
/// All paths are working-copy roots. Implementations must not leave a
/// partially written `dest` behind on a failed clone if they can avoid it, but
/// callers never rely on that: clones are staged and renamed into place.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait GitBackend: Send + Sync {
    /// Clone `url` into `dest` (which must not exist yet).
    async fn clone_repo(&self, url: &str, dest: &Path) -> Result<(), GitError>;

    /// Fetch all remote refs for `origin`.
    async fn fetch(&self, repo: &Path) -> Result<(), GitError>;

    /// Check out a branch, tag or commit.
    async fn checkout(&self, repo: &Path, reference: &str) -> Result<(), GitError>;

    /// Fast-forward the checked out branch to `origin/<branch>`.
    async fn fast_forward(&self, repo: &Path, branch: &str) -> Result<(), GitError>;

    /// Commit hash `HEAD` points at.
    async fn head_commit(&self, repo: &Path) -> Result<String, GitError>;

    /// Resolve any revision (`origin/main`, `v1.2`, `abc123`) to a commit hash.
    async fn resolve_commit(&self, repo: &Path, revision: &str) -> Result<String, GitError>;

    /// Name of the checked out branch, `None` when `HEAD` is detached.
    async fn current_branch(&self, repo: &Path) -> Result<Option<String>, GitError>;
}

/// One schema-constrained completion request.
#[derive(Debug, Clone, PartialEq)]
pub struct StructuredRequest {
    pub system_prompt: String,
    pub user_content: String,
    /// Name the schema is registered under in the request.
    pub schema_name: String,
    /// JSON schema the response must satisfy.
    pub schema: serde_json::Value,
    pub temperature: f32,
}

/// A chat-completion endpoint capable of JSON-schema constrained output.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Provider label for metadata and logs (`gemini`, `openai`, `local`).
    fn provider_name(&self) -> String;

    /// Model identifier requests are sent to.
    fn model_name(&self) -> String;

    /// Issue a single request and return the raw JSON text the model produced.
    ///
    /// No retries: one call either succeeds or fails.
    async fn complete_structured(&self, request: StructuredRequest) -> Result<String, ProviderError>;
}
