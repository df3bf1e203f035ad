//! Error types for every boundary of the core: acquisition, extraction,
//! provider configuration, LLM invocation and the pipeline that ties them
//! together.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// A failed git invocation, with the command line that was run.
#[derive(Debug, Clone, Error)]
#[error("`git {command}` failed: {message}")]
pub struct GitError {
    pub command: String,
    pub message: String,
}

impl GitError {
    pub fn new(command: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            message: message.into(),
        }
    }
}

/// Errors raised while obtaining a working copy of a repository.
#[derive(Debug, Error)]
pub enum AcquireError {
    /// Local directory mode was requested on something that is not a git working copy.
    #[error("not a git repository: {0}")]
    NotARepository(PathBuf),

    #[error("a repository URL is required when no local directory is given")]
    MissingUrl,

    #[error("failed to clone {url}: {source}")]
    Clone {
        url: String,
        #[source]
        source: GitError,
    },

    #[error("failed to check out '{reference}': {source}")]
    Checkout {
        reference: String,
        #[source]
        source: GitError,
    },

    #[error("filesystem error: {0}")]
    Io(#[from] std::io::Error),

    #[error("repository acquisition timed out after {0:?}")]
    Timeout(Duration),
}

/// Errors raised by the strict manifest and navigation readers.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("repository path does not exist: {0}")]
    RepositoryNotFound(PathBuf),

    #[error("site configuration not found at {0}")]
    MissingManifest(PathBuf),

    #[error("invalid site configuration {path}: {message}")]
    InvalidManifest { path: PathBuf, message: String },

    #[error("required field '{0}' not found in default-site.yml")]
    MissingField(&'static str),

    #[error("navigation file not found at {0}")]
    MissingNavigation(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Provider selection or credentials could not be resolved.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderConfigError {
    #[error("unknown LLM provider '{0}' (supported: local, openai, gemini)")]
    UnknownProvider(String),

    #[error("{variables} must be set for the {provider} provider")]
    MissingVariables {
        provider: &'static str,
        variables: String,
    },

    #[error("invalid value for {variable}: {message}")]
    InvalidValue { variable: String, message: String },

    #[error("failed to build HTTP client: {0}")]
    Client(String),
}

/// A single completion request failed at the transport or API level.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{provider} API error ({status}): {body}")]
    Api {
        provider: String,
        status: u16,
        body: String,
    },

    #[error("model refused the request: {0}")]
    Refused(String),

    #[error("provider returned no content")]
    EmptyResponse,
}

/// Why a structured invocation produced no artifact.
#[derive(Debug, Error)]
pub enum InvokeError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("response does not match schema '{schema}': {message}")]
    SchemaViolation { schema: String, message: String },

    #[error("LLM call timed out after {0:?}")]
    Timeout(Duration),

    #[error("iterative processing failed for field '{field}': {message}")]
    FieldFailed { field: String, message: String },
}

/// Errors surfaced by the pipeline orchestrator to its callers.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Acquire(#[from] AcquireError),

    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error(transparent)]
    ProviderConfig(#[from] ProviderConfigError),

    #[error("failed to generate {kind}: {message}")]
    Analysis { kind: String, message: String },
}
