//! Repository acquisition: turns a repository URL + reference (or a local
//! directory) into a path to a git working copy.
//!
//! Three routes exist:
//! - **local directory**: used as-is after checking it is a working copy.
//! - **no cache**: cloned into a temporary directory owned by the returned
//!   [`AcquiredRepo`]; dropping the handle deletes the clone.
//! - **cached**: `<cache_root>/<cache_key(url, ref)>`. A current entry is
//!   reused untouched, a stale one is updated in place, and an entry that
//!   cannot be updated is deleted and cloned again.
//!
//! Fresh clones are made in a temporary staging directory next to the cache
//! entry and renamed into place only after clone and checkout both succeeded,
//! so the cache never exposes a half-cloned repository.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tempfile::TempDir;
use tracing::{debug, info, warn};

use crate::cache::{cache_path, resolve_cache_root};
use crate::contract::GitBackend;
use crate::error::{AcquireError, GitError};

/// Reference recorded on documents read from a local directory.
pub const LOCAL_REF: &str = "(local)";

/// Reference used when none is given.
pub const DEFAULT_REF: &str = "main";

/// Where the repository comes from.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum RepoSource {
    Remote { url: String, reference: String },
    Local { path: PathBuf },
}

impl RepoSource {
    pub fn remote(url: impl Into<String>, reference: impl Into<String>) -> Self {
        RepoSource::Remote {
            url: url.into(),
            reference: reference.into(),
        }
    }

    pub fn local(path: impl Into<PathBuf>) -> Self {
        RepoSource::Local { path: path.into() }
    }
}

/// Knobs for [`acquire`].
#[derive(Debug, Clone, Default)]
pub struct AcquireOptions {
    /// Overrides `~/.showroom-tool/cache`.
    pub cache_dir: Option<PathBuf>,
    /// Clone into a throwaway directory instead of the cache.
    pub no_cache: bool,
    /// Abort the whole acquisition after this long.
    pub timeout: Option<Duration>,
}

/// Classification of the cache on entry to an acquisition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheState {
    NoCacheRequested,
    CacheMiss,
    CacheHitCurrent,
    CacheHitStale,
    LocalDirProvided,
}

/// How the returned working copy was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    LocalDir,
    Ephemeral,
    CachedCurrent,
    CacheRefreshed,
    /// Cloned into the cache; `replaced_stale` is set when a broken or
    /// un-updatable entry was deleted first.
    FreshClone { replaced_stale: bool },
}

/// A ready-to-read working copy.
#[derive(Debug)]
pub struct AcquiredRepo {
    path: PathBuf,
    route: Route,
    // Held only for its Drop: removes the no-cache clone.
    _temp: Option<TempDir>,
}

impl AcquiredRepo {
    fn new(path: PathBuf, route: Route) -> Self {
        Self {
            path,
            route,
            _temp: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn route(&self) -> Route {
        self.route
    }

    /// True when the working copy is deleted together with this handle.
    pub fn is_ephemeral(&self) -> bool {
        self._temp.is_some()
    }
}

/// A directory counts as a working copy when it contains `.git` (a directory
/// for normal clones, a file for worktrees).
pub fn is_working_copy(path: &Path) -> bool {
    path.is_dir() && path.join(".git").exists()
}

/// Obtain a working copy for `source`, honouring `options.timeout`.
pub async fn acquire<G>(
    git: &G,
    source: &RepoSource,
    options: &AcquireOptions,
) -> Result<AcquiredRepo, AcquireError>
where
    G: GitBackend + ?Sized,
{
    let work = acquire_inner(git, source, options);
    match options.timeout {
        Some(limit) => match tokio::time::timeout(limit, work).await {
            Ok(result) => result,
            Err(_) => {
                warn!(timeout = ?limit, "Repository acquisition timed out");
                Err(AcquireError::Timeout(limit))
            }
        },
        None => work.await,
    }
}

async fn acquire_inner<G>(
    git: &G,
    source: &RepoSource,
    options: &AcquireOptions,
) -> Result<AcquiredRepo, AcquireError>
where
    G: GitBackend + ?Sized,
{
    match source {
        RepoSource::Local { path } => use_local_dir(path),
        RepoSource::Remote { url, .. } if url.trim().is_empty() => Err(AcquireError::MissingUrl),
        RepoSource::Remote { url, reference } if options.no_cache => {
            clone_ephemeral(git, url, reference).await
        }
        RepoSource::Remote { url, reference } => {
            acquire_cached(git, url, reference, options.cache_dir.as_deref()).await
        }
    }
}

fn use_local_dir(path: &Path) -> Result<AcquiredRepo, AcquireError> {
    let resolved = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
    if !is_working_copy(&resolved) {
        warn!(path = %resolved.display(), "Local directory is not a git repository");
        return Err(AcquireError::NotARepository(resolved));
    }
    info!(path = %resolved.display(), state = ?CacheState::LocalDirProvided, "Using local showroom repository");
    Ok(AcquiredRepo::new(resolved, Route::LocalDir))
}

async fn clone_ephemeral<G>(git: &G, url: &str, reference: &str) -> Result<AcquiredRepo, AcquireError>
where
    G: GitBackend + ?Sized,
{
    let temp = tempfile::Builder::new().prefix("showroom-").tempdir()?;
    let repo_path = temp.path().join("showroom");
    info!(
        repo_url = url,
        reference = reference,
        path = %repo_path.display(),
        state = ?CacheState::NoCacheRequested,
        "Caching disabled, cloning into temporary directory"
    );
    clone_at_ref(git, url, reference, &repo_path).await?;
    Ok(AcquiredRepo {
        path: repo_path,
        route: Route::Ephemeral,
        _temp: Some(temp),
    })
}

async fn acquire_cached<G>(
    git: &G,
    url: &str,
    reference: &str,
    cache_dir: Option<&Path>,
) -> Result<AcquiredRepo, AcquireError>
where
    G: GitBackend + ?Sized,
{
    let cache_root = resolve_cache_root(cache_dir)?;
    let repo_path = cache_path(&cache_root, url, reference);
    debug!(path = %repo_path.display(), repo_url = url, reference = reference, "Using cache directory");

    let mut replaced_stale = false;
    if is_working_copy(&repo_path) {
        match inspect_cached(git, &repo_path, reference).await {
            CacheState::CacheHitCurrent => {
                info!(path = %repo_path.display(), "Using cached repository");
                return Ok(AcquiredRepo::new(repo_path, Route::CachedCurrent));
            }
            _ => match refresh_cached(git, &repo_path, reference).await {
                Ok(()) => {
                    info!(path = %repo_path.display(), reference = reference, "Updated cached repository");
                    return Ok(AcquiredRepo::new(repo_path, Route::CacheRefreshed));
                }
                Err(e) => {
                    warn!(error = %e, path = %repo_path.display(), "Update failed, removing cache and re-cloning");
                    remove_path(&repo_path)?;
                    replaced_stale = true;
                }
            },
        }
    } else if repo_path.exists() {
        warn!(path = %repo_path.display(), "Cache entry is not a valid working copy, discarding it");
        remove_path(&repo_path)?;
        replaced_stale = true;
    } else {
        debug!(state = ?CacheState::CacheMiss, "No cache entry");
    }

    let staging = tempfile::Builder::new()
        .prefix(".clone-")
        .tempdir_in(&cache_root)?;
    let staged_repo = staging.path().join("repo");
    info!(repo_url = url, reference = reference, "Cloning repository to cache");
    clone_at_ref(git, url, reference, &staged_repo).await?;

    // Another process may have populated the entry while we were cloning.
    if repo_path.exists() {
        remove_path(&repo_path)?;
    }
    fs::rename(&staged_repo, &repo_path)?;
    info!(path = %repo_path.display(), "Repository cached for future use");

    Ok(AcquiredRepo::new(
        repo_path,
        Route::FreshClone { replaced_stale },
    ))
}

/// Decide whether a cached working copy already matches `reference`.
///
/// Any failure while checking counts as stale.
pub async fn inspect_cached<G>(git: &G, repo: &Path, reference: &str) -> CacheState
where
    G: GitBackend + ?Sized,
{
    if let Err(e) = git.fetch(repo).await {
        warn!(error = %e, "Could not fetch remote, assuming cache is stale");
        return CacheState::CacheHitStale;
    }
    let head = match git.head_commit(repo).await {
        Ok(head) => head,
        Err(e) => {
            warn!(error = %e, "Could not read HEAD of cached repository");
            return CacheState::CacheHitStale;
        }
    };

    let target = match git.resolve_commit(repo, &format!("origin/{reference}")).await {
        Ok(remote) => remote,
        // Not a branch: tags and commits are resolved locally.
        Err(_) => match git.resolve_commit(repo, reference).await {
            Ok(commit) => commit,
            Err(e) => {
                warn!(error = %e, reference = reference, "Cannot resolve target ref, assuming cache is stale");
                return CacheState::CacheHitStale;
            }
        },
    };

    if head == target {
        debug!(commit = %short(&head), "Cached repo is current");
        CacheState::CacheHitCurrent
    } else {
        info!(cached = %short(&head), target = %short(&target), "Cached repo is outdated");
        CacheState::CacheHitStale
    }
}

async fn refresh_cached<G>(git: &G, repo: &Path, reference: &str) -> Result<(), GitError>
where
    G: GitBackend + ?Sized,
{
    git.fetch(repo).await?;
    git.checkout(repo, reference).await?;
    if git
        .resolve_commit(repo, &format!("origin/{reference}"))
        .await
        .is_ok()
    {
        git.fast_forward(repo, reference).await?;
    }
    Ok(())
}

async fn clone_at_ref<G>(git: &G, url: &str, reference: &str, dest: &Path) -> Result<(), AcquireError>
where
    G: GitBackend + ?Sized,
{
    git.clone_repo(url, dest).await.map_err(|source| {
        tracing::error!(repo_url = url, error = %source, "Git clone failed");
        AcquireError::Clone {
            url: url.to_string(),
            source,
        }
    })?;

    // The clone already sits on the remote default branch.
    if let Ok(Some(branch)) = git.current_branch(dest).await {
        if branch == reference {
            debug!(branch = %branch, "Reference is the default branch, no checkout needed");
            return Ok(());
        }
    }

    git.checkout(dest, reference).await.map_err(|source| {
        tracing::error!(reference = reference, error = %source, "Checkout failed");
        AcquireError::Checkout {
            reference: reference.to_string(),
            source,
        }
    })?;
    info!(reference = reference, path = %dest.display(), "Checked out git reference");
    Ok(())
}

fn remove_path(path: &Path) -> io::Result<()> {
    if path.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    }
}

fn short(commit: &str) -> &str {
    commit.get(..8).unwrap_or(commit)
}
