// Acquisition state machine tests.
// Most cases drive a MockGitBackend; the last ones run the real git binary
// against a repository created on the fly and are skipped when git is missing.

use showroom_core::cache::cache_path;
use showroom_core::contract::MockGitBackend;
use showroom_core::download::{acquire, AcquireOptions, RepoSource, Route};
use showroom_core::error::{AcquireError, GitError};
use showroom_core::git::GitCli;
use std::fs;
use std::path::Path;
use std::process::Command;
use std::time::Duration;
use tempfile::tempdir;

const URL: &str = "https://github.com/example/showroom-lab";

fn fake_clone(dest: &Path) -> Result<(), GitError> {
    fs::create_dir_all(dest.join(".git")).unwrap();
    fs::write(dest.join("default-site.yml"), "site:\n  title: Lab\n  start_page: index.adoc\n").unwrap();
    Ok(())
}

fn cached_options(root: &Path) -> AcquireOptions {
    AcquireOptions {
        cache_dir: Some(root.to_path_buf()),
        ..Default::default()
    }
}

#[tokio::test]
async fn local_dir_must_be_a_working_copy() {
    let git = MockGitBackend::new();
    let tmp = tempdir().unwrap();

    let err = acquire(&git, &RepoSource::local(tmp.path()), &AcquireOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, AcquireError::NotARepository(_)));

    fs::create_dir(tmp.path().join(".git")).unwrap();
    let repo = acquire(&git, &RepoSource::local(tmp.path()), &AcquireOptions::default())
        .await
        .unwrap();
    assert_eq!(repo.route(), Route::LocalDir);
    assert!(!repo.is_ephemeral());
}

#[tokio::test]
async fn empty_url_is_rejected() {
    let git = MockGitBackend::new();
    let err = acquire(&git, &RepoSource::remote("  ", "main"), &AcquireOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, AcquireError::MissingUrl));
}

#[tokio::test]
async fn cache_miss_clones_into_keyed_directory() {
    let root = tempdir().unwrap();
    let mut git = MockGitBackend::new();
    git.expect_clone_repo()
        .times(1)
        .returning(|_url: &str, dest: &Path| fake_clone(dest));
    git.expect_current_branch()
        .returning(|_repo: &Path| Ok(Some("main".to_string())));
    git.expect_checkout().never();

    let repo = acquire(&git, &RepoSource::remote(URL, "main"), &cached_options(root.path()))
        .await
        .unwrap();

    let expected = cache_path(root.path(), URL, "main");
    assert_eq!(repo.path(), expected);
    assert_eq!(repo.route(), Route::FreshClone { replaced_stale: false });
    assert!(expected.join(".git").is_dir());
    // Only the cache entry remains: the staging directory is gone.
    assert_eq!(fs::read_dir(root.path()).unwrap().count(), 1);
}

#[tokio::test]
async fn non_default_ref_is_checked_out_after_clone() {
    let root = tempdir().unwrap();
    let mut git = MockGitBackend::new();
    git.expect_clone_repo()
        .returning(|_url: &str, dest: &Path| fake_clone(dest));
    git.expect_current_branch()
        .returning(|_repo: &Path| Ok(Some("main".to_string())));
    git.expect_checkout()
        .withf(|_repo: &Path, reference: &str| reference == "v1.2")
        .times(1)
        .returning(|_repo: &Path, _reference: &str| Ok(()));

    let repo = acquire(&git, &RepoSource::remote(URL, "v1.2"), &cached_options(root.path()))
        .await
        .unwrap();
    assert_eq!(repo.path(), cache_path(root.path(), URL, "v1.2"));
}

#[tokio::test]
async fn current_cache_is_reused_untouched() {
    let root = tempdir().unwrap();
    fake_clone(&cache_path(root.path(), URL, "main")).unwrap();

    let mut git = MockGitBackend::new();
    git.expect_fetch().times(1).returning(|_repo: &Path| Ok(()));
    git.expect_head_commit()
        .returning(|_repo: &Path| Ok("abc123".to_string()));
    git.expect_resolve_commit()
        .withf(|_repo: &Path, rev: &str| rev == "origin/main")
        .returning(|_repo: &Path, _rev: &str| Ok("abc123".to_string()));
    git.expect_clone_repo().never();
    git.expect_checkout().never();

    let repo = acquire(&git, &RepoSource::remote(URL, "main"), &cached_options(root.path()))
        .await
        .unwrap();
    assert_eq!(repo.route(), Route::CachedCurrent);
}

#[tokio::test]
async fn tag_is_compared_against_local_resolution() {
    let root = tempdir().unwrap();
    fake_clone(&cache_path(root.path(), URL, "v2.0")).unwrap();

    let mut git = MockGitBackend::new();
    git.expect_fetch().returning(|_repo: &Path| Ok(()));
    git.expect_head_commit()
        .returning(|_repo: &Path| Ok("feedbeef".to_string()));
    git.expect_resolve_commit()
        .returning(|_repo: &Path, rev: &str| match rev {
            "origin/v2.0" => Err(GitError::new("rev-parse", "unknown revision")),
            _ => Ok("feedbeef".to_string()),
        });

    let repo = acquire(&git, &RepoSource::remote(URL, "v2.0"), &cached_options(root.path()))
        .await
        .unwrap();
    assert_eq!(repo.route(), Route::CachedCurrent);
}

#[tokio::test]
async fn stale_cache_is_updated_in_place() {
    let root = tempdir().unwrap();
    fake_clone(&cache_path(root.path(), URL, "main")).unwrap();

    let mut git = MockGitBackend::new();
    git.expect_fetch().times(2).returning(|_repo: &Path| Ok(()));
    git.expect_head_commit()
        .returning(|_repo: &Path| Ok("old".to_string()));
    git.expect_resolve_commit()
        .returning(|_repo: &Path, _rev: &str| Ok("new".to_string()));
    git.expect_checkout()
        .times(1)
        .returning(|_repo: &Path, _reference: &str| Ok(()));
    git.expect_fast_forward()
        .withf(|_repo: &Path, branch: &str| branch == "main")
        .times(1)
        .returning(|_repo: &Path, _branch: &str| Ok(()));
    git.expect_clone_repo().never();

    let repo = acquire(&git, &RepoSource::remote(URL, "main"), &cached_options(root.path()))
        .await
        .unwrap();
    assert_eq!(repo.route(), Route::CacheRefreshed);
}

#[tokio::test]
async fn failed_update_removes_cache_and_reclones() {
    let root = tempdir().unwrap();
    let entry = cache_path(root.path(), URL, "main");
    fake_clone(&entry).unwrap();
    fs::write(entry.join("stale-marker"), "old contents").unwrap();

    let mut git = MockGitBackend::new();
    // Fetch fails during inspection and again during the update.
    git.expect_fetch()
        .returning(|_repo: &Path| Err(GitError::new("fetch", "network unreachable")));
    git.expect_clone_repo()
        .times(1)
        .returning(|_url: &str, dest: &Path| fake_clone(dest));
    git.expect_current_branch()
        .returning(|_repo: &Path| Ok(Some("main".to_string())));

    let repo = acquire(&git, &RepoSource::remote(URL, "main"), &cached_options(root.path()))
        .await
        .unwrap();

    assert_eq!(repo.route(), Route::FreshClone { replaced_stale: true });
    assert!(entry.join(".git").is_dir());
    assert!(!entry.join("stale-marker").exists());
}

#[tokio::test]
async fn invalid_remnant_is_replaced() {
    let root = tempdir().unwrap();
    let entry = cache_path(root.path(), URL, "main");
    fs::create_dir_all(&entry).unwrap();
    fs::write(entry.join("half-written"), "").unwrap();

    let mut git = MockGitBackend::new();
    git.expect_fetch().never();
    git.expect_clone_repo()
        .times(1)
        .returning(|_url: &str, dest: &Path| fake_clone(dest));
    git.expect_current_branch()
        .returning(|_repo: &Path| Ok(Some("main".to_string())));

    let repo = acquire(&git, &RepoSource::remote(URL, "main"), &cached_options(root.path()))
        .await
        .unwrap();
    assert_eq!(repo.route(), Route::FreshClone { replaced_stale: true });
    assert!(!entry.join("half-written").exists());
}

#[tokio::test]
async fn failed_clone_leaves_no_cache_entry() {
    let root = tempdir().unwrap();
    let mut git = MockGitBackend::new();
    git.expect_clone_repo().returning(|_url: &str, dest: &Path| {
        // Partial clone left behind by git before failing.
        fs::create_dir_all(dest.join(".git")).unwrap();
        Err(GitError::new("clone", "repository not found"))
    });

    let err = acquire(&git, &RepoSource::remote(URL, "main"), &cached_options(root.path()))
        .await
        .unwrap_err();

    assert!(matches!(err, AcquireError::Clone { .. }));
    assert!(err.to_string().contains("repository not found"));
    assert!(!cache_path(root.path(), URL, "main").exists());
    assert_eq!(fs::read_dir(root.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn failed_checkout_is_reported_and_not_cached() {
    let root = tempdir().unwrap();
    let mut git = MockGitBackend::new();
    git.expect_clone_repo()
        .returning(|_url: &str, dest: &Path| fake_clone(dest));
    git.expect_current_branch()
        .returning(|_repo: &Path| Ok(Some("main".to_string())));
    git.expect_checkout().returning(|_repo: &Path, _reference: &str| {
        Err(GitError::new("checkout", "pathspec 'nope' did not match"))
    });

    let err = acquire(&git, &RepoSource::remote(URL, "nope"), &cached_options(root.path()))
        .await
        .unwrap_err();
    assert!(matches!(err, AcquireError::Checkout { ref reference, .. } if reference == "nope"));
    assert!(!cache_path(root.path(), URL, "nope").exists());
}

#[tokio::test]
async fn no_cache_clone_is_removed_with_handle() {
    let mut git = MockGitBackend::new();
    git.expect_clone_repo()
        .returning(|_url: &str, dest: &Path| fake_clone(dest));
    git.expect_current_branch()
        .returning(|_repo: &Path| Ok(Some("main".to_string())));

    let options = AcquireOptions {
        no_cache: true,
        ..Default::default()
    };
    let repo = acquire(&git, &RepoSource::remote(URL, "main"), &options)
        .await
        .unwrap();
    assert_eq!(repo.route(), Route::Ephemeral);
    assert!(repo.is_ephemeral());
    let path = repo.path().to_path_buf();
    assert!(path.join(".git").is_dir());

    drop(repo);
    assert!(!path.exists());
}

fn git_available() -> bool {
    Command::new("git")
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

fn run_git(dir: &Path, args: &[&str]) {
    let status = Command::new("git")
        .arg("-C")
        .arg(dir)
        .args([
            "-c",
            "user.name=Showroom Test",
            "-c",
            "user.email=test@example.com",
            "-c",
            "commit.gpgsign=false",
        ])
        .args(args)
        .status()
        .expect("git runs");
    assert!(status.success(), "git {args:?} failed");
}

/// Creates an upstream repository with one commit on `main` and a `v1` tag.
fn init_upstream(dir: &Path) {
    fs::create_dir_all(dir).unwrap();
    run_git(dir, &["init", "--quiet", "--initial-branch=main"]);
    fs::write(dir.join("default-site.yml"), "site:\n  title: Upstream Lab\n  start_page: index.adoc\n").unwrap();
    run_git(dir, &["add", "."]);
    run_git(dir, &["commit", "--quiet", "-m", "initial"]);
    run_git(dir, &["tag", "v1"]);
}

#[tokio::test]
async fn real_git_clone_then_cache_hit_then_refresh() {
    if !git_available() {
        eprintln!("git not available, skipping");
        return;
    }
    let tmp = tempdir().unwrap();
    let upstream = tmp.path().join("upstream");
    init_upstream(&upstream);
    let url = upstream.display().to_string();
    let options = cached_options(&tmp.path().join("cache"));
    let git = GitCli::new();

    let first = acquire(&git, &RepoSource::remote(&url, "main"), &options)
        .await
        .unwrap();
    assert_eq!(first.route(), Route::FreshClone { replaced_stale: false });

    let second = acquire(&git, &RepoSource::remote(&url, "main"), &options)
        .await
        .unwrap();
    assert_eq!(second.route(), Route::CachedCurrent);

    fs::write(upstream.join("new.adoc"), "= New\n").unwrap();
    run_git(&upstream, &["add", "."]);
    run_git(&upstream, &["commit", "--quiet", "-m", "second"]);

    let third = acquire(&git, &RepoSource::remote(&url, "main"), &options)
        .await
        .unwrap();
    assert_eq!(third.route(), Route::CacheRefreshed);
    assert!(third.path().join("new.adoc").is_file());

    let tagged = acquire(&git, &RepoSource::remote(&url, "v1"), &options)
        .await
        .unwrap();
    assert!(!tagged.path().join("new.adoc").exists());
}

#[tokio::test]
async fn real_git_clone_of_missing_repo_fails_cleanly() {
    if !git_available() {
        eprintln!("git not available, skipping");
        return;
    }
    let tmp = tempdir().unwrap();
    let cache = tmp.path().join("cache");
    let missing = tmp.path().join("does-not-exist").display().to_string();
    let options = AcquireOptions {
        cache_dir: Some(cache.clone()),
        timeout: Some(Duration::from_secs(60)),
        ..Default::default()
    };

    let err = acquire(&GitCli::new(), &RepoSource::remote(&missing, "main"), &options)
        .await
        .unwrap_err();
    assert!(matches!(err, AcquireError::Clone { .. }));
    assert!(!cache_path(&cache, &missing, "main").exists());
}

#[tokio::test]
async fn missing_git_binary_reports_clone_error() {
    let root = tempdir().unwrap();
    let git = GitCli::with_program("git-binary-that-does-not-exist");
    let source = RepoSource::remote(URL, "main");

    let err = acquire(&git, &source, &cached_options(root.path())).await.unwrap_err();
    assert!(matches!(err, AcquireError::Clone { .. }), "got {err:?}");
    assert!(!cache_path(root.path(), URL, "main").exists());
}

use async_trait::async_trait;
use showroom_core::contract::GitBackend;

/// Clone writes part of a working copy and then hangs.
struct HangingClone;

#[async_trait]
impl GitBackend for HangingClone {
    async fn clone_repo(&self, _url: &str, dest: &Path) -> Result<(), GitError> {
        fs::create_dir_all(dest.join(".git")).unwrap();
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(())
    }

    async fn fetch(&self, _repo: &Path) -> Result<(), GitError> {
        Ok(())
    }

    async fn checkout(&self, _repo: &Path, _reference: &str) -> Result<(), GitError> {
        Ok(())
    }

    async fn fast_forward(&self, _repo: &Path, _branch: &str) -> Result<(), GitError> {
        Ok(())
    }

    async fn head_commit(&self, _repo: &Path) -> Result<String, GitError> {
        Ok("abc".into())
    }

    async fn resolve_commit(&self, _repo: &Path, _revision: &str) -> Result<String, GitError> {
        Ok("abc".into())
    }

    async fn current_branch(&self, _repo: &Path) -> Result<Option<String>, GitError> {
        Ok(Some("main".into()))
    }
}

#[tokio::test]
async fn deadline_aborts_clone_and_leaves_cache_empty() {
    let root = tempdir().unwrap();
    let options = AcquireOptions {
        cache_dir: Some(root.path().to_path_buf()),
        timeout: Some(Duration::from_millis(50)),
        ..Default::default()
    };

    let err = acquire(&HangingClone, &RepoSource::remote(URL, "main"), &options)
        .await
        .unwrap_err();

    assert!(matches!(err, AcquireError::Timeout(limit) if limit == Duration::from_millis(50)));
    let leftovers: Vec<_> = fs::read_dir(root.path()).unwrap().collect();
    assert!(leftovers.is_empty(), "cache root not empty: {leftovers:?}");
}
