//! Cache location and cache keys for cloned Showroom repositories.
//!
//! Every (repository URL, reference) pair maps to one directory under the
//! cache root, named by a short content hash so it is always filesystem-safe.

use sha2::{Digest, Sha256};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Name of the per-user tool directory under `$HOME`.
pub const TOOL_DIR_NAME: &str = ".showroom-tool";

/// Length of the hex cache key.
pub const CACHE_KEY_LEN: usize = 16;

/// Returns the cache root, creating it (and its parents) if missing.
///
/// Without an override this is `~/.showroom-tool/cache`. If no home directory
/// can be determined the cache falls back to `./.showroom-tool/cache`.
pub fn resolve_cache_root(custom_dir: Option<&Path>) -> io::Result<PathBuf> {
    let cache_dir = match custom_dir {
        Some(dir) => dir.to_path_buf(),
        None => dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(TOOL_DIR_NAME)
            .join("cache"),
    };
    fs::create_dir_all(&cache_dir)?;
    debug!(path = %cache_dir.display(), "Resolved cache directory");
    Ok(cache_dir)
}

/// Lowercases the URL and strips a trailing `.git`.
pub fn normalize_url(url: &str) -> String {
    let lowered = url.trim().to_lowercase();
    match lowered.strip_suffix(".git") {
        Some(stripped) => stripped.to_string(),
        None => lowered,
    }
}

/// Deterministic, filesystem-safe key for a (url, ref) pair.
pub fn cache_key(url: &str, reference: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(normalize_url(url).as_bytes());
    hasher.update(b"#");
    hasher.update(reference.as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    digest[..CACHE_KEY_LEN].to_string()
}

/// Directory a (url, ref) pair is cached in.
pub fn cache_path(cache_root: &Path, url: &str, reference: &str) -> PathBuf {
    cache_root.join(cache_key(url, reference))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn cache_key_is_deterministic() {
        let a = cache_key("https://github.com/example/lab", "main");
        let b = cache_key("https://github.com/example/lab", "main");
        assert_eq!(a, b);
        assert_eq!(a.len(), CACHE_KEY_LEN);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn cache_key_normalizes_case_and_git_suffix() {
        assert_eq!(
            cache_key("https://x/y.git", "main"),
            cache_key("https://X/y", "main")
        );
    }

    #[test]
    fn cache_key_differs_per_ref_and_url() {
        let url = "https://github.com/example/lab";
        let refs = ["main", "master", "v1.0", "879e21e", "feature/x", "Main"];
        let mut keys: Vec<String> = refs.iter().map(|r| cache_key(url, r)).collect();
        keys.push(cache_key("https://github.com/example/other", "main"));
        let mut deduped = keys.clone();
        deduped.sort();
        deduped.dedup();
        assert_eq!(keys.len(), deduped.len(), "collision in {keys:?}");
    }

    #[test]
    fn separator_prevents_ambiguous_concatenation() {
        assert_ne!(cache_key("https://x/ab", "c"), cache_key("https://x/a", "bc"));
    }

    #[test]
    fn resolve_cache_root_creates_custom_dir() {
        let tmp = tempdir().unwrap();
        let wanted = tmp.path().join("nested").join("cache");
        let root = resolve_cache_root(Some(&wanted)).unwrap();
        assert_eq!(root, wanted);
        assert!(root.is_dir());
    }
}
