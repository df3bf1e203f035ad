//! Writes generated artifacts to the workspace directory.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use serde::Serialize;
use tracing::info;

pub const DEFAULT_WORKSPACE: &str = "workspace";

/// File name for an artifact saved at `at`: `<tag>_<YYYYmmdd_HHMMSS>.json`.
pub fn artifact_filename(tag: &str, at: DateTime<Local>) -> String {
    format!("{tag}_{}.json", at.format("%Y%m%d_%H%M%S"))
}

/// Serialize `value` as pretty JSON into `dir`, creating `dir` if needed.
pub fn save_artifact<T: Serialize + ?Sized>(value: &T, tag: &str, dir: &Path) -> io::Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let path = dir.join(artifact_filename(tag, Local::now()));
    let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
    fs::write(&path, json)?;
    info!(path = %path.display(), tag = tag, "Saved artifact");
    Ok(path)
}
