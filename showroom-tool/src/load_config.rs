/// `load_config` module: reads analysis settings from YAML files and layers them.
///
/// Files are discovered in two places and merged in this order, later files
/// overriding earlier ones:
/// 1. user level: `~/.config/showroom-tool/config.yaml`
/// 2. project level: `./config/showroom-tool.yaml`
///
/// A file passed with `--config` is applied last. Secrets never come from
/// these files; API keys are read from the environment (and `.env`).
///
/// # Errors
/// All errors in this module use `anyhow::Error` for context-rich diagnostics, and are surfaced at the CLI boundary.
use anyhow::{Context, Result};
use showroom_core::config::AnalysisConfig;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};

pub const USER_CONFIG: &str = ".config/showroom-tool/config.yaml";
pub const PROJECT_CONFIG: &str = "config/showroom-tool.yaml";

/// Parses a single YAML config file.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AnalysisConfig> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading configuration from file");

    let config_content = fs::read_to_string(path_ref).map_err(|e| {
        error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
        anyhow::anyhow!("Failed to read config file {:?}: {}", path_ref, e)
    })?;

    // An empty file is a valid, empty layer.
    if config_content.trim().is_empty() {
        return Ok(AnalysisConfig::default());
    }

    let config: AnalysisConfig = serde_yaml::from_str(&config_content).map_err(|e| {
        error!(error = ?e, config_path = ?path_ref, "Failed to parse config YAML");
        anyhow::anyhow!("Failed to parse config YAML {:?}: {e}", path_ref)
    })?;
    debug!(config_path = ?path_ref, "Parsed config YAML successfully");
    Ok(config)
}

/// Existing config files, lowest precedence first.
pub fn discover_config_paths(home: Option<&Path>, project_root: &Path) -> Vec<PathBuf> {
    let candidates = home
        .map(|h| h.join(USER_CONFIG))
        .into_iter()
        .chain(std::iter::once(project_root.join(PROJECT_CONFIG)));
    candidates.filter(|p| p.is_file()).collect()
}

/// Discovered files merged, then `explicit` on top.
pub fn load_layered(explicit: Option<&Path>) -> Result<AnalysisConfig> {
    let cwd = std::env::current_dir().context("Cannot determine current directory")?;
    let home = dirs::home_dir();
    load_layered_from(home.as_deref(), &cwd, explicit)
}

pub fn load_layered_from(
    home: Option<&Path>,
    project_root: &Path,
    explicit: Option<&Path>,
) -> Result<AnalysisConfig> {
    let mut paths = discover_config_paths(home, project_root);
    if let Some(path) = explicit {
        paths.push(path.to_path_buf());
    }

    let mut merged = AnalysisConfig::default();
    for path in &paths {
        let layer = load_config(path).with_context(|| format!("Loading {}", path.display()))?;
        merged = merged.merge(layer);
    }
    info!(files = paths.len(), "Configuration layers applied");
    Ok(merged)
}
