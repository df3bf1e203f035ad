//! Reads a Showroom working copy into a [`Showroom`] document.
//!
//! Layout (fixed):
//! - `default-site.yml`: `site.title` and `site.start_page`
//! - `content/modules/ROOT/nav.adoc`: top-level bullets are the modules
//! - `content/modules/ROOT/pages/<file>`: module sources
//!
//! [`read_site_manifest`] and [`read_navigation`] are strict and return
//! errors. [`extract_showroom`] is lenient: anything missing below the
//! repository root is logged and skipped so a partially broken lab still
//! yields a document.

use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::error::ExtractError;
use crate::model::{Showroom, ShowroomModule};
use crate::title::extract_title;

pub const SITE_MANIFEST: &str = "default-site.yml";
pub const NAV_FILE: &str = "content/modules/ROOT/nav.adoc";
pub const PAGES_DIR: &str = "content/modules/ROOT/pages";

/// `site.title` and `site.start_page` from `default-site.yml`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SiteManifest {
    pub title: String,
    /// Page filename with any Antora coordinate removed.
    pub start_page: String,
}

#[derive(Debug, Deserialize)]
struct RawManifest {
    site: Option<RawSite>,
}

#[derive(Debug, Deserialize)]
struct RawSite {
    title: Option<String>,
    start_page: Option<String>,
}

fn read_raw_site(repo: &Path) -> Result<RawSite, ExtractError> {
    let path = repo.join(SITE_MANIFEST);
    if !path.is_file() {
        return Err(ExtractError::MissingManifest(path));
    }
    let text = fs::read_to_string(&path)?;
    let raw: RawManifest =
        serde_yaml::from_str(&text).map_err(|e| ExtractError::InvalidManifest {
            path: path.clone(),
            message: e.to_string(),
        })?;
    raw.site.ok_or(ExtractError::MissingField("site"))
}

/// Parse `default-site.yml` under `repo`.
pub fn read_site_manifest(repo: &Path) -> Result<SiteManifest, ExtractError> {
    let site = read_raw_site(repo)?;
    let title = site.title.ok_or(ExtractError::MissingField("site.title"))?;
    let start_page = site
        .start_page
        .ok_or(ExtractError::MissingField("site.start_page"))?;

    let manifest = SiteManifest {
        title: title.trim().to_string(),
        start_page: strip_coordinates(start_page.trim()).to_string(),
    };
    debug!(title = %manifest.title, start_page = %manifest.start_page, "Read site manifest");
    Ok(manifest)
}

/// Like [`read_site_manifest`], but keeps whatever fields are present and
/// leaves the rest empty.
fn read_site_manifest_lenient(repo: &Path) -> SiteManifest {
    let site = match read_raw_site(repo) {
        Ok(site) => site,
        Err(e) => {
            warn!(error = %e, "Could not read site manifest, continuing without title");
            return SiteManifest::default();
        }
    };
    let title = site.title.map(|t| t.trim().to_string()).unwrap_or_else(|| {
        warn!("Site manifest has no site.title");
        String::new()
    });
    let start_page = site
        .start_page
        .map(|p| strip_coordinates(p.trim()).to_string())
        .unwrap_or_else(|| {
            warn!("Site manifest has no site.start_page");
            String::new()
        });
    SiteManifest { title, start_page }
}

/// Drop Antora coordinates (`ROOT:`, `module::`, `version@module:`) and a
/// leading `./`.
fn strip_coordinates(target: &str) -> &str {
    let page = match target.rfind(':') {
        Some(idx) => &target[idx + 1..],
        None => target,
    };
    page.strip_prefix("./").unwrap_or(page)
}

/// A page path must stay inside the pages directory.
fn is_contained(page: &str) -> bool {
    !page.is_empty()
        && Path::new(page)
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

/// Module filenames listed in `nav.adoc`, in navigation order.
pub fn read_navigation(repo: &Path) -> Result<Vec<String>, ExtractError> {
    let path = repo.join(NAV_FILE);
    if !path.is_file() {
        return Err(ExtractError::MissingNavigation(path));
    }
    let text = fs::read_to_string(&path)?;
    Ok(parse_navigation(&text))
}

fn nav_reference() -> &'static Regex {
    static NAV_REFERENCE: OnceLock<Regex> = OnceLock::new();
    NAV_REFERENCE.get_or_init(|| {
        Regex::new(r"(?:xref|link):([^\[\]\s]+?\.adoc)").expect("navigation pattern is valid")
    })
}

/// Extract page filenames from navigation text.
///
/// Only top-level bullets (`* `) count; `** ` and deeper are nested entries.
/// The first `xref:`/`link:` target ending in `.adoc` is taken, Antora
/// coordinates (`ROOT:`, `module::`) and a leading `./` are removed, and
/// repeats are dropped keeping the first occurrence. Absolute targets and
/// targets with `..` are skipped.
pub fn parse_navigation(text: &str) -> Vec<String> {
    let mut filenames: Vec<String> = Vec::new();
    for line in text.lines() {
        let line = line.trim_start();
        let Some(rest) = line.strip_prefix('*') else {
            continue;
        };
        if !rest.starts_with(char::is_whitespace) {
            continue;
        }
        let Some(target) = nav_reference()
            .captures(rest)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str())
        else {
            continue;
        };
        let filename = strip_coordinates(target);
        if !is_contained(filename) {
            warn!(target = target, "Ignoring navigation entry outside the pages directory");
            continue;
        }
        if filenames.iter().any(|f| f == filename) {
            continue;
        }
        filenames.push(filename.to_string());
    }
    filenames
}

/// Build a document from a working copy.
///
/// Fails only when `repo` does not exist; every other problem degrades with a
/// warning (empty title, no modules, skipped pages).
pub fn extract_showroom(
    repo: &Path,
    source_url: &str,
    source_ref: &str,
) -> Result<Showroom, ExtractError> {
    if !repo.is_dir() {
        return Err(ExtractError::RepositoryNotFound(repo.to_path_buf()));
    }
    info!(path = %repo.display(), "Extracting showroom content");

    let manifest = read_site_manifest_lenient(repo);

    let filenames = read_navigation(repo).unwrap_or_else(|e| {
        warn!(error = %e, "Could not read navigation, no modules will be extracted");
        Vec::new()
    });

    let pages = repo.join(PAGES_DIR);
    let modules: Vec<ShowroomModule> = filenames
        .iter()
        .filter_map(|filename| read_module(&pages, filename, &manifest))
        .collect();

    info!(
        lab_name = %manifest.title,
        modules = modules.len(),
        listed = filenames.len(),
        "Extracted showroom"
    );
    Ok(Showroom::new(manifest.title, source_url, source_ref, modules))
}

fn read_module(pages: &Path, filename: &str, manifest: &SiteManifest) -> Option<ShowroomModule> {
    let path: PathBuf = pages.join(filename);
    let content = match fs::read_to_string(&path) {
        Ok(content) => content,
        Err(e) => {
            warn!(error = %e, path = %path.display(), "Skipping unreadable module");
            return None;
        }
    };

    let mut name = extract_title(&content);
    if name.is_empty() && filename == manifest.start_page && !manifest.title.is_empty() {
        debug!(filename = filename, "Start page has no heading, using lab title");
        name = manifest.title.clone();
    }
    debug!(filename = filename, module_name = %name, "Read module");

    Some(ShowroomModule {
        module_name: name,
        filename: filename.to_string(),
        module_content: content,
    })
}
