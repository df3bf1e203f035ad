//! Linear pipeline: acquire → extract, then optionally prompt → invoke →
//! attach.

use std::path::PathBuf;
use std::time::Duration;

use tracing::{info, warn};

use crate::artifacts::{Artifact, ArtifactKind, CatalogDescription, ShowroomReview, ShowroomSummary};
use crate::config::AnalysisConfig;
use crate::contract::{GitBackend, LlmProvider};
use crate::download::{acquire, AcquireOptions, RepoSource, LOCAL_REF};
use crate::error::PipelineError;
use crate::extract::extract_showroom;
use crate::invoke::{invoke, Invocation};
use crate::model::Showroom;
use crate::prompt::{build_prompt, build_system_prompt, Prompt};

/// Everything needed to turn a repository into a [`Showroom`].
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub source: RepoSource,
    pub cache_dir: Option<PathBuf>,
    pub no_cache: bool,
    pub timeout: Option<Duration>,
}

impl FetchRequest {
    pub fn new(source: RepoSource) -> Self {
        Self {
            source,
            cache_dir: None,
            no_cache: false,
            timeout: None,
        }
    }
}

/// Acquire the repository and extract its document.
///
/// For local directories the document records the directory as its URL and
/// [`LOCAL_REF`] as its reference. A no-cache clone is deleted once
/// extraction has read it.
pub async fn fetch_showroom<G>(git: &G, request: &FetchRequest) -> Result<Showroom, PipelineError>
where
    G: GitBackend + ?Sized,
{
    let options = AcquireOptions {
        cache_dir: request.cache_dir.clone(),
        no_cache: request.no_cache,
        timeout: request.timeout,
    };
    let repo = acquire(git, &request.source, &options).await?;
    info!(path = %repo.path().display(), route = ?repo.route(), "Repository ready");

    let (url, reference) = match &request.source {
        RepoSource::Remote { url, reference } => (url.clone(), reference.clone()),
        RepoSource::Local { .. } => (repo.path().display().to_string(), LOCAL_REF.to_string()),
    };
    let showroom = extract_showroom(repo.path(), &url, &reference)?;
    if showroom.modules().is_empty() {
        warn!(repo_url = %url, "No modules found in showroom");
    }
    Ok(showroom)
}

/// System prompt an artifact kind is generated with, without lab content.
pub fn system_prompt_for(kind: ArtifactKind, config: &AnalysisConfig) -> String {
    build_system_prompt(config.base_prompt(kind), kind.fields(), &config.context_hints)
}

pub fn prompt_for(showroom: &Showroom, kind: ArtifactKind, config: &AnalysisConfig) -> Prompt {
    build_prompt(
        config.base_prompt(kind),
        kind.fields(),
        showroom,
        &config.context_hints,
    )
}

/// Generate one artifact for `showroom` without attaching it.
pub async fn generate<P>(
    provider: &P,
    showroom: &Showroom,
    kind: ArtifactKind,
    config: &AnalysisConfig,
) -> Invocation<Artifact>
where
    P: LlmProvider + ?Sized,
{
    let prompt = prompt_for(showroom, kind, config);
    let options = config.invoke_options(kind);
    match kind {
        ArtifactKind::Summary => invoke::<ShowroomSummary, P>(provider, &prompt.system, &prompt.user, &options)
            .await
            .map(Artifact::Summary),
        ArtifactKind::Review => invoke::<ShowroomReview, P>(provider, &prompt.system, &prompt.user, &options)
            .await
            .map(Artifact::Review),
        ArtifactKind::Description => {
            invoke::<CatalogDescription, P>(provider, &prompt.system, &prompt.user, &options)
                .await
                .map(Artifact::Description)
        }
    }
}

/// Generate an artifact and attach it to `showroom`.
pub async fn analyze<P>(
    provider: &P,
    showroom: &mut Showroom,
    kind: ArtifactKind,
    config: &AnalysisConfig,
) -> Result<Artifact, PipelineError>
where
    P: LlmProvider + ?Sized,
{
    let invocation = generate(provider, showroom, kind, config).await;
    match invocation.result {
        Ok(artifact) => {
            showroom.attach(artifact.clone());
            Ok(artifact)
        }
        Err(e) => Err(PipelineError::Analysis {
            kind: kind.to_string(),
            message: e.to_string(),
        }),
    }
}
