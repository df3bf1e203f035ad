///
/// This module implements the full CLI interface for showroom-tool: command
/// parsing, argument validation and the async entrypoint.
///
/// All core logic (acquisition, extraction, prompts, LLM calls) lives in the
/// [`showroom-core`] crate. This module only maps arguments onto it and
/// hands results to [`crate::render`].
///
/// ## How To Use
/// - For command-line users: use the installed `showroom-tool` binary with `--help`.
/// - For programmatic/integration use: call [`run`] with a constructed [`Cli`].
///
/// [`showroom-core`]: ../../showroom-core/
use crate::load_config::load_layered;
use crate::render::{self, OutputFormat};
use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand};
use showroom_core::artifacts::ArtifactKind;
use showroom_core::config::AnalysisConfig;
use showroom_core::download::{RepoSource, DEFAULT_REF};
use showroom_core::git::GitCli;
use showroom_core::invoke::Strategy;
use showroom_core::model::Showroom;
use showroom_core::output::{save_artifact, DEFAULT_WORKSPACE};
use showroom_core::pipeline::{analyze, fetch_showroom, system_prompt_for, FetchRequest};
use showroom_core::provider::{default_temperature_from_env, OpenAiCompatibleProvider, ProviderConfig};
use std::io;
use std::path::PathBuf;

/// CLI for showroom-tool: fetch Showroom labs and generate AI artifacts.
#[derive(Parser, Debug)]
#[clap(
    name = "showroom-tool",
    version,
    about = "Fetch Showroom lab repositories and generate AI summaries, reviews and catalog descriptions"
)]
pub struct Cli {
    /// Enable debug logging (overridden by SHOWROOM_LOG)
    #[clap(long, short, global = true)]
    pub verbose: bool,

    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fetch a Showroom repository and print its structure
    Fetch {
        #[clap(flatten)]
        repo: RepoArgs,

        /// Extra YAML config file, applied after discovered ones
        #[clap(long)]
        config: Option<PathBuf>,
    },
    /// Generate a summary of the lab
    Summary {
        #[clap(flatten)]
        repo: RepoArgs,
        #[clap(flatten)]
        analysis: AnalysisArgs,
    },
    /// Review the lab across five quality dimensions
    Review {
        #[clap(flatten)]
        repo: RepoArgs,
        #[clap(flatten)]
        analysis: AnalysisArgs,
    },
    /// Generate a catalog description of the lab
    Description {
        #[clap(flatten)]
        repo: RepoArgs,
        #[clap(flatten)]
        analysis: AnalysisArgs,
    },
}

#[derive(Args, Debug, Clone)]
pub struct RepoArgs {
    /// Git repository URL of the Showroom lab
    pub url: Option<String>,

    /// Git repository URL (alternative to the positional argument)
    #[clap(long, conflicts_with = "url")]
    pub repo: Option<String>,

    /// Use an existing local working copy instead of cloning
    #[clap(long, conflicts_with_all = ["url", "repo"])]
    pub dir: Option<PathBuf>,

    /// Branch, tag or commit to check out
    #[clap(long = "ref", default_value = DEFAULT_REF)]
    pub git_ref: String,

    /// Cache directory (default: ~/.showroom-tool/cache)
    #[clap(long)]
    pub cache_dir: Option<PathBuf>,

    /// Clone into a temporary directory that is removed afterwards
    #[clap(long)]
    pub no_cache: bool,

    /// Output format
    #[clap(long, value_enum, default_value_t = OutputFormat::Verbose)]
    pub output: OutputFormat,
}

impl RepoArgs {
    pub fn source(&self) -> Result<RepoSource> {
        if let Some(dir) = &self.dir {
            return Ok(RepoSource::local(dir));
        }
        let url = self
            .url
            .clone()
            .or_else(|| self.repo.clone())
            .ok_or_else(|| anyhow!("A repository URL (positional or --repo) or --dir is required"))?;
        Ok(RepoSource::remote(url, self.git_ref.clone()))
    }
}

#[derive(Args, Debug, Clone)]
pub struct AnalysisArgs {
    /// LLM provider: local, openai or gemini (default: LLM_PROVIDER, then gemini)
    #[clap(long)]
    pub llm_provider: Option<String>,

    /// Model name, overriding the provider's model variable
    #[clap(long)]
    pub model: Option<String>,

    /// Sampling temperature
    #[clap(long)]
    pub temperature: Option<f32>,

    /// single (one request) or per-field (one request per field)
    #[clap(long)]
    pub strategy: Option<Strategy>,

    /// Print the system prompt template and exit without fetching
    #[clap(long)]
    pub show_prompt: bool,

    /// Extra YAML config file, applied after discovered ones
    #[clap(long)]
    pub config: Option<PathBuf>,

    /// Directory the artifact JSON is saved into
    #[clap(long, default_value = DEFAULT_WORKSPACE)]
    pub workspace: PathBuf,
}

impl AnalysisArgs {
    /// Fold command-line overrides into the loaded config.
    fn apply(&self, kind: ArtifactKind, config: &mut AnalysisConfig) -> Result<()> {
        if let Some(temperature) = self.temperature {
            config.temperatures.insert(kind, temperature);
        } else if config.default_temperature.is_none() {
            config.default_temperature = Some(default_temperature_from_env()?);
        }
        if let Some(strategy) = self.strategy {
            config.strategy = Some(strategy);
        }
        Ok(())
    }
}

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    // Emit a top-level 'trace_initialised' event at the very start
    tracing::info!("trace_initialised");

    match cli.command {
        Commands::Fetch { repo, config } => {
            let config = load_layered(config.as_deref())?;
            tracing::info!(command = "fetch", "Fetching showroom");
            let showroom = fetch(&repo, &config).await?;
            render::print_showroom(&mut io::stdout().lock(), &showroom, repo.output)?;
            Ok(())
        }
        Commands::Summary { repo, analysis } => {
            run_analysis(ArtifactKind::Summary, repo, analysis).await
        }
        Commands::Review { repo, analysis } => run_analysis(ArtifactKind::Review, repo, analysis).await,
        Commands::Description { repo, analysis } => {
            run_analysis(ArtifactKind::Description, repo, analysis).await
        }
    }
}

async fn fetch(repo: &RepoArgs, config: &AnalysisConfig) -> Result<Showroom> {
    let request = FetchRequest {
        source: repo.source()?,
        cache_dir: repo.cache_dir.clone(),
        no_cache: repo.no_cache,
        timeout: config.git_timeout(),
    };
    let showroom = fetch_showroom(&GitCli::new(), &request).await?;
    Ok(showroom)
}

async fn run_analysis(kind: ArtifactKind, repo: RepoArgs, analysis: AnalysisArgs) -> Result<()> {
    let mut config = load_layered(analysis.config.as_deref())?;
    analysis.apply(kind, &mut config)?;
    config.trace_loaded();

    if analysis.show_prompt {
        render::print_prompt(&mut io::stdout().lock(), kind, &system_prompt_for(kind, &config))?;
        return Ok(());
    }

    // Provider problems surface before anything is cloned.
    let provider_config = ProviderConfig::from_env(analysis.llm_provider.as_deref(), analysis.model.as_deref())?
        .with_request_timeout(config.llm_timeout());
    let provider = OpenAiCompatibleProvider::new(provider_config)?;

    let mut showroom = fetch(&repo, &config).await?;
    tracing::info!(command = %kind, lab_name = %showroom.lab_name, modules = showroom.modules().len(), "Generating artifact");

    let artifact = analyze(&provider, &mut showroom, kind, &config).await?;
    let saved = save_artifact(&artifact, kind.tag(), &analysis.workspace)
        .with_context(|| format!("Saving {kind} to {}", analysis.workspace.display()))?;

    render::print_artifact(&mut io::stdout().lock(), &showroom, &artifact, &saved, repo.output)?;
    Ok(())
}
